//! Custom tax type
//!
//! A tax type configured entirely by the store owner: one zone made of the
//! configured territories, and undated rates of which the first is the default.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::tax::{TaxError, TaxRate, TaxRateAmount, TaxType, TaxZone, Territory};

/// Label shown to customers next to tax amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayLabel {
    /// "Tax"
    #[default]
    Tax,

    /// "VAT"
    Vat,

    /// "GST"
    Gst,
}

impl DisplayLabel {
    /// Returns the label text.
    pub const fn as_str(self) -> &'static str {
        match self {
            DisplayLabel::Tax => "Tax",
            DisplayLabel::Vat => "VAT",
            DisplayLabel::Gst => "GST",
        }
    }
}

/// A configured rate of a custom tax type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomRateConfig {
    /// Rate id
    pub id: String,

    /// Rate label
    pub label: String,

    /// Rate as a fraction
    pub amount: Decimal,
}

/// Configuration of a [`CustomTaxType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTaxConfig {
    /// Whether displayed prices include the tax
    #[serde(default)]
    pub display_inclusive: bool,

    /// Label shown to customers
    #[serde(default)]
    pub display_label: DisplayLabel,

    /// Whether tax amounts are rounded
    #[serde(default = "round_by_default")]
    pub round: bool,

    /// Rates; the first one is the default
    pub rates: Vec<CustomRateConfig>,

    /// Territories forming the single zone
    pub territories: Vec<Territory>,
}

fn round_by_default() -> bool {
    true
}

/// A tax type with a single `default` zone built from configuration.
#[derive(Debug, Clone)]
pub struct CustomTaxType {
    id: String,
    label: String,
    config: CustomTaxConfig,
    zones: Vec<TaxZone>,
}

impl CustomTaxType {
    /// Plugin id
    pub const PLUGIN_ID: &'static str = "custom";

    /// Builds the tax type.
    ///
    /// # Errors
    ///
    /// - [`TaxError::NoRates`]: no rates are configured.
    /// - [`TaxError::NegativeAmount`]: a rate is below zero.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        config: CustomTaxConfig,
    ) -> Result<Self, TaxError> {
        let id = id.into();

        if config.rates.is_empty() {
            return Err(TaxError::NoRates(id));
        }

        let rates = config
            .rates
            .iter()
            .enumerate()
            .map(|(index, rate)| {
                TaxRate::new(
                    rate.id.clone(),
                    rate.label.clone(),
                    [TaxRateAmount::new(rate.amount)],
                )
                .map(|built| built.with_default(index == 0))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let zones = vec![TaxZone::new(
            "default",
            "Default",
            config.territories.clone(),
            rates,
        )];

        Ok(Self {
            id,
            label: label.into(),
            config,
            zones,
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CustomTaxConfig {
        &self.config
    }

    /// Changes whether displayed prices include the tax.
    pub fn set_display_inclusive(&mut self, display_inclusive: bool) {
        self.config.display_inclusive = display_inclusive;
    }
}

impl TaxType for CustomTaxType {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn display_label(&self) -> &str {
        self.config.display_label.as_str()
    }

    fn is_display_inclusive(&self) -> bool {
        self.config.display_inclusive
    }

    fn should_round(&self) -> bool {
        self.config.round
    }

    fn zones(&self) -> &[TaxZone] {
        &self.zones
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn serbian_vat() -> Result<CustomTaxType, Box<dyn std::error::Error>> {
        let config: CustomTaxConfig = serde_norway::from_str(
            r#"
display_inclusive: true
display_label: vat
rates:
  - id: standard
    label: Standard
    amount: "0.2"
  - id: reduced
    label: Reduced
    amount: "0.1"
territories:
  - country_code: RS
"#,
        )?;

        Ok(CustomTaxType::new("serbian_vat", "Serbian VAT", config)?)
    }

    #[test]
    fn getters_reflect_configuration() -> TestResult {
        let tax_type = serbian_vat()?;

        assert_eq!(tax_type.display_label(), "VAT");
        assert!(tax_type.is_display_inclusive());
        assert!(tax_type.should_round());

        let zones = tax_type.zones();

        assert_eq!(zones.len(), 1);

        let rates = zones.first().map(TaxZone::rates).unwrap_or_default();

        assert_eq!(rates.len(), 2);
        assert_eq!(rates.first().map(TaxRate::id), Some("standard"));
        assert_eq!(
            rates
                .first()
                .and_then(|rate| rate.amounts().first())
                .map(|amount| amount.amount),
            Some(Decimal::new(2, 1))
        );
        assert!(rates.first().is_some_and(TaxRate::is_default));
        assert_eq!(rates.get(1).map(TaxRate::label), Some("Reduced"));
        assert!(!rates.get(1).is_some_and(TaxRate::is_default));

        Ok(())
    }

    #[test]
    fn rates_are_required() {
        let config = CustomTaxConfig {
            display_inclusive: false,
            display_label: DisplayLabel::Tax,
            round: true,
            rates: Vec::new(),
            territories: vec![Territory::new("RS")],
        };

        assert_eq!(
            CustomTaxType::new("empty", "Empty", config).map(|_| ()),
            Err(TaxError::NoRates("empty".to_owned()))
        );
    }
}
