//! Swiss VAT

use jiff::civil::{Date, date};
use rust_decimal::Decimal;

use crate::tax::{TaxError, TaxRate, TaxRateAmount, TaxType, TaxZone, Territory};

const RATE_CHANGE: Date = date(2011, 1, 1);
const INTRODUCED: Date = date(1995, 1, 1);

/// VAT collected in Switzerland, Liechtenstein, Büsingen am Hochrhein and
/// Campione d'Italia.
#[derive(Debug, Clone)]
pub struct SwissVat {
    id: String,
    display_inclusive: bool,
    zones: Vec<TaxZone>,
}

impl SwissVat {
    /// Plugin id
    pub const PLUGIN_ID: &'static str = "swiss_vat";

    /// Creates the tax type.
    ///
    /// # Errors
    ///
    /// Returns a [`TaxError`] if the built-in rates fail validation.
    pub fn new(id: impl Into<String>, display_inclusive: bool) -> Result<Self, TaxError> {
        let zone = TaxZone::new(
            "ch",
            "Switzerland",
            vec![
                Territory::new("CH"),
                Territory::new("LI"),
                Territory::new("DE").with_included_postal_codes("78266"),
                Territory::new("IT").with_included_postal_codes("22060"),
            ],
            vec![
                dated_rate(
                    "standard",
                    "Standard",
                    Decimal::new(76, 3),
                    Decimal::new(8, 2),
                )?
                .with_default(true),
                dated_rate("hotel", "Hotel", Decimal::new(36, 3), Decimal::new(38, 3))?,
                dated_rate(
                    "reduced",
                    "Reduced",
                    Decimal::new(24, 3),
                    Decimal::new(25, 3),
                )?,
            ],
        );

        Ok(Self {
            id: id.into(),
            display_inclusive,
            zones: vec![zone],
        })
    }
}

fn dated_rate(
    id: &str,
    label: &str,
    before: Decimal,
    after: Decimal,
) -> Result<TaxRate, TaxError> {
    TaxRate::new(
        id,
        label,
        [
            TaxRateAmount::between(before, Some(INTRODUCED), Some(RATE_CHANGE)),
            TaxRateAmount::between(after, Some(RATE_CHANGE), None),
        ],
    )
}

impl TaxType for SwissVat {
    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &'static str {
        "Swiss VAT"
    }

    fn display_label(&self) -> &'static str {
        "VAT"
    }

    fn is_display_inclusive(&self) -> bool {
        self.display_inclusive
    }

    fn should_round(&self) -> bool {
        true
    }

    fn zones(&self) -> &[TaxZone] {
        &self.zones
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::stores::Address;

    use super::*;

    fn standard_amount(tax: &SwissVat, on: Date) -> Option<Decimal> {
        tax.zones()
            .first()
            .and_then(TaxZone::default_rate)
            .and_then(|rate| rate.amount_on(on))
            .map(|amount| amount.amount)
    }

    #[test]
    fn standard_rate_changes_on_new_year_2011() -> TestResult {
        let tax = SwissVat::new("swiss_vat", true)?;

        assert_eq!(
            standard_amount(&tax, date(2010, 12, 31)),
            Some(Decimal::new(76, 3))
        );
        assert_eq!(
            standard_amount(&tax, date(2011, 1, 1)),
            Some(Decimal::new(8, 2))
        );
        assert_eq!(standard_amount(&tax, date(1994, 6, 1)), None);

        Ok(())
    }

    #[test]
    fn labels_are_fixed() -> TestResult {
        let tax = SwissVat::new("swiss_vat", false)?;

        assert_eq!(tax.label(), "Swiss VAT");
        assert_eq!(tax.display_label(), "VAT");

        Ok(())
    }

    #[test]
    fn zone_covers_enclaves() -> TestResult {
        let tax = SwissVat::new("swiss_vat", true)?;
        let zone = tax.zones().first().ok_or("missing zone")?;

        assert!(zone.matches(&Address::new("LI")));
        assert!(zone.matches(&Address::new("DE").with_postal_code("78266")));
        assert!(zone.matches(&Address::new("IT").with_postal_code("22060")));
        assert!(!zone.matches(&Address::new("DE").with_postal_code("78267")));
        assert!(!zone.matches(&Address::new("FR")));
        assert_eq!(
            zone.rate("hotel").map(TaxRate::amounts).map(<[_]>::len),
            Some(2)
        );

        Ok(())
    }
}
