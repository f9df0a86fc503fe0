//! Adjustments
//!
//! Monetary deltas (discounts, fees, taxes) attached to an order or to one of its items.

use std::fmt;

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::prices::{Price, PriceError};

/// The kind of an adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    /// Manually added adjustment
    Custom,

    /// Discount or fee produced by a promotion
    Promotion,

    /// Tax
    Tax,

    /// Handling or service fee
    Fee,

    /// Shipping cost
    Shipping,
}

impl AdjustmentType {
    /// Returns the machine name of the adjustment type.
    pub const fn as_str(self) -> &'static str {
        match self {
            AdjustmentType::Custom => "custom",
            AdjustmentType::Promotion => "promotion",
            AdjustmentType::Tax => "tax",
            AdjustmentType::Fee => "fee",
            AdjustmentType::Shipping => "shipping",
        }
    }
}

impl fmt::Display for AdjustmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an item adjustment relates to the item's quantity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AdjustmentScale {
    /// The amount applies to a single unit and is multiplied by the quantity.
    #[default]
    PerUnit,

    /// The amount applies once to the whole line.
    PerLine,
}

/// A typed monetary delta.
///
/// Adjustments are immutable values; two adjustments are the same adjustment
/// when all of their fields are equal.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjustment {
    kind: AdjustmentType,
    label: String,
    amount: Price,
    percentage: Option<Percentage>,
    source_id: Option<String>,
    included: bool,
    locked: bool,
    scale: AdjustmentScale,
}

impl Adjustment {
    /// Creates an unlocked, non-included, per-unit adjustment.
    pub fn new(kind: AdjustmentType, label: impl Into<String>, amount: Price) -> Self {
        Self {
            kind,
            label: label.into(),
            amount,
            percentage: None,
            source_id: None,
            included: false,
            locked: false,
            scale: AdjustmentScale::PerUnit,
        }
    }

    /// Sets the percentage the amount was derived from.
    #[must_use]
    pub fn with_percentage(mut self, percentage: Percentage) -> Self {
        self.percentage = Some(percentage);
        self
    }

    /// Sets the identifier of the rule that produced the adjustment.
    #[must_use]
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Marks the amount as already included in the unit price.
    #[must_use]
    pub fn included(mut self, included: bool) -> Self {
        self.included = included;
        self
    }

    /// Locks the adjustment so that refreshes keep it.
    #[must_use]
    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Applies the amount once per line instead of once per unit.
    #[must_use]
    pub fn per_line(mut self) -> Self {
        self.scale = AdjustmentScale::PerLine;
        self
    }

    /// Returns the adjustment type.
    pub fn kind(&self) -> AdjustmentType {
        self.kind
    }

    /// Returns the label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the signed amount.
    pub fn amount(&self) -> &Price {
        &self.amount
    }

    /// Returns the percentage, if any.
    pub fn percentage(&self) -> Option<&Percentage> {
        self.percentage.as_ref()
    }

    /// Returns the source identifier, if any.
    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    /// Returns whether the amount is already part of the unit price.
    pub fn is_included(&self) -> bool {
        self.included
    }

    /// Returns whether the adjustment survives refreshes.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Returns how the adjustment scales with item quantity.
    pub fn scale(&self) -> AdjustmentScale {
        self.scale
    }

    /// Returns whether this adjustment is a discount.
    pub fn is_negative(&self) -> bool {
        self.amount.is_negative()
    }

    /// Returns whether this adjustment is a fee or tax.
    pub fn is_positive(&self) -> bool {
        self.amount.is_positive()
    }

    /// Returns a copy scaled to the given item quantity.
    ///
    /// Per-line adjustments are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Overflow`] if the scaled amount does not fit a decimal.
    pub fn scaled(&self, quantity: Decimal) -> Result<Self, PriceError> {
        let mut scaled = self.clone();

        if self.scale == AdjustmentScale::PerUnit {
            scaled.amount = self.amount.multiply(quantity)?;
            scaled.scale = AdjustmentScale::PerLine;
        }

        Ok(scaled)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn fee(amount: &str) -> Result<Adjustment, PriceError> {
        Ok(Adjustment::new(
            AdjustmentType::Fee,
            "Handling fee",
            Price::parse(amount, "USD")?,
        ))
    }

    #[test]
    fn new_adjustment_defaults() -> TestResult {
        let adjustment = fee("10.00")?;

        assert_eq!(adjustment.kind(), AdjustmentType::Fee);
        assert_eq!(adjustment.label(), "Handling fee");
        assert!(!adjustment.is_included());
        assert!(!adjustment.is_locked());
        assert!(adjustment.source_id().is_none());
        assert!(adjustment.is_positive());

        Ok(())
    }

    #[test]
    fn structural_equality_compares_all_fields() -> TestResult {
        assert_eq!(fee("10.00")?, fee("10.00")?);
        assert_ne!(fee("10.00")?, fee("10.00")?.included(true));
        assert_ne!(fee("10.00")?, fee("9.99")?);
        assert_ne!(fee("10.00")?, fee("10.00")?.with_source_id("rule"));

        Ok(())
    }

    #[test]
    fn scaled_multiplies_per_unit_amounts() -> TestResult {
        let scaled = fee("5.00")?.scaled(Decimal::from(2))?;

        assert_eq!(scaled.amount(), &Price::parse("10.00", "USD")?);
        assert_eq!(scaled.scale(), AdjustmentScale::PerLine);

        Ok(())
    }

    #[test]
    fn scaled_leaves_per_line_amounts() -> TestResult {
        let scaled = fee("5.00")?.per_line().scaled(Decimal::from(3))?;

        assert_eq!(scaled.amount(), &Price::parse("5.00", "USD")?);

        Ok(())
    }

    #[test]
    fn type_names_are_snake_case() {
        assert_eq!(AdjustmentType::Promotion.to_string(), "promotion");
        assert_eq!(AdjustmentType::Tax.as_str(), "tax");
    }
}
