//! Promotion offers
//!
//! Offers compute the discounts a promotion grants on an order.

use std::{fmt, sync::Arc};

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    orders::{Order, OrderItemKey},
    prices::Price,
    promotions::PromotionError,
};

/// What a discount is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferTarget {
    /// The order as a whole
    Order,

    /// A single item; the amount is per unit
    Item(OrderItemKey),
}

/// A discount produced by an offer. Amounts are negative.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferDiscount {
    /// Order or item the discount applies to
    pub target: OfferTarget,

    /// Signed amount
    pub amount: Price,

    /// Percentage the amount was derived from
    pub percentage: Option<Percentage>,
}

/// Computes the discounts a promotion grants on an order.
pub trait PromotionOffer: fmt::Debug + Send + Sync {
    /// Returns the plugin id of the offer.
    fn id(&self) -> &'static str;

    /// Returns the discounts for `order`.
    ///
    /// # Errors
    ///
    /// Returns a [`PromotionError`] if the discount cannot be computed, for
    /// example because of a currency mismatch.
    fn apply(&self, order: &Order) -> Result<Vec<OfferDiscount>, PromotionError>;
}

/// Percentage off the order total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderPercentageOff {
    percentage: Percentage,
}

impl OrderPercentageOff {
    /// Creates the offer from a fraction such as `0.1` for 10%.
    ///
    /// # Errors
    ///
    /// Returns [`PromotionError::InvalidPercentage`] unless `0 < fraction <= 1`.
    pub fn new(fraction: Decimal) -> Result<Self, PromotionError> {
        Ok(Self {
            percentage: validate_percentage(fraction)?,
        })
    }
}

impl PromotionOffer for OrderPercentageOff {
    fn id(&self) -> &'static str {
        "order_percentage_off"
    }

    fn apply(&self, order: &Order) -> Result<Vec<OfferDiscount>, PromotionError> {
        let Some(total) = order.total_price().filter(|total| total.is_positive()) else {
            return Ok(Vec::new());
        };

        let amount = total.multiply(fraction(self.percentage))?.round();

        Ok(discount(OfferTarget::Order, amount, Some(self.percentage)))
    }
}

/// Fixed amount off the order total, capped at the total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderFixedAmountOff {
    amount: Price,
}

impl OrderFixedAmountOff {
    /// Creates the offer.
    ///
    /// # Errors
    ///
    /// Returns [`PromotionError::InvalidAmount`] unless `amount` is positive.
    pub fn new(amount: Price) -> Result<Self, PromotionError> {
        if !amount.is_positive() {
            return Err(PromotionError::InvalidAmount(amount.to_string()));
        }

        Ok(Self { amount })
    }
}

impl PromotionOffer for OrderFixedAmountOff {
    fn id(&self) -> &'static str {
        "order_fixed_amount_off"
    }

    fn apply(&self, order: &Order) -> Result<Vec<OfferDiscount>, PromotionError> {
        let Some(total) = order.total_price().filter(|total| total.is_positive()) else {
            return Ok(Vec::new());
        };

        let amount = if self.amount.compare(total)?.is_gt() {
            *total
        } else {
            self.amount
        };

        Ok(discount(OfferTarget::Order, amount, None))
    }
}

/// Percentage off the unit price of every item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemPercentageOff {
    percentage: Percentage,
}

impl ItemPercentageOff {
    /// Creates the offer from a fraction such as `0.25` for 25%.
    ///
    /// # Errors
    ///
    /// Returns [`PromotionError::InvalidPercentage`] unless `0 < fraction <= 1`.
    pub fn new(fraction: Decimal) -> Result<Self, PromotionError> {
        Ok(Self {
            percentage: validate_percentage(fraction)?,
        })
    }
}

impl PromotionOffer for ItemPercentageOff {
    fn id(&self) -> &'static str {
        "item_percentage_off"
    }

    fn apply(&self, order: &Order) -> Result<Vec<OfferDiscount>, PromotionError> {
        let mut discounts = Vec::new();

        for key in order.item_keys() {
            let Some(item) = order.item(*key) else {
                continue;
            };

            if !item.unit_price().is_positive() {
                continue;
            }

            let amount = item
                .unit_price()
                .multiply(fraction(self.percentage))?
                .round();

            discounts.extend(discount(
                OfferTarget::Item(*key),
                amount,
                Some(self.percentage),
            ));
        }

        Ok(discounts)
    }
}

/// Serialized offer configuration, keyed by plugin id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "plugin", rename_all = "snake_case")]
pub enum OfferConfig {
    /// [`OrderPercentageOff`]
    OrderPercentageOff {
        /// Fraction of the order total
        percentage: Decimal,
    },

    /// [`OrderFixedAmountOff`]
    OrderFixedAmountOff {
        /// Amount taken off
        amount: Price,
    },

    /// [`ItemPercentageOff`]
    ItemPercentageOff {
        /// Fraction of each unit price
        percentage: Decimal,
    },
}

impl OfferConfig {
    /// Builds the configured offer.
    ///
    /// # Errors
    ///
    /// Returns a [`PromotionError`] if the percentage or amount is invalid.
    pub fn build(&self) -> Result<Arc<dyn PromotionOffer>, PromotionError> {
        Ok(match self {
            OfferConfig::OrderPercentageOff { percentage } => {
                Arc::new(OrderPercentageOff::new(*percentage)?)
            }
            OfferConfig::OrderFixedAmountOff { amount } => {
                Arc::new(OrderFixedAmountOff::new(*amount)?)
            }
            OfferConfig::ItemPercentageOff { percentage } => {
                Arc::new(ItemPercentageOff::new(*percentage)?)
            }
        })
    }
}

fn validate_percentage(fraction: Decimal) -> Result<Percentage, PromotionError> {
    if fraction <= Decimal::ZERO || fraction > Decimal::ONE {
        return Err(PromotionError::InvalidPercentage(fraction));
    }

    Ok(Percentage::from(fraction))
}

fn fraction(percentage: Percentage) -> Decimal {
    percentage * Decimal::ONE
}

fn discount(
    target: OfferTarget,
    amount: Price,
    percentage: Option<Percentage>,
) -> Vec<OfferDiscount> {
    if amount.is_zero() {
        return Vec::new();
    }

    vec![OfferDiscount {
        target,
        amount: amount.negate(),
        percentage,
    }]
}
