//! Promotions
//!
//! A promotion pairs availability rules (order types, stores, date window,
//! coupons, usage limit) with an offer that turns an order into discounts.

use std::{fmt, sync::Arc};

use jiff::{Timestamp, civil::Date};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    orders::{Order, OrderError},
    prices::PriceError,
    stores::StoreId,
};

pub mod offers;
pub mod processor;
pub mod storage;
pub mod usage;

pub use offers::{
    ItemPercentageOff, OfferConfig, OfferDiscount, OfferTarget, OrderFixedAmountOff,
    OrderPercentageOff, PromotionOffer,
};
pub use processor::PromotionOrderProcessor;
pub use storage::PromotionStorage;
pub use usage::{InMemoryPromotionUsage, PromotionUsage, UsageError};

/// Promotion identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromotionId(pub u64);

impl fmt::Display for PromotionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised while building or evaluating promotions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PromotionError {
    /// The end date is before the start date.
    #[error("promotion {promotion} ends on {end_date}, before it starts on {start_date}")]
    InvalidDateRange {
        /// Promotion name
        promotion: String,

        /// Start date
        start_date: Date,

        /// End date
        end_date: Date,
    },

    /// An offer percentage is outside `(0, 1]`.
    #[error("offer percentage must be greater than 0 and at most 1, got {0}")]
    InvalidPercentage(Decimal),

    /// An offer amount is not positive.
    #[error("offer amount must be positive, got {0}")]
    InvalidAmount(String),

    /// Two promotions share an id.
    #[error("duplicate promotion id {0}")]
    DuplicateId(PromotionId),

    /// The usage counter failed.
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// Offer arithmetic failed.
    #[error(transparent)]
    Price(#[from] PriceError),

    /// An offer could not be applied to the order.
    #[error(transparent)]
    Order(#[from] OrderError),
}

/// A coupon code unlocking a promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    /// Code customers enter
    pub code: String,

    /// Whether the code is accepted
    #[serde(default = "enabled")]
    pub enabled: bool,
}

fn enabled() -> bool {
    true
}

impl Coupon {
    /// Creates an enabled coupon.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            enabled: true,
        }
    }
}

/// A promotion with its availability rules and offer.
#[derive(Debug, Clone)]
pub struct Promotion {
    id: PromotionId,
    name: String,
    description: Option<String>,
    order_types: SmallVec<[String; 2]>,
    stores: SmallVec<[StoreId; 2]>,
    offer: Arc<dyn PromotionOffer>,
    start_date: Date,
    end_date: Option<Date>,
    usage_limit: Option<u64>,
    enabled: bool,
    coupons: SmallVec<[Coupon; 2]>,
    weight: i32,
}

impl Promotion {
    /// Starts building an enabled promotion without restrictions.
    pub fn builder(
        id: PromotionId,
        name: impl Into<String>,
        offer: Arc<dyn PromotionOffer>,
        start_date: Date,
    ) -> PromotionBuilder {
        PromotionBuilder {
            promotion: Self {
                id,
                name: name.into(),
                description: None,
                order_types: SmallVec::new(),
                stores: SmallVec::new(),
                offer,
                start_date,
                end_date: None,
                usage_limit: None,
                enabled: true,
                coupons: SmallVec::new(),
                weight: 0,
            },
        }
    }

    /// Returns the id.
    pub fn id(&self) -> PromotionId {
        self.id
    }

    /// Returns the name, used as the adjustment label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the offer.
    pub fn offer(&self) -> &dyn PromotionOffer {
        self.offer.as_ref()
    }

    /// Returns the first day the promotion is active.
    pub fn start_date(&self) -> Date {
        self.start_date
    }

    /// Returns the last day the promotion is active, if it ends.
    pub fn end_date(&self) -> Option<Date> {
        self.end_date
    }

    /// Returns the maximum number of orders that may use the promotion.
    pub fn usage_limit(&self) -> Option<u64> {
        self.usage_limit
    }

    /// Returns whether the promotion is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables the promotion.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Returns the coupons.
    pub fn coupons(&self) -> &[Coupon] {
        &self.coupons
    }

    /// Returns whether the promotion needs a coupon.
    pub fn has_coupons(&self) -> bool {
        !self.coupons.is_empty()
    }

    /// Returns whether `code` matches one of the enabled coupons.
    pub fn has_enabled_coupon(&self, code: &str) -> bool {
        self.coupons
            .iter()
            .any(|coupon| coupon.enabled && coupon.code == code)
    }

    /// Returns the sort weight; lighter promotions apply first.
    pub fn weight(&self) -> i32 {
        self.weight
    }

    /// Returns whether the promotion applies to orders of the given type.
    pub fn applies_to_order_type(&self, order_type: &str) -> bool {
        self.order_types.is_empty() || self.order_types.iter().any(|id| id == order_type)
    }

    /// Returns whether the promotion applies to orders from the given store.
    pub fn applies_to_store(&self, store: Option<&StoreId>) -> bool {
        self.stores.is_empty() || store.is_some_and(|store| self.stores.contains(store))
    }

    /// Returns whether `date` is inside the promotion's window.
    pub fn is_active_on(&self, date: Date) -> bool {
        self.start_date <= date && self.end_date.is_none_or(|end_date| date <= end_date)
    }

    /// Returns whether the promotion ended before `date`.
    pub fn is_expired_on(&self, date: Date) -> bool {
        self.end_date.is_some_and(|end_date| end_date < date)
    }

    /// Returns whether the usage limit has been reached.
    ///
    /// # Errors
    ///
    /// Returns a [`UsageError`] if the counter is unavailable.
    pub fn is_maxed(&self, usage: &dyn PromotionUsage) -> Result<bool, UsageError> {
        match self.usage_limit {
            Some(limit) => Ok(usage.count(self.id)? >= limit),
            None => Ok(false),
        }
    }

    /// Returns whether the promotion can be applied to `order` at `now`.
    ///
    /// Coupon promotions additionally require the order to present one of
    /// their enabled codes.
    ///
    /// # Errors
    ///
    /// Returns [`PromotionError::Usage`] if the usage counter is unavailable.
    pub fn available(
        &self,
        order: &Order,
        usage: &dyn PromotionUsage,
        now: Timestamp,
    ) -> Result<bool, PromotionError> {
        if !self.enabled
            || !self.applies_to_order_type(order.order_type())
            || !self.applies_to_store(order.store_id())
            || !self.is_active_on(order.calculation_date(now))
        {
            return Ok(false);
        }

        if self.has_coupons()
            && !order
                .coupons()
                .iter()
                .any(|code| self.has_enabled_coupon(code))
        {
            return Ok(false);
        }

        Ok(!self.is_maxed(usage)?)
    }
}

/// Builder for [`Promotion`].
#[derive(Debug)]
pub struct PromotionBuilder {
    promotion: Promotion,
}

impl PromotionBuilder {
    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.promotion.description = Some(description.into());
        self
    }

    /// Restricts the promotion to the given order types.
    #[must_use]
    pub fn order_types<I, S>(mut self, order_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.promotion.order_types = order_types.into_iter().map(Into::into).collect();
        self
    }

    /// Restricts the promotion to the given stores.
    #[must_use]
    pub fn stores<I, S>(mut self, stores: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<StoreId>,
    {
        self.promotion.stores = stores.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the last day the promotion is active.
    #[must_use]
    pub fn end_date(mut self, end_date: Date) -> Self {
        self.promotion.end_date = Some(end_date);
        self
    }

    /// Limits the number of orders that may use the promotion.
    #[must_use]
    pub fn usage_limit(mut self, limit: u64) -> Self {
        self.promotion.usage_limit = Some(limit);
        self
    }

    /// Enables or disables the promotion.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.promotion.enabled = enabled;
        self
    }

    /// Adds a coupon.
    #[must_use]
    pub fn coupon(mut self, coupon: Coupon) -> Self {
        self.promotion.coupons.push(coupon);
        self
    }

    /// Sets the sort weight.
    #[must_use]
    pub fn weight(mut self, weight: i32) -> Self {
        self.promotion.weight = weight;
        self
    }

    /// Validates and returns the promotion.
    ///
    /// # Errors
    ///
    /// Returns [`PromotionError::InvalidDateRange`] if the end date is before
    /// the start date.
    pub fn build(self) -> Result<Promotion, PromotionError> {
        let promotion = self.promotion;

        if let Some(end_date) = promotion.end_date
            && end_date < promotion.start_date
        {
            return Err(PromotionError::InvalidDateRange {
                promotion: promotion.name,
                start_date: promotion.start_date,
                end_date,
            });
        }

        Ok(promotion)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use jiff::civil::date;
    use rust_decimal::Decimal;
    use rusty_money::iso::USD;
    use testresult::TestResult;

    use crate::{
        orders::OrderId,
        stores::{Address, Store},
    };

    use super::*;

    fn offer() -> Result<Arc<dyn PromotionOffer>, PromotionError> {
        Ok(Arc::new(OrderPercentageOff::new(Decimal::new(10, 2))?))
    }

    fn order() -> Result<Order, jiff::Error> {
        let store = Store::new("1", "Default store", USD, Address::new("US"));

        Ok(Order::new(OrderId(1), "default", "2017-01-15T10:00:00Z".parse()?)
            .with_store(Arc::new(store)))
    }

    #[test]
    fn end_before_start_is_rejected() -> TestResult {
        let result = Promotion::builder(PromotionId(1), "Broken", offer()?, date(2017, 2, 1))
            .end_date(date(2017, 1, 1))
            .build();

        assert!(matches!(result, Err(PromotionError::InvalidDateRange { .. })));

        Ok(())
    }

    #[test]
    fn available_checks_every_rule() -> TestResult {
        let now: Timestamp = "2017-01-15T10:00:00Z".parse()?;
        let usage = InMemoryPromotionUsage::new();
        let order = order()?;

        let promotion = Promotion::builder(PromotionId(1), "Ten off", offer()?, date(2017, 1, 1))
            .order_types(["default"])
            .stores(["1"])
            .end_date(date(2017, 1, 15))
            .build()?;

        assert!(promotion.available(&order, &usage, now)?);

        let other_type = Promotion::builder(PromotionId(2), "B2B", offer()?, date(2017, 1, 1))
            .order_types(["b2b"])
            .build()?;

        assert!(!other_type.available(&order, &usage, now)?);

        let other_store = Promotion::builder(PromotionId(3), "Other", offer()?, date(2017, 1, 1))
            .stores(["2"])
            .build()?;

        assert!(!other_store.available(&order, &usage, now)?);

        let future = Promotion::builder(PromotionId(4), "Future", offer()?, date(2017, 1, 16))
            .build()?;

        assert!(!future.available(&order, &usage, now)?);

        let disabled = Promotion::builder(PromotionId(5), "Off", offer()?, date(2017, 1, 1))
            .enabled(false)
            .build()?;

        assert!(!disabled.available(&order, &usage, now)?);

        Ok(())
    }

    #[test]
    fn availability_stays_false_once_usage_limit_is_reached() -> TestResult {
        let now: Timestamp = "2017-01-15T10:00:00Z".parse()?;
        let usage = InMemoryPromotionUsage::new();
        let order = order()?;
        let promotion = Promotion::builder(PromotionId(1), "Limited", offer()?, date(2017, 1, 1))
            .usage_limit(2)
            .build()?;

        usage.record(OrderId(10), promotion.id())?;

        assert!(promotion.available(&order, &usage, now)?);

        usage.record(OrderId(11), promotion.id())?;

        assert!(!promotion.available(&order, &usage, now)?);

        usage.record(OrderId(12), promotion.id())?;

        assert!(!promotion.available(&order, &usage, now)?);

        Ok(())
    }

    #[test]
    fn coupon_promotions_need_an_enabled_code() -> TestResult {
        let now: Timestamp = "2017-01-15T10:00:00Z".parse()?;
        let usage = InMemoryPromotionUsage::new();
        let mut order = order()?;
        let promotion = Promotion::builder(PromotionId(1), "Coupon", offer()?, date(2017, 1, 1))
            .coupon(Coupon::new("SAVE10"))
            .coupon(Coupon {
                code: "OLD".to_owned(),
                enabled: false,
            })
            .build()?;

        assert!(!promotion.available(&order, &usage, now)?);

        order.add_coupon("OLD");

        assert!(!promotion.available(&order, &usage, now)?);

        order.add_coupon("SAVE10");

        assert!(promotion.available(&order, &usage, now)?);

        Ok(())
    }

    #[test]
    fn unavailable_usage_store_is_an_error() -> TestResult {
        let now: Timestamp = "2017-01-15T10:00:00Z".parse()?;
        let mut usage = usage::MockPromotionUsage::new();
        usage
            .expect_count()
            .returning(|_| Err(UsageError::Unavailable("timeout".to_owned())));

        let promotion = Promotion::builder(PromotionId(1), "Limited", offer()?, date(2017, 1, 1))
            .usage_limit(1)
            .build()?;

        assert!(matches!(
            promotion.available(&order()?, &usage, now),
            Err(PromotionError::Usage(_))
        ));

        Ok(())
    }
}
