//! Promotion storage

use jiff::civil::Date;
use tracing::info;

use crate::{
    promotions::{Promotion, PromotionError, PromotionId, PromotionUsage, UsageError},
    stores::StoreId,
};

/// The set of configured promotions and the queries run against it.
#[derive(Debug, Clone, Default)]
pub struct PromotionStorage {
    promotions: Vec<Promotion>,
}

impl PromotionStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage holding the given promotions.
    ///
    /// # Errors
    ///
    /// Returns [`PromotionError::DuplicateId`] if two promotions share an id.
    pub fn from_promotions(
        promotions: impl IntoIterator<Item = Promotion>,
    ) -> Result<Self, PromotionError> {
        let mut storage = Self::new();

        for promotion in promotions {
            storage.insert(promotion)?;
        }

        Ok(storage)
    }

    /// Adds a promotion.
    ///
    /// # Errors
    ///
    /// Returns [`PromotionError::DuplicateId`] if the id is already stored.
    pub fn insert(&mut self, promotion: Promotion) -> Result<(), PromotionError> {
        if self.get(promotion.id()).is_some() {
            return Err(PromotionError::DuplicateId(promotion.id()));
        }

        self.promotions.push(promotion);

        Ok(())
    }

    /// Returns a promotion by id.
    pub fn get(&self, id: PromotionId) -> Option<&Promotion> {
        self.promotions
            .iter()
            .find(|promotion| promotion.id() == id)
    }

    /// Returns a mutable promotion by id.
    pub fn get_mut(&mut self, id: PromotionId) -> Option<&mut Promotion> {
        self.promotions
            .iter_mut()
            .find(|promotion| promotion.id() == id)
    }

    /// Returns all promotions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Promotion> {
        self.promotions.iter()
    }

    /// Returns the number of promotions.
    pub fn len(&self) -> usize {
        self.promotions.len()
    }

    /// Returns whether the storage is empty.
    pub fn is_empty(&self) -> bool {
        self.promotions.is_empty()
    }

    /// Loads the automatic promotions usable for the order type and store on
    /// `date`, lightest weight first.
    ///
    /// Promotions that need a coupon are left out; see
    /// [`PromotionStorage::load_by_coupon`].
    ///
    /// # Errors
    ///
    /// Returns a [`UsageError`] if the usage counter is unavailable.
    pub fn load_available(
        &self,
        order_type: &str,
        store: Option<&StoreId>,
        usage: &dyn PromotionUsage,
        date: Date,
    ) -> Result<Vec<&Promotion>, UsageError> {
        let mut available = Vec::new();

        for promotion in &self.promotions {
            if promotion.is_enabled()
                && !promotion.has_coupons()
                && promotion.applies_to_order_type(order_type)
                && promotion.applies_to_store(store)
                && promotion.is_active_on(date)
                && !promotion.is_maxed(usage)?
            {
                available.push(promotion);
            }
        }

        available.sort_by_key(|promotion| promotion.weight());

        Ok(available)
    }

    /// Loads the promotion owning the enabled coupon `code`.
    pub fn load_by_coupon(&self, code: &str) -> Option<&Promotion> {
        self.promotions
            .iter()
            .find(|promotion| promotion.has_enabled_coupon(code))
    }

    /// Loads enabled promotions whose window ended before `date`.
    pub fn load_expired(&self, date: Date) -> Vec<&Promotion> {
        self.promotions
            .iter()
            .filter(|promotion| promotion.is_enabled() && promotion.is_expired_on(date))
            .collect()
    }

    /// Loads enabled promotions that reached their usage limit.
    ///
    /// # Errors
    ///
    /// Returns a [`UsageError`] if the usage counter is unavailable.
    pub fn load_maxed_usage(
        &self,
        usage: &dyn PromotionUsage,
    ) -> Result<Vec<&Promotion>, UsageError> {
        let mut maxed = Vec::new();

        for promotion in &self.promotions {
            if promotion.is_enabled() && promotion.is_maxed(usage)? {
                maxed.push(promotion);
            }
        }

        Ok(maxed)
    }

    /// Disables promotions that expired before `date` or reached their usage
    /// limit, returning their ids.
    ///
    /// # Errors
    ///
    /// Returns a [`UsageError`] if the usage counter is unavailable; nothing
    /// is disabled in that case.
    pub fn disable_expired(
        &mut self,
        date: Date,
        usage: &dyn PromotionUsage,
    ) -> Result<Vec<PromotionId>, UsageError> {
        let mut ids: Vec<_> = self.load_expired(date).iter().map(|p| p.id()).collect();

        for promotion in self.load_maxed_usage(usage)? {
            if !ids.contains(&promotion.id()) {
                ids.push(promotion.id());
            }
        }

        for promotion in &mut self.promotions {
            if ids.contains(&promotion.id()) {
                promotion.set_enabled(false);
                info!(promotion_id = %promotion.id(), "disabled expired promotion");
            }
        }

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use jiff::civil::date;
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use crate::{
        orders::OrderId,
        promotions::{Coupon, InMemoryPromotionUsage, OrderPercentageOff, PromotionOffer},
    };

    use super::*;

    fn offer() -> Result<Arc<dyn PromotionOffer>, PromotionError> {
        Ok(Arc::new(OrderPercentageOff::new(Decimal::new(10, 2))?))
    }

    fn storage() -> Result<PromotionStorage, PromotionError> {
        let start = date(2017, 1, 1);

        PromotionStorage::from_promotions([
            Promotion::builder(PromotionId(1), "Weight 4", offer()?, start)
                .weight(4)
                .build()?,
            Promotion::builder(PromotionId(2), "Disabled", offer()?, start)
                .enabled(false)
                .build()?,
            Promotion::builder(PromotionId(3), "Weight -10", offer()?, start)
                .weight(-10)
                .build()?,
            Promotion::builder(PromotionId(4), "Future", offer()?, date(2017, 2, 1)).build()?,
            Promotion::builder(PromotionId(5), "Weight 2", offer()?, start)
                .weight(2)
                .build()?,
            Promotion::builder(PromotionId(6), "Expired", offer()?, start)
                .end_date(date(2017, 1, 10))
                .build()?,
            Promotion::builder(PromotionId(7), "Weight 1", offer()?, start)
                .weight(1)
                .build()?,
            Promotion::builder(PromotionId(8), "Coupon", offer()?, start)
                .coupon(Coupon::new("SAVE10"))
                .build()?,
            Promotion::builder(PromotionId(9), "Limited", offer()?, start)
                .usage_limit(1)
                .weight(3)
                .build()?,
        ])
    }

    #[test]
    fn load_available_filters_and_sorts_by_weight() -> TestResult {
        let storage = storage()?;
        let usage = InMemoryPromotionUsage::new();
        usage.record(OrderId(1), PromotionId(9))?;

        let names: Vec<_> = storage
            .load_available("default", None, &usage, date(2017, 1, 15))?
            .into_iter()
            .map(Promotion::name)
            .collect();

        assert_eq!(names, ["Weight -10", "Weight 1", "Weight 2", "Weight 4"]);

        Ok(())
    }

    #[test]
    fn equal_weights_keep_insertion_order() -> TestResult {
        let start = date(2017, 1, 1);
        let storage = PromotionStorage::from_promotions([
            Promotion::builder(PromotionId(1), "First", offer()?, start).build()?,
            Promotion::builder(PromotionId(2), "Second", offer()?, start).build()?,
        ])?;

        let ids: Vec<_> = storage
            .load_available("default", None, &InMemoryPromotionUsage::new(), start)?
            .into_iter()
            .map(Promotion::id)
            .collect();

        assert_eq!(ids, [PromotionId(1), PromotionId(2)]);

        Ok(())
    }

    #[test]
    fn duplicate_ids_are_rejected() -> TestResult {
        let mut storage = storage()?;
        let duplicate = Promotion::builder(PromotionId(1), "Again", offer()?, date(2017, 1, 1))
            .build()?;

        assert_eq!(
            storage.insert(duplicate),
            Err(PromotionError::DuplicateId(PromotionId(1)))
        );

        Ok(())
    }

    #[test]
    fn coupon_lookup_and_maintenance_queries() -> TestResult {
        let mut storage = storage()?;
        let usage = InMemoryPromotionUsage::new();
        usage.record(OrderId(1), PromotionId(9))?;

        assert_eq!(
            storage.load_by_coupon("SAVE10").map(Promotion::id),
            Some(PromotionId(8))
        );
        assert!(storage.load_by_coupon("UNKNOWN").is_none());

        let expired: Vec<_> = storage
            .load_expired(date(2017, 1, 15))
            .into_iter()
            .map(Promotion::id)
            .collect();

        assert_eq!(expired, [PromotionId(6)]);

        let maxed: Vec<_> = storage
            .load_maxed_usage(&usage)?
            .into_iter()
            .map(Promotion::id)
            .collect();

        assert_eq!(maxed, [PromotionId(9)]);

        let disabled = storage.disable_expired(date(2017, 1, 15), &usage)?;

        assert_eq!(disabled, [PromotionId(6), PromotionId(9)]);
        assert!(storage.load_expired(date(2017, 1, 15)).is_empty());
        assert!(
            !storage
                .get(PromotionId(9))
                .is_some_and(Promotion::is_enabled)
        );

        Ok(())
    }
}
