//! Promotion order processor

use std::fmt;

use jiff::Timestamp;
use tracing::debug;

use crate::{
    adjustments::{Adjustment, AdjustmentType},
    orders::{
        Order,
        refresh::{OrderProcessor, ProcessContext, RefreshError},
    },
    promotions::{
        OfferTarget, Promotion, PromotionError, PromotionId, PromotionStorage, PromotionUsage,
    },
};

/// Applies available promotions to orders and records their usage.
#[derive(Clone, Copy)]
pub struct PromotionOrderProcessor<'a> {
    storage: &'a PromotionStorage,
    usage: &'a dyn PromotionUsage,
}

impl fmt::Debug for PromotionOrderProcessor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromotionOrderProcessor")
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

impl<'a> PromotionOrderProcessor<'a> {
    /// Creates a processor over the given promotions and usage counter.
    pub fn new(storage: &'a PromotionStorage, usage: &'a dyn PromotionUsage) -> Self {
        Self { storage, usage }
    }

    /// Applies automatic promotions, then the coupon promotions presented on
    /// the order, each group lightest weight first. Returns the ids of the
    /// promotions that produced adjustments.
    ///
    /// # Errors
    ///
    /// Returns a [`PromotionError`] if the usage counter fails or a discount
    /// cannot be added to the order.
    #[tracing::instrument(
        name = "promotions.apply",
        skip(self, order),
        fields(order_id = %order.id()),
        err
    )]
    pub fn apply(
        &self,
        order: &mut Order,
        now: Timestamp,
    ) -> Result<Vec<PromotionId>, PromotionError> {
        let date = order.calculation_date(now);
        let mut candidates = self
            .storage
            .load_available(order.order_type(), order.store_id(), self.usage, date)?;

        let mut coupon_promotions: Vec<&Promotion> = Vec::new();

        for code in order.coupons() {
            match self.storage.load_by_coupon(code) {
                Some(promotion)
                    if !coupon_promotions
                        .iter()
                        .any(|existing| existing.id() == promotion.id()) =>
                {
                    coupon_promotions.push(promotion);
                }
                Some(_) => {}
                None => debug!(order_id = %order.id(), coupon = %code, "unknown coupon code"),
            }
        }

        coupon_promotions.sort_by_key(|promotion| promotion.weight());
        candidates.extend(coupon_promotions);

        let mut applied = Vec::new();

        for promotion in candidates {
            if !promotion.available(order, self.usage, now)? {
                debug!(promotion_id = %promotion.id(), "skipping unavailable promotion");
                continue;
            }

            let discounts = promotion.offer().apply(order)?;

            if discounts.is_empty() {
                continue;
            }

            for discount in discounts {
                let mut adjustment =
                    Adjustment::new(AdjustmentType::Promotion, promotion.name(), discount.amount)
                        .with_source_id(promotion.id().to_string());

                if let Some(percentage) = discount.percentage {
                    adjustment = adjustment.with_percentage(percentage);
                }

                match discount.target {
                    OfferTarget::Order => order.add_adjustment(adjustment)?,
                    OfferTarget::Item(key) => order.update_item(key, |item| {
                        item.add_adjustment(adjustment);

                        Ok(())
                    })?,
                }
            }

            applied.push(promotion.id());
        }

        Ok(applied)
    }

    /// Counts a use of every promotion that contributed an adjustment to
    /// `order`. Call this once the order is placed.
    ///
    /// # Errors
    ///
    /// Returns a [`PromotionError`] if the usage counter fails.
    pub fn record_usage(&self, order: &Order) -> Result<Vec<PromotionId>, PromotionError> {
        let mut recorded = Vec::new();

        for adjustment in order.collect_adjustments()? {
            if adjustment.kind() != AdjustmentType::Promotion {
                continue;
            }

            let Some(id) = adjustment
                .source_id()
                .and_then(|source_id| source_id.parse().ok())
                .map(PromotionId)
            else {
                continue;
            };

            if !recorded.contains(&id) && self.storage.get(id).is_some() {
                self.usage.record(order.id(), id)?;
                recorded.push(id);
            }
        }

        Ok(recorded)
    }
}

impl OrderProcessor for PromotionOrderProcessor<'_> {
    fn process(&self, order: &mut Order, context: &ProcessContext) -> Result<(), RefreshError> {
        self.apply(order, context.now)?;

        Ok(())
    }
}
