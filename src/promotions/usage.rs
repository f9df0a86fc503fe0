//! Promotion usage

use std::sync::Mutex;

use mockall::automock;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use crate::{orders::OrderId, promotions::PromotionId};

/// Errors raised by usage counters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// The backing store could not be read or written.
    #[error("promotion usage store unavailable: {0}")]
    Unavailable(String),
}

/// Counts how many orders have used each promotion.
#[automock]
pub trait PromotionUsage {
    /// Records that `order` used `promotion`.
    ///
    /// Recording the same pair twice counts once. Returns whether the pair
    /// was new.
    ///
    /// # Errors
    ///
    /// Returns a [`UsageError`] if the store is unavailable.
    fn record(&self, order: OrderId, promotion: PromotionId) -> Result<bool, UsageError>;

    /// Returns the number of orders that used `promotion`.
    ///
    /// # Errors
    ///
    /// Returns a [`UsageError`] if the store is unavailable.
    fn count(&self, promotion: PromotionId) -> Result<u64, UsageError>;

    /// Forgets all usage of `promotion`.
    ///
    /// # Errors
    ///
    /// Returns a [`UsageError`] if the store is unavailable.
    fn delete(&self, promotion: PromotionId) -> Result<(), UsageError>;
}

/// Usage counter held in memory and safe to share between threads.
#[derive(Debug, Default)]
pub struct InMemoryPromotionUsage {
    orders: Mutex<FxHashMap<PromotionId, FxHashSet<OrderId>>>,
}

impl InMemoryPromotionUsage {
    /// Creates an empty counter.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_usage<T>(
        &self,
        f: impl FnOnce(&mut FxHashMap<PromotionId, FxHashSet<OrderId>>) -> T,
    ) -> Result<T, UsageError> {
        let mut usage = self
            .orders
            .lock()
            .map_err(|err| UsageError::Unavailable(err.to_string()))?;

        Ok(f(&mut usage))
    }
}

impl PromotionUsage for InMemoryPromotionUsage {
    fn record(&self, order: OrderId, promotion: PromotionId) -> Result<bool, UsageError> {
        self.with_usage(|usage| usage.entry(promotion).or_default().insert(order))
    }

    fn count(&self, promotion: PromotionId) -> Result<u64, UsageError> {
        self.with_usage(|usage| {
            usage
                .get(&promotion)
                .map_or(0, |orders| u64::try_from(orders.len()).unwrap_or(u64::MAX))
        })
    }

    fn delete(&self, promotion: PromotionId) -> Result<(), UsageError> {
        self.with_usage(|usage| {
            usage.remove(&promotion);
        })
    }
}
