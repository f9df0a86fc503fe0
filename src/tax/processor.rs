//! Tax order processor

use std::sync::Arc;

use jiff::Timestamp;
use tracing::debug;

use crate::{
    orders::{
        Order,
        refresh::{OrderProcessor, ProcessContext, RefreshError},
    },
    tax::{TaxError, TaxType},
};

/// Applies every configured tax type that applies to the order.
#[derive(Debug, Clone, Default)]
pub struct TaxOrderProcessor {
    tax_types: Vec<Arc<dyn TaxType>>,
}

impl TaxOrderProcessor {
    /// Creates a processor over the given tax types, applied in order.
    pub fn new(tax_types: impl IntoIterator<Item = Arc<dyn TaxType>>) -> Self {
        Self {
            tax_types: tax_types.into_iter().collect(),
        }
    }

    /// Returns the tax types.
    pub fn tax_types(&self) -> &[Arc<dyn TaxType>] {
        &self.tax_types
    }

    /// Applies the tax types for the order's calculation date, returning the
    /// number of tax adjustments added.
    ///
    /// # Errors
    ///
    /// Returns a [`TaxError`] if a tax type fails; taxes already applied by
    /// earlier tax types are kept on the order.
    #[tracing::instrument(
        name = "tax.apply",
        skip(self, order),
        fields(order_id = %order.id()),
        err
    )]
    pub fn apply(&self, order: &mut Order, now: Timestamp) -> Result<usize, TaxError> {
        let date = order.calculation_date(now);
        let mut added = 0;

        for tax_type in &self.tax_types {
            if !tax_type.applies(order) {
                debug!(tax_type = tax_type.id(), "tax type does not apply");
                continue;
            }

            added += tax_type.apply(order, date)?;
        }

        Ok(added)
    }
}

impl OrderProcessor for TaxOrderProcessor {
    fn process(&self, order: &mut Order, context: &ProcessContext) -> Result<(), RefreshError> {
        self.apply(order, context.now)?;

        Ok(())
    }
}
