//! Order refresh
//!
//! Draft orders go stale as catalog data, promotions and tax rules change. A
//! refresh throws away unlocked adjustments, reloads item data from the
//! catalog and runs the order processors again.

use std::fmt;

use jiff::Timestamp;
use mockall::automock;
use thiserror::Error;
use tracing::{Span, warn};

use crate::{
    catalog::{Catalog, CatalogEntry, CatalogError, PurchasableRef},
    clock::Clock,
    orders::{Order, OrderError, OrderState, OrderType, RefreshMode, RefreshState},
    prices::PriceError,
    promotions::PromotionError,
    stores::UserId,
    tax::TaxError,
};

/// Errors that abort a refresh. The order is left untouched when one occurs.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The catalog could not be queried.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// An order mutation failed.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// The new total could not be computed.
    #[error(transparent)]
    Price(#[from] PriceError),

    /// Promotion processing failed.
    #[error(transparent)]
    Promotion(#[from] PromotionError),

    /// Tax processing failed.
    #[error(transparent)]
    Tax(#[from] TaxError),
}

/// Data shared with order processors during a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessContext {
    /// Time the refresh started
    pub now: Timestamp,
}

/// A step of the refresh pass that adds adjustments or changes unit prices.
#[automock]
pub trait OrderProcessor {
    /// Processes the order.
    ///
    /// # Errors
    ///
    /// Returns a [`RefreshError`] to abort the refresh.
    fn process(&self, order: &mut Order, context: &ProcessContext) -> Result<(), RefreshError>;
}

/// Outcome of a refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Purchasable entities whose items were removed because they are no
    /// longer available
    pub removed_items: Vec<PurchasableRef>,
}

/// Decides when orders need refreshing and refreshes them.
pub struct OrderRefresh<'a> {
    catalog: &'a dyn Catalog,
    clock: &'a dyn Clock,
    processors: Vec<&'a dyn OrderProcessor>,
}

impl fmt::Debug for OrderRefresh<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderRefresh")
            .field("processors", &self.processors.len())
            .finish_non_exhaustive()
    }
}

impl<'a> OrderRefresh<'a> {
    /// Creates a refresher without processors.
    pub fn new(catalog: &'a dyn Catalog, clock: &'a dyn Clock) -> Self {
        Self {
            catalog,
            clock,
            processors: Vec::new(),
        }
    }

    /// Appends an order processor; processors run in the order they were added.
    #[must_use]
    pub fn with_processor(mut self, processor: &'a dyn OrderProcessor) -> Self {
        self.processors.push(processor);
        self
    }

    /// Returns whether `order` should be refreshed when `actor` loads it.
    pub fn needs_refresh(
        &self,
        order: &Order,
        order_type: &OrderType,
        actor: Option<UserId>,
    ) -> bool {
        if order.state() != OrderState::Draft {
            return false;
        }

        match order.refresh_state() {
            Some(RefreshState::Skip) => return false,
            Some(RefreshState::Force) => return true,
            None => {}
        }

        match order_type.refresh_mode {
            RefreshMode::Skip => return false,
            RefreshMode::Owner if actor.is_none() || actor != order.owner() => return false,
            RefreshMode::Owner | RefreshMode::Always => {}
        }

        if order_type.refresh_frequency == 0 {
            return true;
        }

        let elapsed = self.clock.now().duration_since(order.changed_time());
        let frequency = i64::try_from(order_type.refresh_frequency).unwrap_or(i64::MAX);

        elapsed.as_secs() >= frequency
    }

    /// Refreshes the order.
    ///
    /// # Errors
    ///
    /// Returns a [`RefreshError`] if a collaborator or processor fails or the
    /// new total cannot be computed. The order is unchanged in that case.
    #[tracing::instrument(
        name = "orders.refresh",
        skip(self, order),
        fields(order_id = %order.id(), removed_items = tracing::field::Empty),
        err
    )]
    pub fn refresh(&self, order: &mut Order) -> Result<RefreshReport, RefreshError> {
        let now = self.clock.now();
        let mut refreshed = order.clone();
        let mut report = RefreshReport::default();

        refreshed.reset_for_refresh()?;

        for key in refreshed.item_keys().to_vec() {
            let Some(reference) = refreshed
                .item(key)
                .and_then(|item| item.purchased_entity())
                .cloned()
            else {
                continue;
            };

            if let Some(CatalogEntry {
                title,
                unit_price,
                available: true,
            }) = self.catalog.resolve(&reference)?
            {
                refreshed.update_item(key, |item| {
                    item.set_title(title);

                    if !item.is_unit_price_overridden() {
                        item.set_unit_price(unit_price);
                    }

                    Ok(())
                })?;
            } else {
                warn!(
                    order_id = %refreshed.id(),
                    purchased_entity = %reference,
                    "removing order item that is no longer available"
                );

                refreshed.remove_item(key)?;
                report.removed_items.push(reference);
            }
        }

        let context = ProcessContext { now };

        for processor in &self.processors {
            processor.process(&mut refreshed, &context)?;
        }

        refreshed.recalculate_total_price()?;
        refreshed.set_changed_time(now);
        refreshed.set_refresh_state(None);

        Span::current().record("removed_items", report.removed_items.len());

        *order = refreshed;

        Ok(report)
    }

    /// Refreshes the order if [`OrderRefresh::needs_refresh`] says so.
    ///
    /// # Errors
    ///
    /// See [`OrderRefresh::refresh`].
    pub fn refresh_if_needed(
        &self,
        order: &mut Order,
        order_type: &OrderType,
        actor: Option<UserId>,
    ) -> Result<Option<RefreshReport>, RefreshError> {
        if self.needs_refresh(order, order_type, actor) {
            self.refresh(order).map(Some)
        } else {
            Ok(None)
        }
    }
}
