//! Order items

use rust_decimal::Decimal;
use slotmap::new_key_type;
use smallvec::SmallVec;

use crate::{
    adjustments::Adjustment,
    catalog::{CatalogEntry, PurchasableRef},
    orders::OrderError,
    prices::{Price, PriceError},
};

new_key_type! {
    /// Order Item Key
    pub struct OrderItemKey;
}

/// A purchasable quantity at a unit price, owned by a single order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    purchased_entity: Option<PurchasableRef>,
    title: String,
    quantity: Decimal,
    unit_price: Price,
    original_unit_price: Option<Price>,
    overridden_unit_price: bool,
    tax_rate: Option<String>,
    adjustments: SmallVec<[Adjustment; 2]>,
}

impl OrderItem {
    /// Creates an item that is not backed by a purchasable entity.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NegativeQuantity`] if `quantity` is below zero.
    pub fn new(
        title: impl Into<String>,
        quantity: Decimal,
        unit_price: Price,
    ) -> Result<Self, OrderError> {
        ensure_quantity(quantity)?;

        Ok(Self {
            purchased_entity: None,
            title: title.into(),
            quantity,
            unit_price,
            original_unit_price: None,
            overridden_unit_price: false,
            tax_rate: None,
            adjustments: SmallVec::new(),
        })
    }

    /// Creates an item from a catalog entry, copying its title and unit price.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NegativeQuantity`] if `quantity` is below zero.
    pub fn from_purchasable(
        reference: PurchasableRef,
        entry: &CatalogEntry,
        quantity: Decimal,
    ) -> Result<Self, OrderError> {
        let mut item = Self::new(entry.title.clone(), quantity, entry.unit_price)?;
        item.purchased_entity = Some(reference);

        Ok(item)
    }

    /// Sets the tax rate id used instead of each zone's default rate.
    #[must_use]
    pub fn with_tax_rate(mut self, rate_id: impl Into<String>) -> Self {
        self.tax_rate = Some(rate_id.into());
        self
    }

    /// Returns the referenced purchasable entity, if any.
    pub fn purchased_entity(&self) -> Option<&PurchasableRef> {
        self.purchased_entity.as_ref()
    }

    /// Returns the title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Sets the title.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Returns the quantity.
    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    /// Sets the quantity.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NegativeQuantity`] if `quantity` is below zero.
    pub fn set_quantity(&mut self, quantity: Decimal) -> Result<(), OrderError> {
        ensure_quantity(quantity)?;
        self.quantity = quantity;

        Ok(())
    }

    /// Returns the unit price.
    pub fn unit_price(&self) -> &Price {
        &self.unit_price
    }

    /// Sets the unit price, e.g. from current catalog data.
    pub fn set_unit_price(&mut self, unit_price: Price) {
        self.unit_price = unit_price;
        self.original_unit_price = None;
    }

    /// Sets a unit price that refreshes must not replace with catalog data.
    pub fn override_unit_price(&mut self, unit_price: Price) {
        self.set_unit_price(unit_price);
        self.overridden_unit_price = true;
    }

    /// Returns whether the unit price was set manually.
    pub fn is_unit_price_overridden(&self) -> bool {
        self.overridden_unit_price
    }

    /// Replaces the unit price during order processing.
    ///
    /// The price in place before the first replacement is remembered so that a
    /// later refresh can start again from it.
    pub fn replace_unit_price(&mut self, unit_price: Price) {
        if self.original_unit_price.is_none() {
            self.original_unit_price = Some(self.unit_price);
        }

        self.unit_price = unit_price;
    }

    /// Restores the unit price in place before processing replaced it.
    pub fn restore_unit_price(&mut self) {
        if let Some(original) = self.original_unit_price.take() {
            self.unit_price = original;
        }
    }

    /// Returns the tax rate id chosen for this item, if any.
    pub fn tax_rate(&self) -> Option<&str> {
        self.tax_rate.as_deref()
    }

    /// Returns the adjustments recorded against this item.
    pub fn adjustments(&self) -> &[Adjustment] {
        &self.adjustments
    }

    /// Adds an adjustment.
    pub fn add_adjustment(&mut self, adjustment: Adjustment) {
        self.adjustments.push(adjustment);
    }

    /// Removes the first adjustment structurally equal to `adjustment`.
    ///
    /// Returns whether an adjustment was removed.
    pub fn remove_adjustment(&mut self, adjustment: &Adjustment) -> bool {
        remove_first(&mut self.adjustments, adjustment)
    }

    /// Replaces all adjustments.
    pub fn set_adjustments(&mut self, adjustments: impl IntoIterator<Item = Adjustment>) {
        self.adjustments = adjustments.into_iter().collect();
    }

    /// Removes all adjustments.
    pub fn clear_adjustments(&mut self) {
        self.adjustments.clear();
    }

    /// Removes every adjustment that is not locked.
    pub fn clear_unlocked_adjustments(&mut self) {
        self.adjustments.retain(|adjustment| adjustment.is_locked());
    }

    /// Returns the adjustments scaled to this item's quantity.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] if scaling overflows.
    pub fn collect_adjustments(&self) -> Result<Vec<Adjustment>, PriceError> {
        self.adjustments
            .iter()
            .map(|adjustment| adjustment.scaled(self.quantity))
            .collect()
    }

    /// Returns `unit price × quantity`.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] if the multiplication overflows.
    pub fn total_price(&self) -> Result<Price, PriceError> {
        self.unit_price.multiply(self.quantity)
    }

    /// Returns the total price plus all non-included adjustments.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] on overflow or if an adjustment has another currency.
    pub fn adjusted_total_price(&self) -> Result<Price, PriceError> {
        self.collect_adjustments()?
            .iter()
            .filter(|adjustment| !adjustment.is_included())
            .try_fold(self.total_price()?, |total, adjustment| {
                total.add(*adjustment.amount())
            })
    }
}

pub(crate) fn remove_first(
    adjustments: &mut SmallVec<[Adjustment; 2]>,
    target: &Adjustment,
) -> bool {
    match adjustments.iter().position(|candidate| candidate == target) {
        Some(index) => {
            adjustments.remove(index);
            true
        }
        None => false,
    }
}

fn ensure_quantity(quantity: Decimal) -> Result<(), OrderError> {
    if quantity.is_sign_negative() && !quantity.is_zero() {
        Err(OrderError::NegativeQuantity(quantity))
    } else {
        Ok(())
    }
}
