//! Orders
//!
//! An order owns its items and adjustments and keeps its total price in sync
//! with them: every mutation recomputes the total, and a mutation that fails
//! (for example because of a currency mismatch) leaves the order unchanged.

use std::{fmt, sync::Arc};

use jiff::{Timestamp, civil::Date};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    adjustments::Adjustment,
    clock::utc_date,
    prices::{Price, PriceError},
    stores::{Profile, Store, StoreId, UserId},
};

pub mod items;
pub mod order_types;
pub mod refresh;

pub use items::{OrderItem, OrderItemKey};
pub use order_types::{
    DEFAULT_REFRESH_FREQUENCY, OrderType, OrderTypes, RefreshMode, RefreshState,
};

/// Order identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order workflow state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    /// Editable; the only state in which refreshes happen
    #[default]
    Draft,

    /// Checked out
    Placed,

    /// Fulfilled
    Completed,

    /// Canceled
    Canceled,
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderState::Draft => "draft",
            OrderState::Placed => "placed",
            OrderState::Completed => "completed",
            OrderState::Canceled => "canceled",
        })
    }
}

/// Order workflow transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderTransition {
    /// Draft to placed
    Place,

    /// Placed to completed
    Complete,

    /// Draft or placed to canceled
    Cancel,
}

impl OrderTransition {
    /// Returns the state reached by applying this transition to `from`, if allowed.
    pub const fn target(self, from: OrderState) -> Option<OrderState> {
        match (self, from) {
            (OrderTransition::Place, OrderState::Draft) => Some(OrderState::Placed),
            (OrderTransition::Complete, OrderState::Placed) => Some(OrderState::Completed),
            (OrderTransition::Cancel, OrderState::Draft | OrderState::Placed) => {
                Some(OrderState::Canceled)
            }
            _ => None,
        }
    }
}

impl fmt::Display for OrderTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OrderTransition::Place => "place",
            OrderTransition::Complete => "complete",
            OrderTransition::Cancel => "cancel",
        })
    }
}

/// Errors raised by order operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrderError {
    /// Price arithmetic failed, typically because of a currency mismatch.
    #[error(transparent)]
    Price(#[from] PriceError),

    /// An item quantity was below zero.
    #[error("quantity must not be negative, got {0}")]
    NegativeQuantity(Decimal),

    /// The item key does not belong to the order.
    #[error("order item {0:?} not found")]
    ItemNotFound(OrderItemKey),

    /// The transition is not allowed from the current state.
    #[error("cannot {transition} an order that is {state}")]
    InvalidTransition {
        /// Current state
        state: OrderState,

        /// Requested transition
        transition: OrderTransition,
    },
}

/// An order and its derived total.
#[derive(Debug, Clone)]
pub struct Order {
    id: OrderId,
    number: Option<String>,
    type_id: String,
    store: Option<Arc<Store>>,
    owner: Option<UserId>,
    email: Option<String>,
    ip_address: Option<String>,
    billing_profile: Option<Arc<Profile>>,
    items: SlotMap<OrderItemKey, OrderItem>,
    item_keys: Vec<OrderItemKey>,
    adjustments: SmallVec<[Adjustment; 2]>,
    coupons: SmallVec<[String; 2]>,
    state: OrderState,
    refresh_state: Option<RefreshState>,
    created_time: Timestamp,
    changed_time: Timestamp,
    placed_time: Option<Timestamp>,
    completed_time: Option<Timestamp>,
    total_price: Option<Price>,
    total_paid: Option<Price>,
}

impl Order {
    /// Creates an empty draft order of the given type.
    pub fn new(id: OrderId, order_type: impl Into<String>, created_time: Timestamp) -> Self {
        Self {
            id,
            number: None,
            type_id: order_type.into(),
            store: None,
            owner: None,
            email: None,
            ip_address: None,
            billing_profile: None,
            items: SlotMap::with_key(),
            item_keys: Vec::new(),
            adjustments: SmallVec::new(),
            coupons: SmallVec::new(),
            state: OrderState::Draft,
            refresh_state: None,
            created_time,
            changed_time: created_time,
            placed_time: None,
            completed_time: None,
            total_price: None,
            total_paid: None,
        }
    }

    /// Sets the store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the owner.
    #[must_use]
    pub fn with_owner(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Sets the customer email.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the billing profile.
    #[must_use]
    pub fn with_billing_profile(mut self, profile: Arc<Profile>) -> Self {
        self.billing_profile = Some(profile);
        self
    }

    /// Returns the order id.
    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Returns the order number, assigned when the order is placed.
    pub fn order_number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    /// Sets the order number.
    pub fn set_order_number(&mut self, order_number: impl Into<String>) {
        self.number = Some(order_number.into());
    }

    /// Returns the order type id.
    pub fn order_type(&self) -> &str {
        &self.type_id
    }

    /// Returns the store.
    pub fn store(&self) -> Option<&Store> {
        self.store.as_deref()
    }

    /// Returns the store id.
    pub fn store_id(&self) -> Option<&StoreId> {
        self.store().map(Store::id)
    }

    /// Sets the store.
    pub fn set_store(&mut self, store: Option<Arc<Store>>) {
        self.store = store;
    }

    /// Returns the owner.
    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    /// Sets the owner.
    pub fn set_owner(&mut self, owner: Option<UserId>) {
        self.owner = owner;
    }

    /// Returns the customer email.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Sets the customer email.
    pub fn set_email(&mut self, email: Option<String>) {
        self.email = email;
    }

    /// Returns the IP address the order was created from.
    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    /// Sets the IP address.
    pub fn set_ip_address(&mut self, ip_address: Option<String>) {
        self.ip_address = ip_address;
    }

    /// Returns the billing profile.
    pub fn billing_profile(&self) -> Option<&Profile> {
        self.billing_profile.as_deref()
    }

    /// Sets the billing profile.
    pub fn set_billing_profile(&mut self, profile: Option<Arc<Profile>>) {
        self.billing_profile = profile;
    }

    /// Returns the workflow state.
    pub fn state(&self) -> OrderState {
        self.state
    }

    /// Applies a workflow transition, stamping the placed or completed time.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::InvalidTransition`] if the transition is not
    /// allowed from the current state.
    pub fn apply_transition(
        &mut self,
        transition: OrderTransition,
        now: Timestamp,
    ) -> Result<OrderState, OrderError> {
        let state = transition
            .target(self.state)
            .ok_or(OrderError::InvalidTransition {
                state: self.state,
                transition,
            })?;

        match state {
            OrderState::Placed => self.placed_time = Some(now),
            OrderState::Completed => self.completed_time = Some(now),
            OrderState::Draft | OrderState::Canceled => {}
        }

        self.state = state;

        Ok(state)
    }

    /// Returns the per-order refresh override.
    pub fn refresh_state(&self) -> Option<RefreshState> {
        self.refresh_state
    }

    /// Sets the per-order refresh override.
    pub fn set_refresh_state(&mut self, refresh_state: Option<RefreshState>) {
        self.refresh_state = refresh_state;
    }

    /// Returns when the order was created.
    pub fn created_time(&self) -> Timestamp {
        self.created_time
    }

    /// Returns when the order was last saved or refreshed.
    pub fn changed_time(&self) -> Timestamp {
        self.changed_time
    }

    /// Sets the changed time.
    pub fn set_changed_time(&mut self, changed_time: Timestamp) {
        self.changed_time = changed_time;
    }

    /// Returns when the order was placed.
    pub fn placed_time(&self) -> Option<Timestamp> {
        self.placed_time
    }

    /// Returns when the order was completed.
    pub fn completed_time(&self) -> Option<Timestamp> {
        self.completed_time
    }

    /// Returns the date prices and taxes are calculated for: the placed date,
    /// or the current date for orders not yet placed.
    pub fn calculation_date(&self, now: Timestamp) -> Date {
        utc_date(self.placed_time.unwrap_or(now))
    }

    /// Returns the coupon codes presented on the order.
    pub fn coupons(&self) -> &[String] {
        &self.coupons
    }

    /// Adds a coupon code, ignoring duplicates.
    pub fn add_coupon(&mut self, code: impl Into<String>) {
        let code = code.into();

        if !self.coupons.contains(&code) {
            self.coupons.push(code);
        }
    }

    /// Removes a coupon code, returning whether it was present.
    pub fn remove_coupon(&mut self, code: &str) -> bool {
        let before = self.coupons.len();
        self.coupons.retain(|coupon| coupon != code);

        before != self.coupons.len()
    }

    /// Returns the items in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &OrderItem> {
        self.item_keys
            .iter()
            .filter_map(|key| self.items.get(*key))
    }

    /// Returns the item keys in insertion order.
    pub fn item_keys(&self) -> &[OrderItemKey] {
        &self.item_keys
    }

    /// Returns an item by key.
    pub fn item(&self, key: OrderItemKey) -> Option<&OrderItem> {
        self.items.get(key)
    }

    /// Returns whether the order contains the item.
    pub fn has_item(&self, key: OrderItemKey) -> bool {
        self.items.contains_key(key)
    }

    /// Returns whether the order has any items.
    pub fn has_items(&self) -> bool {
        !self.item_keys.is_empty()
    }

    /// Adds an item.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Price`] if the item's currency does not match the order.
    pub fn add_item(&mut self, item: OrderItem) -> Result<OrderItemKey, OrderError> {
        self.apply_change(|order| Ok(order.insert_item(item)))
    }

    /// Removes an item, returning it if it belonged to the order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Price`] if the remaining total cannot be computed.
    pub fn remove_item(&mut self, key: OrderItemKey) -> Result<Option<OrderItem>, OrderError> {
        self.apply_change(|order| {
            order.item_keys.retain(|existing| *existing != key);

            Ok(order.items.remove(key))
        })
    }

    /// Replaces all items.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Price`] if the items' currencies do not match.
    pub fn set_items(
        &mut self,
        items: impl IntoIterator<Item = OrderItem>,
    ) -> Result<Vec<OrderItemKey>, OrderError> {
        self.apply_change(|order| {
            order.items.clear();
            order.item_keys.clear();

            Ok(items
                .into_iter()
                .map(|item| order.insert_item(item))
                .collect())
        })
    }

    /// Changes an item in place.
    ///
    /// # Errors
    ///
    /// - [`OrderError::ItemNotFound`]: the key does not belong to the order.
    /// - Any error returned by `update`, or a price error from the new total.
    pub fn update_item<F>(&mut self, key: OrderItemKey, update: F) -> Result<(), OrderError>
    where
        F: FnOnce(&mut OrderItem) -> Result<(), OrderError>,
    {
        self.apply_change(|order| {
            let item = order
                .items
                .get_mut(key)
                .ok_or(OrderError::ItemNotFound(key))?;

            update(item)
        })
    }

    /// Returns the order-level adjustments.
    pub fn adjustments(&self) -> &[Adjustment] {
        &self.adjustments
    }

    /// Adds an order-level adjustment.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Price`] if the adjustment's currency does not match.
    pub fn add_adjustment(&mut self, adjustment: Adjustment) -> Result<(), OrderError> {
        self.apply_change(|order| {
            order.adjustments.push(adjustment);

            Ok(())
        })
    }

    /// Removes the first order-level adjustment structurally equal to
    /// `adjustment`, returning whether one was removed.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Price`] if the remaining total cannot be computed.
    pub fn remove_adjustment(&mut self, adjustment: &Adjustment) -> Result<bool, OrderError> {
        self.apply_change(|order| Ok(items::remove_first(&mut order.adjustments, adjustment)))
    }

    /// Replaces all order-level adjustments.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Price`] if an adjustment's currency does not match.
    pub fn set_adjustments(
        &mut self,
        adjustments: impl IntoIterator<Item = Adjustment>,
    ) -> Result<(), OrderError> {
        self.apply_change(|order| {
            order.adjustments = adjustments.into_iter().collect();

            Ok(())
        })
    }

    /// Removes every order and item adjustment.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Price`] if the remaining total cannot be computed.
    pub fn clear_adjustments(&mut self) -> Result<(), OrderError> {
        self.apply_change(|order| {
            order.adjustments.clear();

            for item in order.items.values_mut() {
                item.clear_adjustments();
            }

            Ok(())
        })
    }

    /// Removes unlocked order and item adjustments and restores unit prices
    /// replaced by order processors.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Price`] if the remaining total cannot be computed.
    pub fn reset_for_refresh(&mut self) -> Result<(), OrderError> {
        self.apply_change(|order| {
            order
                .adjustments
                .retain(|adjustment| adjustment.is_locked());

            for item in order.items.values_mut() {
                item.clear_unlocked_adjustments();
                item.restore_unit_price();
            }

            Ok(())
        })
    }

    /// Returns item adjustments, scaled by item quantity, followed by the
    /// order-level adjustments.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] if scaling overflows.
    pub fn collect_adjustments(&self) -> Result<Vec<Adjustment>, PriceError> {
        let mut adjustments = Vec::new();

        for item in self.items() {
            adjustments.extend(item.collect_adjustments()?);
        }

        adjustments.extend(self.adjustments.iter().cloned());

        Ok(adjustments)
    }

    /// Returns the sum of item totals, or `None` for an order without items.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] if item currencies differ.
    pub fn subtotal_price(&self) -> Result<Option<Price>, PriceError> {
        self.items().try_fold(None, |subtotal, item| {
            accumulate(subtotal, item.total_price()?)
        })
    }

    /// Returns the total price as of the last mutation.
    pub fn total_price(&self) -> Option<&Price> {
        self.total_price.as_ref()
    }

    /// Recomputes and stores the total price.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] if currencies differ; the stored total is kept.
    pub fn recalculate_total_price(&mut self) -> Result<Option<Price>, PriceError> {
        let total = self.compute_total()?;
        self.total_price = total;

        Ok(total)
    }

    /// Returns the amount paid so far.
    pub fn total_paid(&self) -> Option<&Price> {
        self.total_paid.as_ref()
    }

    /// Sets the amount paid so far.
    pub fn set_total_paid(&mut self, total_paid: Option<Price>) {
        self.total_paid = total_paid;
    }

    /// Returns the total price minus the amount paid.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] if the paid amount is in another currency.
    pub fn balance(&self) -> Result<Option<Price>, PriceError> {
        match (self.total_price, self.total_paid) {
            (Some(total), Some(paid)) => total.subtract(paid).map(Some),
            (Some(total), None) => Ok(Some(total)),
            (None, Some(paid)) => Ok(Some(paid.negate())),
            (None, None) => Ok(None),
        }
    }

    fn insert_item(&mut self, item: OrderItem) -> OrderItemKey {
        let key = self.items.insert(item);
        self.item_keys.push(key);

        key
    }

    fn compute_total(&self) -> Result<Option<Price>, PriceError> {
        let subtotal = self.subtotal_price()?;

        self.collect_adjustments()?
            .iter()
            .filter(|adjustment| !adjustment.is_included())
            .try_fold(subtotal, |total, adjustment| {
                accumulate(total, *adjustment.amount())
            })
    }

    /// Runs a mutation and recomputes the total, restoring the previous items
    /// and adjustments if either step fails.
    fn apply_change<T>(
        &mut self,
        change: impl FnOnce(&mut Self) -> Result<T, OrderError>,
    ) -> Result<T, OrderError> {
        let items = self.items.clone();
        let item_keys = self.item_keys.clone();
        let adjustments = self.adjustments.clone();

        let result = change(self).and_then(|value| {
            self.total_price = self.compute_total()?;

            Ok(value)
        });

        if result.is_err() {
            self.items = items;
            self.item_keys = item_keys;
            self.adjustments = adjustments;
        }

        result
    }
}

fn accumulate(total: Option<Price>, amount: Price) -> Result<Option<Price>, PriceError> {
    match total {
        Some(total) => total.add(amount).map(Some),
        None => Ok(Some(amount)),
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::adjustments::AdjustmentType;

    use super::*;

    fn usd(amount: &str) -> Result<Price, PriceError> {
        Price::parse(amount, "USD")
    }

    fn order() -> Result<Order, jiff::Error> {
        Ok(Order::new(OrderId(1), "default", "2017-01-15T10:00:00Z".parse()?))
    }

    #[test]
    fn empty_order_has_no_total() -> TestResult {
        let mut order = order()?;

        assert!(order.total_price().is_none());
        assert!(order.recalculate_total_price()?.is_none());
        assert!(order.subtotal_price()?.is_none());

        Ok(())
    }

    #[test]
    fn currency_mismatch_rolls_back_mutation() -> TestResult {
        let mut order = order()?;
        order.add_item(OrderItem::new("Test", Decimal::ONE, usd("8.00")?)?)?;

        let fee = Adjustment::new(AdjustmentType::Fee, "Fee", Price::parse("1.00", "EUR")?);
        let result = order.add_adjustment(fee);

        assert!(matches!(
            result,
            Err(OrderError::Price(PriceError::CurrencyMismatch { .. }))
        ));
        assert!(order.adjustments().is_empty());
        assert_eq!(order.total_price(), Some(&usd("8.00")?));

        let other = OrderItem::new("Other", Decimal::ONE, Price::parse("1.00", "EUR")?)?;
        let result = order.add_item(other);

        assert!(result.is_err());
        assert_eq!(order.items().count(), 1);

        Ok(())
    }

    #[test]
    fn included_order_adjustments_leave_total_unchanged() -> TestResult {
        let mut order = order()?;
        order.add_item(OrderItem::new("Test", Decimal::from(2), usd("5.00")?)?)?;

        let vat = Adjustment::new(AdjustmentType::Tax, "VAT", usd("1.67")?).included(true);
        order.add_adjustment(vat.clone())?;

        assert_eq!(order.adjustments(), [vat]);
        assert_eq!(order.total_price(), Some(&usd("10.00")?));
        assert_eq!(order.recalculate_total_price()?, Some(usd("10.00")?));

        order.add_adjustment(Adjustment::new(AdjustmentType::Fee, "Fee", usd("2.00")?))?;

        assert_eq!(order.total_price(), Some(&usd("12.00")?));

        Ok(())
    }

    #[test]
    fn recalculation_is_idempotent() -> TestResult {
        let mut order = order()?;
        order.add_item(OrderItem::new("Test", Decimal::from(3), usd("2.50")?)?)?;
        order.add_adjustment(Adjustment::new(AdjustmentType::Custom, "Off", usd("-1.00")?))?;

        let first = order.recalculate_total_price()?;
        let second = order.recalculate_total_price()?;

        assert_eq!(first, second);
        assert_eq!(first, Some(usd("6.50")?));

        Ok(())
    }

    #[test]
    fn removing_a_missing_adjustment_is_a_no_op() -> TestResult {
        let mut order = order()?;
        order.add_item(OrderItem::new("Test", Decimal::ONE, usd("8.00")?)?)?;

        let removed =
            order.remove_adjustment(&Adjustment::new(AdjustmentType::Fee, "Fee", usd("1.00")?))?;

        assert!(!removed);
        assert_eq!(order.total_price(), Some(&usd("8.00")?));

        Ok(())
    }

    #[test]
    fn items_keep_insertion_order_and_can_be_updated() -> TestResult {
        let mut order = order()?;
        let first = order.add_item(OrderItem::new("First", Decimal::ONE, usd("1.00")?)?)?;
        let second = order.add_item(OrderItem::new("Second", Decimal::ONE, usd("2.00")?)?)?;

        order.update_item(first, |item| item.set_quantity(Decimal::from(4)))?;

        let titles: Vec<_> = order.items().map(OrderItem::title).collect();

        assert_eq!(titles, ["First", "Second"]);
        assert_eq!(order.total_price(), Some(&usd("6.00")?));

        let failed = order.update_item(second, |item| item.set_quantity(Decimal::NEGATIVE_ONE));

        assert!(failed.is_err());
        assert_eq!(
            order.item(second).map(OrderItem::quantity),
            Some(Decimal::ONE)
        );

        assert!(order.remove_item(first)?.is_some());
        assert!(!order.has_item(first));
        assert!(matches!(
            order.update_item(first, |_| Ok(())),
            Err(OrderError::ItemNotFound(_))
        ));
        assert_eq!(order.total_price(), Some(&usd("2.00")?));

        Ok(())
    }

    #[test]
    fn state_machine_allows_documented_transitions() -> TestResult {
        let now: Timestamp = "2017-02-01T00:00:00Z".parse()?;
        let mut order = order()?;

        order.apply_transition(OrderTransition::Place, now)?;

        assert_eq!(order.state(), OrderState::Placed);
        assert_eq!(order.placed_time(), Some(now));

        let result = order.apply_transition(OrderTransition::Place, now);

        assert!(matches!(
            result,
            Err(OrderError::InvalidTransition {
                state: OrderState::Placed,
                transition: OrderTransition::Place,
            })
        ));

        order.apply_transition(OrderTransition::Complete, now)?;

        assert_eq!(order.completed_time(), Some(now));
        let canceled = order.apply_transition(OrderTransition::Cancel, now);

        assert!(canceled.is_err());

        let mut draft = self::order()?;
        draft.apply_transition(OrderTransition::Cancel, now)?;

        assert_eq!(draft.state(), OrderState::Canceled);
        let completed = draft.apply_transition(OrderTransition::Complete, now);

        assert!(completed.is_err());

        Ok(())
    }

    #[test]
    fn calculation_date_prefers_placed_time() -> TestResult {
        let now: Timestamp = "2017-03-01T00:00:00Z".parse()?;
        let mut order = order()?;

        assert_eq!(order.calculation_date(now), jiff::civil::date(2017, 3, 1));

        order.apply_transition(OrderTransition::Place, "2010-12-31T23:00:00Z".parse()?)?;

        assert_eq!(order.calculation_date(now), jiff::civil::date(2010, 12, 31));

        Ok(())
    }

    #[test]
    fn coupons_are_deduplicated() -> TestResult {
        let mut order = order()?;
        order.add_coupon("SAVE10");
        order.add_coupon("SAVE10");

        assert_eq!(order.coupons(), ["SAVE10"]);
        assert!(order.remove_coupon("SAVE10"));
        assert!(!order.remove_coupon("SAVE10"));

        Ok(())
    }

    #[test]
    fn balance_subtracts_total_paid() -> TestResult {
        let mut order = order()?;
        order.add_item(OrderItem::new("Test", Decimal::ONE, usd("30.00")?)?)?;
        order.set_total_paid(Some(usd("12.50")?));

        assert_eq!(order.balance()?, Some(usd("17.50")?));

        Ok(())
    }
}
