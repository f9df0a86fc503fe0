//! Payments
//!
//! Payment bookkeeping: balances, refunds and the amount an order has been
//! paid so far.

use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    orders::{Order, OrderId},
    prices::{Price, PriceError},
};

pub mod methods;

pub use methods::{Deletion, PaymentMethod, PaymentMethodId, PaymentMethodReferences};

/// Payment identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(pub u64);

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised by payment operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PaymentError {
    /// Payment arithmetic failed.
    #[error(transparent)]
    Price(#[from] PriceError),

    /// The refund is larger than what is left on the payment.
    #[error("cannot refund {requested}, only {balance} is left on the payment")]
    RefundExceedsBalance {
        /// Requested refund
        requested: Price,

        /// Remaining balance
        balance: Price,
    },

    /// Refund amounts must be positive.
    #[error("refund amount must be positive, got {0}")]
    InvalidRefund(Price),

    /// Payment method references could not be looked up.
    #[error("payment method references unavailable: {0}")]
    References(String),
}

/// Payment workflow state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    /// Created, not yet sent to the gateway
    #[default]
    New,

    /// Funds are reserved
    Authorization,

    /// The reservation was voided
    AuthorizationVoided,

    /// The reservation expired
    AuthorizationExpired,

    /// Funds were captured
    Completed,

    /// Part of the captured funds were returned
    PartiallyRefunded,

    /// All captured funds were returned
    Refunded,
}

impl PaymentState {
    /// Returns whether captured funds count towards the order's total paid.
    pub const fn counts_as_paid(self) -> bool {
        matches!(
            self,
            PaymentState::Completed | PaymentState::PartiallyRefunded | PaymentState::Refunded
        )
    }
}

/// A payment made against an order.
#[derive(Debug, Clone, PartialEq)]
pub struct Payment {
    id: PaymentId,
    gateway: String,
    gateway_mode: Option<String>,
    order_id: OrderId,
    method: Option<PaymentMethodId>,
    remote_id: Option<String>,
    remote_state: Option<String>,
    amount: Price,
    refunded_amount: Option<Price>,
    state: PaymentState,
    authorized_time: Option<Timestamp>,
    expires_time: Option<Timestamp>,
    completed_time: Option<Timestamp>,
}

impl Payment {
    /// Creates a new payment.
    pub fn new(
        id: PaymentId,
        gateway: impl Into<String>,
        order_id: OrderId,
        amount: Price,
    ) -> Self {
        Self {
            id,
            gateway: gateway.into(),
            gateway_mode: None,
            order_id,
            method: None,
            remote_id: None,
            remote_state: None,
            amount,
            refunded_amount: None,
            state: PaymentState::New,
            authorized_time: None,
            expires_time: None,
            completed_time: None,
        }
    }

    /// Sets the state.
    #[must_use]
    pub fn with_state(mut self, state: PaymentState) -> Self {
        self.state = state;
        self
    }

    /// Sets the payment method.
    #[must_use]
    pub fn with_payment_method(mut self, payment_method: PaymentMethodId) -> Self {
        self.method = Some(payment_method);
        self
    }

    /// Returns the id.
    pub fn id(&self) -> PaymentId {
        self.id
    }

    /// Returns the payment gateway id.
    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    /// Returns the gateway mode, such as `test` or `live`.
    pub fn gateway_mode(&self) -> Option<&str> {
        self.gateway_mode.as_deref()
    }

    /// Returns the order the payment belongs to.
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// Returns the payment method.
    pub fn payment_method(&self) -> Option<PaymentMethodId> {
        self.method
    }

    /// Returns the gateway's id for the payment.
    pub fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    /// Sets the gateway's id for the payment.
    pub fn set_remote_id(&mut self, remote_id: impl Into<String>) {
        self.remote_id = Some(remote_id.into());
    }

    /// Returns the gateway's state for the payment.
    pub fn remote_state(&self) -> Option<&str> {
        self.remote_state.as_deref()
    }

    /// Sets the gateway's state for the payment.
    pub fn set_remote_state(&mut self, remote_state: impl Into<String>) {
        self.remote_state = Some(remote_state.into());
    }

    /// Returns the amount.
    pub fn amount(&self) -> &Price {
        &self.amount
    }

    /// Sets the amount.
    pub fn set_amount(&mut self, amount: Price) {
        self.amount = amount;
    }

    /// Returns the refunded amount.
    pub fn refunded_amount(&self) -> Option<&Price> {
        self.refunded_amount.as_ref()
    }

    /// Sets the refunded amount.
    pub fn set_refunded_amount(&mut self, refunded_amount: Price) {
        self.refunded_amount = Some(refunded_amount);
    }

    /// Returns the state.
    pub fn state(&self) -> PaymentState {
        self.state
    }

    /// Sets the state.
    pub fn set_state(&mut self, state: PaymentState) {
        self.state = state;
    }

    /// Returns when the payment was authorized.
    pub fn authorized_time(&self) -> Option<Timestamp> {
        self.authorized_time
    }

    /// Sets when the payment was authorized.
    pub fn set_authorized_time(&mut self, time: Timestamp) {
        self.authorized_time = Some(time);
    }

    /// Returns when the authorization expires.
    pub fn expires_time(&self) -> Option<Timestamp> {
        self.expires_time
    }

    /// Sets when the authorization expires.
    pub fn set_expires_time(&mut self, time: Timestamp) {
        self.expires_time = Some(time);
    }

    /// Returns when the payment was completed.
    pub fn completed_time(&self) -> Option<Timestamp> {
        self.completed_time
    }

    /// Sets when the payment was completed.
    pub fn set_completed_time(&mut self, time: Timestamp) {
        self.completed_time = Some(time);
    }

    /// Returns whether the authorization expired at `now`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_time.is_some_and(|expires| expires <= now)
    }

    /// Returns whether the payment was completed.
    pub fn is_completed(&self) -> bool {
        self.completed_time.is_some()
    }

    /// Returns the amount minus the refunded amount.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] if the refunded amount has another currency.
    pub fn balance(&self) -> Result<Price, PriceError> {
        match self.refunded_amount {
            Some(refunded) => self.amount.subtract(refunded),
            None => Ok(self.amount),
        }
    }

    /// Refunds part or all of the balance and moves the state to partially
    /// refunded or refunded.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::InvalidRefund`]: `amount` is not positive.
    /// - [`PaymentError::RefundExceedsBalance`]: `amount` is above the balance.
    /// - [`PaymentError::Price`]: `amount` has another currency.
    pub fn refund(&mut self, amount: Price) -> Result<PaymentState, PaymentError> {
        if !amount.is_positive() {
            return Err(PaymentError::InvalidRefund(amount));
        }

        let balance = self.balance()?;

        if amount.compare(&balance)?.is_gt() {
            return Err(PaymentError::RefundExceedsBalance {
                requested: amount,
                balance,
            });
        }

        let refunded = match self.refunded_amount {
            Some(refunded) => refunded.add(amount)?,
            None => amount,
        };

        self.state = if refunded.compare(&self.amount)?.is_lt() {
            PaymentState::PartiallyRefunded
        } else {
            PaymentState::Refunded
        };
        self.refunded_amount = Some(refunded);

        Ok(self.state)
    }

    /// Fills in defaults before the payment is stored: the gateway mode, a
    /// zero refunded amount, and the authorized or completed time matching
    /// the state.
    pub fn prepare_save(&mut self, now: Timestamp, gateway_mode: &str) {
        if self.gateway_mode.is_none() {
            self.gateway_mode = Some(gateway_mode.to_owned());
        }

        if self.refunded_amount.is_none() {
            self.refunded_amount = Some(Price::zero(self.amount.currency()));
        }

        match self.state {
            PaymentState::Authorization if self.authorized_time.is_none() => {
                self.authorized_time = Some(now);
            }
            PaymentState::Completed if self.completed_time.is_none() => {
                self.completed_time = Some(now);
            }
            _ => {}
        }
    }
}

/// Sets the order's total paid to the sum of the balances of its captured
/// payments. Payments of other orders are ignored.
///
/// # Errors
///
/// Returns a [`PaymentError`] if payment currencies differ.
pub fn record_payments<'a>(
    order: &mut Order,
    payments: impl IntoIterator<Item = &'a Payment>,
) -> Result<Option<Price>, PaymentError> {
    let mut total_paid: Option<Price> = None;

    for payment in payments {
        if payment.order_id() != order.id() || !payment.state().counts_as_paid() {
            continue;
        }

        let balance = payment.balance()?;

        total_paid = Some(match total_paid {
            Some(total) => total.add(balance)?,
            None => balance,
        });
    }

    let total_paid = total_paid.or_else(|| {
        order
            .total_price()
            .map(|total| Price::zero(total.currency()))
    });

    order.set_total_paid(total_paid);

    Ok(total_paid)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use crate::orders::OrderItem;

    use super::*;

    fn usd(amount: &str) -> Result<Price, PriceError> {
        Price::parse(amount, "USD")
    }

    #[test]
    fn balance_subtracts_refunds() -> TestResult {
        let mut payment = Payment::new(PaymentId(1), "example", OrderId(1), usd("30")?)
            .with_state(PaymentState::Refunded);
        payment.set_refunded_amount(usd("10")?);

        assert_eq!(payment.balance()?, usd("20")?);

        payment.set_amount(usd("40")?);
        payment.set_refunded_amount(usd("15")?);

        assert_eq!(payment.balance()?, usd("25")?);

        Ok(())
    }

    #[test]
    fn refunds_move_state_and_respect_balance() -> TestResult {
        let mut payment = Payment::new(PaymentId(1), "example", OrderId(1), usd("30")?)
            .with_state(PaymentState::Completed);

        assert_eq!(payment.refund(usd("15")?)?, PaymentState::PartiallyRefunded);
        assert!(matches!(
            payment.refund(usd("20")?),
            Err(PaymentError::RefundExceedsBalance { .. })
        ));
        assert!(matches!(
            payment.refund(usd("0")?),
            Err(PaymentError::InvalidRefund(_))
        ));
        assert_eq!(payment.refund(usd("15")?)?, PaymentState::Refunded);
        assert!(payment.balance()?.is_zero());

        Ok(())
    }

    #[test]
    fn expiry_and_completion() -> TestResult {
        let now: Timestamp = "2017-01-15T10:00:00Z".parse()?;
        let mut payment = Payment::new(PaymentId(1), "example", OrderId(1), usd("30")?);

        assert!(!payment.is_expired(now));
        assert!(!payment.is_completed());

        payment.set_expires_time(now);
        payment.set_completed_time(now);

        assert!(payment.is_expired(now));
        assert!(payment.is_completed());

        Ok(())
    }

    #[test]
    fn prepare_save_fills_defaults_and_stamps_times() -> TestResult {
        let now: Timestamp = "2017-01-15T10:00:00Z".parse()?;
        let mut payment = Payment::new(PaymentId(1), "example", OrderId(1), usd("30")?)
            .with_state(PaymentState::Authorization);

        assert!(payment.refunded_amount().is_none());
        assert_eq!(payment.balance()?, usd("30")?);

        payment.prepare_save(now, "test");

        assert_eq!(payment.gateway_mode(), Some("test"));
        assert_eq!(payment.refunded_amount(), Some(&usd("0")?));
        assert_eq!(payment.authorized_time(), Some(now));
        assert!(payment.completed_time().is_none());

        let later: Timestamp = "2017-01-15T11:00:00Z".parse()?;
        payment.set_state(PaymentState::Completed);
        payment.prepare_save(later, "live");

        assert_eq!(payment.gateway_mode(), Some("test"));
        assert_eq!(payment.authorized_time(), Some(now));
        assert_eq!(payment.completed_time(), Some(later));

        Ok(())
    }

    #[test]
    fn payment_method_is_optional() -> TestResult {
        let payment = Payment::new(PaymentId(2), "example", OrderId(1), usd("5")?);

        assert!(payment.payment_method().is_none());

        let payment = payment.with_payment_method(PaymentMethodId(4));

        assert_eq!(payment.payment_method(), Some(PaymentMethodId(4)));

        Ok(())
    }

    #[test]
    fn order_total_paid_follows_payments() -> TestResult {
        let mut order = Order::new(OrderId(1), "default", "2017-01-15T10:00:00Z".parse()?);
        order.add_item(OrderItem::new(
            "Membership subscription",
            Decimal::ONE,
            usd("30.00")?,
        )?)?;

        record_payments(&mut order, [])?;

        assert_eq!(order.total_paid(), Some(&usd("0")?));
        assert_eq!(order.balance()?, Some(usd("30")?));

        let mut payment = Payment::new(PaymentId(1), "example", OrderId(1), usd("30")?)
            .with_state(PaymentState::Completed);
        let pending = Payment::new(PaymentId(2), "example", OrderId(1), usd("5")?);
        let other_order = Payment::new(PaymentId(3), "example", OrderId(2), usd("7")?)
            .with_state(PaymentState::Completed);

        record_payments(&mut order, [&payment, &pending, &other_order])?;

        assert_eq!(order.total_paid(), Some(&usd("30")?));
        assert_eq!(order.balance()?, Some(usd("0")?));

        payment.set_refunded_amount(usd("15")?);
        payment.set_state(PaymentState::PartiallyRefunded);
        record_payments(&mut order, [&payment])?;

        assert_eq!(order.total_paid(), Some(&usd("15")?));
        assert_eq!(order.balance()?, Some(usd("15")?));

        Ok(())
    }
}
