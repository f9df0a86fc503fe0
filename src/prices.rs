//! Prices

use std::{cmp::Ordering, fmt};

use rust_decimal::{Decimal, RoundingStrategy};
use rusty_money::{Findable, Money, iso::Currency};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by price parsing and arithmetic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Two prices with different currencies were combined.
    #[error("currency mismatch: expected {expected}, found {actual}")]
    CurrencyMismatch {
        /// Currency of the left-hand operand
        expected: &'static str,

        /// Currency of the right-hand operand
        actual: &'static str,
    },

    /// The currency code is not a known ISO-4217 code.
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),

    /// The number could not be parsed as a decimal.
    #[error("invalid price number: {0}")]
    InvalidNumber(String),

    /// A price was divided by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Decimal arithmetic overflowed.
    #[error("price arithmetic overflowed")]
    Overflow,
}

/// How a price is rounded to its currency's fraction digits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// Round half away from zero.
    #[default]
    HalfUp,

    /// Round half towards zero.
    HalfDown,

    /// Round half to the nearest even digit.
    HalfEven,

    /// Always round away from zero.
    Up,

    /// Always round towards zero.
    Down,
}

impl From<RoundingMode> for RoundingStrategy {
    fn from(mode: RoundingMode) -> Self {
        match mode {
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfDown => RoundingStrategy::MidpointTowardZero,
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
            RoundingMode::Up => RoundingStrategy::AwayFromZero,
            RoundingMode::Down => RoundingStrategy::ToZero,
        }
    }
}

/// An exact decimal amount in a single currency.
///
/// Arithmetic keeps full precision; rounding only happens when
/// [`Price::round`] or [`Price::round_with`] is called.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "PriceRecord", into = "PriceRecord")]
pub struct Price {
    number: Decimal,
    currency: &'static Currency,
}

impl Price {
    /// Creates a new price.
    pub const fn new(number: Decimal, currency: &'static Currency) -> Self {
        Self { number, currency }
    }

    /// Creates a zero price in the given currency.
    pub const fn zero(currency: &'static Currency) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    /// Parses a price from a decimal string and an ISO-4217 currency code.
    ///
    /// # Errors
    ///
    /// - [`PriceError::InvalidNumber`]: `number` is not a decimal.
    /// - [`PriceError::UnknownCurrency`]: `currency_code` is not a known currency.
    pub fn parse(number: &str, currency_code: &str) -> Result<Self, PriceError> {
        let currency = find_currency(currency_code)?;
        let number = number
            .trim()
            .parse::<Decimal>()
            .map_err(|err| PriceError::InvalidNumber(format!("{number}: {err}")))?;

        Ok(Self::new(number, currency))
    }

    /// Returns the decimal amount.
    pub const fn number(&self) -> Decimal {
        self.number
    }

    /// Returns the currency.
    pub const fn currency(&self) -> &'static Currency {
        self.currency
    }

    /// Returns the ISO-4217 currency code.
    pub const fn currency_code(&self) -> &'static str {
        self.currency.iso_alpha_code
    }

    /// Adds two prices.
    ///
    /// # Errors
    ///
    /// - [`PriceError::CurrencyMismatch`]: the currencies differ.
    /// - [`PriceError::Overflow`]: the result does not fit a decimal.
    #[expect(
        clippy::should_implement_trait,
        reason = "Checked addition returns a Result"
    )]
    pub fn add(self, other: Price) -> Result<Self, PriceError> {
        self.ensure_same_currency(&other)?;

        let number = self
            .number
            .checked_add(other.number)
            .ok_or(PriceError::Overflow)?;

        Ok(Self::new(number, self.currency))
    }

    /// Subtracts `other` from this price.
    ///
    /// # Errors
    ///
    /// - [`PriceError::CurrencyMismatch`]: the currencies differ.
    /// - [`PriceError::Overflow`]: the result does not fit a decimal.
    pub fn subtract(self, other: Price) -> Result<Self, PriceError> {
        self.ensure_same_currency(&other)?;

        let number = self
            .number
            .checked_sub(other.number)
            .ok_or(PriceError::Overflow)?;

        Ok(Self::new(number, self.currency))
    }

    /// Multiplies this price by a decimal factor, without rounding.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Overflow`] if the result does not fit a decimal.
    pub fn multiply(self, factor: Decimal) -> Result<Self, PriceError> {
        let number = self
            .number
            .checked_mul(factor)
            .ok_or(PriceError::Overflow)?;

        Ok(Self::new(number, self.currency))
    }

    /// Divides this price by a decimal divisor, without rounding.
    ///
    /// # Errors
    ///
    /// - [`PriceError::DivisionByZero`]: `divisor` is zero.
    /// - [`PriceError::Overflow`]: the result does not fit a decimal.
    pub fn divide(self, divisor: Decimal) -> Result<Self, PriceError> {
        if divisor.is_zero() {
            return Err(PriceError::DivisionByZero);
        }

        let number = self
            .number
            .checked_div(divisor)
            .ok_or(PriceError::Overflow)?;

        Ok(Self::new(number, self.currency))
    }

    /// Returns the price with its sign flipped.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::new(-self.number, self.currency)
    }

    /// Compares two prices of the same currency.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::CurrencyMismatch`] if the currencies differ.
    pub fn compare(&self, other: &Price) -> Result<Ordering, PriceError> {
        self.ensure_same_currency(other)?;

        Ok(self.number.cmp(&other.number))
    }

    /// Returns whether the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.number.is_zero()
    }

    /// Returns whether the amount is greater than zero.
    pub fn is_positive(&self) -> bool {
        self.number > Decimal::ZERO
    }

    /// Returns whether the amount is less than zero.
    pub fn is_negative(&self) -> bool {
        self.number < Decimal::ZERO
    }

    /// Rounds half-up to the currency's fraction digits.
    #[must_use]
    pub fn round(self) -> Self {
        self.round_with(RoundingMode::HalfUp)
    }

    /// Rounds to the currency's fraction digits with the given mode.
    #[must_use]
    pub fn round_with(self, mode: RoundingMode) -> Self {
        let number = self
            .number
            .round_dp_with_strategy(self.currency.exponent, mode.into());

        Self::new(number, self.currency)
    }

    /// Converts the rounded price into a [`Money`] value in minor units.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Overflow`] if the minor units do not fit an `i64`.
    pub fn to_money(&self) -> Result<Money<'static, Currency>, PriceError> {
        let mut rounded = self.round().number;
        rounded.rescale(self.currency.exponent);

        let minor = i64::try_from(rounded.mantissa()).map_err(|err| {
            tracing::debug!(price = %self, %err, "price does not fit minor units");

            PriceError::Overflow
        })?;

        Ok(Money::from_minor(minor, self.currency))
    }

    fn ensure_same_currency(&self, other: &Price) -> Result<(), PriceError> {
        if self.currency.iso_alpha_code == other.currency.iso_alpha_code {
            Ok(())
        } else {
            Err(PriceError::CurrencyMismatch {
                expected: self.currency.iso_alpha_code,
                actual: other.currency.iso_alpha_code,
            })
        }
    }
}

impl PartialEq for Price {
    fn eq(&self, other: &Self) -> bool {
        self.currency.iso_alpha_code == other.currency.iso_alpha_code && self.number == other.number
    }
}

impl Eq for Price {}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.currency.iso_alpha_code)
    }
}

impl From<Money<'static, Currency>> for Price {
    fn from(money: Money<'static, Currency>) -> Self {
        let currency = money.currency();

        Self::new(
            Decimal::new(money.to_minor_units(), currency.exponent),
            currency,
        )
    }
}

/// Looks up an ISO-4217 currency by its alphabetic code.
///
/// # Errors
///
/// Returns [`PriceError::UnknownCurrency`] if the code is not known.
pub fn find_currency(code: &str) -> Result<&'static Currency, PriceError> {
    Currency::find(code.trim()).ok_or_else(|| PriceError::UnknownCurrency(code.to_string()))
}

/// Serialized form of a price: `{ number: "2.00", currency_code: "USD" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PriceRecord {
    number: String,
    currency_code: String,
}

impl TryFrom<PriceRecord> for Price {
    type Error = PriceError;

    fn try_from(record: PriceRecord) -> Result<Self, Self::Error> {
        Price::parse(&record.number, &record.currency_code)
    }
}

impl From<Price> for PriceRecord {
    fn from(price: Price) -> Self {
        Self {
            number: price.number.to_string(),
            currency_code: price.currency_code().to_string(),
        }
    }
}
