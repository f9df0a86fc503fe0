//! Tax zones, territories and dated rates

use std::cmp::Ordering;

use jiff::civil::Date;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{stores::Address, tax::TaxError};

/// A country, optionally narrowed down by postal codes.
///
/// Postal code lists are comma separated. Each entry is an exact code
/// (`78266`), a prefix ending in `*` (`782*`) or an inclusive range
/// (`78000:78299`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Territory {
    /// ISO 3166-1 alpha-2 country code
    pub country_code: String,

    /// Postal codes the territory is limited to
    #[serde(default)]
    pub included_postal_codes: Option<String>,

    /// Postal codes excluded from the territory
    #[serde(default)]
    pub excluded_postal_codes: Option<String>,
}

impl Territory {
    /// Creates a territory covering a whole country.
    pub fn new(country_code: impl Into<String>) -> Self {
        Self {
            country_code: country_code.into(),
            included_postal_codes: None,
            excluded_postal_codes: None,
        }
    }

    /// Limits the territory to the given postal codes.
    #[must_use]
    pub fn with_included_postal_codes(mut self, postal_codes: impl Into<String>) -> Self {
        self.included_postal_codes = Some(postal_codes.into());
        self
    }

    /// Excludes the given postal codes from the territory.
    #[must_use]
    pub fn with_excluded_postal_codes(mut self, postal_codes: impl Into<String>) -> Self {
        self.excluded_postal_codes = Some(postal_codes.into());
        self
    }

    /// Returns whether the address lies in the territory.
    pub fn matches(&self, address: &Address) -> bool {
        if !self
            .country_code
            .eq_ignore_ascii_case(&address.country_code)
        {
            return false;
        }

        let postal_code = address.postal_code.as_deref().map(str::trim);

        if let Some(included) = &self.included_postal_codes {
            match postal_code {
                Some(postal_code) if postal_code_listed(included, postal_code) => {}
                _ => return false,
            }
        }

        match (&self.excluded_postal_codes, postal_code) {
            (Some(excluded), Some(postal_code)) => !postal_code_listed(excluded, postal_code),
            _ => true,
        }
    }
}

fn postal_code_listed(list: &str, postal_code: &str) -> bool {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .any(|entry| {
            if let Some(prefix) = entry.strip_suffix('*') {
                postal_code.starts_with(prefix)
            } else if let Some((start, end)) = entry.split_once(':') {
                compare_postal_codes(start.trim(), postal_code).is_le()
                    && compare_postal_codes(postal_code, end.trim()).is_le()
            } else {
                entry.eq_ignore_ascii_case(postal_code)
            }
        })
}

fn compare_postal_codes(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

/// A rate amount valid during `[start_date, end_date)`.
///
/// A missing start means the amount has always applied; a missing end means
/// it still applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRateAmount {
    /// Rate as a fraction, e.g. `0.2` for 20%
    pub amount: Decimal,

    /// First day the amount applies
    #[serde(default)]
    pub start_date: Option<Date>,

    /// First day the amount no longer applies
    #[serde(default)]
    pub end_date: Option<Date>,
}

impl TaxRateAmount {
    /// Creates an amount that always applies.
    pub const fn new(amount: Decimal) -> Self {
        Self {
            amount,
            start_date: None,
            end_date: None,
        }
    }

    /// Creates an amount valid during `[start_date, end_date)`.
    pub const fn between(
        amount: Decimal,
        start_date: Option<Date>,
        end_date: Option<Date>,
    ) -> Self {
        Self {
            amount,
            start_date,
            end_date,
        }
    }

    /// Returns whether the amount applies on `date`.
    pub fn contains(&self, date: Date) -> bool {
        self.start_date.is_none_or(|start_date| start_date <= date)
            && self.end_date.is_none_or(|end_date| date < end_date)
    }

    fn overlaps(&self, other: &TaxRateAmount) -> bool {
        let starts_before_other_ends = match (self.start_date, other.end_date) {
            (Some(start_date), Some(end_date)) => start_date < end_date,
            _ => true,
        };
        let other_starts_before_end = match (other.start_date, self.end_date) {
            (Some(start_date), Some(end_date)) => start_date < end_date,
            _ => true,
        };

        starts_before_other_ends && other_starts_before_end
    }
}

/// A named rate with its dated amounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxRate {
    id: String,
    label: String,
    amounts: SmallVec<[TaxRateAmount; 2]>,
    default: bool,
}

impl TaxRate {
    /// Creates a non-default rate.
    ///
    /// # Errors
    ///
    /// - [`TaxError::InvalidDateRange`]: an amount ends before it starts.
    /// - [`TaxError::OverlappingAmounts`]: two amounts apply on the same day.
    /// - [`TaxError::NegativeAmount`]: an amount is below zero.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        amounts: impl IntoIterator<Item = TaxRateAmount>,
    ) -> Result<Self, TaxError> {
        let id = id.into();
        let amounts: SmallVec<[TaxRateAmount; 2]> = amounts.into_iter().collect();

        for (index, amount) in amounts.iter().enumerate() {
            if amount.amount.is_sign_negative() && !amount.amount.is_zero() {
                return Err(TaxError::NegativeAmount {
                    rate: id,
                    amount: amount.amount,
                });
            }

            if let (Some(start_date), Some(end_date)) = (amount.start_date, amount.end_date)
                && end_date <= start_date
            {
                return Err(TaxError::InvalidDateRange {
                    rate: id,
                    start_date,
                    end_date,
                });
            }

            if amounts
                .iter()
                .skip(index + 1)
                .any(|other| amount.overlaps(other))
            {
                return Err(TaxError::OverlappingAmounts { rate: id });
            }
        }

        Ok(Self {
            id,
            label: label.into(),
            amounts,
            default: false,
        })
    }

    /// Marks the rate as its zone's default.
    #[must_use]
    pub fn with_default(mut self, default: bool) -> Self {
        self.default = default;
        self
    }

    /// Returns the id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the dated amounts.
    pub fn amounts(&self) -> &[TaxRateAmount] {
        &self.amounts
    }

    /// Returns whether this is the zone's default rate.
    pub fn is_default(&self) -> bool {
        self.default
    }

    /// Returns the amount applying on `date`.
    pub fn amount_on(&self, date: Date) -> Option<&TaxRateAmount> {
        self.amounts.iter().find(|amount| amount.contains(date))
    }
}

/// A set of territories sharing the same tax rates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxZone {
    id: String,
    label: String,
    territories: Vec<Territory>,
    rates: Vec<TaxRate>,
}

impl TaxZone {
    /// Creates a zone.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        territories: Vec<Territory>,
        rates: Vec<TaxRate>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            territories,
            rates,
        }
    }

    /// Returns the id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the territories.
    pub fn territories(&self) -> &[Territory] {
        &self.territories
    }

    /// Returns the rates.
    pub fn rates(&self) -> &[TaxRate] {
        &self.rates
    }

    /// Returns a rate by id.
    pub fn rate(&self, id: &str) -> Option<&TaxRate> {
        self.rates.iter().find(|rate| rate.id == id)
    }

    /// Returns the default rate.
    pub fn default_rate(&self) -> Option<&TaxRate> {
        self.rates.iter().find(|rate| rate.default)
    }

    /// Returns whether the address lies in one of the zone's territories.
    pub fn matches(&self, address: &Address) -> bool {
        self.territories
            .iter()
            .any(|territory| territory.matches(address))
    }

    /// Returns whether a seller registered in `is_registered_in` countries
    /// collects tax in this zone.
    pub fn is_registered(&self, is_registered_in: impl Fn(&str) -> bool) -> bool {
        self.territories
            .iter()
            .any(|territory| is_registered_in(&territory.country_code))
    }
}
