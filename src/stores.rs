//! Stores, addresses and customer profiles

use std::fmt;

use rusty_money::iso::Currency;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Store identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreId(String);

impl StoreId {
    /// Creates a store identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StoreId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// User identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A postal address, reduced to the parts tax matching needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// ISO 3166-1 alpha-2 country code
    pub country_code: String,

    /// Postal code
    #[serde(default)]
    pub postal_code: Option<String>,
}

impl Address {
    /// Creates an address in the given country.
    pub fn new(country_code: impl Into<String>) -> Self {
        Self {
            country_code: country_code.into(),
            postal_code: None,
        }
    }

    /// Sets the postal code.
    #[must_use]
    pub fn with_postal_code(mut self, postal_code: impl Into<String>) -> Self {
        self.postal_code = Some(postal_code.into());
        self
    }
}

/// A store selling to customers.
#[derive(Debug, Clone)]
pub struct Store {
    id: StoreId,
    name: String,
    default_currency: &'static Currency,
    address: Address,
    tax_registrations: SmallVec<[String; 4]>,
    prices_include_tax: bool,
}

impl Store {
    /// Creates a store with no tax registrations whose prices exclude tax.
    pub fn new(
        id: impl Into<StoreId>,
        name: impl Into<String>,
        default_currency: &'static Currency,
        address: Address,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            default_currency,
            address,
            tax_registrations: SmallVec::new(),
            prices_include_tax: false,
        }
    }

    /// Sets the countries the store is registered to collect tax in.
    #[must_use]
    pub fn with_tax_registrations<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tax_registrations = countries.into_iter().map(Into::into).collect();
        self
    }

    /// Sets whether the store's prices already include tax.
    #[must_use]
    pub fn with_prices_including_tax(mut self, prices_include_tax: bool) -> Self {
        self.prices_include_tax = prices_include_tax;
        self
    }

    /// Returns the store identifier.
    pub fn id(&self) -> &StoreId {
        &self.id
    }

    /// Returns the store name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the store's default currency.
    pub fn default_currency(&self) -> &'static Currency {
        self.default_currency
    }

    /// Returns the store address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Returns the countries the store is registered to collect tax in.
    pub fn tax_registrations(&self) -> &[String] {
        &self.tax_registrations
    }

    /// Returns whether the store is registered to collect tax in the given country.
    pub fn is_registered_in(&self, country_code: &str) -> bool {
        self.tax_registrations
            .iter()
            .any(|registration| registration.eq_ignore_ascii_case(country_code))
    }

    /// Returns whether the store's prices already include tax.
    pub fn prices_include_tax(&self) -> bool {
        self.prices_include_tax
    }
}

/// A customer profile holding the address used for tax resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    id: u64,
    owner: Option<UserId>,
    address: Address,
}

impl Profile {
    /// Creates a profile.
    pub fn new(id: u64, owner: Option<UserId>, address: Address) -> Self {
        Self { id, owner, address }
    }

    /// Returns the profile identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the owning user, if any.
    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    /// Returns the profile address.
    pub fn address(&self) -> &Address {
        &self.address
    }
}
