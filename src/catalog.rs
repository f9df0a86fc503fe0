//! Catalog
//!
//! Lookup of the purchasable entities that order items point at.

use std::fmt;

use mockall::automock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::prices::Price;

/// Reference to a purchasable entity, such as a product variation SKU.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchasableRef(String);

impl PurchasableRef {
    /// Creates a reference.
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Returns the reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PurchasableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PurchasableRef {
    fn from(reference: &str) -> Self {
        Self::new(reference)
    }
}

/// Current catalog data for a purchasable entity.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    /// Title shown on order items
    pub title: String,

    /// Current unit price
    pub unit_price: Price,

    /// Whether the entity can still be purchased
    pub available: bool,
}

impl CatalogEntry {
    /// Creates an available entry.
    pub fn new(title: impl Into<String>, unit_price: Price) -> Self {
        Self {
            title: title.into(),
            unit_price,
            available: true,
        }
    }
}

/// Errors raised by catalog lookups.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CatalogError {
    /// The backing store could not be queried.
    #[error("catalog lookup for {reference} failed: {reason}")]
    Lookup {
        /// Reference being resolved
        reference: PurchasableRef,

        /// Reason reported by the backing store
        reason: String,
    },
}

/// Resolves purchasable references to current catalog data.
#[automock]
pub trait Catalog {
    /// Looks up a purchasable entity; `Ok(None)` means it no longer exists.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] when the lookup itself fails.
    fn resolve(&self, reference: &PurchasableRef) -> Result<Option<CatalogEntry>, CatalogError>;
}

/// A catalog held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    entries: FxHashMap<PurchasableRef, CatalogEntry>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry.
    pub fn insert(&mut self, reference: impl Into<PurchasableRef>, entry: CatalogEntry) {
        self.entries.insert(reference.into(), entry);
    }

    /// Removes an entry, returning it if present.
    pub fn remove(&mut self, reference: &PurchasableRef) -> Option<CatalogEntry> {
        self.entries.remove(reference)
    }

    /// Returns an entry.
    pub fn get(&self, reference: &PurchasableRef) -> Option<&CatalogEntry> {
        self.entries.get(reference)
    }

    /// Changes the unit price of an entry, returning whether it exists.
    pub fn set_price(&mut self, reference: &PurchasableRef, unit_price: Price) -> bool {
        self.entries
            .get_mut(reference)
            .map(|entry| entry.unit_price = unit_price)
            .is_some()
    }

    /// Changes the title of an entry, returning whether it exists.
    pub fn set_title(&mut self, reference: &PurchasableRef, title: impl Into<String>) -> bool {
        let title = title.into();

        self.entries
            .get_mut(reference)
            .map(|entry| entry.title = title)
            .is_some()
    }

    /// Changes the availability of an entry, returning whether it exists.
    pub fn set_available(&mut self, reference: &PurchasableRef, available: bool) -> bool {
        self.entries
            .get_mut(reference)
            .map(|entry| entry.available = available)
            .is_some()
    }
}

impl Catalog for InMemoryCatalog {
    fn resolve(&self, reference: &PurchasableRef) -> Result<Option<CatalogEntry>, CatalogError> {
        Ok(self.entries.get(reference).cloned())
    }
}
