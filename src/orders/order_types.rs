//! Order types and their refresh settings

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Refresh frequency used when an order type does not configure one, in seconds.
pub const DEFAULT_REFRESH_FREQUENCY: u64 = 300;

/// Who may trigger a refresh of draft orders of a given type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshMode {
    /// Refresh for every actor.
    #[default]
    Always,

    /// Refresh only when the acting user owns the order.
    Owner,

    /// Never refresh automatically.
    Skip,
}

/// Per-order override of the order type's refresh mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshState {
    /// Refresh on the next check regardless of frequency.
    Force,

    /// Do not refresh.
    Skip,
}

/// An order type, e.g. `default` or `subscription`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderType {
    /// Machine name
    pub id: String,

    /// Human readable label
    pub label: String,

    /// Refresh mode
    #[serde(default)]
    pub refresh_mode: RefreshMode,

    /// Minimum number of seconds between refreshes; zero disables the limit
    #[serde(default = "default_refresh_frequency")]
    pub refresh_frequency: u64,
}

fn default_refresh_frequency() -> u64 {
    DEFAULT_REFRESH_FREQUENCY
}

impl OrderType {
    /// Creates an order type that always refreshes, at most every 300 seconds.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            refresh_mode: RefreshMode::Always,
            refresh_frequency: DEFAULT_REFRESH_FREQUENCY,
        }
    }

    /// Sets the refresh mode.
    #[must_use]
    pub fn with_refresh_mode(mut self, refresh_mode: RefreshMode) -> Self {
        self.refresh_mode = refresh_mode;
        self
    }

    /// Sets the refresh frequency in seconds.
    #[must_use]
    pub fn with_refresh_frequency(mut self, seconds: u64) -> Self {
        self.refresh_frequency = seconds;
        self
    }
}

/// Order types keyed by id.
#[derive(Debug, Clone, Default)]
pub struct OrderTypes {
    types: FxHashMap<String, OrderType>,
}

impl OrderTypes {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an order type, returning the one it replaced.
    pub fn insert(&mut self, order_type: OrderType) -> Option<OrderType> {
        self.types.insert(order_type.id.clone(), order_type)
    }

    /// Returns an order type by id.
    pub fn get(&self, id: &str) -> Option<&OrderType> {
        self.types.get(id)
    }

    /// Returns the number of order types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns whether no order types are registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl FromIterator<OrderType> for OrderTypes {
    fn from_iter<I: IntoIterator<Item = OrderType>>(iter: I) -> Self {
        let mut types = Self::new();

        for order_type in iter {
            types.insert(order_type);
        }

        types
    }
}
