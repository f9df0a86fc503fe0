//! Commerce Pricing
//!
//! Order pricing for online stores: an order's total is derived from its
//! items and their adjustments, and a refresh pass keeps prices, promotions
//! and taxes current before the order is placed.

pub mod adjustments;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod orders;
pub mod payments;
pub mod prelude;
pub mod prices;
pub mod promotions;
pub mod stores;
pub mod tax;
