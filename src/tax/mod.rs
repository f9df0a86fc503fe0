//! Tax
//!
//! Tax types own zones of territories with dated rates. A tax type applies to
//! an order when its store sits in, or is registered in, one of the zones; it
//! then adds a tax adjustment to every item bought by a customer in a zone.

use std::fmt;

use decimal_percentage::Percentage;
use jiff::civil::Date;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::{
    adjustments::{Adjustment, AdjustmentType},
    orders::{Order, OrderError},
    prices::PriceError,
};

pub mod custom;
pub mod processor;
pub mod swiss_vat;
pub mod zones;

pub use custom::{CustomTaxConfig, CustomTaxType, DisplayLabel};
pub use processor::TaxOrderProcessor;
pub use swiss_vat::SwissVat;
pub use zones::{TaxRate, TaxRateAmount, TaxZone, Territory};

/// Errors raised while building tax types or applying them.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TaxError {
    /// A rate amount ends on or before the day it starts.
    #[error("tax rate {rate} has an amount ending on {end_date}, not after its start on {start_date}")]
    InvalidDateRange {
        /// Rate id
        rate: String,

        /// Start date
        start_date: Date,

        /// End date
        end_date: Date,
    },

    /// Two amounts of the same rate apply on the same day.
    #[error("tax rate {rate} has overlapping amounts")]
    OverlappingAmounts {
        /// Rate id
        rate: String,
    },

    /// A rate amount is below zero.
    #[error("tax rate {rate} has a negative amount {amount}")]
    NegativeAmount {
        /// Rate id
        rate: String,

        /// Offending amount
        amount: Decimal,
    },

    /// A tax type was configured without rates.
    #[error("tax type {0} has no rates")]
    NoRates(String),

    /// Tax arithmetic failed.
    #[error(transparent)]
    Price(#[from] PriceError),

    /// An adjustment could not be added to the order.
    #[error(transparent)]
    Order(#[from] OrderError),
}

/// A kind of tax, such as a country's VAT.
pub trait TaxType: fmt::Debug + Send + Sync {
    /// Returns the id, used as the first part of adjustment source ids.
    fn id(&self) -> &str;

    /// Returns the admin label.
    fn label(&self) -> &str;

    /// Returns the label shown to customers, e.g. `VAT`.
    fn display_label(&self) -> &str;

    /// Returns whether displayed prices include this tax.
    fn is_display_inclusive(&self) -> bool;

    /// Returns whether tax amounts are rounded to the currency's precision.
    fn should_round(&self) -> bool;

    /// Returns the zones.
    fn zones(&self) -> &[TaxZone];

    /// Returns whether the order's store is in, or registered in, one of the zones.
    fn applies(&self, order: &Order) -> bool {
        let Some(store) = order.store() else {
            return false;
        };

        self.zones().iter().any(|zone| {
            zone.matches(store.address())
                || zone.is_registered(|country| store.is_registered_in(country))
        })
    }

    /// Adds tax adjustments for `date` to the order's items, returning how
    /// many were added.
    ///
    /// # Errors
    ///
    /// Returns a [`TaxError`] if tax cannot be computed or recorded; the order
    /// is left unchanged in that case.
    fn apply(&self, order: &mut Order, date: Date) -> Result<usize, TaxError> {
        let mut taxed = order.clone();
        let added = apply_zones(self, &mut taxed, date)?;
        *order = taxed;

        Ok(added)
    }
}

fn apply_zones<T: TaxType + ?Sized>(
    tax_type: &T,
    order: &mut Order,
    date: Date,
) -> Result<usize, TaxError> {
    let (Some(store), Some(profile)) = (order.store(), order.billing_profile()) else {
        return Ok(0);
    };

    let prices_include_tax = store.prices_include_tax();
    let customer_zones: Vec<&TaxZone> = tax_type
        .zones()
        .iter()
        .filter(|zone| {
            zone.matches(profile.address())
                && (zone.matches(store.address())
                    || zone.is_registered(|country| store.is_registered_in(country)))
        })
        .collect();

    let display_inclusive = tax_type.is_display_inclusive();
    let mut added = 0;

    for key in order.item_keys().to_vec() {
        for zone in &customer_zones {
            let Some(item) = order.item(key) else {
                continue;
            };

            let rate = item
                .tax_rate()
                .and_then(|id| zone.rate(id))
                .or_else(|| zone.default_rate());

            let Some((rate, amount)) = rate.and_then(|rate| Some((rate, rate.amount_on(date)?)))
            else {
                debug!(zone = zone.id(), %date, "no tax rate amount applies");
                continue;
            };

            let unit_price = *item.unit_price();
            let mut tax = unit_price.multiply(amount.amount)?;

            if prices_include_tax {
                tax = tax.divide(Decimal::ONE + amount.amount)?;
            }

            if tax_type.should_round() {
                tax = tax.round();
            }

            let adjustment = Adjustment::new(AdjustmentType::Tax, tax_type.display_label(), tax)
                .with_percentage(Percentage::from(amount.amount))
                .with_source_id(format!("{}|{}|{}", tax_type.id(), zone.id(), rate.id()))
                .included(display_inclusive);

            order.update_item(key, |item| {
                match (display_inclusive, prices_include_tax) {
                    (true, false) => item.replace_unit_price(unit_price.add(tax)?),
                    (false, true) => item.replace_unit_price(unit_price.subtract(tax)?),
                    _ => {}
                }

                item.add_adjustment(adjustment);

                Ok(())
            })?;

            added += 1;
        }
    }

    Ok(added)
}
