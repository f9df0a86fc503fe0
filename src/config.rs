//! Configuration
//!
//! Order types, tax types and promotions read from YAML and validated into
//! the collaborators the pricing pipeline runs with.

use std::{fs, path::Path, sync::Arc};

use jiff::civil::Date;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{
    orders::{OrderType, OrderTypes},
    prices::PriceError,
    promotions::{Coupon, OfferConfig, Promotion, PromotionError, PromotionId, PromotionStorage},
    stores::StoreId,
    tax::{CustomTaxConfig, CustomTaxType, SwissVat, TaxError, TaxOrderProcessor, TaxType},
};

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid YAML for the expected shape.
    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// A configured price is invalid.
    #[error(transparent)]
    Price(#[from] PriceError),

    /// A promotion failed validation.
    #[error(transparent)]
    Promotion(#[from] PromotionError),

    /// A tax type failed validation.
    #[error(transparent)]
    Tax(#[from] TaxError),

    /// No tax type plugin has the given id.
    #[error("unknown tax type plugin: {0}")]
    UnknownTaxType(String),

    /// A custom tax type has no `configuration` block.
    #[error("tax type {0} is missing its configuration")]
    MissingConfiguration(String),

    /// Two records of the same kind share an id.
    #[error("duplicate {kind} id: {id}")]
    DuplicateId {
        /// Record kind
        kind: &'static str,

        /// Repeated id
        id: String,
    },
}

/// A configured tax type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxTypeConfig {
    /// Tax type id, used in adjustment source ids
    pub id: String,

    /// Label; defaults to the id
    #[serde(default)]
    pub label: Option<String>,

    /// Plugin id: `custom` or `swiss_vat`
    pub plugin: String,

    /// Whether displayed prices include the tax, for built-in plugins
    #[serde(default)]
    pub display_inclusive: bool,

    /// Plugin configuration, required by `custom`
    #[serde(default)]
    pub configuration: Option<CustomTaxConfig>,
}

impl TaxTypeConfig {
    /// Builds the tax type through the plugin registry.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::UnknownTaxType`]: the plugin id is not registered.
    /// - [`ConfigError::MissingConfiguration`]: a custom tax type has no configuration.
    /// - [`ConfigError::Tax`]: the rates fail validation.
    pub fn build(&self) -> Result<Arc<dyn TaxType>, ConfigError> {
        match self.plugin.as_str() {
            CustomTaxType::PLUGIN_ID => {
                let configuration = self
                    .configuration
                    .clone()
                    .ok_or_else(|| ConfigError::MissingConfiguration(self.id.clone()))?;
                let label = self.label.clone().unwrap_or_else(|| self.id.clone());

                Ok(Arc::new(CustomTaxType::new(
                    self.id.clone(),
                    label,
                    configuration,
                )?))
            }
            SwissVat::PLUGIN_ID => Ok(Arc::new(SwissVat::new(
                self.id.clone(),
                self.display_inclusive,
            )?)),
            other => Err(ConfigError::UnknownTaxType(other.to_owned())),
        }
    }
}

/// A configured promotion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionConfig {
    /// Promotion id
    pub id: PromotionId,

    /// Name, used as the adjustment label
    pub name: String,

    /// Description
    #[serde(default)]
    pub description: Option<String>,

    /// Order types the promotion is limited to; empty means all
    #[serde(default)]
    pub order_types: Vec<String>,

    /// Stores the promotion is limited to; empty means all
    #[serde(default)]
    pub stores: Vec<StoreId>,

    /// Offer plugin and its settings
    pub offer: OfferConfig,

    /// First active day
    pub start_date: Date,

    /// Last active day
    #[serde(default)]
    pub end_date: Option<Date>,

    /// Maximum number of orders that may use the promotion
    #[serde(default)]
    pub usage_limit: Option<u64>,

    /// Whether the promotion is enabled
    #[serde(default = "enabled")]
    pub enabled: bool,

    /// Coupons unlocking the promotion
    #[serde(default)]
    pub coupons: Vec<Coupon>,

    /// Sort weight
    #[serde(default)]
    pub weight: i32,
}

fn enabled() -> bool {
    true
}

impl PromotionConfig {
    /// Builds the promotion.
    ///
    /// # Errors
    ///
    /// Returns a [`PromotionError`] if the offer or the date range is invalid.
    pub fn build(&self) -> Result<Promotion, PromotionError> {
        let mut builder = Promotion::builder(
            self.id,
            self.name.clone(),
            self.offer.build()?,
            self.start_date,
        )
        .order_types(self.order_types.iter().cloned())
        .stores(self.stores.iter().cloned())
        .enabled(self.enabled)
        .weight(self.weight);

        if let Some(description) = &self.description {
            builder = builder.description(description.clone());
        }

        if let Some(end_date) = self.end_date {
            builder = builder.end_date(end_date);
        }

        if let Some(limit) = self.usage_limit {
            builder = builder.usage_limit(limit);
        }

        for coupon in &self.coupons {
            builder = builder.coupon(coupon.clone());
        }

        builder.build()
    }
}

/// Pricing configuration as read from YAML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Order types
    #[serde(default)]
    pub order_types: Vec<OrderType>,

    /// Tax types, applied in this order
    #[serde(default)]
    pub tax_types: Vec<TaxTypeConfig>,

    /// Promotions
    #[serde(default)]
    pub promotions: Vec<PromotionConfig>,
}

/// Validated collaborators built from a [`PricingConfig`].
#[derive(Debug)]
pub struct PricingRules {
    /// Order types
    pub order_types: OrderTypes,

    /// Tax processor over the configured tax types
    pub taxes: TaxOrderProcessor,

    /// Promotions
    pub promotions: PromotionStorage,
}

impl PricingConfig {
    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the YAML is malformed.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_norway::from_str(yaml)?)
    }

    /// Reads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&contents)?;

        info!(
            path = %path.display(),
            order_types = config.order_types.len(),
            tax_types = config.tax_types.len(),
            promotions = config.promotions.len(),
            "loaded pricing configuration"
        );

        Ok(config)
    }

    /// Validates the configuration and builds the pricing collaborators.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for duplicate ids, unknown tax plugins, and
    /// invalid rates, offers or date ranges.
    pub fn build(&self) -> Result<PricingRules, ConfigError> {
        let mut order_types = OrderTypes::new();

        for order_type in &self.order_types {
            if order_types.insert(order_type.clone()).is_some() {
                return Err(ConfigError::DuplicateId {
                    kind: "order type",
                    id: order_type.id.clone(),
                });
            }
        }

        let mut tax_ids = FxHashSet::default();
        let mut tax_types = Vec::with_capacity(self.tax_types.len());

        for tax_type in &self.tax_types {
            if !tax_ids.insert(tax_type.id.as_str()) {
                return Err(ConfigError::DuplicateId {
                    kind: "tax type",
                    id: tax_type.id.clone(),
                });
            }

            tax_types.push(tax_type.build()?);
        }

        let mut promotions = PromotionStorage::new();

        for promotion in &self.promotions {
            if promotions.get(promotion.id).is_some() {
                return Err(ConfigError::DuplicateId {
                    kind: "promotion",
                    id: promotion.id.to_string(),
                });
            }

            promotions.insert(promotion.build()?)?;
        }

        info!(
            order_types = order_types.len(),
            tax_types = tax_types.len(),
            promotions = promotions.len(),
            "built pricing rules"
        );

        Ok(PricingRules {
            order_types,
            taxes: TaxOrderProcessor::new(tax_types),
            promotions,
        })
    }
}
