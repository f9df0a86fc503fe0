//! Commerce Pricing prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    adjustments::{Adjustment, AdjustmentScale, AdjustmentType},
    catalog::{Catalog, CatalogEntry, CatalogError, InMemoryCatalog, PurchasableRef},
    clock::{Clock, FixedClock, SystemClock},
    config::{ConfigError, PricingConfig, PricingRules},
    orders::{
        Order, OrderError, OrderId, OrderItem, OrderItemKey, OrderState, OrderTransition,
        OrderType, OrderTypes, RefreshMode, RefreshState,
        refresh::{OrderProcessor, OrderRefresh, ProcessContext, RefreshError, RefreshReport},
    },
    payments::{
        Deletion, Payment, PaymentError, PaymentId, PaymentMethod, PaymentMethodId,
        PaymentMethodReferences, PaymentState, record_payments,
    },
    prices::{Price, PriceError, RoundingMode},
    promotions::{
        Coupon, InMemoryPromotionUsage, OfferConfig, Promotion, PromotionError, PromotionId,
        PromotionOffer, PromotionOrderProcessor, PromotionStorage, PromotionUsage,
    },
    stores::{Address, Profile, Store, StoreId, UserId},
    tax::{CustomTaxType, SwissVat, TaxError, TaxOrderProcessor, TaxType},
};
