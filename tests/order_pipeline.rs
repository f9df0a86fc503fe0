//! Integration tests for order totals and the refresh pipeline

use std::{path::Path, sync::Arc};

use jiff::Timestamp;
use rust_decimal::Decimal;
use rusty_money::iso::USD;
use testresult::TestResult;

use commerce_pricing::{
    adjustments::{Adjustment, AdjustmentType},
    catalog::{CatalogEntry, InMemoryCatalog, PurchasableRef},
    clock::{Clock, FixedClock},
    config::{PricingConfig, PricingRules},
    orders::{Order, OrderId, OrderItem, OrderState, OrderTransition, refresh::OrderRefresh},
    payments::{Payment, PaymentId, PaymentState, record_payments},
    prices::{Price, PriceError},
    promotions::{InMemoryPromotionUsage, PromotionId, PromotionOrderProcessor, PromotionUsage},
    stores::{Address, Profile, Store, UserId},
};

fn usd(amount: &str) -> Result<Price, PriceError> {
    Price::parse(amount, "USD")
}

fn rules() -> TestResult<PricingRules> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/pricing.yml");

    Ok(PricingConfig::load(path)?.build()?)
}

fn catalog() -> TestResult<InMemoryCatalog> {
    let mut catalog = InMemoryCatalog::new();
    catalog.insert("sku-a", CatalogEntry::new("Coffee mug", usd("10.00")?));
    catalog.insert("sku-b", CatalogEntry::new("Tea towel", usd("5.00")?));

    Ok(catalog)
}

fn draft(
    id: u64,
    catalog: &InMemoryCatalog,
    lines: &[(&str, u32)],
    created: Timestamp,
) -> TestResult<Order> {
    let store = Store::new("1", "Belgrade", USD, Address::new("RS"));
    let customer = Profile::new(1, Some(UserId(7)), Address::new("RS"));
    let mut order = Order::new(OrderId(id), "default", created)
        .with_store(Arc::new(store))
        .with_billing_profile(Arc::new(customer))
        .with_owner(UserId(7));

    for (sku, quantity) in lines {
        let reference = PurchasableRef::new(*sku);
        let entry = catalog.get(&reference).ok_or("unknown sku")?;

        order.add_item(OrderItem::from_purchasable(
            reference.clone(),
            entry,
            Decimal::from(*quantity),
        )?)?;
    }

    Ok(order)
}

fn tax_amounts(order: &Order) -> Vec<Price> {
    order
        .items()
        .flat_map(OrderItem::adjustments)
        .filter(|adjustment| adjustment.kind() == AdjustmentType::Tax)
        .map(|adjustment| *adjustment.amount())
        .collect()
}

#[test]
fn order_total_follows_items_and_adjustments() -> TestResult {
    let mut order = Order::new(OrderId(1), "default", "1990-02-24T11:15:00Z".parse()?);
    let mug = OrderItem::new("Mug", Decimal::ONE, usd("2.00")?)?;
    let towels = OrderItem::new("Towel", Decimal::from(2), usd("3.00")?)?;

    let keys = order.set_items([mug, towels])?;
    let towels_key = *keys.get(1).ok_or("missing key")?;

    let towels = order.remove_item(towels_key)?.ok_or("missing item")?;
    assert!(!order.has_item(towels_key));
    let towels_key = order.add_item(towels)?;

    assert_eq!(order.total_price(), Some(&usd("8.00")?));

    let discount = Adjustment::new(AdjustmentType::Custom, "10% off", usd("-1.00")?);
    let fee = Adjustment::new(AdjustmentType::Fee, "Handling fee", usd("10.00")?);
    order.add_adjustment(discount.clone())?;
    order.add_adjustment(fee.clone())?;

    let same_discount = Adjustment::new(AdjustmentType::Custom, "10% off", usd("-1.00")?);
    assert!(order.remove_adjustment(&same_discount)?);
    assert_eq!(order.total_price(), Some(&usd("18.00")?));
    assert_eq!(order.adjustments(), [fee.clone()]);

    order.set_adjustments([discount, fee])?;
    assert_eq!(order.total_price(), Some(&usd("17.00")?));

    let mut towels = order.remove_item(towels_key)?.ok_or("missing item")?;
    towels.add_adjustment(Adjustment::new(AdjustmentType::Custom, "Gift wrap", usd("5.00")?));
    order.add_item(towels)?;

    assert_eq!(order.total_price(), Some(&usd("27.00")?));

    let placed: Timestamp = "1990-02-24T11:16:40Z".parse()?;
    order.apply_transition(OrderTransition::Place, placed)?;
    order.apply_transition(OrderTransition::Complete, placed)?;

    assert_eq!(order.state(), OrderState::Completed);
    assert_eq!(order.placed_time(), Some(placed));
    let canceled = order.apply_transition(OrderTransition::Cancel, placed);

    assert!(canceled.is_err());

    Ok(())
}

#[test]
fn refresh_applies_promotions_then_taxes() -> TestResult {
    let rules = rules()?;
    let usage = InMemoryPromotionUsage::new();
    let promotions = PromotionOrderProcessor::new(&rules.promotions, &usage);
    let mut catalog = catalog()?;
    let created: Timestamp = "2017-01-15T10:00:00Z".parse()?;
    let clock = FixedClock::new("2017-01-15T10:10:00Z".parse()?);
    let mut order = draft(1, &catalog, &[("sku-a", 2), ("sku-b", 1)], created)?;

    let refresh = OrderRefresh::new(&catalog, &clock)
        .with_processor(&promotions)
        .with_processor(&rules.taxes);
    refresh.refresh(&mut order)?;

    assert_eq!(order.total_price(), Some(&usd("27.50")?));
    assert_eq!(tax_amounts(&order), [usd("2.00")?, usd("1.00")?]);

    let promotion = order.adjustments().first().ok_or("missing promotion")?;

    assert_eq!(promotion.kind(), AdjustmentType::Promotion);
    assert_eq!(promotion.label(), "Ten percent off");
    assert_eq!(promotion.amount(), &usd("-2.50")?);
    assert_eq!(promotion.source_id(), Some("1"));

    refresh.refresh(&mut order)?;

    assert_eq!(order.total_price(), Some(&usd("27.50")?));
    assert_eq!(order.adjustments().len(), 1);
    assert_eq!(order.collect_adjustments()?.len(), 3);

    drop(refresh);
    catalog.set_price(&PurchasableRef::new("sku-a"), usd("12.00")?);
    catalog.set_title(&PurchasableRef::new("sku-a"), "Large coffee mug");
    catalog.set_available(&PurchasableRef::new("sku-b"), false);

    let refresh = OrderRefresh::new(&catalog, &clock)
        .with_processor(&promotions)
        .with_processor(&rules.taxes);
    let report = refresh.refresh(&mut order)?;

    assert_eq!(report.removed_items, [PurchasableRef::new("sku-b")]);

    let item = order.items().next().ok_or("missing item")?;

    assert_eq!(item.title(), "Large coffee mug");
    assert_eq!(item.unit_price(), &usd("12.00")?);
    assert_eq!(order.total_price(), Some(&usd("26.40")?));
    assert_eq!(order.changed_time(), clock.now());

    Ok(())
}

#[test]
fn coupons_unlock_promotions_after_automatic_ones() -> TestResult {
    let rules = rules()?;
    let usage = InMemoryPromotionUsage::new();
    let promotions = PromotionOrderProcessor::new(&rules.promotions, &usage);
    let catalog = catalog()?;
    let clock = FixedClock::new("2017-01-15T10:10:00Z".parse()?);
    let refresh = OrderRefresh::new(&catalog, &clock)
        .with_processor(&promotions)
        .with_processor(&rules.taxes);

    let created: Timestamp = "2017-01-15T10:00:00Z".parse()?;
    let mut order = draft(1, &catalog, &[("sku-a", 2), ("sku-b", 1)], created)?;
    order.add_coupon("FIVEOFF");
    refresh.refresh(&mut order)?;

    let labels: Vec<_> = order.adjustments().iter().map(Adjustment::label).collect();

    assert_eq!(labels, ["Ten percent off", "Five off"]);
    assert_eq!(order.total_price(), Some(&usd("22.50")?));

    let mut retired = draft(2, &catalog, &[("sku-b", 1)], created)?;
    retired.add_coupon("RETIRED");
    refresh.refresh(&mut retired)?;

    assert!(
        retired
            .adjustments()
            .iter()
            .all(|adjustment| adjustment.label() != "Five off")
    );

    Ok(())
}

#[test]
fn usage_limit_stops_promotion_after_placed_order() -> TestResult {
    let rules = rules()?;
    let usage = InMemoryPromotionUsage::new();
    let promotions = PromotionOrderProcessor::new(&rules.promotions, &usage);
    let catalog = catalog()?;
    let created: Timestamp = "2017-01-15T10:00:00Z".parse()?;
    let now: Timestamp = "2017-01-15T10:10:00Z".parse()?;
    let clock = FixedClock::new(now);
    let refresh = OrderRefresh::new(&catalog, &clock)
        .with_processor(&promotions)
        .with_processor(&rules.taxes);

    let mut first = draft(1, &catalog, &[("sku-a", 1)], created)?;
    refresh.refresh(&mut first)?;
    first.apply_transition(OrderTransition::Place, now)?;

    assert_eq!(promotions.record_usage(&first)?, [PromotionId(1)]);
    assert_eq!(usage.count(PromotionId(1))?, 1);

    let mut second = draft(2, &catalog, &[("sku-a", 1)], created)?;
    refresh.refresh(&mut second)?;

    assert!(second.adjustments().is_empty());
    assert_eq!(second.total_price(), Some(&usd("12.00")?));

    let payment = Payment::new(PaymentId(1), "manual", first.id(), usd("11.00")?)
        .with_state(PaymentState::Completed);
    record_payments(&mut first, [&payment])?;

    assert_eq!(first.total_price(), Some(&usd("11.00")?));
    assert_eq!(first.balance()?, Some(usd("0")?));

    Ok(())
}

#[test]
fn refresh_gating_by_frequency_owner_and_state() -> TestResult {
    let rules = rules()?;
    let catalog = catalog()?;
    let created: Timestamp = "2017-01-15T10:00:00Z".parse()?;
    let mut order = draft(1, &catalog, &[("sku-a", 1)], created)?;
    let order_types = &rules.order_types;
    let default_type = order_types.get("default").ok_or("missing order type")?;
    let subscription = order_types.get("subscription").ok_or("missing order type")?;

    let soon = FixedClock::new("2017-01-15T10:01:00Z".parse()?);
    let soon_refresh = OrderRefresh::new(&catalog, &soon);

    let report = soon_refresh.refresh_if_needed(&mut order, default_type, None)?;

    assert!(report.is_none());
    assert!(!soon_refresh.needs_refresh(&order, subscription, Some(UserId(8))));
    assert!(!soon_refresh.needs_refresh(&order, subscription, None));
    assert!(soon_refresh.needs_refresh(&order, subscription, Some(UserId(7))));

    let later = FixedClock::new("2017-01-15T10:05:00Z".parse()?);
    let later_refresh = OrderRefresh::new(&catalog, &later);

    let report = later_refresh.refresh_if_needed(&mut order, default_type, None)?;

    assert!(report.is_some());
    assert!(!later_refresh.needs_refresh(&order, default_type, None));

    order.apply_transition(OrderTransition::Place, "2017-01-15T10:05:00Z".parse()?)?;

    assert!(!later_refresh.needs_refresh(&order, subscription, Some(UserId(7))));

    Ok(())
}
