use chrono::Utc;
use contango_instrument::{Side, symbol::BrokerId};
use contango_integration::retry::RetryPolicy;
use contango_store::{
    InMemoryStore, Quote,
    event::StreamEvent,
    order::{
        BrokerRef, OrdType, Order, OrderDetails, OrderId, OrderStatus, StrategyTag, Trade,
        TradeReason, TransactionTime,
    },
    security::{RiskLimits, Security, SecurityDescription},
    store::LedgerHandler,
};
use contango_strategy::{RollConfig, RollEvaluator};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn quote_event(symbol: &str, date: &str) -> StreamEvent {
    serde_json::from_value(serde_json::json!({
        "Records": [
            {
                "eventName": "INSERT",
                "dynamodb": {
                    "Keys": {
                        "Symbol": {"S": symbol},
                        "Date": {"S": date}
                    },
                    "NewImage": {
                        "Symbol": {"S": symbol},
                        "Date": {"S": date}
                    }
                }
            }
        ]
    }))
    .unwrap()
}

fn seed_quotes(store: &InMemoryStore, date: &str, vix_close: Decimal, future: &str, future_close: Decimal) {
    store.insert_quote(Quote::new("VIX".into(), date.parse().unwrap(), vix_close));
    store.insert_quote(Quote::new(future.into(), date.parse().unwrap(), future_close));
}

fn seed_security(store: &InMemoryStore, max_position: Decimal) {
    store.insert_security(Security::new(
        "VX".into(),
        BrokerId::Ig,
        true,
        SecurityDescription::new("Volatility Index".into(), "FUTURES".into()),
        RiskLimits::new(dec!(0.25), max_position),
    ));
}

fn seed_filled_position(store: &InMemoryStore, maturity: &str, side: Side, size: Decimal) {
    store.insert_order(Order::new(
        OrderId::random(),
        TransactionTime::now(),
        "VX".into(),
        BrokerId::Ig,
        maturity.parse().unwrap(),
        "FUTURE".into(),
        OrderStatus::Filled,
        OrderDetails::new(side, size, OrdType::Market, None),
        Some(Trade::new(
            Utc::now(),
            side,
            size,
            dec!(11.80),
            BrokerRef::new("IG".into(), "dealId".into(), "DIAAAA111".into()),
        )),
        StrategyTag::new("VIX_ROLL".into(), TradeReason::Open),
    ));
}

fn evaluator(store: &InMemoryStore, config: RollConfig) -> RollEvaluator<InMemoryStore> {
    RollEvaluator::new(Arc::new(store.clone()), config).with_retry_policy(RetryPolicy::immediate(1))
}

#[tokio::test]
async fn test_close_one_day_before_expiry() {
    let store = InMemoryStore::new();
    // 2017-11-14 is one day before the November expiry (2017-11-15)
    seed_quotes(&store, "20171114", dec!(11.25), "VXX7", dec!(11.70));
    seed_security(&store, dec!(100));
    seed_filled_position(&store, "201711", Side::Buy, dec!(2));

    let created = evaluator(&store, RollConfig::default())
        .evaluate_batch(&quote_event("VIX", "20171114"))
        .await
        .unwrap();

    assert_eq!(created.len(), 1);
    let close = &created[0];
    assert_eq!(close.order.side, Side::Sell);
    assert_eq!(close.order.size, dec!(2));
    assert_eq!(close.strategy.reason, TradeReason::Close);
    assert_eq!(close.maturity.to_string(), "201711");
    assert_eq!(close.status, OrderStatus::Pending);
    assert!(close.order.stop_distance.is_none());
}

#[tokio::test]
async fn test_entry_on_contango_sells_the_future() {
    let store = InMemoryStore::new();
    // 2017-06-01: 20 days to the June expiry; roll = (12 - 10) / 20 = 0.10
    seed_quotes(&store, "20170601", dec!(10.00), "VXM7", dec!(12.00));
    seed_security(&store, dec!(100));

    let config = RollConfig {
        std_size: dec!(5),
        ..RollConfig::default()
    };
    let created = evaluator(&store, config)
        .evaluate_batch(&quote_event("VXM7", "20170601"))
        .await
        .unwrap();

    assert_eq!(created.len(), 1);
    let open = &created[0];
    assert_eq!(open.order.side, Side::Sell);
    assert_eq!(open.order.size, dec!(5));
    assert_eq!(open.strategy.reason, TradeReason::Open);
    assert_eq!(open.maturity.to_string(), "201706");
}

#[tokio::test]
async fn test_entry_on_backwardation_buys_the_future() {
    let store = InMemoryStore::new();
    // roll = (13 - 15) / 20 = -0.10
    seed_quotes(&store, "20170601", dec!(15.00), "VXM7", dec!(13.00));
    seed_security(&store, dec!(100));

    let created = evaluator(&store, RollConfig::default())
        .evaluate_batch(&quote_event("VIX", "20170601"))
        .await
        .unwrap();

    assert_eq!(created.len(), 1);
    assert_eq!(created[0].order.side, Side::Buy);
    assert_eq!(created[0].strategy.reason, TradeReason::Open);
}

#[tokio::test]
async fn test_sub_threshold_roll_is_a_no_op() {
    let store = InMemoryStore::new();
    // roll = (11 - 10) / 20 = 0.05 < 0.10
    seed_quotes(&store, "20170601", dec!(10.00), "VXM7", dec!(11.00));
    seed_security(&store, dec!(100));

    let created = evaluator(&store, RollConfig::default())
        .evaluate_batch(&quote_event("VIX", "20170601"))
        .await
        .unwrap();

    assert!(created.is_empty());
    assert!(store.orders().is_empty());
    // The evaluation itself is still recorded
    assert!(store.ledger().contains("20170601,VXM7,11.00,10.00,20,0.05"));
}

#[tokio::test]
async fn test_identical_rerun_creates_exactly_one_order() {
    let store = InMemoryStore::new();
    seed_quotes(&store, "20170601", dec!(10.00), "VXM7", dec!(12.00));
    seed_security(&store, dec!(100));

    let evaluator = evaluator(&store, RollConfig::default());
    let event = quote_event("VIX", "20170601");

    let first = evaluator.evaluate_batch(&event).await.unwrap();
    let second = evaluator.evaluate_batch(&event).await.unwrap();

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
    assert_eq!(store.orders().len(), 1);
    assert_eq!(
        store.ledger().matches("20170601,VXM7,12.00,10.00,20,0.10").count(),
        1
    );
}

#[tokio::test]
async fn test_entry_skipped_when_position_bound_would_be_breached() {
    let store = InMemoryStore::new();
    seed_quotes(&store, "20170601", dec!(10.00), "VXM7", dec!(12.00));
    seed_security(&store, dec!(2));
    // Already short 2 with MaxPosition 2: selling any more would breach the bound
    seed_filled_position(&store, "201706", Side::Sell, dec!(2));

    let created = evaluator(&store, RollConfig::default())
        .evaluate_batch(&quote_event("VIX", "20170601"))
        .await
        .unwrap();

    assert!(created.is_empty());
    // Only the seeded position row exists
    assert_eq!(store.orders().len(), 1);
}

#[tokio::test]
async fn test_unrelated_and_off_month_symbols_are_ignored() {
    let store = InMemoryStore::new();
    seed_quotes(&store, "20170601", dec!(10.00), "VXM7", dec!(12.00));
    seed_security(&store, dec!(100));

    let evaluator = evaluator(&store, RollConfig::default());

    // Gold is not our market; VXZ7 is not the June front month
    for symbol in ["GC", "VXZ7"] {
        let created = evaluator
            .evaluate_batch(&quote_event(symbol, "20170601"))
            .await
            .unwrap();
        assert!(created.is_empty());
    }
    assert!(store.orders().is_empty());
}

#[tokio::test]
async fn test_missing_future_close_is_a_no_op() {
    let store = InMemoryStore::new();
    store.insert_quote(Quote::new("VIX".into(), "20170601".parse().unwrap(), dec!(10.00)));
    seed_security(&store, dec!(100));

    let created = evaluator(&store, RollConfig::default())
        .evaluate_batch(&quote_event("VIX", "20170601"))
        .await
        .unwrap();

    assert!(created.is_empty());
    assert!(store.ledger().is_empty());
}

#[tokio::test]
async fn test_expiry_day_takes_no_action() {
    let store = InMemoryStore::new();
    // 2017-11-15 is the November expiry itself
    seed_quotes(&store, "20171115", dec!(11.25), "VXX7", dec!(11.30));
    seed_security(&store, dec!(100));
    seed_filled_position(&store, "201711", Side::Buy, dec!(2));

    let created = evaluator(&store, RollConfig::default())
        .evaluate_batch(&quote_event("VIX", "20171115"))
        .await
        .unwrap();

    assert!(created.is_empty());
    assert_eq!(store.orders().len(), 1);
}

#[tokio::test]
async fn test_back_test_orders_are_pre_settled_at_the_future_close() {
    let store = InMemoryStore::new();
    seed_quotes(&store, "20170601", dec!(10.00), "VXM7", dec!(12.00));
    seed_security(&store, dec!(100));

    let config = RollConfig {
        back_test: true,
        ..RollConfig::default()
    };
    let created = evaluator(&store, config)
        .evaluate_batch(&quote_event("VIX", "20170601"))
        .await
        .unwrap();

    assert_eq!(created.len(), 1);
    let order = &created[0];
    assert_eq!(order.status, OrderStatus::Filled);
    let trade = order.trade.as_ref().unwrap();
    assert_eq!(trade.price, dec!(12.00));
    assert_eq!(trade.filled_size, order.order.size);
}

#[tokio::test]
async fn test_stop_distance_rides_on_entries_only() {
    let store = InMemoryStore::new();
    seed_quotes(&store, "20170601", dec!(10.00), "VXM7", dec!(12.00));
    seed_security(&store, dec!(100));

    let config = RollConfig {
        stop_distance: Some(dec!(15)),
        ..RollConfig::default()
    };
    let created = evaluator(&store, config)
        .evaluate_batch(&quote_event("VIX", "20170601"))
        .await
        .unwrap();

    assert_eq!(created[0].order.stop_distance, Some(dec!(15)));
}

#[tokio::test]
async fn test_ledger_guard_blocks_even_without_orders_table_access() {
    let store = InMemoryStore::new();
    seed_quotes(&store, "20170601", dec!(10.00), "VXM7", dec!(12.00));
    seed_security(&store, dec!(100));

    // A previous run already recorded this evaluation
    store
        .ledger_append("20170601,VXM7,12.00,10.00,20,0.10\n")
        .unwrap();

    let created = evaluator(&store, RollConfig::default())
        .evaluate_batch(&quote_event("VIX", "20170601"))
        .await
        .unwrap();

    assert!(created.is_empty());
    assert!(store.orders().is_empty());
}
