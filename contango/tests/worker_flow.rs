//! Full control-plane flow: a quote insert drives the strategy to write an order, the order
//! insert drives the executor to fill it at the broker, and the resulting position is closed
//! the day before expiry.

use contango::{
    WorkerState,
    notifier::Notifier,
    workers::{executor::run_executor, strategy::run_strategy},
};
use contango_execution::{Money, Scheduler, client::Market, client::mock::MockBroker};
use contango_instrument::{Side, symbol::BrokerId};
use contango_integration::retry::RetryPolicy;
use contango_store::{
    InMemoryStore, Quote,
    event::StreamEvent,
    order::{Order, OrderStatus, TradeReason},
    security::{RiskLimits, Security, SecurityDescription},
};
use contango_strategy::{RollConfig, RollEvaluator};
use rust_decimal_macros::dec;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
struct CapturingNotifier(Arc<Mutex<Vec<(String, String)>>>);

impl Notifier for CapturingNotifier {
    fn notify(&self, subject: &str, html_body: &str) {
        self.0
            .lock()
            .unwrap()
            .push((subject.to_string(), html_body.to_string()));
    }
}

impl CapturingNotifier {
    fn bodies(&self) -> Vec<String> {
        self.0.lock().unwrap().iter().map(|(_, body)| body.clone()).collect()
    }
}

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

fn order_insert_event(order: &Order) -> StreamEvent {
    serde_json::from_value(serde_json::json!({
        "Records": [
            {
                "eventName": "INSERT",
                "dynamodb": {
                    "Keys": {
                        "OrderId": {"S": order.order_id.to_string()},
                        "TransactionTime": {"S": order.transaction_time.as_str()}
                    },
                    "NewImage": {
                        "OrderId": {"S": order.order_id.to_string()},
                        "TransactionTime": {"S": order.transaction_time.as_str()},
                        "Symbol": {"S": order.symbol.as_str()},
                        "Broker": {"S": order.broker.as_str()},
                        "Maturity": {"S": order.maturity.to_string()},
                        "ProductType": {"S": order.product_type.as_str()},
                        "Status": {"S": order.status.as_str()},
                        "Order": {"M": {
                            "Side": {"S": order.order.side.as_str()},
                            "Size": {"N": order.order.size.to_string()},
                            "OrdType": {"S": order.order.ord_type.as_str()}
                        }},
                        "Strategy": {"M": {
                            "Name": {"S": order.strategy.name.as_str()},
                            "Reason": {"S": order.strategy.reason.as_str()}
                        }}
                    }
                }
            }
        ]
    }))
    .unwrap()
}

#[tokio::test]
async fn test_quote_to_order_to_fill_to_close() {
    let store = InMemoryStore::new();
    store.insert_security(Security::new(
        "VX".into(),
        BrokerId::Ig,
        true,
        SecurityDescription::new("Volatility Index".into(), "FUTURES".into()),
        RiskLimits::new(dec!(0.25), dec!(100)),
    ));

    // 2017-06-01: contango roll of exactly 0.10 signals an entry
    store.insert_quote(Quote::new("VIX".into(), "20170601".parse().unwrap(), dec!(10.00)));
    store.insert_quote(Quote::new("VXM7".into(), "20170601".parse().unwrap(), dec!(12.00)));

    let evaluator = RollEvaluator::new(Arc::new(store.clone()), RollConfig::default())
        .with_retry_policy(RetryPolicy::immediate(1));

    let response = run_strategy(&quote_event("VIX", "20170601"), &evaluator).await;
    assert_eq!(response.state, WorkerState::Ok);

    let pending = store.orders();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].status, OrderStatus::Pending);
    assert_eq!(pending[0].order.side, Side::Sell);
    assert_eq!(pending[0].strategy.reason, TradeReason::Open);

    // The order insert now drives the executor
    let broker = MockBroker::new(Money::new(dec!(100000), "USD".into()))
        .with_market(Market::new(
            "CC.D.VX.UNC.IP".into(),
            "Volatility Index".into(),
            "FUTURES".into(),
            "JUN-17".into(),
            serde_json::Map::new(),
        ))
        .with_fill_level(dec!(12.05));

    let scheduler = Scheduler::new(broker.clone(), Arc::new(store.clone()))
        .with_retry_policy(RetryPolicy::immediate(1));
    let notifier = CapturingNotifier::default();

    let response = run_executor(&order_insert_event(&pending[0]), &scheduler, &notifier).await;
    assert_eq!(response.state, WorkerState::Ok);
    assert_eq!(broker.logouts(), 1);

    let filled = store.orders();
    assert_eq!(filled[0].status, OrderStatus::Filled);
    assert_eq!(filled[0].trade.as_ref().unwrap().price, dec!(12.05));

    let bodies = notifier.bodies();
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].contains("FILLED at 12.05"));

    // 2017-06-20, one day before the June expiry: the short position is flattened
    store.insert_quote(Quote::new("VIX".into(), "20170620".parse().unwrap(), dec!(11.00)));
    store.insert_quote(Quote::new("VXM7".into(), "20170620".parse().unwrap(), dec!(11.20)));

    let response = run_strategy(&quote_event("VXM7", "20170620"), &evaluator).await;
    assert_eq!(response.state, WorkerState::Ok);

    let orders = store.orders();
    assert_eq!(orders.len(), 2);
    let close = orders
        .iter()
        .find(|order| order.strategy.reason == TradeReason::Close)
        .expect("a closing order should have been created");
    assert_eq!(close.order.side, Side::Buy);
    assert_eq!(close.order.size, dec!(1));
    assert_eq!(close.maturity.to_string(), "201706");
    assert_eq!(close.status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_strategy_worker_is_idempotent_per_event() {
    let store = InMemoryStore::new();
    store.insert_security(Security::new(
        "VX".into(),
        BrokerId::Ig,
        true,
        SecurityDescription::new("Volatility Index".into(), "FUTURES".into()),
        RiskLimits::new(dec!(0.25), dec!(100)),
    ));
    store.insert_quote(Quote::new("VIX".into(), "20170601".parse().unwrap(), dec!(10.00)));
    store.insert_quote(Quote::new("VXM7".into(), "20170601".parse().unwrap(), dec!(12.00)));

    let evaluator = RollEvaluator::new(Arc::new(store.clone()), RollConfig::default())
        .with_retry_policy(RetryPolicy::immediate(1));

    // Identical invocations, eg/ a redelivered change event
    let event = quote_event("VIX", "20170601");
    assert_eq!(run_strategy(&event, &evaluator).await.state, WorkerState::Ok);
    assert_eq!(run_strategy(&event, &evaluator).await.state, WorkerState::Ok);

    assert_eq!(store.orders().len(), 1);
}
