use crate::{
    error::StoreError,
    order::{NewOrder, Order, OrderId, OrderStatus, Trade, TransactionTime},
    quote::{Quote, QuoteDate},
    security::{Security, SecurityKey},
    store::{LedgerHandler, OrderHandler, QuoteHandler, SecurityHandler, validate_settle},
};
use contango_instrument::symbol::{BrokerId, SymbolCode};
use fnv::FnvHashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// In-memory store used by tests and local runs. **No durability guarantees.**
///
/// Cheap to clone - clones share the same tables.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    quotes: FnvHashMap<(SymbolCode, QuoteDate), Quote>,
    securities: FnvHashMap<SecurityKey, Security>,
    orders: FnvHashMap<OrderId, Order>,
    ledger: String,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a quote row, as the external end-of-day feed would.
    pub fn insert_quote(&self, quote: Quote) {
        self.inner
            .write()
            .quotes
            .insert((quote.symbol.clone(), quote.date), quote);
    }

    /// Seed a security master row, as the out-of-band onboarding process would.
    pub fn insert_security(&self, security: Security) {
        self.inner.write().securities.insert(security.key(), security);
    }

    /// Seed a fully-formed order row, bypassing id generation. Intended for tests.
    pub fn insert_order(&self, order: Order) {
        self.inner.write().orders.insert(order.order_id, order);
    }

    /// Snapshot of every order row, ordered by transaction time.
    pub fn orders(&self) -> Vec<Order> {
        let mut orders: Vec<_> = self.inner.read().orders.values().cloned().collect();
        orders.sort_by(|a, b| a.transaction_time.cmp(&b.transaction_time));
        orders
    }

    /// Current ledger text.
    pub fn ledger(&self) -> String {
        self.inner.read().ledger.clone()
    }
}

impl QuoteHandler for InMemoryStore {
    fn get_quote(&self, symbol: &SymbolCode, date: QuoteDate) -> Option<Quote> {
        self.inner
            .read()
            .quotes
            .get(&(symbol.clone(), date))
            .cloned()
    }
}

impl SecurityHandler for InMemoryStore {
    fn get_securities(&self, keys: &[SecurityKey]) -> Option<Vec<Security>> {
        let inner = self.inner.read();
        Some(
            inner
                .securities
                .values()
                .filter(|security| keys.contains(&security.key()))
                .cloned()
                .collect(),
        )
    }
}

impl OrderHandler for InMemoryStore {
    fn get_orders_by_symbol_broker(
        &self,
        symbol: &SymbolCode,
        broker: &BrokerId,
    ) -> Option<Vec<Order>> {
        let inner = self.inner.read();
        let mut orders: Vec<_> = inner
            .orders
            .values()
            .filter(|order| &order.symbol == symbol && &order.broker == broker)
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.transaction_time.cmp(&b.transaction_time));
        Some(orders)
    }

    fn create_order(&self, new_order: NewOrder) -> Result<Order, StoreError> {
        let order = new_order.into_order(OrderId::random(), TransactionTime::now());
        self.inner
            .write()
            .orders
            .insert(order.order_id, order.clone());
        Ok(order)
    }

    fn settle_order(
        &self,
        order_id: OrderId,
        transaction_time: &TransactionTime,
        status: OrderStatus,
        trade: Option<Trade>,
    ) -> Result<bool, StoreError> {
        validate_settle(order_id, status, &trade)?;

        let mut inner = self.inner.write();
        let order = inner
            .orders
            .get_mut(&order_id)
            .filter(|order| &order.transaction_time == transaction_time)
            .ok_or(StoreError::OrderNotFound(order_id))?;

        if !order.status.can_transition_to(status) {
            return Ok(false);
        }

        order.status = status;
        order.trade = trade;
        Ok(true)
    }
}

impl LedgerHandler for InMemoryStore {
    fn ledger_has(&self, line: &str) -> Result<bool, StoreError> {
        Ok(self.inner.read().ledger.contains(line))
    }

    fn ledger_append(&self, line: &str) -> Result<(), StoreError> {
        self.inner.write().ledger.push_str(line);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrdType, OrderDetails, BrokerRef, StrategyTag, TradeReason};
    use chrono::Utc;
    use contango_instrument::Side;
    use rust_decimal_macros::dec;

    fn new_order() -> NewOrder {
        NewOrder::new(
            "VX".into(),
            BrokerId::Ig,
            "201711".parse().unwrap(),
            "FUTURE".into(),
            OrderDetails::new(Side::Buy, dec!(2), OrdType::Market, None),
            StrategyTag::new("VIX_ROLL".into(), TradeReason::Open),
            None,
        )
    }

    fn trade() -> Trade {
        Trade::new(
            Utc::now(),
            Side::Buy,
            dec!(2),
            dec!(12.05),
            BrokerRef::new("IG".into(), "dealId".into(), "DIAAAABBBCCC".into()),
        )
    }

    #[test]
    fn test_create_then_settle_takes_effect_once() {
        let store = InMemoryStore::new();
        let order = store.create_order(new_order()).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);

        let settled = store
            .settle_order(
                order.order_id,
                &order.transaction_time,
                OrderStatus::Filled,
                Some(trade()),
            )
            .unwrap();
        assert!(settled);

        // Second settle finds the order already terminal and is ignored
        let settled_again = store
            .settle_order(
                order.order_id,
                &order.transaction_time,
                OrderStatus::Failed,
                None,
            )
            .unwrap();
        assert!(!settled_again);

        let stored = &store.orders()[0];
        assert_eq!(stored.status, OrderStatus::Filled);
        assert!(stored.trade.is_some());
    }

    #[test]
    fn test_concurrent_settles_collapse_to_one_effective_write() {
        let store = InMemoryStore::new();
        let order = store.create_order(new_order()).unwrap();

        let effects: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|attempt| {
                    let store = store.clone();
                    let order_id = order.order_id;
                    let transaction_time = order.transaction_time.clone();
                    scope.spawn(move || {
                        if attempt % 2 == 0 {
                            store
                                .settle_order(
                                    order_id,
                                    &transaction_time,
                                    OrderStatus::Filled,
                                    Some(trade()),
                                )
                                .unwrap()
                        } else {
                            store
                                .settle_order(
                                    order_id,
                                    &transaction_time,
                                    OrderStatus::Failed,
                                    None,
                                )
                                .unwrap()
                        }
                    })
                })
                .collect();

            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });

        // Exactly one settle takes effect, and the stored row is internally consistent
        assert_eq!(effects.iter().filter(|effect| **effect).count(), 1);
        let settled = &store.orders()[0];
        assert!(settled.status.is_terminal());
        assert!(settled.trade_status_consistent());
    }

    #[test]
    fn test_settle_rejects_inconsistent_trade() {
        let store = InMemoryStore::new();
        let order = store.create_order(new_order()).unwrap();

        // FILLED without a trade violates the data model
        let result = store.settle_order(
            order.order_id,
            &order.transaction_time,
            OrderStatus::Filled,
            None,
        );
        assert!(matches!(result, Err(StoreError::InvalidSettle { .. })));

        // FAILED with a trade does too
        let result = store.settle_order(
            order.order_id,
            &order.transaction_time,
            OrderStatus::Failed,
            Some(trade()),
        );
        assert!(matches!(result, Err(StoreError::InvalidSettle { .. })));
    }

    #[test]
    fn test_settle_unknown_order_is_an_error() {
        let store = InMemoryStore::new();
        let result = store.settle_order(
            OrderId::random(),
            &TransactionTime::now(),
            OrderStatus::Failed,
            None,
        );
        assert!(matches!(result, Err(StoreError::OrderNotFound(_))));
    }

    #[test]
    fn test_get_securities_filters_to_requested_keys() {
        let store = InMemoryStore::new();
        store.insert_security(Security::new(
            "VX".into(),
            BrokerId::Ig,
            true,
            crate::security::SecurityDescription::new("Volatility Index".into(), "Futures".into()),
            crate::security::RiskLimits::new(dec!(0.25), dec!(100)),
        ));
        store.insert_security(Security::new(
            "GC".into(),
            BrokerId::Ig,
            true,
            crate::security::SecurityDescription::new("Gold".into(), "Futures".into()),
            crate::security::RiskLimits::new(dec!(0.25), dec!(100)),
        ));

        let found = store
            .get_securities(&[("VX".into(), BrokerId::Ig), ("SI".into(), BrokerId::Ig)])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].symbol.as_str(), "VX");
    }

    #[test]
    fn test_ledger_append_then_has() {
        let store = InMemoryStore::new();
        let line = "20171114,VXX7,12.00,10.00,20,0.10\n";

        assert!(!store.ledger_has(line).unwrap());
        store.ledger_append(line).unwrap();
        assert!(store.ledger_has(line).unwrap());
        assert_eq!(store.ledger(), line);
    }
}
