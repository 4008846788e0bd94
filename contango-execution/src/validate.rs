use contango_instrument::symbol::{BrokerId, SymbolCode};
use contango_store::{
    order::{Order, OrderId, OrderStatus},
    security::Security,
};
use rust_decimal::Decimal;
use smol_str::SmolStr;
use thiserror::Error;

/// Order inner-joined with its trading-enabled security definition, carrying everything the
/// risk gate and dispatch need: broker display maturity, market identification, risk limits.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOrder {
    pub order: Order,
    pub instrument_name: SmolStr,
    pub market_group: SmolStr,
    pub risk_factor: Decimal,
    pub max_position: Decimal,
    pub trading_enabled: bool,
    /// Broker display form of the order maturity, eg/ `"NOV-17"`.
    pub expiry: SmolStr,
}

/// Order rejected before dispatch. Surfaced in the batch report; no store write occurs.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidOrder {
    pub order_id: OrderId,
    pub symbol: SymbolCode,
    pub broker: BrokerId,
    pub reason: InvalidReason,
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum InvalidReason {
    #[error("no security definition found")]
    SecurityMissing,

    #[error("security is not enabled for trading")]
    TradingDisabled,

    #[error("no adapter configured for broker {0}")]
    UnsupportedBroker(BrokerId),

    #[error("order is not PENDING")]
    NotPending,
}

impl InvalidOrder {
    pub fn from_order(order: &Order, reason: InvalidReason) -> Self {
        Self {
            order_id: order.order_id,
            symbol: order.symbol.clone(),
            broker: order.broker.clone(),
            reason,
        }
    }
}

/// Split a batch into orders this executor can dispatch and ones it cannot.
///
/// An order survives iff it is still `PENDING`, addressed to `broker`, and joins to a
/// trading-enabled security on `(Symbol, Broker)`.
pub fn validate_orders(
    orders: Vec<Order>,
    securities: &[Security],
    broker: &BrokerId,
) -> (Vec<ValidatedOrder>, Vec<InvalidOrder>) {
    let mut valid = Vec::with_capacity(orders.len());
    let mut invalid = Vec::new();

    for order in orders {
        if &order.broker != broker {
            let reason = InvalidReason::UnsupportedBroker(order.broker.clone());
            invalid.push(InvalidOrder::from_order(&order, reason));
            continue;
        }

        if order.status != OrderStatus::Pending {
            invalid.push(InvalidOrder::from_order(&order, InvalidReason::NotPending));
            continue;
        }

        let Some(security) = securities
            .iter()
            .find(|security| security.symbol == order.symbol && &security.broker == broker)
        else {
            invalid.push(InvalidOrder::from_order(
                &order,
                InvalidReason::SecurityMissing,
            ));
            continue;
        };

        if !security.trading_enabled {
            invalid.push(InvalidOrder::from_order(
                &order,
                InvalidReason::TradingDisabled,
            ));
            continue;
        }

        let expiry = order.maturity.broker_expiry();
        valid.push(ValidatedOrder {
            order,
            instrument_name: security.description.name.clone(),
            market_group: security.description.market_group.clone(),
            risk_factor: security.risk.risk_factor,
            max_position: security.risk.max_position,
            trading_enabled: security.trading_enabled,
            expiry,
        });
    }

    (valid, invalid)
}
