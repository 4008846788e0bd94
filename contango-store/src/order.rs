use chrono::{DateTime, Utc};
use contango_instrument::{
    Side,
    maturity::Maturity,
    symbol::{BrokerId, SymbolCode},
};
use derive_more::{Constructor, Display, From};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, format_smolstr};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier of an [`Order`] row, generated at creation time.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
    Constructor,
)]
pub struct OrderId(pub Uuid);

impl OrderId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Order creation time, wire form epoch-seconds-as-string. Sort key of the `Orders` table.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct TransactionTime(SmolStr);

impl TransactionTime {
    pub fn from_datetime(time: DateTime<Utc>) -> Self {
        Self(format_smolstr!("{}", time.timestamp()))
    }

    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for TransactionTime {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

/// Lifecycle status of an [`Order`].
///
/// Transitions form a DAG with exactly three edges, all out of [`OrderStatus::Pending`]:
/// `PENDING -> FILLED`, `PENDING -> PART_FILLED`, `PENDING -> FAILED`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Filled,
    PartFilled,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Filled => "FILLED",
            OrderStatus::PartFilled => "PART_FILLED",
            OrderStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    /// Whether this status carries a fill - ie/ whether `Trade` must be populated.
    pub fn has_fill(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::PartFilled)
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(self, OrderStatus::Pending) && next.is_terminal()
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("invalid order status: {0}")]
pub struct ParseOrderStatusError(pub String);

impl FromStr for OrderStatus {
    type Err = ParseOrderStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PENDING" => Ok(OrderStatus::Pending),
            "FILLED" => Ok(OrderStatus::Filled),
            "PART_FILLED" => Ok(OrderStatus::PartFilled),
            "FAILED" => Ok(OrderStatus::Failed),
            other => Err(ParseOrderStatusError(other.to_string())),
        }
    }
}

/// Execution instruction type.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrdType {
    Market,
    Limit,
}

impl OrdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrdType::Market => "MARKET",
            OrdType::Limit => "LIMIT",
        }
    }
}

impl Display for OrdType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("invalid order type: {0}")]
pub struct ParseOrdTypeError(pub String);

impl FromStr for OrdType {
    type Err = ParseOrdTypeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "MARKET" => Ok(OrdType::Market),
            "LIMIT" => Ok(OrdType::Limit),
            other => Err(ParseOrdTypeError(other.to_string())),
        }
    }
}

/// Execution instruction of an [`Order`].
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
#[serde(rename_all = "PascalCase")]
pub struct OrderDetails {
    pub side: Side,
    pub size: Decimal,
    pub ord_type: OrdType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_distance: Option<Decimal>,
}

/// Broker-side reference of a fill.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
#[serde(rename_all = "PascalCase")]
pub struct BrokerRef {
    pub name: SmolStr,
    pub ref_type: SmolStr,
    #[serde(rename = "Ref")]
    pub reference: SmolStr,
}

/// Fill outcome of an [`Order`].
///
/// Populated if and only if the order reached `FILLED` or `PART_FILLED`.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
#[serde(rename_all = "PascalCase")]
pub struct Trade {
    pub fill_time: DateTime<Utc>,
    pub side: Side,
    pub filled_size: Decimal,
    pub price: Decimal,
    pub broker: BrokerRef,
}

/// Why the originating strategy emitted an [`Order`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeReason {
    Open,
    Close,
}

impl TradeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeReason::Open => "OPEN",
            TradeReason::Close => "CLOSE",
        }
    }
}

impl Display for TradeReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("invalid trade reason: {0}")]
pub struct ParseTradeReasonError(pub String);

impl FromStr for TradeReason {
    type Err = ParseTradeReasonError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "OPEN" => Ok(TradeReason::Open),
            "CLOSE" => Ok(TradeReason::Close),
            other => Err(ParseTradeReasonError(other.to_string())),
        }
    }
}

/// Strategy provenance of an [`Order`].
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
#[serde(rename_all = "PascalCase")]
pub struct StrategyTag {
    pub name: SmolStr,
    pub reason: TradeReason,
}

/// `Orders` table row, keyed `(OrderId, TransactionTime)`.
///
/// Created by the strategy evaluator (or an external actor), settled at most once by the
/// executor, never deleted.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
#[serde(rename_all = "PascalCase")]
pub struct Order {
    pub order_id: OrderId,
    pub transaction_time: TransactionTime,
    pub symbol: SymbolCode,
    pub broker: BrokerId,
    pub maturity: Maturity,
    pub product_type: SmolStr,
    pub status: OrderStatus,
    pub order: OrderDetails,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade: Option<Trade>,
    pub strategy: StrategyTag,
}

impl Order {
    /// `Trade` is populated exactly when the status carries a fill.
    pub fn trade_status_consistent(&self) -> bool {
        self.status.has_fill() == self.trade.is_some()
    }
}

/// Request to create an [`Order`] row.
///
/// The store generates `OrderId` and `TransactionTime`. Live orders are created `PENDING`;
/// back-test runs supply a pre-settled `fill`, short-circuiting the executor entirely.
#[derive(Debug, Clone, Eq, PartialEq, Constructor)]
pub struct NewOrder {
    pub symbol: SymbolCode,
    pub broker: BrokerId,
    pub maturity: Maturity,
    pub product_type: SmolStr,
    pub order: OrderDetails,
    pub strategy: StrategyTag,
    pub fill: Option<Trade>,
}

impl NewOrder {
    /// Materialise the row this request persists as.
    pub fn into_order(self, order_id: OrderId, transaction_time: TransactionTime) -> Order {
        let status = if self.fill.is_some() {
            OrderStatus::Filled
        } else {
            OrderStatus::Pending
        };

        Order {
            order_id,
            transaction_time,
            symbol: self.symbol,
            broker: self.broker,
            maturity: self.maturity,
            product_type: self.product_type,
            status,
            order: self.order,
            trade: self.fill,
            strategy: self.strategy,
        }
    }
}

/// Signed aggregate of filled sizes over the given orders at `maturity`, `BUY` positive.
///
/// Only `FILLED` and `PART_FILLED` orders contribute; the net position is derived, never
/// stored.
pub fn net_position<'a, Orders>(orders: Orders, maturity: Maturity) -> Decimal
where
    Orders: IntoIterator<Item = &'a Order>,
{
    orders
        .into_iter()
        .filter(|order| order.maturity == maturity && order.status.has_fill())
        .filter_map(|order| order.trade.as_ref())
        .map(|trade| match trade.side {
            Side::Buy => trade.filled_size,
            Side::Sell => -trade.filled_size,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fill(side: Side, size: Decimal) -> Trade {
        Trade::new(
            Utc::now(),
            side,
            size,
            dec!(12.05),
            BrokerRef::new("IG".into(), "dealId".into(), "DIAAAABBBCCC".into()),
        )
    }

    fn order(maturity: &str, status: OrderStatus, trade: Option<Trade>) -> Order {
        let side = trade.as_ref().map(|trade| trade.side).unwrap_or(Side::Buy);
        let size = trade
            .as_ref()
            .map(|trade| trade.filled_size)
            .unwrap_or(dec!(1));

        Order::new(
            OrderId::random(),
            TransactionTime::now(),
            "VX".into(),
            BrokerId::Ig,
            maturity.parse().unwrap(),
            "FUTURE".into(),
            status,
            OrderDetails::new(side, size, OrdType::Market, None),
            trade,
            StrategyTag::new("VIX_ROLL".into(), TradeReason::Open),
        )
    }

    #[test]
    fn test_status_transitions_form_the_settle_dag() {
        use OrderStatus::*;

        for terminal in [Filled, PartFilled, Failed] {
            assert!(Pending.can_transition_to(terminal));
        }

        // No edge re-opens an order, none leaves a terminal state
        assert!(!Pending.can_transition_to(Pending));
        for from in [Filled, PartFilled, Failed] {
            for to in [Pending, Filled, PartFilled, Failed] {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn test_status_wire_representation() {
        assert_eq!(serde_json::to_string(&OrderStatus::PartFilled).unwrap(), r#""PART_FILLED""#);
        assert_eq!("PART_FILLED".parse::<OrderStatus>().unwrap(), OrderStatus::PartFilled);
        assert_eq!(serde_json::to_string(&OrderStatus::Pending).unwrap(), r#""PENDING""#);
    }

    #[test]
    fn test_net_position_signs_and_filters() {
        let maturity = "201711".parse::<Maturity>().unwrap();
        let orders = vec![
            order("201711", OrderStatus::Filled, Some(fill(Side::Buy, dec!(3)))),
            order("201711", OrderStatus::PartFilled, Some(fill(Side::Sell, dec!(1)))),
            // Pending and failed orders never contribute
            order("201711", OrderStatus::Pending, None),
            order("201711", OrderStatus::Failed, None),
            // Other maturities never contribute
            order("201712", OrderStatus::Filled, Some(fill(Side::Buy, dec!(5)))),
        ];

        assert_eq!(net_position(&orders, maturity), dec!(2));
    }

    #[test]
    fn test_net_position_empty_is_flat() {
        let maturity = "201711".parse::<Maturity>().unwrap();
        let orders: Vec<Order> = Vec::new();
        assert_eq!(net_position(&orders, maturity), dec!(0));
    }

    #[test]
    fn test_new_order_materialises_pending_without_fill() {
        let new_order = NewOrder::new(
            "VX".into(),
            BrokerId::Ig,
            "201711".parse().unwrap(),
            "FUTURE".into(),
            OrderDetails::new(Side::Sell, dec!(2), OrdType::Market, None),
            StrategyTag::new("VIX_ROLL".into(), TradeReason::Close),
            None,
        );

        let order = new_order.into_order(OrderId::random(), TransactionTime::now());
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.trade.is_none());
        assert!(order.trade_status_consistent());
    }

    #[test]
    fn test_new_order_materialises_back_test_fill_as_filled() {
        let new_order = NewOrder::new(
            "VX".into(),
            BrokerId::Ig,
            "201711".parse().unwrap(),
            "FUTURE".into(),
            OrderDetails::new(Side::Buy, dec!(1), OrdType::Market, None),
            StrategyTag::new("VIX_ROLL".into(), TradeReason::Open),
            Some(fill(Side::Buy, dec!(1))),
        );

        let order = new_order.into_order(OrderId::random(), TransactionTime::now());
        assert_eq!(order.status, OrderStatus::Filled);
        assert!(order.trade_status_consistent());
    }
}
