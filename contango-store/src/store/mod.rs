use crate::{
    error::StoreError,
    order::{NewOrder, Order, OrderId, OrderStatus, Trade, TransactionTime},
    quote::{Quote, QuoteDate},
    security::{Security, SecurityKey},
};
use contango_instrument::symbol::{BrokerId, SymbolCode};

pub mod in_memory;
pub mod redis;

/// Read access to the `Quotes.EOD` table.
///
/// Transient backend failures manifest as `None` and are retried uniformly by the caller, so
/// a missing quote and an unreachable backend are indistinguishable by design - both mean
/// "not available yet".
pub trait QuoteHandler: Send + Sync {
    fn get_quote(&self, symbol: &SymbolCode, date: QuoteDate) -> Option<Quote>;
}

/// Read access to the `Securities` table.
pub trait SecurityHandler: Send + Sync {
    /// Fetch the union of the requested `(Symbol, Broker)` keys in a single scan.
    ///
    /// Keys without a row are simply absent from the result.
    fn get_securities(&self, keys: &[SecurityKey]) -> Option<Vec<Security>>;
}

/// Access to the `Orders` table.
pub trait OrderHandler: Send + Sync {
    fn get_orders_by_symbol_broker(
        &self,
        symbol: &SymbolCode,
        broker: &BrokerId,
    ) -> Option<Vec<Order>>;

    /// Persist a new order row, generating `OrderId` and `TransactionTime`.
    ///
    /// Returns the row as written.
    fn create_order(&self, new_order: NewOrder) -> Result<Order, StoreError>;

    /// Conditional update out of `PENDING`: takes effect iff the stored status is still
    /// `PENDING`. Returns whether the update took effect - `false` means another worker
    /// already settled the order, which is not an error.
    fn settle_order(
        &self,
        order_id: OrderId,
        transaction_time: &TransactionTime,
        status: OrderStatus,
        trade: Option<Trade>,
    ) -> Result<bool, StoreError>;
}

/// Access to the strategy idempotence ledger: an append-only text artefact with one line per
/// evaluated `(date, front-month, roll)` tuple.
pub trait LedgerHandler: Send + Sync {
    fn ledger_has(&self, line: &str) -> Result<bool, StoreError>;

    fn ledger_append(&self, line: &str) -> Result<(), StoreError>;
}

/// Umbrella trait for a complete store gateway.
pub trait StoreHandler: QuoteHandler + SecurityHandler + OrderHandler + LedgerHandler {}

impl<S> StoreHandler for S where S: QuoteHandler + SecurityHandler + OrderHandler + LedgerHandler {}

/// Reject settles that would violate the trade/status invariant before they reach a backend:
/// a fill-carrying status requires a `Trade`, `FAILED` forbids one, and the target must be
/// terminal.
pub(crate) fn validate_settle(
    order_id: OrderId,
    status: OrderStatus,
    trade: &Option<Trade>,
) -> Result<(), StoreError> {
    if !status.is_terminal() {
        return Err(StoreError::InvalidSettle {
            order_id,
            reason: "target status is not terminal",
        });
    }

    if status.has_fill() != trade.is_some() {
        return Err(StoreError::InvalidSettle {
            order_id,
            reason: "Trade must be populated exactly when status carries a fill",
        });
    }

    Ok(())
}
