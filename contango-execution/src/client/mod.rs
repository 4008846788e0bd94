use crate::{balance::Money, error::BrokerError};
use chrono::{DateTime, Utc};
use contango_instrument::{Side, symbol::BrokerId};
use contango_store::order::OrdType;
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::future::Future;

pub mod ig;
pub mod mock;

/// Opaque session tokens plus the account balance captured at login.
///
/// A `Session` is an explicit value passed to every authenticated broker call - one is
/// acquired per batch and shared read-only among dispatch tasks, so no broker client carries
/// latent mutable session state.
#[derive(Debug, Clone, Eq, PartialEq, Constructor)]
pub struct Session {
    pub cst: SmolStr,
    pub security_token: SmolStr,
    pub balance: Money,
}

/// Broker-listed market returned by a search.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Constructor)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    pub epic: SmolStr,
    pub instrument_name: SmolStr,
    pub instrument_type: SmolStr,
    pub expiry: SmolStr,

    /// Unknown payload fields, preserved for forward compatibility.
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// Execution time-in-force instruction sent with a position creation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeInForce {
    FillOrKill,
    ExecuteAndEliminate,
}

/// Request to open a position at the broker.
#[derive(Debug, Clone, Eq, PartialEq, Constructor)]
pub struct PositionRequest {
    pub epic: SmolStr,
    pub direction: Side,
    /// Broker display form of the contract month, eg/ `"NOV-17"`.
    pub expiry: SmolStr,
    pub order_type: OrdType,
    pub size: Decimal,
    pub time_in_force: TimeInForce,
    pub currency_code: SmolStr,
    pub stop_distance: Option<Decimal>,
}

/// Outcome of a position creation request.
///
/// A populated `error_code` means the broker accepted the request but rejected the deal; the
/// order is surfaced for human triage rather than settled.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub deal_reference: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<SmolStr>,
}

/// Open position reported by the broker, the source of fill confirmations.
#[derive(Debug, Clone, PartialEq, Constructor)]
pub struct OpenPosition {
    pub deal_reference: SmolStr,
    pub deal_id: SmolStr,
    pub created_date_utc: DateTime<Utc>,
    pub level: Decimal,
    pub size: Decimal,
    pub direction: Side,
    pub market: Market,
}

/// Abstract broker capability.
///
/// Transient failures on the read path (`login`, `search_markets`, `get_positions`) are
/// retried uniformly by the caller; `create_position` is a write and is never retried - the
/// store's conditional settle is the idempotence anchor, not broker-side dedup.
pub trait Broker
where
    Self: Clone + Send + Sync,
{
    const ID: BrokerId;

    /// Authenticate, yielding session tokens and the account balance.
    ///
    /// `None` covers transport errors, non-success responses and rejected credentials alike -
    /// all are logged, and `None` after retries aborts the batch.
    fn login(&self) -> impl Future<Output = Option<Session>> + Send;

    /// Best-effort session teardown - failures are logged and swallowed.
    fn logout(&self, session: &Session) -> impl Future<Output = ()> + Send;

    fn search_markets(
        &self,
        session: &Session,
        term: &str,
    ) -> impl Future<Output = Result<Vec<Market>, BrokerError>> + Send;

    fn create_position(
        &self,
        session: &Session,
        request: &PositionRequest,
    ) -> impl Future<Output = Result<Deal, BrokerError>> + Send;

    fn get_positions(
        &self,
        session: &Session,
    ) -> impl Future<Output = Result<Vec<OpenPosition>, BrokerError>> + Send;
}
