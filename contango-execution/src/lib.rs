#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Contango-Execution
//! Order execution for the Contango control plane.
//!
//! Contains the abstract [`Broker`](client::Broker) capability (login, market search, position
//! creation, open-position queries) with its concrete IG adapter and a scriptable mock, the
//! pre-trade [`risk`] gate, and the [`scheduler`] that consumes inserted orders, validates and
//! risk-checks them, dispatches the survivors concurrently, and settles the fills back through
//! the store.

/// Account balance captured at broker login.
pub mod balance;

/// [`Broker`](client::Broker) capability trait and its implementations.
pub mod client;

/// All errors generated by broker integrations.
pub mod error;

/// Batch execution report surfaced to the notifier collaborator.
pub mod report;

/// Per-order pre-trade risk checks.
pub mod risk;

/// Single-batch executor pipeline: validate, risk-check, dispatch, settle.
pub mod scheduler;

/// Inner-join of inserted orders to their trading-enabled security definitions.
pub mod validate;

pub use balance::Money;
pub use client::{Broker, Deal, Market, OpenPosition, PositionRequest, Session, TimeInForce};
pub use error::BrokerError;
pub use report::{DispatchOutcome, ExecutionReport};
pub use risk::{RiskApproved, RiskGate, RiskRefused, RiskVeto};
pub use scheduler::{Scheduler, SchedulerError};
pub use validate::{InvalidOrder, InvalidReason, ValidatedOrder};
