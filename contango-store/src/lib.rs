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

//! # Contango-Store
//! Typed gateway over the Contango persistent tables.
//!
//! Contains the `Quotes.EOD`, `Securities` and `Orders` row models, the conditional
//! `PENDING -> terminal` settle semantics that anchor executor idempotence, the change-stream
//! record types both workers are triggered by, and two interchangeable backends - an in-memory
//! store for tests and local runs, and a Redis store for deployment.

/// Errors generated by store backends.
pub mod error;

/// Change-stream record types carried by worker trigger events.
pub mod event;

/// `Orders` table rows: identifiers, status DAG, fills, and net position derivation.
pub mod order;

/// `Quotes.EOD` table rows.
pub mod quote;

/// `Securities` table rows.
pub mod security;

/// Store handler traits and the in-memory / Redis backends.
pub mod store;

pub use error::StoreError;
pub use order::{NewOrder, Order, OrderStatus, Trade, net_position};
pub use quote::{Quote, QuoteDate};
pub use security::{Security, SecurityKey};
pub use store::{
    LedgerHandler, OrderHandler, QuoteHandler, SecurityHandler, StoreHandler,
    in_memory::InMemoryStore, redis::RedisStore,
};
