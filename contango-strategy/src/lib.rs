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

//! # Contango-Strategy
//! The VIX roll strategy evaluator.
//!
//! Watches end-of-day quotes for the VIX spot index and the front-month VIX future, computes
//! the normalised roll `(F - S) / days_to_expiry`, and decides whether to open, hold, or
//! close a position - writing orders through the store for the executor to pick up. A
//! run-once-per-day idempotence ledger guarantees at-most-once effect per `(Date, Symbol)`.

/// All errors generated by the strategy evaluator.
pub mod error;

/// The per-quote-event decision state machine.
pub mod evaluator;

/// Roll signal computation and its ledger line form.
pub mod roll;

pub use error::StrategyError;
pub use evaluator::{RollConfig, RollEvaluator};
pub use roll::RollSignal;
