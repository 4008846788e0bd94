#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Contango
//! An automated futures-trading control plane built around two change-event-driven workers:
//! a **strategy evaluator** that watches end-of-day VIX quotes and decides whether to open,
//! hold, or close a position, and an **order executor** that validates newly persisted
//! orders against the security master and risk limits, submits them to the broker, and
//! durably records the fill outcome.
//!
//! This crate wires the pieces together: environment configuration, `tracing` setup, the
//! notifier collaborator, and the worker entry points themselves.

/// Environment-sourced configuration for both workers.
pub mod config;

/// Utilities to initialise `tracing` logging.
pub mod logging;

/// End-of-batch report delivery collaborator.
pub mod notifier;

/// Worker return shape: `{"State":"OK"}` or `{"State":"ERROR"}`.
pub mod response;

/// The two worker entry points.
pub mod workers;

pub use config::{ConfigError, ExecutorConfig, StrategyWorkerConfig};
pub use notifier::{LogNotifier, Notifier};
pub use response::{WorkerResponse, WorkerState};
