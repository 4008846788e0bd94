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

//! # Contango-Integration
//! Low-level I/O integration utilities shared by every outbound-calling Contango component.
//!
//! Contains the typed [`RestClient`](http::RestClient) plumbing used to integrate broker REST
//! APIs, and the uniform transient-failure [`retry`] policy applied to all read-path I/O.

/// All HTTP integration errors generated in `contango-integration`.
pub mod error;

/// Configurable [`RestClient`](http::RestClient) capable of executing typed
/// [`RestRequest`](http::RestRequest)s.
pub mod http;

/// Bounded exponential backoff retry of transiently failing operations.
pub mod retry;
