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

//! # Contango-Instrument
//! Core Contango instrument data structures: order sides, broker identifiers, symbol codes,
//! contract maturities, and the deterministic VIX monthly expiry calendar.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Deterministic VIX monthly futures expiry calendar and front-month symbol derivation.
pub mod calendar;

/// Contract month ([`Maturity`](maturity::Maturity)) in internal `YYYYMM` form, with the
/// broker display form `MON-YY`.
pub mod maturity;

/// Symbol and broker identifiers.
///
/// eg/ `SymbolCode`, `BrokerId`.
pub mod symbol;

/// Side of a trade or position - Buy or Sell.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub enum Side {
    #[serde(rename = "BUY", alias = "buy", alias = "Buy")]
    Buy,
    #[serde(rename = "SELL", alias = "sell", alias = "Sell")]
    Sell,
}

impl Side {
    /// Wire representation used by the store and broker payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = ParseSideError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "BUY" | "buy" | "Buy" => Ok(Side::Buy),
            "SELL" | "sell" | "Sell" => Ok(Side::Sell),
            other => Err(ParseSideError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
#[error("invalid side: {0}")]
pub struct ParseSideError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_wire_representation() {
        assert_eq!(serde_json::to_string(&Side::Buy).unwrap(), r#""BUY""#);
        assert_eq!(serde_json::to_string(&Side::Sell).unwrap(), r#""SELL""#);
        assert_eq!(serde_json::from_str::<Side>(r#""SELL""#).unwrap(), Side::Sell);
    }
}
