use contango_instrument::symbol::{BrokerId, SymbolCode};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Primary key of a [`Security`] row.
pub type SecurityKey = (SymbolCode, BrokerId);

/// Security master row, keyed `(Symbol, Broker)`.
///
/// Mutated out-of-band by the instrument onboarding process; read-only to the control plane.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
#[serde(rename_all = "PascalCase")]
pub struct Security {
    pub symbol: SymbolCode,
    pub broker: BrokerId,
    pub trading_enabled: bool,
    pub description: SecurityDescription,
    pub risk: RiskLimits,
}

impl Security {
    pub fn key(&self) -> SecurityKey {
        (self.symbol.clone(), self.broker.clone())
    }
}

/// Broker-facing description of a security, used to disambiguate market search results.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
#[serde(rename_all = "PascalCase")]
pub struct SecurityDescription {
    pub name: SmolStr,
    pub market_group: SmolStr,
}

/// Pre-trade risk limits configured per security.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
#[serde(rename_all = "PascalCase")]
pub struct RiskLimits {
    /// Maximum fraction of the account balance a single order may consume, in `(0, 1]`.
    pub risk_factor: Decimal,

    /// Maximum order size, and the bound on the absolute net position.
    pub max_position: Decimal,
}
