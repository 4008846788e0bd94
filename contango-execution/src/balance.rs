use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Account balance reported by the broker at login, shared read-only across a batch.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize, Constructor)]
pub struct Money {
    pub amount: Decimal,
    pub ccy: SmolStr,
}
