use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, StrExt};
use std::{
    borrow::Borrow,
    fmt::{Display, Formatter},
};

/// Contango `SmolStr` representation of a quoted or traded symbol.
///
/// Upper-case normalised so `"vix"`, `"Vix"` and `"VIX"` key the same rows.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
pub struct SymbolCode(SmolStr);

impl SymbolCode {
    pub fn new<S>(symbol: S) -> Self
    where
        S: Into<SmolStr>,
    {
        let symbol = symbol.into();
        if symbol.chars().any(char::is_lowercase) {
            Self(symbol.to_uppercase_smolstr())
        } else {
            Self(symbol)
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl<'de> Deserialize<'de> for SymbolCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        SmolStr::deserialize(deserializer).map(SymbolCode::new)
    }
}

impl From<&str> for SymbolCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<SmolStr> for SymbolCode {
    fn from(value: SmolStr) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for SymbolCode {
    fn borrow(&self) -> &str {
        self.0.borrow()
    }
}

impl AsRef<str> for SymbolCode {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl Display for SymbolCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a broker.
///
/// Orders routed to brokers the executor has no adapter for still appear in change events,
/// so unrecognised names are preserved as [`BrokerId::Other`] rather than rejected.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum BrokerId {
    Ig,
    Other(SmolStr),
}

impl BrokerId {
    pub fn new(name: &str) -> Self {
        match name {
            "IG" | "ig" | "Ig" => BrokerId::Ig,
            other => BrokerId::Other(other.to_uppercase_smolstr()),
        }
    }

    /// Wire representation used as the `Broker` attribute of securities and orders.
    pub fn as_str(&self) -> &str {
        match self {
            BrokerId::Ig => "IG",
            BrokerId::Other(name) => name.as_str(),
        }
    }
}

impl From<&str> for BrokerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Display for BrokerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for BrokerId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BrokerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        SmolStr::deserialize(deserializer).map(|name| BrokerId::new(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_code_normalises_to_upper_case() {
        assert_eq!(SymbolCode::new("vix"), SymbolCode::new("VIX"));
        assert_eq!(SymbolCode::new("VxX7").as_str(), "VXX7");
    }

    #[test]
    fn test_symbol_code_deserialise_normalises() {
        let symbol = serde_json::from_str::<SymbolCode>(r#""vx""#).unwrap();
        assert_eq!(symbol.as_str(), "VX");
    }

    #[test]
    fn test_broker_id_wire_representation() {
        assert_eq!(serde_json::to_string(&BrokerId::Ig).unwrap(), r#""IG""#);
        assert_eq!(serde_json::from_str::<BrokerId>(r#""IG""#).unwrap(), BrokerId::Ig);
    }

    #[test]
    fn test_broker_id_preserves_unrecognised_names() {
        let broker = serde_json::from_str::<BrokerId>(r#""SAXO""#).unwrap();
        assert_eq!(broker, BrokerId::Other("SAXO".into()));
        assert_eq!(broker.as_str(), "SAXO");
    }
}
