use chrono::NaiveDate;
use contango_instrument::symbol::SymbolCode;
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};
use thiserror::Error;

/// Trading date of an end-of-day quote, wire form `YYYYMMDD`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct QuoteDate(NaiveDate);

impl QuoteDate {
    const FORMAT: &'static str = "%Y%m%d";

    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl From<NaiveDate> for QuoteDate {
    fn from(value: NaiveDate) -> Self {
        Self(value)
    }
}

impl Display for QuoteDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("invalid YYYYMMDD quote date: {0}")]
pub struct ParseQuoteDateError(pub String);

impl FromStr for QuoteDate {
    type Err = ParseQuoteDateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(value, Self::FORMAT)
            .map(Self)
            .map_err(|_| ParseQuoteDateError(value.to_string()))
    }
}

impl Serialize for QuoteDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for QuoteDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = SmolStr::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// End-of-day quote row, keyed `(Symbol, Date)`. Immutable once written.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize, Constructor)]
#[serde(rename_all = "PascalCase")]
pub struct Quote {
    pub symbol: SymbolCode,
    pub date: QuoteDate,
    pub close: Decimal,
}
