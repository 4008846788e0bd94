use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, format_smolstr};
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};
use thiserror::Error;

/// Upper-case month abbreviations used in the broker display form of a [`Maturity`].
const MONTH_ABBREVIATIONS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Contract month of a futures contract.
///
/// Internal wire form is `YYYYMM` (eg/ `"201711"`); brokers display it as `MON-YY`
/// (eg/ `"NOV-17"`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Maturity {
    year: i32,
    month: u32,
}

impl Maturity {
    /// Construct from a calendar year and one-indexed month.
    ///
    /// Returns `None` if `month` is not in `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The [`Maturity`] of the month containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Broker display form, eg/ `"NOV-17"`.
    pub fn broker_expiry(&self) -> SmolStr {
        format_smolstr!(
            "{}-{:02}",
            MONTH_ABBREVIATIONS[(self.month - 1) as usize],
            self.year.rem_euclid(100)
        )
    }
}

impl Display for Maturity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("invalid YYYYMM maturity: {0}")]
pub struct ParseMaturityError(pub String);

impl FromStr for Maturity {
    type Err = ParseMaturityError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.len() != 6 || !value.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(ParseMaturityError(value.to_string()));
        }

        let (year, month) = value.split_at(4);
        let year = year.parse().map_err(|_| ParseMaturityError(value.to_string()))?;
        let month = month.parse().map_err(|_| ParseMaturityError(value.to_string()))?;

        Maturity::new(year, month).ok_or_else(|| ParseMaturityError(value.to_string()))
    }
}

impl Serialize for Maturity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Maturity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = SmolStr::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}
