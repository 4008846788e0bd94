use contango_execution::client::ig::IgConfig;
use contango_store::store::redis::TableNames;
use contango_strategy::RollConfig;
use rust_decimal::Decimal;
use smol_str::SmolStr;
use std::env;
use thiserror::Error;

/// Default Redis endpoint when `REDIS_URL` is not set.
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1/";

/// Table names used when the corresponding variables are not set.
const DEFAULT_QUOTES_TABLE: &str = "Quotes.EOD";
const DEFAULT_SECURITIES_TABLE: &str = "Securities";
const DEFAULT_ORDERS_TABLE: &str = "Orders";

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("environment variable {name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Email relay parameters handed to the notifier collaborator.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EmailParams {
    pub address: String,
    pub user: String,
    pub password: String,
    pub smtp_host: String,
}

/// Executor worker configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub ig: IgConfig,
    pub email: EmailParams,
    pub redis_url: String,
    pub tables: TableNames,
}

impl ExecutorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Missing required variables abort before any
    /// side effect.
    pub fn from_lookup<Lookup>(lookup: Lookup) -> Result<Self, ConfigError>
    where
        Lookup: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            ig: IgConfig {
                base_url: required(&lookup, "IG_URL")?,
                api_key: required(&lookup, "X_IG_API_KEY")?.into(),
                identifier: required(&lookup, "IDENTIFIER")?.into(),
                password: required(&lookup, "PASSWORD")?.into(),
            },
            email: EmailParams {
                address: required(&lookup, "EMAIL_ADDRESS")?,
                user: required(&lookup, "EMAIL_USER")?,
                password: required(&lookup, "EMAIL_PASSWORD")?,
                smtp_host: required(&lookup, "EMAIL_SMTP")?,
            },
            redis_url: lookup("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            tables: tables(&lookup, false)?,
        })
    }
}

/// Strategy worker configuration.
#[derive(Debug, Clone)]
pub struct StrategyWorkerConfig {
    pub tables: TableNames,
    pub debug_folder: String,
    pub roll_file: String,
    pub back_test: bool,
    pub std_size: Decimal,
    pub stop_distance: Option<Decimal>,
    pub max_roll: Decimal,
    pub redis_url: String,
}

impl StrategyWorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<Lookup>(lookup: Lookup) -> Result<Self, ConfigError>
    where
        Lookup: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            tables: tables(&lookup, true)?,
            debug_folder: required(&lookup, "DEBUG_FOLDER")?,
            roll_file: required(&lookup, "ROLL_FILE")?,
            back_test: parse_bool(&lookup, "BACK_TEST")?,
            std_size: parse_decimal(&required(&lookup, "STD_SIZE")?, "STD_SIZE")?,
            stop_distance: lookup("STOP_DISTANCE")
                .map(|value| parse_decimal(&value, "STOP_DISTANCE"))
                .transpose()?,
            max_roll: lookup("MAX_ROLL")
                .map(|value| parse_decimal(&value, "MAX_ROLL"))
                .transpose()?
                .unwrap_or_else(|| Decimal::new(10, 2)),
            redis_url: lookup("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
        })
    }

    /// Evaluator parameters derived from this configuration.
    pub fn roll_config(&self) -> RollConfig {
        RollConfig {
            std_size: self.std_size,
            max_roll: self.max_roll,
            stop_distance: self.stop_distance,
            back_test: self.back_test,
            strategy_name: SmolStr::new_static("VIX_ROLL"),
        }
    }
}

fn required<Lookup>(lookup: &Lookup, name: &'static str) -> Result<String, ConfigError>
where
    Lookup: Fn(&str) -> Option<String>,
{
    lookup(name).ok_or(ConfigError::Missing(name))
}

/// The strategy requires its table names explicitly; the executor falls back to the
/// deployment defaults.
fn tables<Lookup>(lookup: &Lookup, require: bool) -> Result<TableNames, ConfigError>
where
    Lookup: Fn(&str) -> Option<String>,
{
    let table = |name: &'static str, default: &str| -> Result<String, ConfigError> {
        match lookup(name) {
            Some(value) => Ok(value),
            None if require => Err(ConfigError::Missing(name)),
            None => Ok(default.to_string()),
        }
    };

    Ok(TableNames {
        quotes: table("QUOTES_TABLE", DEFAULT_QUOTES_TABLE)?,
        securities: table("SECURITIES_TABLE", DEFAULT_SECURITIES_TABLE)?,
        orders: table("ORDERS_TABLE", DEFAULT_ORDERS_TABLE)?,
    })
}

fn parse_bool<Lookup>(lookup: &Lookup, name: &'static str) -> Result<bool, ConfigError>
where
    Lookup: Fn(&str) -> Option<String>,
{
    let value = required(lookup, name)?;
    match value.as_str() {
        "True" | "true" => Ok(true),
        "False" | "false" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}

fn parse_decimal(value: &str, name: &'static str) -> Result<Decimal, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn strategy_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("SECURITIES_TABLE", "Securities"),
            ("ORDERS_TABLE", "Orders"),
            ("QUOTES_TABLE", "Quotes.EOD"),
            ("DEBUG_FOLDER", "debug"),
            ("ROLL_FILE", "vix_roll.csv"),
            ("BACK_TEST", "False"),
            ("STD_SIZE", "2"),
        ])
    }

    fn lookup(vars: &HashMap<&'static str, &'static str>) -> impl Fn(&str) -> Option<String> {
        let vars = vars.clone();
        move |name| vars.get(name).map(|value| value.to_string())
    }

    #[test]
    fn test_strategy_config_from_complete_environment() {
        let config = StrategyWorkerConfig::from_lookup(lookup(&strategy_vars())).unwrap();

        assert_eq!(config.std_size, dec!(2));
        assert!(!config.back_test);
        assert_eq!(config.stop_distance, None);
        // MaxRoll defaults to 0.10 when unset
        assert_eq!(config.max_roll, dec!(0.10));
        assert_eq!(config.tables.quotes, "Quotes.EOD");
        assert_eq!(config.roll_config().strategy_name, "VIX_ROLL");
    }

    #[test]
    fn test_strategy_config_missing_required_variable() {
        for missing in [
            "SECURITIES_TABLE",
            "ORDERS_TABLE",
            "QUOTES_TABLE",
            "DEBUG_FOLDER",
            "ROLL_FILE",
            "BACK_TEST",
            "STD_SIZE",
        ] {
            let mut vars = strategy_vars();
            vars.remove(missing);

            let error = StrategyWorkerConfig::from_lookup(lookup(&vars)).unwrap_err();
            assert_eq!(error, ConfigError::Missing(missing));
        }
    }

    #[test]
    fn test_strategy_config_rejects_malformed_values() {
        let mut vars = strategy_vars();
        vars.insert("BACK_TEST", "yes");
        assert!(matches!(
            StrategyWorkerConfig::from_lookup(lookup(&vars)).unwrap_err(),
            ConfigError::Invalid { name: "BACK_TEST", .. }
        ));

        let mut vars = strategy_vars();
        vars.insert("STD_SIZE", "two");
        assert!(matches!(
            StrategyWorkerConfig::from_lookup(lookup(&vars)).unwrap_err(),
            ConfigError::Invalid { name: "STD_SIZE", .. }
        ));
    }

    #[test]
    fn test_executor_config_from_complete_environment() {
        let vars = HashMap::from([
            ("IG_URL", "https://demo-api.ig.com/gateway/deal"),
            ("X_IG_API_KEY", "key"),
            ("IDENTIFIER", "user"),
            ("PASSWORD", "secret"),
            ("EMAIL_ADDRESS", "desk@example.com"),
            ("EMAIL_USER", "desk"),
            ("EMAIL_PASSWORD", "mail-secret"),
            ("EMAIL_SMTP", "smtp.example.com"),
        ]);

        let config = ExecutorConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.ig.base_url, "https://demo-api.ig.com/gateway/deal");
        assert_eq!(config.email.smtp_host, "smtp.example.com");
        // Executor table names fall back to the deployment defaults
        assert_eq!(config.tables.orders, "Orders");
        assert_eq!(config.redis_url, "redis://127.0.0.1/");
    }

    #[test]
    fn test_executor_config_missing_credentials() {
        let error = ExecutorConfig::from_lookup(|_| None).unwrap_err();
        assert_eq!(error, ConfigError::Missing("IG_URL"));
    }
}
