use crate::{
    error::StoreError,
    order::{NewOrder, Order, OrderId, OrderStatus, Trade, TransactionTime},
    quote::{Quote, QuoteDate},
    security::{Security, SecurityKey},
    store::{LedgerHandler, OrderHandler, QuoteHandler, SecurityHandler, validate_settle},
};
use contango_instrument::symbol::{BrokerId, SymbolCode};
use redis::{Commands, Connection, Script};
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

/// Atomic conditional settle: transition the order hash out of `PENDING` iff it is still
/// `PENDING` and the sort key matches. Returns 1 on effect, 0 when already terminal, -1 when
/// the row is missing.
const SETTLE_SCRIPT: &str = r#"
local status = redis.call('HGET', KEYS[1], 'status')
if not status then return -1 end
if status ~= ARGV[1] then return 0 end
if redis.call('HGET', KEYS[1], 'transaction_time') ~= ARGV[2] then return -1 end
redis.call('HSET', KEYS[1], 'status', ARGV[3], 'trade', ARGV[4])
return 1
"#;

/// Names of the persistent tables, supplied via configuration.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TableNames {
    pub quotes: String,
    pub securities: String,
    pub orders: String,
}

/// Redis backed store used in deployment.
///
/// Rows are JSON strings under `{table}:{key…}` keys; orders are hashes so the settle script
/// can check-and-set the status field atomically; per-table index sets support the scans.
pub struct RedisStore {
    client: redis::Client,
    tables: TableNames,
    ledger_key: String,
    settle_script: Script,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("tables", &self.tables)
            .field("ledger_key", &self.ledger_key)
            .finish()
    }
}

impl RedisStore {
    /// Construct a store over the given Redis endpoint.
    ///
    /// `ledger_folder` / `ledger_file` name the idempotence ledger object, eg/
    /// `debug/vix_roll.csv`.
    pub fn new(
        uri: &str,
        tables: TableNames,
        ledger_folder: &str,
        ledger_file: &str,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            client: redis::Client::open(uri).map_err(StoreError::from)?,
            tables,
            ledger_key: format!("{ledger_folder}/{ledger_file}"),
            settle_script: Script::new(SETTLE_SCRIPT),
        })
    }

    fn connection(&self) -> Result<Connection, StoreError> {
        self.client.get_connection().map_err(StoreError::from)
    }

    fn quote_key(&self, symbol: &SymbolCode, date: QuoteDate) -> String {
        format!("{}:{}:{}", self.tables.quotes, symbol, date)
    }

    fn security_key(&self, (symbol, broker): &SecurityKey) -> String {
        format!("{}:{}:{}", self.tables.securities, symbol, broker)
    }

    fn order_key(&self, order_id: OrderId) -> String {
        format!("{}:{}", self.tables.orders, order_id)
    }

    fn order_index_key(&self, symbol: &SymbolCode, broker: &BrokerId) -> String {
        format!("{}:index:{}:{}", self.tables.orders, symbol, broker)
    }

}

fn get_json<T>(connection: &mut Connection, key: &str) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
{
    let payload: Option<String> = connection.get(key)?;
    payload
        .map(|payload| serde_json::from_str(&payload).map_err(StoreError::from))
        .transpose()
}

fn read_order(connection: &mut Connection, key: &str) -> Result<Option<Order>, StoreError> {
    let fields: Vec<Option<String>> = connection.hget(key, &["body", "status", "trade"][..])?;

    let [Some(body), Some(status), trade] = fields.as_slice() else {
        return Ok(None);
    };

    let mut order: Order = serde_json::from_str(body)?;
    order.status = status
        .parse()
        .map_err(|_| StoreError::Backend(format!("corrupt status field on {key}")))?;
    order.trade = match trade.as_deref() {
        None | Some("") => None,
        Some(trade) => Some(serde_json::from_str(trade)?),
    };

    Ok(Some(order))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(StoreError::from)
}

impl QuoteHandler for RedisStore {
    fn get_quote(&self, symbol: &SymbolCode, date: QuoteDate) -> Option<Quote> {
        let key = self.quote_key(symbol, date);
        let mut connection = match self.connection() {
            Ok(connection) => connection,
            Err(error) => {
                warn!(%key, %error, "get_quote failed");
                return None;
            }
        };

        match get_json(&mut connection, &key) {
            Ok(quote) => quote,
            Err(error) => {
                warn!(%key, %error, "get_quote failed");
                None
            }
        }
    }
}

impl SecurityHandler for RedisStore {
    fn get_securities(&self, keys: &[SecurityKey]) -> Option<Vec<Security>> {
        let mut connection = match self.connection() {
            Ok(connection) => connection,
            Err(error) => {
                warn!(%error, "get_securities failed");
                return None;
            }
        };

        let mut securities = Vec::with_capacity(keys.len());
        for key in keys {
            let key = self.security_key(key);
            match get_json::<Security>(&mut connection, &key) {
                Ok(Some(security)) => securities.push(security),
                Ok(None) => {}
                Err(error) => {
                    warn!(%key, %error, "get_securities failed");
                    return None;
                }
            }
        }

        Some(securities)
    }
}

impl OrderHandler for RedisStore {
    fn get_orders_by_symbol_broker(
        &self,
        symbol: &SymbolCode,
        broker: &BrokerId,
    ) -> Option<Vec<Order>> {
        let index_key = self.order_index_key(symbol, broker);
        let mut connection = match self.connection() {
            Ok(connection) => connection,
            Err(error) => {
                warn!(%index_key, %error, "get_orders_by_symbol_broker failed");
                return None;
            }
        };

        let keys: Vec<String> = match connection.smembers(&index_key) {
            Ok(keys) => keys,
            Err(error) => {
                warn!(%index_key, %error, "get_orders_by_symbol_broker failed");
                return None;
            }
        };

        let mut orders = Vec::with_capacity(keys.len());
        for key in keys {
            match read_order(&mut connection, &key) {
                Ok(Some(order)) => orders.push(order),
                // Index members without a row were trimmed out-of-band
                Ok(None) => {}
                Err(error) => {
                    warn!(%key, %error, "get_orders_by_symbol_broker failed");
                    return None;
                }
            }
        }

        orders.sort_by(|a, b| a.transaction_time.cmp(&b.transaction_time));
        Some(orders)
    }

    fn create_order(&self, new_order: NewOrder) -> Result<Order, StoreError> {
        let order = new_order.into_order(OrderId::random(), TransactionTime::now());
        let key = self.order_key(order.order_id);
        let index_key = self.order_index_key(&order.symbol, &order.broker);

        // The body holds the row as created; status and trade live in their own fields so
        // the settle script can check-and-set without rewriting the body.
        let trade_json = order
            .trade
            .as_ref()
            .map(to_json)
            .transpose()?
            .unwrap_or_default();

        let mut connection = self.connection()?;
        redis::pipe()
            .atomic()
            .hset_multiple(
                &key,
                &[
                    ("body", to_json(&order)?),
                    ("status", order.status.as_str().to_string()),
                    ("trade", trade_json),
                    ("transaction_time", order.transaction_time.as_str().to_string()),
                ],
            )
            .sadd(&index_key, &key)
            .query::<()>(&mut connection)?;

        Ok(order)
    }

    fn settle_order(
        &self,
        order_id: OrderId,
        transaction_time: &TransactionTime,
        status: OrderStatus,
        trade: Option<Trade>,
    ) -> Result<bool, StoreError> {
        validate_settle(order_id, status, &trade)?;

        let key = self.order_key(order_id);
        let trade_json = trade.as_ref().map(to_json).transpose()?.unwrap_or_default();

        let mut connection = self.connection()?;
        let effect: i64 = self
            .settle_script
            .key(&key)
            .arg(OrderStatus::Pending.as_str())
            .arg(transaction_time.as_str())
            .arg(status.as_str())
            .arg(trade_json)
            .invoke(&mut connection)?;

        match effect {
            1 => Ok(true),
            0 => Ok(false),
            _ => Err(StoreError::OrderNotFound(order_id)),
        }
    }
}

impl LedgerHandler for RedisStore {
    fn ledger_has(&self, line: &str) -> Result<bool, StoreError> {
        let mut connection = self.connection()?;
        let ledger: Option<String> = connection.get(&self.ledger_key)?;
        Ok(ledger.is_some_and(|ledger| ledger.contains(line)))
    }

    fn ledger_append(&self, line: &str) -> Result<(), StoreError> {
        let mut connection = self.connection()?;
        connection.append::<_, _, ()>(&self.ledger_key, line)?;
        Ok(())
    }
}
