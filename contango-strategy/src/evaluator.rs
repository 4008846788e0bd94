use crate::{error::StrategyError, roll::RollSignal};
use chrono::Utc;
use contango_execution::risk::position_within_bound;
use contango_instrument::{
    Side,
    calendar::{front_month_symbol, vix_expiry_on_or_after},
    maturity::Maturity,
    symbol::{BrokerId, SymbolCode},
};
use contango_integration::retry::{RetryPolicy, retry_null};
use contango_store::{
    event::{StreamEvent, decode_quote_key},
    net_position,
    order::{
        BrokerRef, NewOrder, OrdType, Order, OrderDetails, StrategyTag, Trade, TradeReason,
    },
    quote::{Quote, QuoteDate},
    security::SecurityKey,
    store::StoreHandler,
};
use rust_decimal::Decimal;
use smol_str::SmolStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Symbol of the VIX spot index in the quotes table.
pub const VIX_SPOT: &str = "VIX";

/// Root symbol of the VIX futures contract.
pub const FUTURE_ROOT: &str = "VX";

/// Strategy evaluator parameters, sourced from configuration.
#[derive(Debug, Clone)]
pub struct RollConfig {
    /// Position size of a new entry.
    pub std_size: Decimal,

    /// Absolute roll threshold at or above which an entry is signalled.
    pub max_roll: Decimal,

    /// Optional protective stop attached to entries.
    pub stop_distance: Option<Decimal>,

    /// When set, orders are written pre-settled `FILLED` at the future's close and the
    /// executor's fill step never runs.
    pub back_test: bool,

    /// Strategy name stamped on every emitted order.
    pub strategy_name: SmolStr,
}

impl Default for RollConfig {
    fn default() -> Self {
        Self {
            std_size: Decimal::ONE,
            max_roll: Decimal::new(10, 2),
            stop_distance: None,
            back_test: false,
            strategy_name: SmolStr::new_static("VIX_ROLL"),
        }
    }
}

/// The VIX roll strategy evaluator.
///
/// Triggered per inserted quote; at most one evaluation takes effect per `(Date, Symbol)`
/// thanks to the idempotence ledger.
#[derive(Debug)]
pub struct RollEvaluator<S> {
    store: Arc<S>,
    config: RollConfig,
    retry_policy: RetryPolicy,
}

impl<S> RollEvaluator<S>
where
    S: StoreHandler,
{
    pub fn new(store: Arc<S>, config: RollConfig) -> Self {
        Self {
            store,
            config,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Evaluate every inserted quote in the batch, returning the orders created.
    pub async fn evaluate_batch(&self, event: &StreamEvent) -> Result<Vec<Order>, StrategyError> {
        let mut created = Vec::new();

        for record in &event.records {
            if !record.is_insert() {
                debug!(event_name = %record.event_name, "non-INSERT record is ignored");
                continue;
            }

            match decode_quote_key(&record.dynamodb.keys) {
                Ok((symbol, date)) => {
                    created.extend(self.evaluate_quote(&symbol, date).await?);
                }
                Err(error) => warn!(%error, "skipping undecodable quote record"),
            }
        }

        Ok(created)
    }

    /// The decision state machine for one quote insert.
    pub async fn evaluate_quote(
        &self,
        symbol: &SymbolCode,
        date: QuoteDate,
    ) -> Result<Vec<Order>, StrategyError> {
        let today = date.date();
        let front_future = front_month_symbol(FUTURE_ROOT, today);

        // Only the spot index and the front-month future trigger an evaluation.
        if symbol.as_str() != VIX_SPOT && symbol != &front_future {
            debug!(%symbol, "quote is neither VIX nor the front-month future - ignored");
            return Ok(Vec::new());
        }

        // Both closes must have arrived; the missing one will trigger its own event later.
        let Some(vix) = self.get_quote(&SymbolCode::new(VIX_SPOT), date).await else {
            info!(%date, "VIX close has not arrived yet - no-op");
            return Ok(Vec::new());
        };
        let Some(future) = self.get_quote(&front_future, date).await else {
            info!(%date, %front_future, "front future close has not arrived yet - no-op");
            return Ok(Vec::new());
        };

        let expiry = vix_expiry_on_or_after(today);
        let days_left = (expiry - today).num_days();
        if days_left <= 0 {
            info!(%date, %expiry, "contract expires today - no-op");
            return Ok(Vec::new());
        }

        let signal = RollSignal::compute(
            date,
            front_future.clone(),
            future.close,
            vix.close,
            days_left,
        );
        info!(
            %date,
            %front_future,
            roll = %signal.roll,
            days_left,
            "roll signal computed"
        );

        // Run-once-per-day guard: a present ledger line means this evaluation already
        // happened on another invocation.
        let line = signal.ledger_line();
        if self.store.ledger_has(&line)? {
            info!(%date, %front_future, "already evaluated - no-op");
            return Ok(Vec::new());
        }
        self.store.ledger_append(&line)?;

        let maturity = Maturity::from_date(expiry);
        let orders = self
            .get_orders(&SymbolCode::new(FUTURE_ROOT), BrokerId::Ig)
            .await
            .ok_or(StrategyError::OrdersUnavailable)?;
        let open_position = net_position(&orders, maturity);

        let mut created = Vec::new();

        // Close the book one day before expiry.
        if open_position != Decimal::ZERO && days_left == 1 {
            let side = if open_position > Decimal::ZERO {
                Side::Sell
            } else {
                Side::Buy
            };
            created.push(
                self.create_order(side, open_position.abs(), TradeReason::Close, None, maturity, &future)?,
            );
        }

        // Too close to expiry for fresh risk.
        if days_left <= 1 {
            return Ok(created);
        }

        // Entry: a roll at or beyond the threshold sells a rich future / buys a cheap one.
        if signal.roll.abs() >= self.config.max_roll {
            let side = if future.close - vix.close >= Decimal::ZERO {
                Side::Sell
            } else {
                Side::Buy
            };

            let Some(max_position) = self.max_position().await else {
                warn!("no security definition for the future root - entry skipped");
                return Ok(created);
            };

            if !position_within_bound(side, self.config.std_size, open_position, max_position) {
                info!(
                    %side,
                    %open_position,
                    %max_position,
                    "entry would breach MaxPosition - no-op"
                );
                return Ok(created);
            }

            created.push(self.create_order(
                side,
                self.config.std_size,
                TradeReason::Open,
                self.config.stop_distance,
                maturity,
                &future,
            )?);
        }

        Ok(created)
    }

    fn create_order(
        &self,
        side: Side,
        size: Decimal,
        reason: TradeReason,
        stop_distance: Option<Decimal>,
        maturity: Maturity,
        future: &Quote,
    ) -> Result<Order, StrategyError> {
        let fill = self.config.back_test.then(|| Trade {
            fill_time: Utc::now(),
            side,
            filled_size: size,
            price: future.close,
            broker: BrokerRef {
                name: SmolStr::new_static("BACKTEST"),
                ref_type: SmolStr::new_static("backTest"),
                reference: SmolStr::new_static("SIMULATED"),
            },
        });

        let order = self.store.create_order(NewOrder::new(
            SymbolCode::new(FUTURE_ROOT),
            BrokerId::Ig,
            maturity,
            SmolStr::new_static("FUTURE"),
            OrderDetails::new(side, size, OrdType::Market, stop_distance),
            StrategyTag::new(self.config.strategy_name.clone(), reason),
            fill,
        ))?;

        info!(
            order_id = %order.order_id,
            side = %order.order.side,
            size = %order.order.size,
            maturity = %order.maturity,
            reason = %order.strategy.reason,
            "order created"
        );
        Ok(order)
    }

    async fn get_quote(&self, symbol: &SymbolCode, date: QuoteDate) -> Option<Quote> {
        retry_null(self.retry_policy, "get_quote", || {
            let store = Arc::clone(&self.store);
            let symbol = symbol.clone();
            async move { store.get_quote(&symbol, date) }
        })
        .await
    }

    async fn get_orders(&self, symbol: &SymbolCode, broker: BrokerId) -> Option<Vec<Order>> {
        retry_null(self.retry_policy, "get_orders_by_symbol_broker", || {
            let store = Arc::clone(&self.store);
            let symbol = symbol.clone();
            let broker = broker.clone();
            async move { store.get_orders_by_symbol_broker(&symbol, &broker) }
        })
        .await
    }

    async fn max_position(&self) -> Option<Decimal> {
        let keys: Vec<SecurityKey> = vec![(SymbolCode::new(FUTURE_ROOT), BrokerId::Ig)];

        retry_null(self.retry_policy, "get_securities", || {
            let store = Arc::clone(&self.store);
            let keys = keys.clone();
            async move { store.get_securities(&keys) }
        })
        .await
        .and_then(|securities| securities.into_iter().next())
        .map(|security| security.risk.max_position)
    }
}
