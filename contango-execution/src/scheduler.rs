use crate::{
    client::{Broker, OpenPosition, PositionRequest, TimeInForce},
    error::BrokerError,
    report::{DispatchOutcome, ExecutionReport},
    risk::RiskGate,
    validate::{InvalidOrder, InvalidReason, ValidatedOrder, validate_orders},
};
use contango_instrument::Side;
use contango_integration::retry::{RetryPolicy, retry_null, retry_transient};
use contango_store::{
    event::{StreamEvent, decode_order},
    order::{BrokerRef, Order, OrderStatus, Trade},
    security::SecurityKey,
    store::{OrderHandler, SecurityHandler},
};
use itertools::Itertools;
use rust_decimal::Decimal;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Deadline for the concurrent dispatch phase of one batch.
pub const DEFAULT_BATCH_DEADLINE: Duration = Duration::from_secs(10);

/// Batch-fatal scheduler failures. Everything else degrades to a per-order outcome in the
/// [`ExecutionReport`].
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum SchedulerError {
    #[error("broker login failed after retries")]
    LoginFailed,

    #[error("security definitions unavailable after retries")]
    SecuritiesUnavailable,

    #[error("open positions unavailable after retries")]
    PositionsUnavailable,
}

/// Executor scheduler: consumes order-insert events, joins them with the security master,
/// applies the risk gate, dispatches the survivors concurrently to the broker, and settles
/// fills back through the store.
#[derive(Debug)]
pub struct Scheduler<B, S> {
    broker: B,
    store: Arc<S>,
    risk_gate: RiskGate,
    retry_policy: RetryPolicy,
    batch_deadline: Duration,
}

impl<B, S> Scheduler<B, S>
where
    B: Broker + 'static,
    S: OrderHandler + SecurityHandler + 'static,
{
    pub fn new(broker: B, store: Arc<S>) -> Self {
        Self {
            broker,
            store,
            risk_gate: RiskGate,
            retry_policy: RetryPolicy::default(),
            batch_deadline: DEFAULT_BATCH_DEADLINE,
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_batch_deadline(mut self, batch_deadline: Duration) -> Self {
        self.batch_deadline = batch_deadline;
        self
    }

    /// Run the full pipeline over one change-event batch.
    pub async fn execute_batch(
        &self,
        event: &StreamEvent,
    ) -> Result<ExecutionReport, SchedulerError> {
        let orders = extract_inserted_orders(event);
        if orders.is_empty() {
            info!("no inserted orders - event ignored");
            return Ok(ExecutionReport::default());
        }

        // Keep only dispatchable orders for this adapter; the rest go straight to the report.
        let mut invalid = Vec::new();
        let mut candidates = Vec::new();
        for order in orders {
            if order.broker != B::ID {
                let reason = InvalidReason::UnsupportedBroker(order.broker.clone());
                invalid.push(InvalidOrder::from_order(&order, reason));
            } else if order.status != OrderStatus::Pending {
                invalid.push(InvalidOrder::from_order(&order, InvalidReason::NotPending));
            } else {
                candidates.push(order);
            }
        }

        if candidates.is_empty() {
            return Ok(ExecutionReport {
                invalid,
                ..ExecutionReport::default()
            });
        }

        // One session per batch, shared read-only among dispatch tasks.
        let session = retry_null(self.retry_policy, "broker_login", || {
            let broker = self.broker.clone();
            async move { broker.login().await }
        })
        .await
        .ok_or(SchedulerError::LoginFailed)?;
        let session = Arc::new(session);
        info!(balance = %session.balance.amount, ccy = %session.balance.ccy, "broker session opened");

        let keys: Vec<SecurityKey> = candidates
            .iter()
            .map(|order| (order.symbol.clone(), order.broker.clone()))
            .unique()
            .collect();

        let securities = retry_null(self.retry_policy, "get_securities", || {
            let store = Arc::clone(&self.store);
            let keys = keys.clone();
            async move { store.get_securities(&keys) }
        })
        .await;
        let Some(securities) = securities else {
            self.broker.logout(&session).await;
            return Err(SchedulerError::SecuritiesUnavailable);
        };

        let (valid, joined_invalid) = validate_orders(candidates, &securities, &B::ID);
        invalid.extend(joined_invalid);

        if valid.is_empty() {
            self.broker.logout(&session).await;
            return Ok(ExecutionReport {
                invalid,
                ..ExecutionReport::default()
            });
        }

        // One open-positions snapshot per batch, reused by every risk check.
        let open_positions = retry_transient(self.retry_policy, "get_positions", || {
            let broker = self.broker.clone();
            let session = Arc::clone(&session);
            async move { broker.get_positions(&session).await }
        })
        .await;

        let open_positions = match open_positions {
            Ok(open_positions) => open_positions,
            Err(BrokerError::AuthExpired(_)) => {
                // Fatal for the batch: nothing was dispatched, nothing is written.
                let outcomes = valid
                    .iter()
                    .map(|validated| DispatchOutcome::AuthExpired {
                        order_id: validated.order.order_id,
                    })
                    .collect();
                return Ok(ExecutionReport {
                    invalid,
                    risk_refused: Vec::new(),
                    outcomes,
                });
            }
            Err(error) => {
                warn!(%error, "open positions unavailable");
                self.broker.logout(&session).await;
                return Err(SchedulerError::PositionsUnavailable);
            }
        };

        let mut risk_refused = Vec::new();
        let mut approved = Vec::new();
        for validated in valid {
            let net_position = broker_net_position(&open_positions, &validated);
            match self
                .risk_gate
                .check(validated, &session.balance, net_position)
            {
                Ok(approved_order) => approved.push(approved_order.into_item()),
                Err(refused) => {
                    warn!(
                        order_id = %refused.item.order.order_id,
                        reason = %refused.reason,
                        "risk gate veto"
                    );
                    risk_refused.push((refused.item.order.order_id, refused.reason));
                }
            }
        }

        // Dispatch concurrently - one task per order, all sharing the batch session.
        let mut handles = Vec::with_capacity(approved.len());
        for validated in approved {
            let order_id = validated.order.order_id;
            let broker = self.broker.clone();
            let store = Arc::clone(&self.store);
            let session = Arc::clone(&session);
            let retry_policy = self.retry_policy;

            let handle = tokio::spawn(async move {
                dispatch_order(broker, store, session, retry_policy, validated).await
            });
            handles.push((order_id, handle));
        }

        // Join under the batch deadline. Late tasks are abandoned, not cancelled: a late
        // completion still settles through the conditional update, which makes it harmless.
        let deadline = tokio::time::Instant::now() + self.batch_deadline;
        let mut outcomes = Vec::with_capacity(handles.len());
        for (order_id, handle) in handles {
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(outcome)) => outcomes.push(outcome),
                Ok(Err(join_error)) => {
                    error!(%order_id, %join_error, "dispatch task failed");
                    outcomes.push(DispatchOutcome::BrokerRejected {
                        order_id,
                        error: format!("dispatch task failed: {join_error}"),
                    });
                }
                Err(_) => {
                    warn!(%order_id, "batch deadline elapsed - abandoning in-flight dispatch");
                    outcomes.push(DispatchOutcome::InFlight { order_id });
                }
            }
        }

        self.broker.logout(&session).await;

        Ok(ExecutionReport {
            invalid,
            risk_refused,
            outcomes,
        })
    }
}

fn extract_inserted_orders(event: &StreamEvent) -> Vec<Order> {
    let mut orders = Vec::new();
    for record in &event.records {
        if !record.is_insert() {
            debug!(event_name = %record.event_name, "non-INSERT record is ignored");
            continue;
        }

        match decode_order(&record.dynamodb.new_image) {
            Ok(order) => {
                info!(order_id = %order.order_id, symbol = %order.symbol, "new order received");
                orders.push(order);
            }
            Err(error) => warn!(%error, "skipping undecodable order record"),
        }
    }
    orders
}

/// Net position at the broker for the validated order's market, `BUY` positive.
fn broker_net_position(positions: &[OpenPosition], validated: &ValidatedOrder) -> Decimal {
    positions
        .iter()
        .filter(|position| {
            position.market.instrument_name == validated.instrument_name
                && position.market.expiry == validated.expiry
        })
        .map(|position| match position.direction {
            Side::Buy => position.size,
            Side::Sell => -position.size,
        })
        .sum()
}

/// Dispatch one approved order: resolve the epic, create the position, confirm the fill, and
/// settle the terminal status through the store's conditional update.
async fn dispatch_order<B, S>(
    broker: B,
    store: Arc<S>,
    session: Arc<crate::client::Session>,
    retry_policy: RetryPolicy,
    validated: ValidatedOrder,
) -> DispatchOutcome
where
    B: Broker,
    S: OrderHandler,
{
    let order_id = validated.order.order_id;

    let markets = retry_transient(retry_policy, "search_markets", || {
        let broker = broker.clone();
        let session = Arc::clone(&session);
        let term = validated.order.symbol.clone();
        async move { broker.search_markets(&session, term.as_str()).await }
    })
    .await;

    let markets = match markets {
        Ok(markets) => markets,
        Err(BrokerError::AuthExpired(_)) => return DispatchOutcome::AuthExpired { order_id },
        Err(error) => {
            return settle_failed(&*store, &validated, format!("market search failed: {error}"));
        }
    };

    // The search must identify exactly one market - anything else is untradeable.
    let matches: Vec<_> = markets
        .iter()
        .filter(|market| {
            market.instrument_name == validated.instrument_name
                && market.instrument_type == validated.market_group
                && market.expiry == validated.expiry
        })
        .collect();

    let [market] = matches.as_slice() else {
        let reason = format!(
            "expected exactly one market matching ({}, {}, {}), found {}",
            validated.instrument_name,
            validated.market_group,
            validated.expiry,
            matches.len()
        );
        return settle_failed(&*store, &validated, reason);
    };

    info!(%order_id, epic = %market.epic, "resolved market");

    let request = PositionRequest {
        epic: market.epic.clone(),
        direction: validated.order.order.side,
        expiry: validated.expiry.clone(),
        order_type: validated.order.order.ord_type,
        size: validated.order.order.size,
        time_in_force: TimeInForce::FillOrKill,
        currency_code: session.balance.ccy.clone(),
        stop_distance: validated.order.order.stop_distance,
    };

    let deal = match broker.create_position(&session, &request).await {
        Ok(deal) => deal,
        Err(BrokerError::AuthExpired(_)) => return DispatchOutcome::AuthExpired { order_id },
        Err(error) => {
            // The submission outcome is unknown - leave the order PENDING for triage.
            warn!(%order_id, %error, "position creation did not complete");
            return DispatchOutcome::BrokerRejected {
                order_id,
                error: error.to_string(),
            };
        }
    };

    if let Some(error_code) = deal.error_code {
        warn!(%order_id, %error_code, "deal rejected by broker");
        return DispatchOutcome::BrokerRejected {
            order_id,
            error: error_code.to_string(),
        };
    }

    // Confirm the fill: re-fetch open positions and locate the deal by its reference.
    let positions = retry_transient(retry_policy, "confirm_fill", || {
        let broker = broker.clone();
        let session = Arc::clone(&session);
        async move { broker.get_positions(&session).await }
    })
    .await;

    let positions = match positions {
        Ok(positions) => positions,
        Err(BrokerError::AuthExpired(_)) => return DispatchOutcome::AuthExpired { order_id },
        Err(error) => {
            let reason = format!(
                "fill lookup failed after deal {}: {error}",
                deal.deal_reference
            );
            return settle_failed(&*store, &validated, reason);
        }
    };

    let Some(position) = positions
        .iter()
        .find(|position| position.deal_reference == deal.deal_reference)
    else {
        let reason = format!("no open position matches deal {}", deal.deal_reference);
        return settle_failed(&*store, &validated, reason);
    };

    let trade = Trade {
        fill_time: position.created_date_utc,
        side: position.direction,
        filled_size: position.size,
        price: position.level,
        broker: BrokerRef {
            name: B::ID.as_str().into(),
            ref_type: "dealId".into(),
            reference: position.deal_id.clone(),
        },
    };

    let status = if position.size < validated.order.order.size {
        OrderStatus::PartFilled
    } else {
        OrderStatus::Filled
    };

    match store.settle_order(order_id, &validated.order.transaction_time, status, Some(trade)) {
        Ok(true) => {}
        Ok(false) => info!(%order_id, "order was already settled - conditional update ignored"),
        Err(error) => {
            error!(%order_id, %error, "fill settle failed");
            return DispatchOutcome::BrokerRejected {
                order_id,
                error: format!("deal {} confirmed but settle failed: {error}", deal.deal_reference),
            };
        }
    }

    match status {
        OrderStatus::PartFilled => DispatchOutcome::PartFilled {
            order_id,
            deal_reference: deal.deal_reference,
            price: position.level,
            filled_size: position.size,
        },
        _ => DispatchOutcome::Filled {
            order_id,
            deal_reference: deal.deal_reference,
            price: position.level,
        },
    }
}

/// Settle `FAILED` through the conditional update; a rejected predicate means another worker
/// got there first and is ignored.
fn settle_failed<S>(store: &S, validated: &ValidatedOrder, reason: String) -> DispatchOutcome
where
    S: OrderHandler,
{
    let order_id = validated.order.order_id;
    warn!(%order_id, %reason, "settling order FAILED");

    match store.settle_order(
        order_id,
        &validated.order.transaction_time,
        OrderStatus::Failed,
        None,
    ) {
        Ok(true) => DispatchOutcome::Failed { order_id, reason },
        Ok(false) => {
            info!(%order_id, "order was already settled - conditional update ignored");
            DispatchOutcome::Failed { order_id, reason }
        }
        Err(error) => {
            error!(%order_id, %error, "FAILED settle did not take effect");
            DispatchOutcome::BrokerRejected {
                order_id,
                error: format!("{reason}; settle failed: {error}"),
            }
        }
    }
}
