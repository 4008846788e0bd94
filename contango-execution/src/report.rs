use crate::{risk::RiskVeto, validate::InvalidOrder};
use contango_store::order::OrderId;
use rust_decimal::Decimal;
use smol_str::SmolStr;
use std::fmt::Write;

/// Terminal outcome of one dispatched order.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Deal confirmed and settled `FILLED`.
    Filled {
        order_id: OrderId,
        deal_reference: SmolStr,
        price: Decimal,
    },

    /// Deal confirmed with a smaller size than requested; settled `PART_FILLED`.
    PartFilled {
        order_id: OrderId,
        deal_reference: SmolStr,
        price: Decimal,
        filled_size: Decimal,
    },

    /// Settled `FAILED` - market not found, or created deal without a matching fill.
    Failed { order_id: OrderId, reason: String },

    /// Broker rejected the deal (or the submission outcome is unknown). The order stays
    /// `PENDING` for human triage - settling it could mask a live position.
    BrokerRejected { order_id: OrderId, error: String },

    /// Session tokens were rejected mid-batch; nothing was written.
    AuthExpired { order_id: OrderId },

    /// Dispatch did not complete inside the batch deadline. The task was abandoned; a late
    /// completion is made harmless by the conditional settle.
    InFlight { order_id: OrderId },
}

impl DispatchOutcome {
    pub fn order_id(&self) -> OrderId {
        match self {
            DispatchOutcome::Filled { order_id, .. }
            | DispatchOutcome::PartFilled { order_id, .. }
            | DispatchOutcome::Failed { order_id, .. }
            | DispatchOutcome::BrokerRejected { order_id, .. }
            | DispatchOutcome::AuthExpired { order_id }
            | DispatchOutcome::InFlight { order_id } => *order_id,
        }
    }

    fn describe(&self) -> String {
        match self {
            DispatchOutcome::Filled {
                order_id,
                deal_reference,
                price,
            } => format!("{order_id}: FILLED at {price} (deal {deal_reference})"),
            DispatchOutcome::PartFilled {
                order_id,
                deal_reference,
                price,
                filled_size,
            } => format!(
                "{order_id}: PART_FILLED {filled_size} at {price} (deal {deal_reference})"
            ),
            DispatchOutcome::Failed { order_id, reason } => {
                format!("{order_id}: FAILED - {reason}")
            }
            DispatchOutcome::BrokerRejected { order_id, error } => {
                format!("{order_id}: left PENDING, broker error - {error}")
            }
            DispatchOutcome::AuthExpired { order_id } => {
                format!("{order_id}: left PENDING, session tokens rejected")
            }
            DispatchOutcome::InFlight { order_id } => {
                format!("{order_id}: still in flight at the batch deadline")
            }
        }
    }
}

/// Summary of one executor batch, rendered for the notifier collaborator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionReport {
    pub invalid: Vec<InvalidOrder>,
    pub risk_refused: Vec<(OrderId, RiskVeto)>,
    pub outcomes: Vec<DispatchOutcome>,
}

impl ExecutionReport {
    pub fn is_empty(&self) -> bool {
        self.invalid.is_empty() && self.risk_refused.is_empty() && self.outcomes.is_empty()
    }

    /// HTML body of the batch summary email.
    pub fn to_html(&self) -> String {
        let mut text = String::new();

        let invalid: Vec<String> = self
            .invalid
            .iter()
            .map(|order| format!("{} ({}, {}): {}", order.order_id, order.symbol, order.broker, order.reason))
            .collect();
        let _ = write!(
            text,
            "<br>Orders where the definition has not been found, not enabled for trading or not an IG order: {invalid:?}\n"
        );

        let refused: Vec<String> = self
            .risk_refused
            .iter()
            .map(|(order_id, veto)| format!("{order_id}: {veto}"))
            .collect();
        let _ = write!(
            text,
            "<br>Orders where MaxPosition or RiskFactor in the Securities table is exceeded: {refused:?}\n"
        );

        let results: Vec<String> = self
            .outcomes
            .iter()
            .map(DispatchOutcome::describe)
            .collect();
        let _ = write!(
            text,
            "<br>The results of the trades sent to the broker: {results:?}\n"
        );

        text
    }
}
