use crate::{balance::Money, validate::ValidatedOrder};
use contango_instrument::Side;
use derive_more::{Constructor, From};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

/// Order request that passed every pre-trade risk check.
#[derive(Debug, Clone, PartialEq, From, Constructor)]
pub struct RiskApproved<T>(pub T);

impl<T> RiskApproved<T> {
    pub fn into_item(self) -> T {
        self.0
    }
}

/// Order request vetoed by the risk gate, with the reason.
#[derive(Debug, Clone, PartialEq, Constructor)]
pub struct RiskRefused<T, Reason = RiskVeto> {
    pub item: T,
    pub reason: Reason,
}

impl<T, Reason> RiskRefused<T, Reason> {
    pub fn into_item(self) -> T {
        self.item
    }
}

/// Why the risk gate vetoed an order. Vetoes are terminal - the order is reported, never
/// submitted, and no store write occurs.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum RiskVeto {
    #[error("size {size} is {fraction} of balance {balance}, above the RiskFactor {risk_factor}")]
    BalanceFraction {
        size: Decimal,
        balance: Decimal,
        fraction: Decimal,
        risk_factor: Decimal,
    },

    #[error("size {size} exceeds MaxPosition {max_position}")]
    OrderTooLarge {
        size: Decimal,
        max_position: Decimal,
    },

    #[error("net position {net_position} would breach MaxPosition {max_position}")]
    PositionBound {
        net_position: Decimal,
        max_position: Decimal,
    },

    #[error("security is not enabled for trading")]
    TradingDisabled,
}

/// Would applying `size` on `side` keep the resulting net position within `max_position`?
///
/// Buys grow the signed position; sells shrink it, so the bound is on its magnitude. All
/// comparisons are inclusive on the allowed side. Shared with the strategy evaluator's entry
/// gating so both ends agree on what "would breach" means.
pub fn position_within_bound(
    side: Side,
    size: Decimal,
    net_position: Decimal,
    max_position: Decimal,
) -> bool {
    match side {
        Side::Buy => net_position + size <= max_position,
        Side::Sell => (net_position - size).abs() <= max_position,
    }
}

/// Per-order pre-trade checks against the account balance, configured risk limits, and the
/// current net position.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskGate;

impl RiskGate {
    /// Accept iff every check passes; the first failing check names the veto.
    pub fn check(
        &self,
        order: ValidatedOrder,
        balance: &Money,
        net_position: Decimal,
    ) -> Result<RiskApproved<ValidatedOrder>, RiskRefused<ValidatedOrder>> {
        let size = order.order.order.size;

        info!(
            order_id = %order.order.order_id,
            symbol = %order.order.symbol,
            %size,
            balance = %balance.amount,
            risk_factor = %order.risk_factor,
            max_position = %order.max_position,
            %net_position,
            "risk check"
        );

        if !order.trading_enabled {
            return Err(RiskRefused::new(order, RiskVeto::TradingDisabled));
        }

        if balance.amount <= Decimal::ZERO || size / balance.amount > order.risk_factor {
            let veto = RiskVeto::BalanceFraction {
                size,
                balance: balance.amount,
                fraction: if balance.amount > Decimal::ZERO {
                    size / balance.amount
                } else {
                    Decimal::ZERO
                },
                risk_factor: order.risk_factor,
            };
            return Err(RiskRefused::new(order, veto));
        }

        if size > order.max_position {
            let veto = RiskVeto::OrderTooLarge {
                size,
                max_position: order.max_position,
            };
            return Err(RiskRefused::new(order, veto));
        }

        if !position_within_bound(order.order.order.side, size, net_position, order.max_position)
        {
            let veto = RiskVeto::PositionBound {
                net_position,
                max_position: order.max_position,
            };
            return Err(RiskRefused::new(order, veto));
        }

        Ok(RiskApproved::new(order))
    }
}
