use contango_store::StoreError;
use thiserror::Error;

/// All errors generated by the strategy evaluator.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("order history unavailable after retries - cannot derive the open position")]
    OrdersUnavailable,
}
