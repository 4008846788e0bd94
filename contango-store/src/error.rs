use crate::order::OrderId;
use thiserror::Error;

/// All errors generated by store backends.
///
/// Read-path operations do not surface here - transient read failures manifest as `None` and
/// are retried uniformly by the caller. Write-path failures are terminal and propagate.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("JSON SerDe error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("settle of {order_id} rejected: {reason}")]
    InvalidSettle {
        order_id: OrderId,
        reason: &'static str,
    },
}

impl From<redis::RedisError> for StoreError {
    fn from(error: redis::RedisError) -> Self {
        StoreError::Backend(error.to_string())
    }
}
