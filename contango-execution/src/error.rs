use contango_integration::{error::HttpError, retry::Transient};
use thiserror::Error;

/// All errors generated by broker integrations.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum BrokerError {
    /// Session tokens rejected by the broker. Fatal for the current batch - never retried.
    #[error("session tokens rejected: {0}")]
    AuthExpired(String),

    /// Transient connectivity or server failure, retried with backoff on the read path.
    #[error("transient broker failure: {0}")]
    Transient(String),

    /// Structured error returned by the broker API.
    #[error("broker API error: {0}")]
    Api(String),
}

impl Transient for BrokerError {
    fn is_transient(&self) -> bool {
        matches!(self, BrokerError::Transient(_))
    }
}

impl From<HttpError> for BrokerError {
    fn from(error: HttpError) -> Self {
        match error {
            HttpError::Http(_) | HttpError::HttpTimeout(_) => {
                BrokerError::Transient(error.to_string())
            }
            HttpError::Response(status, _) if status.is_server_error() => {
                BrokerError::Transient(error.to_string())
            }
            other => BrokerError::Api(other.to_string()),
        }
    }
}
