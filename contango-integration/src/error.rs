use reqwest::StatusCode;
use thiserror::Error;

/// All HTTP IO related errors generated in `contango-integration`.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Serialising JSON error: {0}")]
    Serialise(serde_json::Error),

    #[error("Deserialising JSON error: {error} for payload: {payload}")]
    Deserialise {
        error: serde_json::Error,
        payload: String,
    },

    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("HTTP request timed out")]
    HttpTimeout(reqwest::Error),

    /// REST http response error
    #[error("HTTP response (status={0}) error: {1}")]
    Response(StatusCode, String),
}

impl From<reqwest::Error> for HttpError {
    fn from(error: reqwest::Error) -> Self {
        match error {
            error if error.is_timeout() => HttpError::HttpTimeout(error),
            error => HttpError::Http(error),
        }
    }
}
