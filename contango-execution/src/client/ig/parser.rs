use crate::error::BrokerError;
use contango_integration::http::HttpParser;
use reqwest::StatusCode;
use serde::Deserialize;

/// Structured error payload returned by the IG API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IgApiError {
    pub error_code: String,
}

/// [`HttpParser`] translating IG `errorCode` payloads into [`BrokerError`]s.
#[derive(Debug, Clone, Copy)]
pub struct IgParser;

impl HttpParser for IgParser {
    type ApiError = IgApiError;
    type OutputError = BrokerError;

    fn parse_api_error(&self, status: StatusCode, error: Self::ApiError) -> Self::OutputError {
        let code = error.error_code;

        // eg/ error.security.client-token-invalid, error.security.oauth-token-invalid
        if code.contains("client-token") || code.contains("oauth-token") {
            BrokerError::AuthExpired(code)
        } else if status.is_server_error() {
            BrokerError::Transient(code)
        } else {
            BrokerError::Api(code)
        }
    }
}
