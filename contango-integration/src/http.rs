use crate::error::HttpError;
use bytes::Bytes;
use reqwest::{StatusCode, header::HeaderMap};
use serde::{Serialize, de::DeserializeOwned};
use std::{borrow::Cow, time::Duration};

/// Default timeout applied to a [`RestRequest`] execution.
pub const DEFAULT_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Typed HTTP request executed by a [`RestClient`].
///
/// Each API endpoint is modelled as one implementor carrying its expected `Response`, optional
/// query parameters, and optional JSON body.
pub trait RestRequest {
    type Response: DeserializeOwned;
    type QueryParams: Serialize;
    type Body: Serialize;

    fn path(&self) -> Cow<'static, str>;

    fn method() -> reqwest::Method;

    /// API version communicated to the server via a `Version` header.
    fn version() -> u8 {
        1
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        None
    }

    fn body(&self) -> Option<&Self::Body> {
        None
    }

    fn timeout() -> Duration {
        DEFAULT_HTTP_REQUEST_TIMEOUT
    }
}

/// Convenient unit type for [`RestRequest`] implementors without query parameters or a body.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct Unused;

/// [`RestRequest`] build strategy for the API being integrated.
///
/// An authenticated API will add its credential and session headers here; a public API may add
/// any mandatory `reqwest` headers required.
pub trait BuildStrategy {
    fn build<Request>(
        &self,
        request: Request,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Request, HttpError>
    where
        Request: RestRequest;
}

/// Parser of [`RestRequest::Response`]s that, upon failure, attempts to parse the structured
/// API error returned from the server instead.
pub trait HttpParser {
    type ApiError: DeserializeOwned;
    type OutputError: From<HttpError>;

    fn parse<Response>(
        &self,
        status: StatusCode,
        payload: &[u8],
    ) -> Result<Response, Self::OutputError>
    where
        Response: DeserializeOwned,
    {
        // Attempt to deserialise the expected API Success response
        let parse_error = if status.is_success() {
            match serde_json::from_slice::<Response>(payload) {
                Ok(response) => return Ok(response),
                Err(error) => error,
            }
        } else {
            match serde_json::from_slice::<Self::ApiError>(payload) {
                Ok(api_error) => return Err(self.parse_api_error(status, api_error)),
                Err(error) => error,
            }
        };

        // A success status may still carry an API error payload (eg/ a deal rejection)
        if let Ok(api_error) = serde_json::from_slice::<Self::ApiError>(payload) {
            return Err(self.parse_api_error(status, api_error));
        }

        Err(Self::OutputError::from(HttpError::Deserialise {
            error: parse_error,
            payload: String::from_utf8_lossy(payload).into_owned(),
        }))
    }

    /// Translate the structured API error into the integration's output error.
    fn parse_api_error(&self, status: StatusCode, error: Self::ApiError) -> Self::OutputError;
}

/// Configurable REST client capable of executing typed [`RestRequest`]s.
///
/// Each API integration requires a specific combination of [`BuildStrategy`] (credential and
/// session headers) and [`HttpParser`] (success and error payload shapes).
#[derive(Debug)]
pub struct RestClient<'a, Strategy, Parser> {
    /// HTTP [`reqwest::Client`] executing the built [`reqwest::Request`]s.
    pub http_client: reqwest::Client,

    /// Base Url of the API being integrated.
    pub base_url: Cow<'a, str>,

    /// [`BuildStrategy`] for the API being integrated.
    pub strategy: Strategy,

    /// [`HttpParser`] deserialising [`RestRequest::Response`]s and API errors.
    pub parser: Parser,
}

impl<Strategy, Parser> RestClient<'_, Strategy, Parser>
where
    Strategy: BuildStrategy,
    Parser: HttpParser,
{
    /// Execute the provided [`RestRequest`].
    pub async fn execute<Request>(
        &self,
        request: Request,
    ) -> Result<Request::Response, Parser::OutputError>
    where
        Request: RestRequest,
    {
        self.execute_with_headers(request)
            .await
            .map(|(response, _)| response)
    }

    /// Execute the provided [`RestRequest`], also returning the response [`HeaderMap`].
    ///
    /// Required by APIs that hand out session tokens via response headers.
    pub async fn execute_with_headers<Request>(
        &self,
        request: Request,
    ) -> Result<(Request::Response, HeaderMap), Parser::OutputError>
    where
        Request: RestRequest,
    {
        let request = self.build(request)?;
        let (status, headers, payload) = self.send(request).await?;
        self.parser
            .parse::<Request::Response>(status, &payload)
            .map(|response| (response, headers))
    }

    /// Use the provided [`RestRequest`] to construct a [`reqwest::Request`] via the
    /// [`BuildStrategy`].
    pub fn build<Request>(&self, request: Request) -> Result<reqwest::Request, HttpError>
    where
        Request: RestRequest,
    {
        let url = format!("{}{}", self.base_url, request.path());

        let mut builder = self
            .http_client
            .request(Request::method(), url)
            .timeout(Request::timeout());

        if let Some(query_params) = request.query_params() {
            builder = builder.query(query_params);
        }

        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        self.strategy.build(request, builder)
    }

    /// Execute the built [`reqwest::Request`], returning status, headers and raw payload.
    pub async fn send(
        &self,
        request: reqwest::Request,
    ) -> Result<(StatusCode, HeaderMap, Bytes), HttpError> {
        let response = self.http_client.execute(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let payload = response.bytes().await?;

        Ok((status, headers, payload))
    }
}

impl<'a, Strategy, Parser> RestClient<'a, Strategy, Parser> {
    /// Construct a new [`Self`] using the provided configuration.
    pub fn new<Url: Into<Cow<'a, str>>>(base_url: Url, strategy: Strategy, parser: Parser) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into(),
            strategy,
            parser,
        }
    }
}
