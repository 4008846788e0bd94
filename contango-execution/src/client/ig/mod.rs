use crate::{
    balance::Money,
    client::{Broker, Deal, Market, OpenPosition, PositionRequest, Session},
    error::BrokerError,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use contango_instrument::symbol::BrokerId;
use contango_integration::{
    error::HttpError,
    http::{BuildStrategy, HttpParser, RestClient, RestRequest},
};
use self::{
    parser::IgParser,
    requests::{
        CreatePositionBody, CreatePositionRequest, CreateSessionRequest, GetPositionsRequest,
        LogoutRequest, SearchMarketsRequest,
    },
};
use reqwest::header::{HeaderName, HeaderValue};
use smol_str::SmolStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// [`HttpParser`](contango_integration::http::HttpParser) for IG payloads.
pub mod parser;

/// Typed request/response models for the IG REST endpoints.
pub mod requests;

const HEADER_API_KEY: HeaderName = HeaderName::from_static("x-ig-api-key");
const HEADER_VERSION: HeaderName = HeaderName::from_static("version");
const HEADER_CST: HeaderName = HeaderName::from_static("cst");
const HEADER_SECURITY_TOKEN: HeaderName = HeaderName::from_static("x-security-token");

/// Configuration for constructing an [`IgClient`].
#[derive(Debug, Clone)]
pub struct IgConfig {
    pub base_url: String,
    pub api_key: SmolStr,
    pub identifier: SmolStr,
    pub password: SmolStr,
}

/// [`BuildStrategy`] adding the `X-IG-API-KEY` credential and the per-endpoint `Version`
/// header to every request. Session headers are applied per call - see
/// [`IgClient::execute_authenticated`].
#[derive(Debug, Clone)]
pub struct IgRequestBuilder {
    api_key: HeaderValue,
}

impl BuildStrategy for IgRequestBuilder {
    fn build<Request>(
        &self,
        _: Request,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Request, HttpError>
    where
        Request: RestRequest,
    {
        builder
            .header(HEADER_API_KEY, self.api_key.clone())
            .header(HEADER_VERSION, u64::from(Request::version()))
            .build()
            .map_err(HttpError::from)
    }
}

/// IG REST API adapter implementing the [`Broker`] capability.
#[derive(Debug, Clone)]
pub struct IgClient {
    identifier: SmolStr,
    password: SmolStr,
    rest_client: Arc<RestClient<'static, IgRequestBuilder, IgParser>>,
}

impl IgClient {
    pub fn new(config: IgConfig) -> Self {
        let api_key = HeaderValue::from_str(&config.api_key)
            .expect("IG api key contains invalid header characters");

        Self {
            identifier: config.identifier,
            password: config.password,
            rest_client: Arc::new(RestClient::new(
                config.base_url,
                IgRequestBuilder { api_key },
                IgParser,
            )),
        }
    }

    /// Execute a [`RestRequest`] with the session token headers applied.
    async fn execute_authenticated<Request>(
        &self,
        session: &Session,
        request: Request,
    ) -> Result<Request::Response, BrokerError>
    where
        Request: RestRequest,
    {
        let mut request = self.rest_client.build(request).map_err(BrokerError::from)?;

        let headers = request.headers_mut();
        headers.insert(HEADER_CST, header_value(&session.cst)?);
        headers.insert(HEADER_SECURITY_TOKEN, header_value(&session.security_token)?);

        let (status, _, payload) = self
            .rest_client
            .send(request)
            .await
            .map_err(BrokerError::from)?;

        self.rest_client
            .parser
            .parse::<Request::Response>(status, &payload)
    }
}

fn header_value(token: &str) -> Result<HeaderValue, BrokerError> {
    HeaderValue::from_str(token)
        .map_err(|_| BrokerError::Api("session token is not header-safe".to_string()))
}

/// Parse IG's `createdDateUTC`, which arrives without a zone designator.
fn parse_created_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Some(time.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|time| time.and_utc())
}

impl Broker for IgClient {
    const ID: BrokerId = BrokerId::Ig;

    async fn login(&self) -> Option<Session> {
        let request =
            CreateSessionRequest::from_credentials(self.identifier.clone(), self.password.clone());

        match self.rest_client.execute_with_headers(request).await {
            Ok((response, headers)) => {
                let token = |name: &HeaderName| {
                    headers
                        .get(name)
                        .and_then(|value| value.to_str().ok())
                        .map(SmolStr::new)
                };

                let (Some(cst), Some(security_token)) =
                    (token(&HEADER_CST), token(&HEADER_SECURITY_TOKEN))
                else {
                    warn!("Login response is missing session token headers");
                    return None;
                };

                debug!(ccy = %response.currency_iso_code, "Login succeeded");
                Some(Session::new(
                    cst,
                    security_token,
                    Money::new(response.account_info.available, response.currency_iso_code),
                ))
            }
            Err(error) => {
                warn!(%error, "Login failed");
                None
            }
        }
    }

    async fn logout(&self, session: &Session) {
        let mut request = match self.rest_client.build(LogoutRequest) {
            Ok(request) => request,
            Err(error) => {
                warn!(%error, "Logout request could not be built");
                return;
            }
        };

        let headers = request.headers_mut();
        for (name, token) in [
            (HEADER_CST, &session.cst),
            (HEADER_SECURITY_TOKEN, &session.security_token),
        ] {
            match header_value(token) {
                Ok(value) => {
                    headers.insert(name, value);
                }
                Err(error) => {
                    warn!(%error, "Logout skipped");
                    return;
                }
            }
        }

        match self.rest_client.send(request).await {
            Ok((status, _, _)) => debug!(%status, "Logout response"),
            Err(error) => warn!(%error, "Logout failed"),
        }
    }

    async fn search_markets(
        &self,
        session: &Session,
        term: &str,
    ) -> Result<Vec<Market>, BrokerError> {
        self.execute_authenticated(session, SearchMarketsRequest::from_term(term))
            .await
            .map(|response| response.markets)
    }

    async fn create_position(
        &self,
        session: &Session,
        request: &PositionRequest,
    ) -> Result<Deal, BrokerError> {
        let body = CreatePositionBody {
            epic: request.epic.clone(),
            expiry: request.expiry.clone(),
            direction: request.direction,
            size: request.size,
            order_type: request.order_type,
            time_in_force: request.time_in_force,
            currency_code: request.currency_code.clone(),
            guaranteed_stop: false,
            stop_distance: request.stop_distance,
            force_open: true,
        };

        match self
            .execute_authenticated(session, CreatePositionRequest::new(body))
            .await
        {
            Ok(response) => Ok(Deal::new(response.deal_reference, None)),
            // A structured rejection is an outcome, not a transport failure - surface the
            // code so the order can be triaged rather than settled.
            Err(BrokerError::Api(code)) => Ok(Deal::new(SmolStr::default(), Some(code.into()))),
            Err(error) => Err(error),
        }
    }

    async fn get_positions(&self, session: &Session) -> Result<Vec<OpenPosition>, BrokerError> {
        let response = self
            .execute_authenticated(session, GetPositionsRequest)
            .await?;

        let positions = response
            .positions
            .into_iter()
            .map(|envelope| {
                let created = parse_created_date(&envelope.position.created_date_utc)
                    .unwrap_or_else(|| {
                        warn!(
                            deal_id = %envelope.position.deal_id,
                            raw = %envelope.position.created_date_utc,
                            "unparseable createdDateUTC - substituting now"
                        );
                        Utc::now()
                    });

                OpenPosition::new(
                    envelope.position.deal_reference.unwrap_or_default(),
                    envelope.position.deal_id,
                    created,
                    envelope.position.level,
                    envelope.position.size,
                    envelope.position.direction,
                    envelope.market,
                )
            })
            .collect();

        Ok(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_created_date_accepts_ig_and_rfc3339_forms() {
        let naive = parse_created_date("2017-11-14T14:07:29").unwrap();
        assert_eq!(naive.to_rfc3339(), "2017-11-14T14:07:29+00:00");

        let millis = parse_created_date("2017-11-14T14:07:29.123").unwrap();
        assert_eq!(millis.timestamp_subsec_millis(), 123);

        let rfc3339 = parse_created_date("2017-11-14T14:07:29Z").unwrap();
        assert_eq!(rfc3339, naive);

        assert!(parse_created_date("14/11/2017").is_none());
    }
}
