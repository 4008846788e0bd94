use crate::client::{Market, TimeInForce};
use contango_instrument::Side;
use contango_store::order::OrdType;
use contango_integration::http::{RestRequest, Unused};
use derive_more::Constructor;
use reqwest::Method;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::borrow::Cow;

/// `POST /session` (v2). Session tokens are returned via the `CST` and `X-SECURITY-TOKEN`
/// response headers, not the payload.
#[derive(Debug, Clone, Constructor)]
pub struct CreateSessionRequest {
    body: CreateSessionBody,
}

impl CreateSessionRequest {
    pub fn from_credentials(identifier: SmolStr, password: SmolStr) -> Self {
        Self::new(CreateSessionBody {
            identifier,
            password,
            encrypted_password: None,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionBody {
    pub identifier: SmolStr,
    pub password: SmolStr,
    /// Always serialised as an explicit `null`.
    pub encrypted_password: Option<bool>,
}

impl RestRequest for CreateSessionRequest {
    type Response = CreateSessionResponse;
    type QueryParams = Unused;
    type Body = CreateSessionBody;

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/session")
    }

    fn method() -> Method {
        Method::POST
    }

    fn version() -> u8 {
        2
    }

    fn body(&self) -> Option<&Self::Body> {
        Some(&self.body)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub account_info: AccountInfo,
    pub currency_iso_code: SmolStr,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub available: Decimal,
}

/// `DELETE /session` (v1). Success carries no payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogoutRequest;

impl RestRequest for LogoutRequest {
    type Response = serde_json::Value;
    type QueryParams = Unused;
    type Body = Unused;

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/session")
    }

    fn method() -> Method {
        Method::DELETE
    }
}

/// `GET /markets?searchTerm=` (v1).
#[derive(Debug, Clone, Constructor)]
pub struct SearchMarketsRequest {
    query: SearchMarketsQuery,
}

impl SearchMarketsRequest {
    pub fn from_term(term: &str) -> Self {
        Self::new(SearchMarketsQuery {
            search_term: term.into(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMarketsQuery {
    pub search_term: SmolStr,
}

impl RestRequest for SearchMarketsRequest {
    type Response = SearchMarketsResponse;
    type QueryParams = SearchMarketsQuery;
    type Body = Unused;

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/markets")
    }

    fn method() -> Method {
        Method::GET
    }

    fn query_params(&self) -> Option<&Self::QueryParams> {
        Some(&self.query)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchMarketsResponse {
    pub markets: Vec<Market>,
}

/// `POST /positions/otc` (v2).
#[derive(Debug, Clone, Constructor)]
pub struct CreatePositionRequest {
    body: CreatePositionBody,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePositionBody {
    pub epic: SmolStr,
    pub expiry: SmolStr,
    pub direction: Side,
    pub size: Decimal,
    pub order_type: OrdType,
    pub time_in_force: TimeInForce,
    pub currency_code: SmolStr,
    pub guaranteed_stop: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_distance: Option<Decimal>,
    pub force_open: bool,
}

impl RestRequest for CreatePositionRequest {
    type Response = CreateDealResponse;
    type QueryParams = Unused;
    type Body = CreatePositionBody;

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/positions/otc")
    }

    fn method() -> Method {
        Method::POST
    }

    fn version() -> u8 {
        2
    }

    fn body(&self) -> Option<&Self::Body> {
        Some(&self.body)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDealResponse {
    pub deal_reference: SmolStr,
}

/// `GET /positions` (v2).
#[derive(Debug, Clone, Copy, Default)]
pub struct GetPositionsRequest;

impl RestRequest for GetPositionsRequest {
    type Response = PositionsResponse;
    type QueryParams = Unused;
    type Body = Unused;

    fn path(&self) -> Cow<'static, str> {
        Cow::Borrowed("/positions")
    }

    fn method() -> Method {
        Method::GET
    }

    fn version() -> u8 {
        2
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionsResponse {
    pub positions: Vec<PositionEnvelope>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionEnvelope {
    pub position: PositionDetails,
    pub market: Market,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDetails {
    pub deal_id: SmolStr,
    #[serde(default)]
    pub deal_reference: Option<SmolStr>,
    #[serde(rename = "createdDateUTC")]
    pub created_date_utc: SmolStr,
    pub direction: Side,
    pub size: Decimal,
    pub level: Decimal,
}
