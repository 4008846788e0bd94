use crate::{
    order::{
        BrokerRef, Order, OrderDetails, OrderId, StrategyTag, TradeReason, TransactionTime,
    },
    quote::QuoteDate,
};
use chrono::{DateTime, Utc};
use contango_instrument::symbol::SymbolCode;
use fnv::FnvHashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Batch of change-stream records delivered to a worker invocation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct StreamEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<StreamRecord>,
}

/// One change-stream record. Only `INSERT` records are consumed by the workers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StreamRecord {
    #[serde(rename = "eventName")]
    pub event_name: SmolStr,
    pub dynamodb: RecordPayload,
}

impl StreamRecord {
    pub fn is_insert(&self) -> bool {
        self.event_name == "INSERT"
    }
}

/// Table image carried by a [`StreamRecord`]: the primary key, and the full row for inserts.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct RecordPayload {
    #[serde(rename = "Keys", default)]
    pub keys: AttrMap,

    #[serde(rename = "NewImage", default)]
    pub new_image: AttrMap,
}

/// Attribute map of a change-stream row image.
pub type AttrMap = FnvHashMap<String, AttrValue>;

/// Typed attribute-value encoding used by the change stream.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AttrValue {
    S(String),
    N(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    M(AttrMap),
    L(Vec<AttrValue>),
    #[serde(rename = "NULL")]
    Null(bool),
}

impl AttrValue {
    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttrValue::S(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_n(&self) -> Option<&str> {
        match self {
            AttrValue::N(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_m(&self) -> Option<&AttrMap> {
        match self {
            AttrValue::M(value) => Some(value),
            _ => None,
        }
    }
}

/// Failure to decode a typed row from a change-stream image.
///
/// Per-record: one malformed record is logged and skipped without poisoning its batch.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum DecodeError {
    #[error("missing attribute: {0}")]
    Missing(&'static str),

    #[error("attribute {attribute} has unexpected shape: expected {expected}")]
    UnexpectedShape {
        attribute: &'static str,
        expected: &'static str,
    },

    #[error("attribute {attribute} failed to parse: {value}")]
    Parse {
        attribute: &'static str,
        value: String,
    },
}

fn attr<'a>(map: &'a AttrMap, attribute: &'static str) -> Result<&'a AttrValue, DecodeError> {
    map.get(attribute).ok_or(DecodeError::Missing(attribute))
}

fn string_attr<'a>(map: &'a AttrMap, attribute: &'static str) -> Result<&'a str, DecodeError> {
    attr(map, attribute)?
        .as_s()
        .ok_or(DecodeError::UnexpectedShape {
            attribute,
            expected: "S",
        })
}

fn number_attr(map: &AttrMap, attribute: &'static str) -> Result<Decimal, DecodeError> {
    let value = attr(map, attribute)?
        .as_n()
        .ok_or(DecodeError::UnexpectedShape {
            attribute,
            expected: "N",
        })?;

    Decimal::from_str(value).map_err(|_| DecodeError::Parse {
        attribute,
        value: value.to_string(),
    })
}

fn optional_number_attr(
    map: &AttrMap,
    attribute: &'static str,
) -> Result<Option<Decimal>, DecodeError> {
    match map.get(attribute) {
        None | Some(AttrValue::Null(_)) => Ok(None),
        Some(_) => number_attr(map, attribute).map(Some),
    }
}

fn map_attr<'a>(map: &'a AttrMap, attribute: &'static str) -> Result<&'a AttrMap, DecodeError> {
    attr(map, attribute)?
        .as_m()
        .ok_or(DecodeError::UnexpectedShape {
            attribute,
            expected: "M",
        })
}

fn parse_attr<T>(map: &AttrMap, attribute: &'static str) -> Result<T, DecodeError>
where
    T: FromStr,
{
    let value = string_attr(map, attribute)?;
    value.parse().map_err(|_| DecodeError::Parse {
        attribute,
        value: value.to_string(),
    })
}

/// `(Symbol, Date)` primary key of an inserted `Quotes.EOD` row.
pub fn decode_quote_key(keys: &AttrMap) -> Result<(SymbolCode, QuoteDate), DecodeError> {
    let symbol = SymbolCode::new(string_attr(keys, "Symbol")?);
    let date = parse_attr(keys, "Date")?;
    Ok((symbol, date))
}

/// Full [`Order`] row from an inserted `Orders` image.
pub fn decode_order(image: &AttrMap) -> Result<Order, DecodeError> {
    let order_id = string_attr(image, "OrderId")?;
    let order_id = Uuid::parse_str(order_id)
        .map(OrderId::new)
        .map_err(|_| DecodeError::Parse {
            attribute: "OrderId",
            value: order_id.to_string(),
        })?;

    let trade = match image.get("Trade") {
        None | Some(AttrValue::Null(_)) => None,
        Some(_) => Some(decode_trade(map_attr(image, "Trade")?)?),
    };

    Ok(Order {
        order_id,
        transaction_time: TransactionTime::from(string_attr(image, "TransactionTime")?),
        symbol: SymbolCode::new(string_attr(image, "Symbol")?),
        broker: string_attr(image, "Broker")?.into(),
        maturity: parse_attr(image, "Maturity")?,
        product_type: string_attr(image, "ProductType")?.into(),
        status: parse_attr(image, "Status")?,
        order: decode_order_details(map_attr(image, "Order")?)?,
        trade,
        strategy: decode_strategy(map_attr(image, "Strategy")?)?,
    })
}

fn decode_order_details(map: &AttrMap) -> Result<OrderDetails, DecodeError> {
    Ok(OrderDetails {
        side: parse_attr(map, "Side")?,
        size: number_attr(map, "Size")?,
        ord_type: parse_attr(map, "OrdType")?,
        stop_distance: optional_number_attr(map, "StopDistance")?,
    })
}

fn decode_strategy(map: &AttrMap) -> Result<StrategyTag, DecodeError> {
    Ok(StrategyTag {
        name: string_attr(map, "Name")?.into(),
        reason: parse_attr::<TradeReason>(map, "Reason")?,
    })
}

fn decode_trade(map: &AttrMap) -> Result<crate::order::Trade, DecodeError> {
    let fill_time = string_attr(map, "FillTime")?;
    let fill_time = DateTime::parse_from_rfc3339(fill_time)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|_| DecodeError::Parse {
            attribute: "FillTime",
            value: fill_time.to_string(),
        })?;

    let broker = map_attr(map, "Broker")?;

    Ok(crate::order::Trade {
        fill_time,
        side: parse_attr(map, "Side")?,
        filled_size: number_attr(map, "FilledSize")?,
        price: number_attr(map, "Price")?,
        broker: BrokerRef {
            name: string_attr(broker, "Name")?.into(),
            ref_type: string_attr(broker, "RefType")?.into(),
            reference: string_attr(broker, "Ref")?.into(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrdType, OrderStatus};
    use contango_instrument::Side;
    use rust_decimal_macros::dec;

    fn quote_insert_event() -> StreamEvent {
        serde_json::from_str(
            r#"{
                "Records": [
                    {
                        "eventName": "INSERT",
                        "dynamodb": {
                            "Keys": {
                                "Symbol": {"S": "VIX"},
                                "Date": {"S": "20171114"}
                            },
                            "NewImage": {
                                "Symbol": {"S": "VIX"},
                                "Date": {"S": "20171114"},
                                "Close": {"N": "11.25"}
                            }
                        }
                    },
                    {
                        "eventName": "MODIFY",
                        "dynamodb": {
                            "Keys": {
                                "Symbol": {"S": "VIX"},
                                "Date": {"S": "20171113"}
                            }
                        }
                    }
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_only_insert_records_are_consumable() {
        let event = quote_insert_event();
        assert_eq!(event.records.len(), 2);
        assert!(event.records[0].is_insert());
        assert!(!event.records[1].is_insert());
    }

    #[test]
    fn test_decode_quote_key() {
        let event = quote_insert_event();
        let (symbol, date) = decode_quote_key(&event.records[0].dynamodb.keys).unwrap();
        assert_eq!(symbol.as_str(), "VIX");
        assert_eq!(date.to_string(), "20171114");
    }

    #[test]
    fn test_decode_order_image() {
        let image: AttrMap = serde_json::from_str(
            r#"{
                "OrderId": {"S": "a7f25991-8e94-45d6-9d1e-52c4497e463b"},
                "TransactionTime": {"S": "1510662000"},
                "Symbol": {"S": "VX"},
                "Broker": {"S": "IG"},
                "Maturity": {"S": "201711"},
                "ProductType": {"S": "FUTURE"},
                "Status": {"S": "PENDING"},
                "Order": {"M": {
                    "Side": {"S": "SELL"},
                    "Size": {"N": "2"},
                    "OrdType": {"S": "MARKET"}
                }},
                "Strategy": {"M": {
                    "Name": {"S": "VIX_ROLL"},
                    "Reason": {"S": "CLOSE"}
                }}
            }"#,
        )
        .unwrap();

        let order = decode_order(&image).unwrap();
        assert_eq!(order.symbol.as_str(), "VX");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.order.side, Side::Sell);
        assert_eq!(order.order.size, dec!(2));
        assert_eq!(order.order.ord_type, OrdType::Market);
        assert_eq!(order.order.stop_distance, None);
        assert_eq!(order.maturity.to_string(), "201711");
        assert_eq!(order.strategy.reason, TradeReason::Close);
        assert!(order.trade.is_none());
    }

    #[test]
    fn test_decode_order_missing_attribute() {
        let image: AttrMap = serde_json::from_str(
            r#"{"OrderId": {"S": "a7f25991-8e94-45d6-9d1e-52c4497e463b"}}"#,
        )
        .unwrap();

        assert_eq!(
            decode_order(&image).unwrap_err(),
            DecodeError::Missing("TransactionTime")
        );
    }

    #[test]
    fn test_decode_order_wrong_shape() {
        let image: AttrMap = serde_json::from_str(
            r#"{
                "OrderId": {"S": "a7f25991-8e94-45d6-9d1e-52c4497e463b"},
                "TransactionTime": {"N": "1510662000"}
            }"#,
        )
        .unwrap();

        assert_eq!(
            decode_order(&image).unwrap_err(),
            DecodeError::UnexpectedShape {
                attribute: "TransactionTime",
                expected: "S"
            }
        );
    }
}
