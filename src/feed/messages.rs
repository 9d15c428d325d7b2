//! Wire types for the streaming price source

use serde::Serialize;
use serde_json::Value;

/// Control messages sent to the transport
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    Subscribe { channel: String, market: String },
    Unsubscribe { channel: String, market: String },
}

impl ControlMessage {
    pub fn subscribe(market_id: &str) -> Self {
        Self::Subscribe {
            channel: "market".to_string(),
            market: market_id.to_string(),
        }
    }

    pub fn unsubscribe(market_id: &str) -> Self {
        Self::Unsubscribe {
            channel: "market".to_string(),
            market: market_id.to_string(),
        }
    }
}

/// A parsed inbound price tick
#[derive(Debug, Clone, PartialEq)]
pub struct PriceMessage {
    pub market_id: String,
    pub price: f64,
}

/// Parse an inbound frame into a price tick.
///
/// The source tags ticks as `price_update` or `trade`, identifies the
/// market as `market` or `asset_id`, and carries the price as `price` or
/// `yes_price`, sometimes as a string. Anything else - unknown kind,
/// missing id, non-numeric price - returns `None`; a single bad frame
/// must never break the stream.
pub fn parse_price_message(text: &str) -> Option<PriceMessage> {
    let value: Value = serde_json::from_str(text).ok()?;

    match value.get("type").and_then(Value::as_str) {
        Some("price_update") | Some("trade") => {}
        _ => return None,
    }

    let market_id = value
        .get("market")
        .or_else(|| value.get("asset_id"))
        .and_then(Value::as_str)?
        .to_string();
    if market_id.is_empty() {
        return None;
    }

    let price = value
        .get("price")
        .or_else(|| value.get("yes_price"))
        .and_then(as_f64)?;
    if !price.is_finite() {
        return None;
    }

    Some(PriceMessage { market_id, price })
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
