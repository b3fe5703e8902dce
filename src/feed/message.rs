use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::MessageError;
use crate::models::{ChannelId, TickerRecord};

/// Ticker fields carried by one inbound frame, before a capture time is attached
#[derive(Debug, Clone, PartialEq)]
pub struct TickerUpdate {
    pub channel: ChannelId,
    pub close: f64,
    pub low_ask: f64,
    pub high_ask: f64,
    pub percentage_change: f64,
    pub volume: f64,
    pub quote_volume: f64,
    pub is_frozen: i64,
    pub high: f64,
    pub low: f64,
}

impl TickerUpdate {
    pub fn into_record(self, observed_at: DateTime<Utc>) -> TickerRecord {
        TickerRecord {
            pair_id: self.channel,
            close: self.close,
            low_ask: self.low_ask,
            high_ask: self.high_ask,
            percentage_change: self.percentage_change,
            volume: self.volume,
            quote_volume: self.quote_volume,
            is_frozen: self.is_frozen,
            high: self.high,
            low: self.low,
            observed_at,
        }
    }
}

/// Parse a raw text frame from the feed
pub fn parse_ticker(raw: &str) -> Result<TickerUpdate, MessageError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| MessageError::InvalidJson(e.to_string()))?;
    parse_ticker_value(&value)
}

/// Classify a decoded frame as a ticker update
///
/// A ticker frame is an array whose last element is the ticker payload:
/// `[1002, null, [id, "close", ...]]` from the live feed, or `[id, [id, close, ...]]`.
/// Heartbeats (`[1010]`) and subscription acks (`[1002, 1]`) have no payload.
pub fn parse_ticker_value(value: &Value) -> Result<TickerUpdate, MessageError> {
    let fields = value
        .as_array()
        .filter(|outer| outer.len() >= 2)
        .and_then(|outer| outer.last())
        .and_then(Value::as_array)
        .ok_or(MessageError::NoPayload)?;

    if fields.len() < 10 {
        return Err(MessageError::TooFewFields(fields.len()));
    }

    Ok(TickerUpdate {
        channel: channel_id(&fields[0])?,
        close: float(&fields[1], "close")?,
        low_ask: float(&fields[2], "low_ask")?,
        high_ask: float(&fields[3], "high_ask")?,
        percentage_change: float(&fields[4], "percentage_change")?,
        volume: float(&fields[5], "volume")?,
        quote_volume: float(&fields[6], "quote_volume")?,
        is_frozen: integer(&fields[7], "is_frozen")?,
        high: float(&fields[8], "high")?,
        low: float(&fields[9], "low")?,
    })
}

fn not_numeric(field: &'static str, value: &Value) -> MessageError {
    MessageError::NotNumeric {
        field,
        value: value.to_string(),
    }
}

// The feed sends prices as strings and flags as numbers; accept either.
fn float(value: &Value, field: &'static str) -> Result<f64, MessageError> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
    .ok_or_else(|| not_numeric(field, value))
}

fn channel_id(value: &Value) -> Result<ChannelId, MessageError> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<ChannelId>().ok(),
        _ => None,
    }
    .ok_or_else(|| not_numeric("pair_id", value))
}

fn integer(value: &Value, field: &'static str) -> Result<i64, MessageError> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| not_numeric(field, value))
}
