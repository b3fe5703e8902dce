use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Numeric channel identifier used by the ticker feed
pub type ChannelId = u64;

/// One ticker snapshot for a pair
///
/// `observed_at` is the local capture time, not the exchange time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TickerRecord {
    pub pair_id: ChannelId,
    pub close: f64,
    pub low_ask: f64,
    pub high_ask: f64,
    pub percentage_change: f64,
    pub volume: f64,
    pub quote_volume: f64,
    pub is_frozen: i64,
    pub high: f64,
    pub low: f64,
    pub observed_at: DateTime<Utc>,
}

/// OHLCV candle from the historical klines endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub date: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: DateTime<Utc>,
    pub qa_volume: f64,
    pub nof_trades: u64,
    pub tbba_volume: f64,
    pub tbqa_volume: f64,
}

/// Trading signal returned by a strategy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    NoSignal,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Buy => write!(f, "buy"),
            Signal::Sell => write!(f, "sell"),
            Signal::NoSignal => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
}

/// Outbound order request, one per buy signal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderRequest {
    pub id: Uuid,
    pub pair: String,
    pub side: OrderSide,
    pub issued_at: DateTime<Utc>,
}

impl OrderRequest {
    pub fn buy(pair: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            pair: pair.into(),
            side: OrderSide::Buy,
            issued_at: Utc::now(),
        }
    }
}

/// Acknowledgement returned by an order gateway
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderAck {
    pub id: Uuid,
    pub pair: String,
    pub status: String,
}
