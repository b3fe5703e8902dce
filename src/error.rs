use thiserror::Error;

use crate::models::ChannelId;

/// Startup configuration problems; all of them are fatal
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("buffer capacity must be greater than zero")]
    ZeroCapacity,

    #[error("channel id {0:?} is not a non-negative integer")]
    InvalidChannel(String),

    #[error("no pairs configured")]
    NoPairs,

    #[error("pair symbol for channel {0} is empty")]
    EmptySymbol(ChannelId),

    #[error("{0}")]
    Load(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}

/// Raised when an inbound frame is not ticker-shaped
#[derive(Error, Debug, PartialEq)]
pub enum MessageError {
    #[error("not valid JSON: {0}")]
    InvalidJson(String),

    #[error("no ticker payload")]
    NoPayload,

    #[error("ticker payload has {0} fields, need at least 10")]
    TooFewFields(usize),

    #[error("field {field} is not numeric: {value}")]
    NotNumeric { field: &'static str, value: String },
}

/// Raised by a strategy that cannot evaluate a frame
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("frame has no column named {0}")]
    MissingColumn(&'static str),

    #[error("{0}")]
    Failed(String),
}

/// Order submission failures; never retried
#[derive(Error, Debug)]
pub enum OrderError {
    #[error("order rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("order transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("order submission timed out after {0}ms")]
    Timeout(u64),

    #[error("order queue is full")]
    QueueFull,

    #[error("order queue is closed")]
    QueueClosed,
}

/// Per-message failures of the dispatch pipeline
///
/// None of these stop the stream; they are logged and the message is dropped.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("malformed message: {0}")]
    MalformedMessage(#[from] MessageError),

    #[error("unknown channel {0}")]
    UnknownChannel(ChannelId),

    #[error("decision function failed for {pair}: {source}")]
    DecisionFunction {
        pair: String,
        #[source]
        source: EvaluationError,
    },

    #[error("order submission failed for {pair}: {source}")]
    OrderSubmission {
        pair: String,
        #[source]
        source: OrderError,
    },
}

/// Failures of the historical market data REST client
#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error {code}: {msg}")]
    Api { code: i64, msg: String },

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not parse response: {0}")]
    Parse(String),
}

/// Transport-level failures; these end the ingestion loop
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to encode subscription: {0}")]
    Encode(#[from] serde_json::Error),
}
