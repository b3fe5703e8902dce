use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc::Sender;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::error::FeedError;

pub const POLONIEX_WS_URL: &str = "wss://api2.poloniex.com";

/// Channel carrying ticker updates for every market
pub const TICKER_CHANNEL: u64 = 1002;

/// Websocket transport for the Poloniex ticker channel
///
/// Forwards every text frame, untouched and in arrival order, into a bounded
/// queue. Classification happens on the consumer side.
pub struct PoloniexFeed {
    url: String,
    channel: u64,
}

impl PoloniexFeed {
    pub fn new(url: impl Into<String>, channel: u64) -> Self {
        Self {
            url: url.into(),
            channel,
        }
    }

    pub fn subscribe_request(&self) -> serde_json::Value {
        json!({ "command": "subscribe", "channel": self.channel })
    }

    /// Connect, subscribe and forward frames until the stream ends
    ///
    /// Waits for queue capacity rather than dropping frames, so ordering is kept.
    /// Returns the number of forwarded frames once the server closes the
    /// connection or the consumer goes away. Does not reconnect.
    pub async fn run(&self, sink: Sender<String>) -> Result<u64, FeedError> {
        tracing::info!(url = %self.url, channel = self.channel, "Connecting to ticker feed");
        let (ws, _) = connect_async(self.url.as_str()).await?;
        let (mut write, mut read) = ws.split();

        let request = serde_json::to_string(&self.subscribe_request())?;
        write.send(Message::Text(request.into())).await?;
        tracing::info!(channel = self.channel, "Subscribed to ticker channel");

        let mut forwarded = 0u64;
        while let Some(msg) = read.next().await {
            match msg? {
                Message::Text(text) => {
                    if sink.send(text.as_str().to_owned()).await.is_err() {
                        tracing::info!("Message consumer stopped, closing feed");
                        break;
                    }
                    forwarded += 1;
                }
                Message::Close(frame) => {
                    tracing::warn!(?frame, "Feed closed by server");
                    break;
                }
                // Pings are answered by tungstenite while reading
                _ => {}
            }
        }

        tracing::info!(forwarded, "Ticker feed ended");
        Ok(forwarded)
    }
}

impl Default for PoloniexFeed {
    fn default() -> Self {
        Self::new(POLONIEX_WS_URL, TICKER_CHANNEL)
    }
}
