use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::error::MarketDataError;
use crate::models::Candle;

const BINANCE_API_BASE: &str = "https://api.binance.com";

/// Client for the Binance public market data API
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
}

// open time, open, high, low, close, volume, close time, quote asset volume,
// number of trades, taker buy base volume, taker buy quote volume, ignore
type KlineRow = (
    i64,
    String,
    String,
    String,
    String,
    String,
    i64,
    String,
    u64,
    String,
    String,
    Value,
);

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24hResponse {
    symbol: String,
    last_price: String,
    price_change_percent: String,
    high_price: String,
    low_price: String,
    volume: String,
    quote_volume: String,
}

/// 24 hour rolling statistics for one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct Ticker24h {
    pub symbol: String,
    pub last_price: f64,
    pub price_change_percent: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub volume: f64,
    pub quote_volume: f64,
}

impl BinanceClient {
    pub fn new() -> Self {
        Self::with_base_url(BINANCE_API_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Get historical candles
    ///
    /// # Arguments
    /// * `symbol` - Market pair, e.g. `BTCUSDT`
    /// * `interval` - Candle period, e.g. `1h`
    /// * `limit` - Maximum number of candles to return
    ///
    /// # Returns
    /// Candles sorted oldest first, as returned by the API
    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: u16,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let limit = limit.to_string();
        let body = self
            .get_json(
                &url,
                &[("symbol", symbol), ("interval", interval), ("limit", limit.as_str())],
            )
            .await?;

        let rows: Vec<KlineRow> =
            serde_json::from_value(body).map_err(|e| MarketDataError::Parse(e.to_string()))?;

        let candles = rows
            .into_iter()
            .map(candle_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(symbol, interval, count = candles.len(), "Fetched klines");
        Ok(candles)
    }

    /// Get 24 hour rolling statistics for a symbol
    pub async fn get_24h_ticker(&self, symbol: &str) -> Result<Ticker24h, MarketDataError> {
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        let body = self.get_json(&url, &[("symbol", symbol)]).await?;

        let raw: Ticker24hResponse =
            serde_json::from_value(body).map_err(|e| MarketDataError::Parse(e.to_string()))?;

        Ok(Ticker24h {
            symbol: raw.symbol,
            last_price: parse_float(&raw.last_price, "lastPrice")?,
            price_change_percent: parse_float(&raw.price_change_percent, "priceChangePercent")?,
            high_price: parse_float(&raw.high_price, "highPrice")?,
            low_price: parse_float(&raw.low_price, "lowPrice")?,
            volume: parse_float(&raw.volume, "volume")?,
            quote_volume: parse_float(&raw.quote_volume, "quoteVolume")?,
        })
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, MarketDataError> {
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        let text = response.text().await?;

        // Error bodies look like {"code": -1121, "msg": "Invalid symbol."}
        if let Ok(err) = serde_json::from_str::<ApiErrorBody>(&text) {
            return Err(MarketDataError::Api {
                code: err.code,
                msg: err.msg,
            });
        }

        if !status.is_success() {
            return Err(MarketDataError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| MarketDataError::Parse(e.to_string()))
    }
}

impl Default for BinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_float(value: &str, field: &str) -> Result<f64, MarketDataError> {
    value
        .parse::<f64>()
        .map_err(|_| MarketDataError::Parse(format!("{} is not a number: {:?}", field, value)))
}

fn parse_millis(ms: i64) -> Result<DateTime<Utc>, MarketDataError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| MarketDataError::Parse(format!("timestamp out of range: {}", ms)))
}

fn candle_from_row(row: KlineRow) -> Result<Candle, MarketDataError> {
    let (date, open, high, low, close, volume, close_time, qa_volume, nof_trades, tbba, tbqa, _) =
        row;

    Ok(Candle {
        date: parse_millis(date)?,
        open: parse_float(&open, "open")?,
        high: parse_float(&high, "high")?,
        low: parse_float(&low, "low")?,
        close: parse_float(&close, "close")?,
        volume: parse_float(&volume, "volume")?,
        close_time: parse_millis(close_time)?,
        qa_volume: parse_float(&qa_volume, "qa_volume")?,
        nof_trades,
        tbba_volume: parse_float(&tbba, "tbba_volume")?,
        tbqa_volume: parse_float(&tbqa, "tbqa_volume")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::Matcher;

    const KLINES_BODY: &str = r#"[
        [1583236800000,"0.02608580","0.02613449","0.02581001","0.02581078","59.40688146",1583240399999,"1.53",120,"30.1","0.78","0"],
        [1583240400000,"0.02581078","0.02600000","0.02570000","0.02590000","40.00000000",1583243999999,"1.03",80,"20.0","0.51","0"]
    ]"#;

    #[tokio::test]
    async fn test_get_klines() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v3/klines")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("symbol".into(), "ETHBTC".into()),
                Matcher::UrlEncoded("interval".into(), "1h".into()),
                Matcher::UrlEncoded("limit".into(), "2".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(KLINES_BODY)
            .create_async()
            .await;

        let client = BinanceClient::with_base_url(server.url());
        let candles = client.get_klines("ETHBTC", "1h", 2).await.unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(
            candles[0].date,
            Utc.with_ymd_and_hms(2020, 3, 3, 12, 0, 0).unwrap()
        );
        assert_eq!(candles[0].open, 0.02608580);
        assert_eq!(candles[0].nof_trades, 120);
        assert_eq!(candles[1].close, 0.0259);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_klines_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v3/klines")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"code":-1121,"msg":"Invalid symbol."}"#)
            .create_async()
            .await;

        let client = BinanceClient::with_base_url(server.url());
        let result = client.get_klines("NOPE", "1h", 10).await;

        match result {
            Err(MarketDataError::Api { code, msg }) => {
                assert_eq!(code, -1121);
                assert_eq!(msg, "Invalid symbol.");
            }
            other => panic!("expected api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_klines_bad_number() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v3/klines")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[[1583236800000,"x","1","1","1","1",1583240399999,"1",1,"1","1","0"]]"#)
            .create_async()
            .await;

        let client = BinanceClient::with_base_url(server.url());
        let result = client.get_klines("ETHBTC", "1h", 1).await;

        assert!(matches!(result, Err(MarketDataError::Parse(_))));
    }

    #[tokio::test]
    async fn test_get_24h_ticker() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v3/ticker/24hr")
            .match_query(Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()))
            .with_status(200)
            .with_body(
                r#"{"symbol":"BTCUSDT","lastPrice":"100.5","priceChangePercent":"-1.2",
                    "highPrice":"105.0","lowPrice":"95.0","volume":"10.0","quoteVolume":"1000.0",
                    "openPrice":"101.7","count":12}"#,
            )
            .create_async()
            .await;

        let client = BinanceClient::with_base_url(format!("{}/", server.url()));
        let ticker = client.get_24h_ticker("BTCUSDT").await.unwrap();

        assert_eq!(ticker.symbol, "BTCUSDT");
        assert_eq!(ticker.last_price, 100.5);
        assert_eq!(ticker.price_change_percent, -1.2);
        assert_eq!(ticker.quote_volume, 1000.0);
    }

    #[tokio::test]
    async fn test_unexpected_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v3/ticker/24hr")
            .match_query(Matcher::Any)
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = BinanceClient::with_base_url(server.url());
        let result = client.get_24h_ticker("BTCUSDT").await;

        assert!(matches!(result, Err(MarketDataError::Status { status: 502, .. })));
    }
}
