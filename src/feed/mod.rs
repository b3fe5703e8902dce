// Market data inputs: live ticker feed, message classification, REST history
pub mod binance;
pub mod message;
pub mod poloniex;

pub use binance::{BinanceClient, Ticker24h};
pub use message::{parse_ticker, parse_ticker_value, TickerUpdate};
pub use poloniex::PoloniexFeed;
