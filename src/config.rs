use std::collections::HashMap;
use std::path::Path;

use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::feed::poloniex::{POLONIEX_WS_URL, TICKER_CHANNEL};
use crate::registry::PairRegistry;
use crate::strategy::EngulfingEmaConfig;

const DEFAULT_CONFIG_FILE: &str = "tickerbot";
const ENV_PREFIX: &str = "TICKERBOT";

#[derive(Debug, Clone, Deserialize)]
pub struct FeedSettings {
    /// Websocket endpoint of the ticker feed
    pub url: String,
    /// Channel to subscribe to once connected
    pub subscribe_channel: u64,
    /// Capacity of the queue between the feed and the dispatcher
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BufferSettings {
    /// Records kept per pair; must be greater than zero
    pub max_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderSettings {
    /// Signal endpoint; orders are only logged when unset
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Upper bound for one order submission
    pub timeout_ms: u64,
    /// Capacity of the queue between the dispatcher and the order worker.
    /// A buy signal that finds the queue full is dropped and logged.
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategySettings {
    pub ema_period: usize,
    pub min_rows: usize,
}

impl From<&StrategySettings> for EngulfingEmaConfig {
    fn from(settings: &StrategySettings) -> Self {
        EngulfingEmaConfig {
            ema_period: settings.ema_period,
            min_rows: settings.min_rows,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceSettings {
    pub base_url: String,
}

/// Application settings
///
/// Layered as: built-in defaults, then `tickerbot.toml` (or the file passed on
/// the command line), then `TICKERBOT__SECTION__KEY` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub feed: FeedSettings,
    pub buffer: BufferSettings,
    /// Channel id (as a string key) to pair symbol
    #[serde(default)]
    pub pairs: HashMap<String, String>,
    pub orders: OrderSettings,
    pub strategy: StrategySettings,
    pub binance: BinanceSettings,
}

impl Settings {
    /// Load settings from file and environment
    ///
    /// # Arguments
    /// * `path` - Config file to use; when `None`, an optional `tickerbot.toml`
    ///   in the working directory is read if present
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = with_defaults()?
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML string on top of the defaults, ignoring the environment
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let settings: Settings = with_defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check values that deserialization alone cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer.max_length == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.feed.queue_capacity == 0 || self.orders.queue_capacity == 0 {
            return Err(ConfigError::Load(
                "queue capacities must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the channel registry from the `pairs` table
    pub fn registry(&self) -> Result<PairRegistry, ConfigError> {
        PairRegistry::from_config(&self.pairs)
    }
}

fn with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Ok(Config::builder()
        .set_default("feed.url", POLONIEX_WS_URL)?
        .set_default("feed.subscribe_channel", TICKER_CHANNEL as i64)?
        .set_default("feed.queue_capacity", 1024_i64)?
        .set_default("buffer.max_length", 100_i64)?
        .set_default("orders.timeout_ms", 5_000_i64)?
        .set_default("orders.queue_capacity", 64_i64)?
        .set_default("strategy.ema_period", 50_i64)?
        .set_default("strategy.min_rows", 50_i64)?
        .set_default("binance.base_url", "https://api.binance.com")?)
}
