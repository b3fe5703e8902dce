use std::collections::HashMap;

use crate::error::ConfigError;
use crate::models::ChannelId;

/// Read-only mapping from feed channel id to pair symbol
///
/// Built once at startup; there are no mutation methods.
#[derive(Debug, Clone)]
pub struct PairRegistry {
    pairs: HashMap<ChannelId, String>,
}

impl PairRegistry {
    /// Build a registry from already-parsed channel ids
    pub fn new(pairs: HashMap<ChannelId, String>) -> Result<Self, ConfigError> {
        if pairs.is_empty() {
            return Err(ConfigError::NoPairs);
        }
        if let Some((channel, _)) = pairs.iter().find(|(_, symbol)| symbol.trim().is_empty()) {
            return Err(ConfigError::EmptySymbol(*channel));
        }
        Ok(Self { pairs })
    }

    /// Build a registry from config entries, where channel ids arrive as strings
    ///
    /// # Arguments
    /// * `entries` - channel id string to pair symbol, e.g. `"121" => "USDT_BTC"`
    pub fn from_config(entries: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut pairs = HashMap::with_capacity(entries.len());
        for (channel, symbol) in entries {
            let id = channel
                .trim()
                .parse::<ChannelId>()
                .map_err(|_| ConfigError::InvalidChannel(channel.clone()))?;
            pairs.insert(id, symbol.clone());
        }
        Self::new(pairs)
    }

    /// Look up the pair for a channel; `None` means the message should be ignored
    pub fn resolve(&self, channel: ChannelId) -> Option<&str> {
        self.pairs.get(&channel).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// All tracked pair symbols, in no particular order
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.pairs.values().map(String::as_str)
    }
}
