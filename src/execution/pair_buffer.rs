use crate::error::ConfigError;
use crate::models::TickerRecord;
use crate::registry::PairRegistry;
use std::collections::{HashMap, VecDeque};

/// Bounded rolling window of ticker records for one pair
///
/// Records are kept oldest first. The length never exceeds `capacity`.
#[derive(Debug, Clone)]
pub struct PairBuffer {
    records: VecDeque<TickerRecord>,
    capacity: usize,
}

impl PairBuffer {
    /// Create an empty buffer
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of records to keep, must be at least 1
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        Ok(Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    /// Add a record at the tail
    ///
    /// If the buffer is full, removes the oldest record
    pub fn append(&mut self, record: TickerRecord) {
        self.records.push_back(record);

        while self.records.len() > self.capacity {
            self.records.pop_front();
        }
    }

    /// Current contents, oldest first
    pub fn snapshot(&self) -> Vec<TickerRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&TickerRecord> {
        self.records.back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Owned table of per-pair buffers
///
/// One buffer per registered pair, created empty at startup. Only the
/// dispatcher holds this, so no locking is needed.
#[derive(Debug, Clone)]
pub struct PairBook {
    buffers: HashMap<String, PairBuffer>,
}

impl PairBook {
    /// Create an empty buffer for every symbol in the registry
    pub fn new(registry: &PairRegistry, capacity: usize) -> Result<Self, ConfigError> {
        let mut buffers = HashMap::with_capacity(registry.len());
        for symbol in registry.symbols() {
            buffers.insert(symbol.to_string(), PairBuffer::new(capacity)?);
        }
        Ok(Self { buffers })
    }

    /// Append a record to a tracked pair and return its updated buffer
    ///
    /// Returns `None` for a pair that is not tracked; no buffer is created.
    pub fn append(&mut self, pair: &str, record: TickerRecord) -> Option<&PairBuffer> {
        let buffer = self.buffers.get_mut(pair)?;
        buffer.append(record);
        Some(buffer)
    }

    pub fn get(&self, pair: &str) -> Option<&PairBuffer> {
        self.buffers.get(pair)
    }

    /// Number of records held for a pair (0 if untracked)
    pub fn record_count(&self, pair: &str) -> usize {
        self.buffers.get(pair).map(PairBuffer::len).unwrap_or(0)
    }

    /// Total records held across all pairs
    pub fn total_records(&self) -> usize {
        self.buffers.values().map(PairBuffer::len).sum()
    }

    pub fn pairs(&self) -> Vec<String> {
        self.buffers.keys().cloned().collect()
    }
}
