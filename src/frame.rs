use chrono::{DateTime, Utc};

use crate::models::{Candle, ChannelId, TickerRecord};

/// Column order of a ticker frame
pub const TICKER_COLUMNS: [&str; 10] = [
    "pair_id",
    "close",
    "low_ask",
    "high_ask",
    "percentage_change",
    "volume",
    "quote_volume",
    "is_frozen",
    "high",
    "low",
];

/// Column order of a candle frame
pub const CANDLE_COLUMNS: [&str; 9] = [
    "open",
    "high",
    "low",
    "close",
    "volume",
    "qa_volume",
    "nof_trades",
    "tbba_volume",
    "tbqa_volume",
];

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Float(Vec<f64>),
    Category(Vec<ChannelId>),
}

impl ColumnData {
    fn len(&self) -> usize {
        match self {
            ColumnData::Float(values) => values.len(),
            ColumnData::Category(values) => values.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: &'static str,
    pub data: ColumnData,
}

/// Immutable table handed to a strategy
///
/// Rows are snapshots in buffer order, indexed by timestamp. Every column has
/// exactly one value per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    index_name: &'static str,
    index: Vec<DateTime<Utc>>,
    columns: Vec<Column>,
}

impl Frame {
    fn new(index_name: &'static str, index: Vec<DateTime<Utc>>, columns: Vec<Column>) -> Self {
        debug_assert!(columns.iter().all(|c| c.data.len() == index.len()));
        Self {
            index_name,
            index,
            columns,
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index_name(&self) -> &str {
        self.index_name
    }

    /// Row timestamps, in row order
    pub fn index(&self) -> &[DateTime<Utc>] {
        &self.index
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Values of a float column
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.iter().find(|c| c.name == name).and_then(|c| match &c.data {
            ColumnData::Float(values) => Some(values.as_slice()),
            ColumnData::Category(_) => None,
        })
    }

    /// Values of the categorical `pair_id` column, if this is a ticker frame
    pub fn pair_ids(&self) -> Option<&[ChannelId]> {
        self.columns.iter().find_map(|c| match &c.data {
            ColumnData::Category(values) if c.name == "pair_id" => Some(values.as_slice()),
            _ => None,
        })
    }

    pub fn row(&self, position: usize) -> Option<Row<'_>> {
        (position < self.len()).then_some(Row {
            frame: self,
            position,
        })
    }

    pub fn last_row(&self) -> Option<Row<'_>> {
        self.len().checked_sub(1).and_then(|i| self.row(i))
    }

    /// Row counted from the end, `0` being the last row
    pub fn row_from_end(&self, offset: usize) -> Option<Row<'_>> {
        self.len()
            .checked_sub(offset + 1)
            .and_then(|i| self.row(i))
    }
}

/// Borrowed view of one frame row
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    frame: &'a Frame,
    position: usize,
}

impl<'a> Row<'a> {
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.frame.index[self.position]
    }

    /// Float value of a column in this row
    pub fn get(&self, name: &str) -> Option<f64> {
        self.frame
            .column(name)
            .map(|values| values[self.position])
    }
}

/// Turns buffered records into frames
pub struct FrameBuilder;

impl FrameBuilder {
    /// Build a ticker frame
    ///
    /// One row per record, in input order. All numeric fields, `is_frozen`
    /// included, become f64 columns; `pair_id` stays categorical and
    /// `observed_at` becomes the index.
    pub fn build(records: &[TickerRecord]) -> Frame {
        let columns = vec![
            Column {
                name: "pair_id",
                data: ColumnData::Category(records.iter().map(|r| r.pair_id).collect()),
            },
            float_column("close", records, |r| r.close),
            float_column("low_ask", records, |r| r.low_ask),
            float_column("high_ask", records, |r| r.high_ask),
            float_column("percentage_change", records, |r| r.percentage_change),
            float_column("volume", records, |r| r.volume),
            float_column("quote_volume", records, |r| r.quote_volume),
            float_column("is_frozen", records, |r| r.is_frozen as f64),
            float_column("high", records, |r| r.high),
            float_column("low", records, |r| r.low),
        ];

        Frame::new(
            "observed_at",
            records.iter().map(|r| r.observed_at).collect(),
            columns,
        )
    }

    /// Build a candle frame indexed by candle open time
    pub fn build_candles(candles: &[Candle]) -> Frame {
        let columns = vec![
            float_column("open", candles, |c| c.open),
            float_column("high", candles, |c| c.high),
            float_column("low", candles, |c| c.low),
            float_column("close", candles, |c| c.close),
            float_column("volume", candles, |c| c.volume),
            float_column("qa_volume", candles, |c| c.qa_volume),
            float_column("nof_trades", candles, |c| c.nof_trades as f64),
            float_column("tbba_volume", candles, |c| c.tbba_volume),
            float_column("tbqa_volume", candles, |c| c.tbqa_volume),
        ];

        Frame::new("date", candles.iter().map(|c| c.date).collect(), columns)
    }
}

fn float_column<T>(name: &'static str, items: &[T], value: fn(&T) -> f64) -> Column {
    Column {
        name,
        data: ColumnData::Float(items.iter().map(value).collect()),
    }
}
