use super::SignalEvaluator;
use crate::error::EvaluationError;
use crate::frame::Frame;
use crate::indicators::{bar_range, ema, Bar};
use crate::models::Signal;

#[derive(Debug, Clone, PartialEq)]
pub struct EngulfingEmaConfig {
    pub ema_period: usize,
    pub min_rows: usize,
}

impl Default for EngulfingEmaConfig {
    fn default() -> Self {
        Self {
            ema_period: 50,
            min_rows: 50,
        }
    }
}

/// Bullish engulfing bar near the EMA
///
/// Buys when the previous bar dipped to or below the EMA (taken at the previous
/// bar) and the current bar opens below the previous close and closes above the
/// previous open. Needs `open`, `high`, `low` and `close` columns; ticker frames
/// carry no `open` and are reported as `MissingColumn("open")` once enough rows
/// have been buffered.
///
/// Never produces `Sell`.
#[derive(Debug, Clone, Default)]
pub struct EngulfingEmaStrategy {
    config: EngulfingEmaConfig,
}

impl EngulfingEmaStrategy {
    pub fn new(config: EngulfingEmaConfig) -> Self {
        Self { config }
    }

    fn required<'a>(frame: &'a Frame, name: &'static str) -> Result<&'a [f64], EvaluationError> {
        frame.column(name).ok_or(EvaluationError::MissingColumn(name))
    }
}

impl SignalEvaluator for EngulfingEmaStrategy {
    fn evaluate(&self, frame: &Frame) -> Result<Signal, EvaluationError> {
        if frame.len() < self.min_rows_required() {
            tracing::trace!(
                rows = frame.len(),
                needed = self.min_rows_required(),
                "Not enough rows yet"
            );
            return Ok(Signal::NoSignal);
        }

        let closes = Self::required(frame, "close")?;
        let highs = Self::required(frame, "high")?;
        let lows = Self::required(frame, "low")?;
        let opens = Self::required(frame, "open")?;

        let current = frame.len() - 1;
        let previous = current - 1;

        let Some(ema_previous) = ema(&closes[..=previous], self.config.ema_period) else {
            return Ok(Signal::NoSignal);
        };

        let range = bar_range(
            Bar {
                high: highs[current],
                low: lows[current],
                close: closes[current],
            },
            Bar {
                high: highs[previous],
                low: lows[previous],
                close: closes[previous],
            },
        );
        match range {
            Some(atr) => tracing::debug!(
                ema = ema_previous,
                atr,
                take_profit = 3.0 * atr,
                stop_loss = atr,
                "Evaluated bar"
            ),
            None => tracing::debug!(ema = ema_previous, "Evaluated bar without range"),
        }

        let engulfing = lows[previous] <= ema_previous
            && opens[current] < closes[previous]
            && closes[current] > opens[previous];

        Ok(if engulfing {
            Signal::Buy
        } else {
            Signal::NoSignal
        })
    }

    fn name(&self) -> &str {
        "EngulfingEmaStrategy"
    }

    fn min_rows_required(&self) -> usize {
        self.config.min_rows.max(self.config.ema_period + 1).max(2)
    }
}
