// Trading strategy module
pub mod engulfing_ema;

pub use engulfing_ema::{EngulfingEmaConfig, EngulfingEmaStrategy};

use crate::error::EvaluationError;
use crate::frame::Frame;
use crate::models::Signal;

/// Decision function called on every dispatched frame
///
/// Implementations must not call back into the pipeline. Returning an error is
/// treated as `Signal::NoSignal` for that tick.
pub trait SignalEvaluator: Send + Sync {
    /// Produce a signal for the latest row of the frame
    fn evaluate(&self, frame: &Frame) -> Result<Signal, EvaluationError>;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Rows needed before the strategy produces anything but `NoSignal`
    fn min_rows_required(&self) -> usize {
        1
    }
}

impl<E: SignalEvaluator + ?Sized> SignalEvaluator for Box<E> {
    fn evaluate(&self, frame: &Frame) -> Result<Signal, EvaluationError> {
        (**self).evaluate(frame)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn min_rows_required(&self) -> usize {
        (**self).min_rows_required()
    }
}
