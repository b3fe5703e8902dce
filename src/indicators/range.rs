/// One bar of price data as seen by the range helpers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Range of the current bar against the previous one
///
/// Checks, in order: a high above the previous close, a low below the previous
/// close, then an outside bar. Returns `None` when none of them holds (a bar
/// that stays exactly at the previous close); callers treat that as "no range".
pub fn bar_range(current: Bar, previous: Bar) -> Option<f64> {
    if current.high > previous.close {
        Some(current.high - previous.close)
    } else if current.low < previous.close {
        Some(previous.close - current.low)
    } else if current.high > previous.high && current.low < previous.low {
        Some(current.high - current.low)
    } else {
        None
    }
}
