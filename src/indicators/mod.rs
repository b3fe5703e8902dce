// Indicator helpers used by the shipped strategies

pub mod moving_average;
pub mod range;

pub use moving_average::{ema, ema_series, sma};
pub use range::{bar_range, Bar};
