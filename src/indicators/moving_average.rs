/// Simple average of the last `period` values
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }

    let sum: f64 = values.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// Exponential moving average aligned with `values`
///
/// The first `period - 1` entries are `None`; the value at `period - 1` is
/// seeded with the SMA of the first `period` values.
pub fn ema_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut series = vec![None; values.len()];
    let Some(seed) = sma(values.get(..period).unwrap_or(&[]), period) else {
        return series;
    };

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema = seed;
    series[period - 1] = Some(ema);

    for (i, value) in values.iter().enumerate().skip(period) {
        ema = (value - ema) * multiplier + ema;
        series[i] = Some(ema);
    }

    series
}

/// EMA at the last value
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    ema_series(values, period).last().copied().flatten()
}
