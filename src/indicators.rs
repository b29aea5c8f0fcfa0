//! RSI computation using Wilder's smoothing (no TA library).

/// Default RSI lookback period.
pub const RSI_PERIOD: usize = 14;

/// Compute the Relative Strength Index over `closes` with Wilder smoothing.
///
/// `closes` must be ordered oldest-first; the caller owns that ordering, a
/// reversed series produces a wrong-but-plausible value. Returns `None` when
/// fewer than `period + 1` closes are supplied. Only the final RSI value is
/// returned.
///
/// Wilder smoothing seeds the gain/loss averages with a simple mean over the
/// first `period` transitions, then decays them exponentially with
/// alpha = 1/period. When the smoothed loss is zero the RSI is exactly 100,
/// avoiding the division by zero.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = closes[i] - closes[i - 1];
        avg_gain += change.max(0.0);
        avg_loss += (-change).max(0.0);
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    for i in (period + 1)..closes.len() {
        let change = closes[i] - closes[i - 1];
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}
