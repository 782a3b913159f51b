//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the first value (no SMA warm-up, no bias
//! adjustment), then EMA[i] = x[i]*k + EMA[i-1]*(1-k).
//! Every output is defined from the first sample on. MACD builds its fast,
//! slow and signal lines from this.

/// Raw recursive EMA over `values`, seeded by `values[0]`.
pub fn ema_values(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    if period == 0 {
        return out;
    }
    let k = 2.0 / (period as f64 + 1.0);
    let mut ema = 0.0;
    for (i, &x) in values.iter().enumerate() {
        ema = if i == 0 { x } else { x * k + ema * (1.0 - k) };
        out.push(ema);
    }
    out
}
