//! Simple Moving Average with min_periods=1 semantics.
//!
//! SMA(n)[i] = mean(x[max(0, i-n+1)..=i]). The value is always computed over
//! whatever history exists; `valid` is only set once the full window of n
//! points is populated.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::nav::NavPoint;

pub fn calculate_sma(points: &[NavPoint], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Sma(period),
            values: Vec::new(),
        };
    }

    let navs: Vec<f64> = points.iter().map(|p| p.nav).collect();
    let values = trailing_means(&navs, period)
        .into_iter()
        .enumerate()
        .map(|(i, mean)| IndicatorPoint {
            date: points[i].date,
            valid: i + 1 >= period,
            value: IndicatorValue::Simple(mean),
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values,
    }
}

/// Trailing mean of up to `period` values ending at each index.
fn trailing_means(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        let start = (i + 1).saturating_sub(period);
        let window = &values[start..=i];
        out.push(window.iter().sum::<f64>() / window.len() as f64);
    }
    out
}
