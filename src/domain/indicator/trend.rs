//! Long-trend health: the MA(short)/MA(long) ratio and the least-squares
//! slope of its trailing window.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

/// Fewest ratio samples a slope is fitted over.
pub const MIN_SLOPE_SAMPLES: usize = 5;

/// MA(short)/MA(long) from two SMA series over the same points. Both means
/// keep min_periods=1 values, so the raw ratio exists from day one; a point
/// is valid once the long window is full and the ratio is finite.
pub fn calculate_ma_ratio(ma_short: &IndicatorSeries, ma_long: &IndicatorSeries) -> IndicatorSeries {
    let indicator_type = IndicatorType::MaRatio {
        short: sma_period(ma_short),
        long: sma_period(ma_long),
    };

    let values = ma_short
        .values
        .iter()
        .zip(&ma_long.values)
        .map(|(s, l)| {
            let ratio = match (s.value.simple(), l.value.simple()) {
                (Some(s), Some(l)) => s / l,
                _ => f64::NAN,
            };
            IndicatorPoint {
                date: l.date,
                valid: l.valid && ratio.is_finite(),
                value: IndicatorValue::Simple(ratio),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

fn sma_period(series: &IndicatorSeries) -> usize {
    match series.indicator_type {
        IndicatorType::Sma(period) => period,
        _ => 0,
    }
}

/// Ordinary least squares slope of `values` against x = 0, 1, 2, ...
///
/// `None` for fewer than two samples or a non-finite result.
pub fn ols_slope(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mean_x = (nf - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / nf;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }
    let slope = sxy / sxx;
    if slope.is_finite() { Some(slope) } else { None }
}

/// Slope of the ratio over the `window` samples ending at `index`, using
/// every ratio value (valid or not) that is finite.
pub fn trailing_slope(ratio: &IndicatorSeries, index: usize, window: usize) -> Option<f64> {
    let start = (index + 1).saturating_sub(window);
    let samples: Vec<f64> = ratio.values.get(start..=index)?
        .iter()
        .filter_map(|p| p.value.simple())
        .filter(|v| v.is_finite())
        .collect();
    if samples.len() < MIN_SLOPE_SAMPLES {
        return None;
    }
    ols_slope(&samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::sma::calculate_sma;
    use crate::domain::nav::NavPoint;
    use chrono::NaiveDate;

    fn make_points(navs: &[f64]) -> Vec<NavPoint> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        navs.iter()
            .enumerate()
            .map(|(i, &nav)| NavPoint {
                date: start + chrono::Duration::days(i as i64),
                nav,
            })
            .collect()
    }

    #[test]
    fn slope_of_line() {
        let ys: Vec<f64> = (0..10).map(|x| 0.5 + 0.01 * x as f64).collect();
        assert!((ols_slope(&ys).unwrap() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn slope_of_flat_is_zero() {
        assert_eq!(ols_slope(&[1.0; 20]), Some(0.0));
    }

    #[test]
    fn slope_needs_two_points() {
        assert_eq!(ols_slope(&[1.0]), None);
        assert_eq!(ols_slope(&[]), None);
    }

    fn ratio(navs: &[f64], short: usize, long: usize) -> IndicatorSeries {
        let points = make_points(navs);
        calculate_ma_ratio(&calculate_sma(&points, short), &calculate_sma(&points, long))
    }

    #[test]
    fn ratio_valid_only_after_long_window() {
        let series = ratio(&[1.0; 12], 3, 10);
        assert!(!series.values[8].valid);
        assert!(series.values[9].valid);
        assert_eq!(series.values[9].value.simple(), Some(1.0));
    }

    #[test]
    fn ratio_above_one_in_uptrend() {
        let navs: Vec<f64> = (0..30).map(|i| 1.0 + i as f64 * 0.01).collect();
        let series = ratio(&navs, 5, 20);
        assert!(series.simple_at(29).unwrap() > 1.0);
    }

    #[test]
    fn ratio_carries_periods_and_partial_values() {
        let navs: Vec<f64> = (0..12).map(|i| 1.0 + i as f64 * 0.1).collect();
        let series = ratio(&navs, 2, 4);
        assert_eq!(series.indicator_type, IndicatorType::MaRatio { short: 2, long: 4 });
        assert_eq!(series.values.len(), 12);
        // both means cover the same two points
        assert_eq!(series.values[1].value.simple(), Some(1.0));
        assert!(!series.values[2].valid);
        let expected = ((1.2 + 1.3) / 2.0) / ((1.0 + 1.1 + 1.2 + 1.3) / 4.0);
        assert!((series.simple_at(3).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn ratio_of_empty_means_is_empty() {
        assert!(ratio(&[1.0; 5], 0, 10).values.is_empty());
    }

    #[test]
    fn trailing_slope_requires_samples() {
        let series = ratio(&[1.0; 12], 3, 10);
        assert_eq!(trailing_slope(&series, 2, 20), None);
        assert_eq!(trailing_slope(&series, 11, 20), Some(0.0));
    }
}
