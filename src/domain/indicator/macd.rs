//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! All EMAs are seeded from the first sample of their input, so every point
//! is valid from the first NAV on. Default parameters: fast=12, slow=26,
//! signal=9.

use serde::Serialize;

use crate::domain::indicator::{
    ema_values, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue,
};
use crate::domain::nav::NavPoint;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    points: &[NavPoint],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    if points.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        };
    }

    let navs: Vec<f64> = points.iter().map(|p| p.nav).collect();
    let ema_fast = ema_values(&navs, fast);
    let ema_slow = ema_values(&navs, slow);
    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema_values(&macd_line, signal_period);

    let values = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let line = macd_line[i];
            let signal = signal_line[i];
            IndicatorPoint {
                date: p.date,
                valid: line.is_finite() && signal.is_finite(),
                value: IndicatorValue::Macd {
                    line,
                    signal,
                    histogram: line - signal,
                },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

/// MACD/signal crossing observed between two consecutive days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MacdCross {
    /// Golden cross with the MACD line above zero.
    GoldenStrong,
    /// Golden cross at or below zero.
    GoldenWeak,
    Dead,
    NoCross,
}

impl MacdCross {
    /// Compare the sign of `macd - signal` between `prev` and `curr`, each a
    /// `(macd, signal)` pair.
    pub fn detect(prev: (f64, f64), curr: (f64, f64)) -> Self {
        let (macd_prev, signal_prev) = prev;
        let (macd, signal) = curr;
        if macd > signal && macd_prev <= signal_prev {
            if macd > 0.0 {
                MacdCross::GoldenStrong
            } else {
                MacdCross::GoldenWeak
            }
        } else if macd < signal && macd_prev >= signal_prev {
            MacdCross::Dead
        } else {
            MacdCross::NoCross
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MacdCross::GoldenStrong => "golden_strong",
            MacdCross::GoldenWeak => "golden_weak",
            MacdCross::Dead => "dead",
            MacdCross::NoCross => "none",
        }
    }
}

/// `(line, signal)` of a MACD point, if it is valid.
pub fn macd_pair(point: &IndicatorPoint) -> Option<(f64, f64)> {
    match point.value {
        IndicatorValue::Macd { line, signal, .. } if point.valid => Some((line, signal)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_points(navs: &[f64]) -> Vec<NavPoint> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        navs.iter()
            .enumerate()
            .map(|(i, &nav)| NavPoint {
                date: start + chrono::Duration::days(i as i64),
                nav,
            })
            .collect()
    }

    fn macd_12_26_9(navs: &[f64]) -> IndicatorSeries {
        calculate_macd(&make_points(navs), DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
    }

    #[test]
    fn macd_flat_is_zero() {
        let series = macd_12_26_9(&[1.2; 100]);
        for p in &series.values {
            let (line, signal) = macd_pair(p).unwrap();
            assert!(line.abs() < 1e-12);
            assert!(signal.abs() < 1e-12);
        }
    }

    #[test]
    fn macd_first_point_is_zero() {
        let series = macd_12_26_9(&[1.0, 2.0, 3.0]);
        let (line, signal) = macd_pair(&series.values[0]).unwrap();
        assert_eq!(line, 0.0);
        assert_eq!(signal, 0.0);
    }

    #[test]
    fn macd_rising_series_positive() {
        let navs: Vec<f64> = (0..60).map(|i| 1.0 + i as f64 * 0.01).collect();
        let series = macd_12_26_9(&navs);
        let (line, signal) = macd_pair(&series.values[59]).unwrap();
        assert!(line > 0.0);
        assert!(line > signal);
    }

    #[test]
    fn macd_histogram_is_difference() {
        let navs: Vec<f64> = (0..40).map(|i| 1.0 + ((i as f64) * 0.3).sin() * 0.1).collect();
        let series = calculate_macd(&make_points(&navs), 3, 6, 4);
        for p in &series.values {
            if let IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } = p.value
            {
                assert!((histogram - (line - signal)).abs() < 1e-15);
            } else {
                panic!("expected Macd value");
            }
        }
    }

    #[test]
    fn macd_zero_period_empty() {
        assert!(calculate_macd(&make_points(&[1.0]), 0, 26, 9).values.is_empty());
    }

    #[test]
    fn cross_golden_strong() {
        assert_eq!(
            MacdCross::detect((0.01, 0.02), (0.03, 0.02)),
            MacdCross::GoldenStrong
        );
    }

    #[test]
    fn cross_golden_weak() {
        assert_eq!(
            MacdCross::detect((-0.03, -0.02), (-0.01, -0.02)),
            MacdCross::GoldenWeak
        );
    }

    #[test]
    fn cross_dead() {
        assert_eq!(MacdCross::detect((0.03, 0.02), (0.01, 0.02)), MacdCross::Dead);
    }

    #[test]
    fn cross_none_when_same_side() {
        assert_eq!(
            MacdCross::detect((0.03, 0.02), (0.04, 0.02)),
            MacdCross::NoCross
        );
        assert_eq!(MacdCross::detect((0.0, 0.0), (0.0, 0.0)), MacdCross::NoCross);
    }
}
