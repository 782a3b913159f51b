//! Bollinger Bands.
//!
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! StdDev is the sample standard deviation (divides by N-1).
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) points are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::nav::NavPoint;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_MULT_X100: u32 = 200;

pub fn calculate_bollinger(
    points: &[NavPoint],
    period: usize,
    stddev_mult_x100: u32,
) -> IndicatorSeries {
    let mut values = Vec::with_capacity(points.len());
    let warmup = period.saturating_sub(1);
    let mult = stddev_mult_x100 as f64 / 100.0;

    for i in 0..points.len() {
        let valid = period >= 2 && i >= warmup;

        let (upper, middle, lower) = if valid {
            let window = &points[i + 1 - period..=i];
            let middle = window.iter().map(|p| p.nav).sum::<f64>() / period as f64;
            let variance = window
                .iter()
                .map(|p| {
                    let diff = p.nav - middle;
                    diff * diff
                })
                .sum::<f64>()
                / (period - 1) as f64;
            let stddev = variance.sqrt();
            (middle + mult * stddev, middle, middle - mult * stddev)
        } else {
            (0.0, 0.0, 0.0)
        };

        values.push(IndicatorPoint {
            date: points[i].date,
            valid,
            value: IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            },
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        },
        values,
    }
}

/// `(upper, middle, lower)` of a valid Bollinger point.
pub fn bands(point: &IndicatorPoint) -> Option<(f64, f64, f64)> {
    match point.value {
        IndicatorValue::Bollinger {
            upper,
            middle,
            lower,
        } if point.valid => Some((upper, middle, lower)),
        _ => None,
    }
}
