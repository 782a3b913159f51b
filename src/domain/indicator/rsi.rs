//! RSI (Relative Strength Index).
//!
//! Gains and losses of consecutive NAV differences are smoothed with an
//! exponential weight of span n (alpha = 2/(n+1)), seeded by the first
//! difference:
//! - avg[1] = gain[1]
//! - avg[i] = gain[i]*alpha + avg[i-1]*(1-alpha)
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: avg_loss is replaced by [`RSI_EPSILON`].
//! If both averages are 0 (flat history): RSI = 50.
//!
//! Warmup: first n points are invalid (n+1 points give n differences).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::nav::NavPoint;

pub const RSI_EPSILON: f64 = 1e-10;
pub const RSI_NEUTRAL: f64 = 50.0;

pub fn calculate_rsi(points: &[NavPoint], period: usize) -> IndicatorSeries {
    if period == 0 || points.len() < 2 {
        let values = points
            .iter()
            .map(|p| IndicatorPoint {
                date: p.date,
                valid: false,
                value: IndicatorValue::Simple(0.0),
            })
            .collect();

        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values,
        };
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut values = Vec::with_capacity(points.len());
    values.push(IndicatorPoint {
        date: points[0].date,
        valid: false,
        value: IndicatorValue::Simple(0.0),
    });

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for i in 1..points.len() {
        let change = points[i].nav - points[i - 1].nav;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);

        if i == 1 {
            avg_gain = gain;
            avg_loss = loss;
        } else {
            avg_gain = gain * alpha + avg_gain * (1.0 - alpha);
            avg_loss = loss * alpha + avg_loss * (1.0 - alpha);
        }

        let rsi = rsi_from_averages(avg_gain, avg_loss);
        values.push(IndicatorPoint {
            date: points[i].date,
            valid: i >= period && rsi.is_finite(),
            value: IndicatorValue::Simple(rsi),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

/// RSI from smoothed averages, clamped to [0, 100].
pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain < RSI_EPSILON && avg_loss < RSI_EPSILON {
        return RSI_NEUTRAL;
    }
    let denom = if avg_loss == 0.0 { RSI_EPSILON } else { avg_loss };
    let rs = avg_gain / denom;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}
