//! Assembles the per-day [`IndicatorSnapshot`] from the individual series.

use crate::domain::indicator::bollinger::{self, calculate_bollinger};
use crate::domain::indicator::macd::{calculate_macd, macd_pair, MacdCross};
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::snapshot::{BollingerPosition, IndicatorSnapshot, TrendDirection};
use crate::domain::indicator::trend::{calculate_ma_ratio, trailing_slope};
use crate::domain::indicator::{finite, macd};
use crate::domain::nav::{NavPoint, MIN_NAV_POINTS};

pub const MA_SHORT_PERIOD: usize = 50;
pub const MA_LONG_PERIOD: usize = 250;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorParams {
    pub rsi_long: usize,
    pub rsi_short: usize,
    pub ma_short: usize,
    pub ma_long: usize,
    /// Ratio samples the trend slope is fitted over.
    pub trend_window: usize,
    pub trend_slope_threshold: f64,
    pub bollinger_period: usize,
    pub bollinger_mult_x100: u32,
    /// Prefix length below which every windowed field is unset.
    pub min_points: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        IndicatorParams {
            rsi_long: 14,
            rsi_short: 6,
            ma_short: MA_SHORT_PERIOD,
            ma_long: MA_LONG_PERIOD,
            trend_window: 20,
            trend_slope_threshold: 0.001,
            bollinger_period: bollinger::DEFAULT_PERIOD,
            bollinger_mult_x100: bollinger::DEFAULT_MULT_X100,
            min_points: MIN_NAV_POINTS,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndicatorEngine {
    params: IndicatorParams,
}

impl IndicatorEngine {
    pub fn new(params: IndicatorParams) -> Self {
        IndicatorEngine { params }
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    /// Snapshot for the last day of `prefix`.
    pub fn compute(&self, prefix: &[NavPoint]) -> Option<IndicatorSnapshot> {
        self.compute_series(prefix).pop()
    }

    /// One snapshot per point. Snapshot `i` equals `compute(&points[..=i])`.
    pub fn compute_series(&self, points: &[NavPoint]) -> Vec<IndicatorSnapshot> {
        let p = &self.params;
        let rsi_long = calculate_rsi(points, p.rsi_long);
        let rsi_short = calculate_rsi(points, p.rsi_short);
        let macd = calculate_macd(
            points,
            macd::DEFAULT_FAST,
            macd::DEFAULT_SLOW,
            macd::DEFAULT_SIGNAL,
        );
        let ma_short = calculate_sma(points, p.ma_short);
        let ma_long = calculate_sma(points, p.ma_long);
        let ratio = calculate_ma_ratio(&ma_short, &ma_long);
        let boll = calculate_bollinger(points, p.bollinger_period, p.bollinger_mult_x100);

        let mut out = Vec::with_capacity(points.len());
        for (i, point) in points.iter().enumerate() {
            let daily_return = if i == 0 {
                0.0
            } else {
                let prev = points[i - 1].nav;
                finite((point.nav - prev) / prev).unwrap_or(0.0)
            };

            let count = i + 1;
            let mut snap = IndicatorSnapshot::empty(point.date, point.nav, count, daily_return);
            if count < p.min_points {
                out.push(snap);
                continue;
            }

            snap.rsi_long = rsi_long.simple_at(i);
            snap.rsi_short = rsi_short.simple_at(i);

            let today = macd.values.get(i).and_then(macd_pair);
            if let Some((line, signal)) = today {
                snap.macd = finite(line);
                snap.macd_signal = finite(signal);
                let yesterday = i
                    .checked_sub(1)
                    .and_then(|j| macd.values.get(j))
                    .and_then(macd_pair);
                snap.macd_cross = yesterday.map(|prev| MacdCross::detect(prev, (line, signal)));
            }

            // min_periods=1: partial-window means are reported as-is
            snap.ma_short = ma_short.values.get(i).and_then(|v| v.value.simple()).and_then(finite);
            snap.ma_long = ma_long.values.get(i).and_then(|v| v.value.simple()).and_then(finite);

            if count >= p.ma_long {
                snap.ma_ratio = ratio.simple_at(i);
                snap.trend_slope = trailing_slope(&ratio, i, p.trend_window);
                snap.trend_direction =
                    TrendDirection::classify(snap.trend_slope, p.trend_slope_threshold);
            }

            let bands = boll
                .values
                .get(i)
                .and_then(bollinger::bands)
                .map(|(upper, _, lower)| (upper, lower));
            snap.bollinger_position = BollingerPosition::classify(point.nav, bands);

            out.push(snap);
        }
        out
    }
}
