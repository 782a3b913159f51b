//! Per-day indicator record consumed by the signal policy.
//!
//! Windowed fields are `None` (or an `InsufficientData` variant) until their
//! history is long enough; that is ordinary data, not an error.

use chrono::NaiveDate;
use serde::Serialize;

use super::macd::MacdCross;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
    InsufficientData,
}

impl TrendDirection {
    /// `Up` above `threshold`, `Down` below `-threshold`, otherwise `Flat`.
    pub fn classify(slope: Option<f64>, threshold: f64) -> Self {
        match slope {
            Some(s) if s > threshold => TrendDirection::Up,
            Some(s) if s < -threshold => TrendDirection::Down,
            Some(_) => TrendDirection::Flat,
            None => TrendDirection::InsufficientData,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
            TrendDirection::Flat => "flat",
            TrendDirection::InsufficientData => "insufficient_data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BollingerPosition {
    BelowLower,
    NearLower,
    Mid,
    NearUpper,
    AboveUpper,
    InsufficientData,
}

/// Fraction of the band width counted as "near" a band.
pub const NEAR_BAND_FRACTION: f64 = 0.2;
/// Band widths at or below this are treated as zero volatility.
pub const MIN_BAND_WIDTH: f64 = 1e-6;

impl BollingerPosition {
    /// Place `nav` relative to `(upper, lower)`. A collapsed band is `Mid`.
    pub fn classify(nav: f64, bands: Option<(f64, f64)>) -> Self {
        let Some((upper, lower)) = bands else {
            return BollingerPosition::InsufficientData;
        };
        if !upper.is_finite() || !lower.is_finite() {
            return BollingerPosition::InsufficientData;
        }
        let width = upper - lower;
        if width <= MIN_BAND_WIDTH {
            return BollingerPosition::Mid;
        }
        if nav <= lower {
            return BollingerPosition::BelowLower;
        }
        if nav >= upper {
            return BollingerPosition::AboveUpper;
        }
        let position = (nav - lower) / width;
        if position < NEAR_BAND_FRACTION {
            BollingerPosition::NearLower
        } else if position > 1.0 - NEAR_BAND_FRACTION {
            BollingerPosition::NearUpper
        } else {
            BollingerPosition::Mid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BollingerPosition::BelowLower => "below_lower",
            BollingerPosition::NearLower => "near_lower",
            BollingerPosition::Mid => "mid",
            BollingerPosition::NearUpper => "near_upper",
            BollingerPosition::AboveUpper => "above_upper",
            BollingerPosition::InsufficientData => "insufficient_data",
        }
    }

    pub fn is_lower_touch(&self) -> bool {
        matches!(
            self,
            BollingerPosition::BelowLower | BollingerPosition::NearLower
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub date: NaiveDate,
    pub nav: f64,
    /// Length of the prefix this snapshot was computed from.
    pub points: usize,
    pub rsi_long: Option<f64>,
    pub rsi_short: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_cross: Option<MacdCross>,
    pub ma_short: Option<f64>,
    pub ma_long: Option<f64>,
    pub ma_ratio: Option<f64>,
    pub trend_slope: Option<f64>,
    pub trend_direction: TrendDirection,
    pub bollinger_position: BollingerPosition,
    pub daily_return: f64,
}

impl IndicatorSnapshot {
    /// Snapshot with every windowed field unset.
    pub fn empty(date: NaiveDate, nav: f64, points: usize, daily_return: f64) -> Self {
        IndicatorSnapshot {
            date,
            nav,
            points,
            rsi_long: None,
            rsi_short: None,
            macd: None,
            macd_signal: None,
            macd_cross: None,
            ma_short: None,
            ma_long: None,
            ma_ratio: None,
            trend_slope: None,
            trend_direction: TrendDirection::InsufficientData,
            bollinger_position: BollingerPosition::InsufficientData,
            daily_return,
        }
    }

    /// Long trend is known to be unhealthy: direction down or ratio under
    /// `health_threshold`. Unknown trend is not a veto.
    pub fn trend_vetoed(&self, health_threshold: f64) -> bool {
        self.trend_direction == TrendDirection::Down
            || self.ma_ratio.is_some_and(|r| r < health_threshold)
    }

    pub fn has_trend_data(&self) -> bool {
        self.ma_ratio.is_some() && self.trend_direction != TrendDirection::InsufficientData
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_classification() {
        assert_eq!(TrendDirection::classify(Some(0.01), 0.005), TrendDirection::Up);
        assert_eq!(TrendDirection::classify(Some(-0.01), 0.005), TrendDirection::Down);
        assert_eq!(TrendDirection::classify(Some(0.005), 0.005), TrendDirection::Flat);
        assert_eq!(TrendDirection::classify(Some(0.0), 0.005), TrendDirection::Flat);
        assert_eq!(
            TrendDirection::classify(None, 0.005),
            TrendDirection::InsufficientData
        );
    }

    #[test]
    fn bollinger_five_way() {
        let bands = Some((1.2, 1.0));
        assert_eq!(BollingerPosition::classify(0.9, bands), BollingerPosition::BelowLower);
        assert_eq!(BollingerPosition::classify(1.0, bands), BollingerPosition::BelowLower);
        assert_eq!(BollingerPosition::classify(1.02, bands), BollingerPosition::NearLower);
        assert_eq!(BollingerPosition::classify(1.1, bands), BollingerPosition::Mid);
        assert_eq!(BollingerPosition::classify(1.18, bands), BollingerPosition::NearUpper);
        assert_eq!(BollingerPosition::classify(1.2, bands), BollingerPosition::AboveUpper);
        assert_eq!(BollingerPosition::classify(1.3, bands), BollingerPosition::AboveUpper);
    }

    #[test]
    fn bollinger_collapsed_band_is_mid() {
        assert_eq!(
            BollingerPosition::classify(1.0, Some((1.0, 1.0))),
            BollingerPosition::Mid
        );
    }

    #[test]
    fn bollinger_missing_bands() {
        assert_eq!(
            BollingerPosition::classify(1.0, None),
            BollingerPosition::InsufficientData
        );
        assert_eq!(
            BollingerPosition::classify(1.0, Some((f64::NAN, 1.0))),
            BollingerPosition::InsufficientData
        );
    }

    #[test]
    fn veto_ignores_unknown_trend() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut snap = IndicatorSnapshot::empty(date, 1.0, 10, 0.0);
        assert!(!snap.trend_vetoed(0.95));
        snap.ma_ratio = Some(0.9);
        assert!(snap.trend_vetoed(0.95));
        snap.ma_ratio = Some(1.0);
        snap.trend_direction = TrendDirection::Down;
        assert!(snap.trend_vetoed(0.95));
    }
}
