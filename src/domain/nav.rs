//! Net asset value samples and the validated per-instrument series.

use chrono::NaiveDate;

use super::error::FundgridError;

/// Fewest rows an instrument needs before any indicator is considered valid.
pub const MIN_NAV_POINTS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavPoint {
    pub date: NaiveDate,
    pub nav: f64,
}

impl NavPoint {
    pub fn new(date: NaiveDate, nav: f64) -> Self {
        NavPoint { date, nav }
    }
}

/// Date-ascending, date-unique NAV history of one instrument. Read-only once
/// built.
#[derive(Debug, Clone, PartialEq)]
pub struct NavSeries {
    code: String,
    points: Vec<NavPoint>,
}

impl NavSeries {
    /// Build a series, enforcing positive finite NAVs, strictly increasing
    /// dates and the [`MIN_NAV_POINTS`] floor. Content errors are reported
    /// ahead of the length floor.
    pub fn new(code: impl Into<String>, points: Vec<NavPoint>) -> Result<Self, FundgridError> {
        let code = code.into();
        if points.is_empty() {
            return Err(FundgridError::NoData { code });
        }
        for (i, p) in points.iter().enumerate() {
            if !p.nav.is_finite() || p.nav <= 0.0 {
                return Err(FundgridError::InvalidNav {
                    code,
                    date: p.date,
                    nav: p.nav,
                });
            }
            if i > 0 && p.date <= points[i - 1].date {
                return Err(FundgridError::UnorderedDates { code, date: p.date });
            }
        }
        if points.len() < MIN_NAV_POINTS {
            return Err(FundgridError::InsufficientData {
                code,
                rows: points.len(),
                minimum: MIN_NAV_POINTS,
            });
        }
        Ok(NavSeries { code, points })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn points(&self) -> &[NavPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn navs(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.nav).collect()
    }

    /// Index range of the points falling inside `[start, end]` (either bound
    /// optional). Empty when no point qualifies.
    pub fn window(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> std::ops::Range<usize> {
        let lo = match start {
            Some(s) => self.points.partition_point(|p| p.date < s),
            None => 0,
        };
        let hi = match end {
            Some(e) => self.points.partition_point(|p| p.date <= e),
            None => self.points.len(),
        };
        lo..hi.max(lo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn points(n: usize) -> Vec<NavPoint> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        (0..n)
            .map(|i| NavPoint::new(start + chrono::Duration::days(i as i64), 1.0 + i as f64 * 0.01))
            .collect()
    }

    #[test]
    fn accepts_valid_series() {
        let series = NavSeries::new("000001", points(60)).unwrap();
        assert_eq!(series.len(), 60);
        assert_eq!(series.code(), "000001");
    }

    #[test]
    fn rejects_short_series() {
        let err = NavSeries::new("000001", points(59)).unwrap_err();
        assert!(matches!(
            err,
            FundgridError::InsufficientData {
                rows: 59,
                minimum: 60,
                ..
            }
        ));
    }

    #[test]
    fn rejects_non_positive_nav() {
        let pts = vec![NavPoint::new(d(1), 1.0), NavPoint::new(d(2), 0.0)];
        let err = NavSeries::new("X", pts).unwrap_err();
        assert!(matches!(err, FundgridError::InvalidNav { .. }));
    }

    #[test]
    fn rejects_nan_nav() {
        let mut pts = points(80);
        pts[40].nav = f64::NAN;
        let err = NavSeries::new("X", pts).unwrap_err();
        assert!(matches!(err, FundgridError::InvalidNav { .. }));
    }

    #[test]
    fn rejects_duplicate_dates() {
        let pts = vec![NavPoint::new(d(1), 1.0), NavPoint::new(d(1), 1.1)];
        let err = NavSeries::new("X", pts).unwrap_err();
        assert!(matches!(err, FundgridError::UnorderedDates { .. }));
    }

    #[test]
    fn rejects_descending_dates() {
        let mut pts = points(80);
        pts.swap(10, 11);
        let err = NavSeries::new("X", pts).unwrap_err();
        assert!(matches!(err, FundgridError::UnorderedDates { .. }));
    }

    #[test]
    fn rejects_empty() {
        let err = NavSeries::new("X", vec![]).unwrap_err();
        assert!(matches!(err, FundgridError::NoData { .. }));
    }

    #[test]
    fn window_bounds_inclusive() {
        let pts: Vec<NavPoint> = (1..=70)
            .map(|i| NavPoint::new(d(1) + chrono::Duration::days(i - 1), 1.0))
            .collect();
        let series = NavSeries::new("X", pts).unwrap();
        assert_eq!(series.window(Some(d(3)), Some(d(5))), 2..5);
        assert_eq!(series.window(None, None), 0..70);
        assert_eq!(series.window(Some(d(1) + chrono::Duration::days(70)), None), 70..70);
        assert_eq!(series.window(Some(d(5)), Some(d(2))), 4..4);
    }
}
