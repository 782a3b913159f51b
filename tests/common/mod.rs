#![allow(dead_code)]

use chrono::NaiveDate;
use fundgrid::domain::error::FundgridError;
use fundgrid::domain::nav::{NavPoint, NavSeries};
use fundgrid::ports::nav_port::NavPort;
use std::collections::HashMap;

pub struct MockNavPort {
    pub data: HashMap<String, Vec<NavPoint>>,
    pub errors: HashMap<String, String>,
}

impl MockNavPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_navs(mut self, code: &str, navs: &[f64]) -> Self {
        self.data.insert(code.to_string(), make_points(navs));
        self
    }

    pub fn with_points(mut self, code: &str, points: Vec<NavPoint>) -> Self {
        self.data.insert(code.to_string(), points);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl NavPort for MockNavPort {
    fn fetch_nav(&self, code: &str) -> Result<NavSeries, FundgridError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(FundgridError::DataSource {
                reason: reason.clone(),
            });
        }
        let points = self.data.get(code).cloned().unwrap_or_default();
        NavSeries::new(code, points)
    }

    fn list_codes(&self) -> Result<Vec<String>, FundgridError> {
        let mut codes: Vec<String> = self
            .data
            .keys()
            .chain(self.errors.keys())
            .cloned()
            .collect();
        codes.sort();
        Ok(codes)
    }

    fn data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, FundgridError> {
        Ok(self.data.get(code).and_then(|points| {
            Some((points.first()?.date, points.last()?.date, points.len()))
        }))
    }
}

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 3).unwrap()
}

pub fn date(i: usize) -> NaiveDate {
    start_date() + chrono::Duration::days(i as i64)
}

/// One point per calendar day starting at [`start_date`].
pub fn make_points(navs: &[f64]) -> Vec<NavPoint> {
    navs.iter()
        .enumerate()
        .map(|(i, &nav)| NavPoint::new(date(i), nav))
        .collect()
}

pub fn make_series(code: &str, navs: &[f64]) -> NavSeries {
    NavSeries::new(code, make_points(navs)).unwrap()
}

pub fn flat(n: usize, nav: f64) -> Vec<f64> {
    vec![nav; n]
}

/// Straight-line interpolation from `from` to `to` over `steps` points,
/// excluding `from` itself.
pub fn ramp(from: f64, to: f64, steps: usize) -> Vec<f64> {
    (1..=steps)
        .map(|i| from + (to - from) * i as f64 / steps as f64)
        .collect()
}

/// Sinusoidal NAV with a slight upward drift.
pub fn wave(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 1.0 + 0.08 * (i as f64 / 7.0).sin() + 0.0004 * i as f64)
        .collect()
}

/// Render NAVs as a fund CSV file, newest row first.
pub fn nav_csv(navs: &[f64]) -> String {
    let mut out = String::from("date,net_value,cumulative_net_value,daily_growth_rate\n");
    for (i, nav) in navs.iter().enumerate().rev() {
        out.push_str(&format!("{},{:.6},{:.6},0.00%\n", date(i), nav, nav));
    }
    out
}
