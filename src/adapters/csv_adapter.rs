//! CSV file NAV adapter: one `<code>.csv` per instrument in a directory.

use crate::domain::error::FundgridError;
use crate::domain::nav::{NavPoint, NavSeries};
use crate::ports::nav_port::NavPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};

const DATE_COLUMNS: &[&str] = &["date", "Date"];
const NAV_COLUMNS: &[&str] = &["net_value", "NetValue", "nav", "value"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

pub struct CsvNavAdapter {
    base_path: PathBuf,
}

impl CsvNavAdapter {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }

    /// Parsed rows sorted by date, before any series validation.
    fn read_points(&self, code: &str) -> Result<Vec<NavPoint>, FundgridError> {
        let path = self.csv_path(code);
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(&path)
            .map_err(|e| FundgridError::DataSource {
                reason: format!("failed to read {}: {}", path.display(), e),
            })?;

        let headers = rdr
            .headers()
            .map_err(|e| FundgridError::DataSource {
                reason: format!("{}: bad CSV header: {}", path.display(), e),
            })?
            .clone();
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.contains(&h.trim_start_matches('\u{feff}')))
        };
        let date_idx = find(DATE_COLUMNS).ok_or_else(|| FundgridError::MissingColumn {
            code: code.to_string(),
            column: "date".to_string(),
        })?;
        let nav_idx = find(NAV_COLUMNS).ok_or_else(|| FundgridError::MissingColumn {
            code: code.to_string(),
            column: "net_value".to_string(),
        })?;

        let mut points = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| FundgridError::DataSource {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;

            let date_str = record.get(date_idx).unwrap_or_default();
            if date_str.is_empty() {
                continue;
            }
            let date = parse_date(date_str).ok_or_else(|| FundgridError::DataSource {
                reason: format!("{}: invalid date '{}'", code, date_str),
            })?;
            let nav = record
                .get(nav_idx)
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(f64::NAN);

            points.push(NavPoint::new(date, nav));
        }

        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
}

impl NavPort for CsvNavAdapter {
    fn fetch_nav(&self, code: &str) -> Result<NavSeries, FundgridError> {
        let points = self.read_points(code)?;
        NavSeries::new(code, points)
    }

    fn list_codes(&self) -> Result<Vec<String>, FundgridError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| FundgridError::DataSource {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut codes = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FundgridError::DataSource {
                reason: format!("directory entry error: {}", e),
            })?;
            let path = entry.path();
            let is_csv = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
            if !is_csv || !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                codes.push(stem.to_string_lossy().into_owned());
            }
        }

        codes.sort();
        Ok(codes)
    }

    fn data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, FundgridError> {
        let points = self.read_points(code)?;
        Ok(match (points.first(), points.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, points.len())),
            _ => None,
        })
    }
}
