//! JSON report adapter: `results.json` and `screen.json` via serde_json.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::batch::{InstrumentOutcome, InstrumentReport};
use crate::domain::error::FundgridError;
use crate::domain::screen::ScreenRow;
use crate::ports::report_port::ReportPort;

pub const RESULTS_FILE: &str = "results.json";
pub const SCREEN_FILE: &str = "screen.json";

#[derive(Debug, Default)]
pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct OutcomeView<'a> {
    code: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a InstrumentReport>,
}

impl<'a> From<&'a InstrumentOutcome> for OutcomeView<'a> {
    fn from(outcome: &'a InstrumentOutcome) -> Self {
        match &outcome.result {
            Ok(report) => OutcomeView {
                code: &outcome.code,
                status: "ok",
                error: None,
                report: Some(report),
            },
            Err(reason) => OutcomeView {
                code: &outcome.code,
                status: "failed",
                error: Some(reason),
                report: None,
            },
        }
    }
}

#[derive(Serialize)]
struct BacktestDocument<'a> {
    instruments: Vec<OutcomeView<'a>>,
}

#[derive(Serialize)]
struct ScreenDocument<'a> {
    rows: &'a [ScreenRow],
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), FundgridError> {
    let body = serde_json::to_string_pretty(value).map_err(|e| FundgridError::Report {
        reason: format!("{}: {}", path.display(), e),
    })?;
    fs::write(path, body)?;
    Ok(())
}

impl ReportPort for JsonReportAdapter {
    fn write_backtest(
        &self,
        outcomes: &[InstrumentOutcome],
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, FundgridError> {
        fs::create_dir_all(output_dir)?;
        let path = output_dir.join(RESULTS_FILE);
        let doc = BacktestDocument {
            instruments: outcomes.iter().map(OutcomeView::from).collect(),
        };
        write_json(&doc, &path)?;
        Ok(vec![path])
    }

    fn write_screen(
        &self,
        rows: &[ScreenRow],
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, FundgridError> {
        fs::create_dir_all(output_dir)?;
        let path = output_dir.join(SCREEN_FILE);
        write_json(&ScreenDocument { rows }, &path)?;
        Ok(vec![path])
    }
}
