//! Domain error types.
//!
//! Only conditions that stop an instrument (or the whole run, for config) are
//! errors. Warm-up gaps and degenerate arithmetic are sentinels in the data
//! model, never variants here.

use chrono::NaiveDate;

/// Top-level error type for fundgrid.
#[derive(Debug, thiserror::Error)]
pub enum FundgridError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("{code}: missing required column '{column}'")]
    MissingColumn { code: String, column: String },

    #[error("{code}: invalid nav {nav} on {date}")]
    InvalidNav {
        code: String,
        date: NaiveDate,
        nav: f64,
    },

    #[error("{code}: dates not strictly increasing at {date}")]
    UnorderedDates { code: String, date: NaiveDate },

    #[error("insufficient data for {code}: have {rows} rows, need {minimum}")]
    InsufficientData {
        code: String,
        rows: usize,
        minimum: usize,
    },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FundgridError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        FundgridError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(
            self,
            FundgridError::ConfigParse { .. }
                | FundgridError::ConfigMissing { .. }
                | FundgridError::ConfigInvalid { .. }
        )
    }
}

impl From<&FundgridError> for std::process::ExitCode {
    fn from(err: &FundgridError) -> Self {
        let code: u8 = match err {
            FundgridError::Io(_) | FundgridError::Report { .. } => 1,
            FundgridError::ConfigParse { .. }
            | FundgridError::ConfigMissing { .. }
            | FundgridError::ConfigInvalid { .. } => 2,
            FundgridError::DataSource { .. }
            | FundgridError::MissingColumn { .. }
            | FundgridError::InvalidNav { .. }
            | FundgridError::UnorderedDates { .. }
            | FundgridError::InsufficientData { .. }
            | FundgridError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
