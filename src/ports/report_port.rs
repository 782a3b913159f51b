//! Report output port.

use std::path::{Path, PathBuf};

use crate::domain::batch::InstrumentOutcome;
use crate::domain::error::FundgridError;
use crate::domain::screen::ScreenRow;

/// Writes run results into a directory. Each call returns the files it wrote.
pub trait ReportPort {
    fn write_backtest(
        &self,
        outcomes: &[InstrumentOutcome],
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, FundgridError>;

    /// `rows` arrive already ranked.
    fn write_screen(
        &self,
        rows: &[ScreenRow],
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, FundgridError>;
}
