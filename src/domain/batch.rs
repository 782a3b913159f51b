//! Multi-instrument runs on a bounded rayon pool.
//!
//! Each instrument is loaded, simulated and scored on its own; instruments
//! share nothing but the read-only configuration. A failure becomes a failed
//! outcome and never aborts its siblings.

use rayon::prelude::*;
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{info, warn};

use super::backtest::{BacktestConfig, HoldTally, run_backtest};
use super::error::FundgridError;
use super::indicator::snapshot::IndicatorSnapshot;
use super::metrics::BacktestResult;
use super::portfolio::{EquityPoint, TradeRecord};
use super::position::PositionState;
use super::screen::{self, ScreenRow};
use super::strategy::StrategyParams;
use crate::ports::nav_port::NavPort;

/// Everything a report needs about one successful instrument run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentReport {
    pub code: String,
    pub result: BacktestResult,
    pub trades: Vec<TradeRecord>,
    #[serde(skip)]
    pub equity_curve: Vec<EquityPoint>,
    pub holds: HoldTally,
    pub final_position: PositionState,
    pub last_snapshot: Option<IndicatorSnapshot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentOutcome {
    pub code: String,
    /// The error is kept as its message so outcomes stay `Send` and cloneable.
    pub result: Result<InstrumentReport, String>,
}

impl InstrumentOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenOutcome {
    pub code: String,
    pub result: Result<ScreenRow, String>,
}

/// Load, simulate and score a single instrument.
pub fn run_instrument(
    nav: &dyn NavPort,
    code: &str,
    config: &BacktestConfig,
    params: &StrategyParams,
) -> Result<InstrumentReport, FundgridError> {
    let series = nav.fetch_nav(code)?;
    let run = run_backtest(&series, config, params)?;
    let result = BacktestResult::compute(&run, config.risk_free_rate);
    Ok(InstrumentReport {
        code: run.code,
        result,
        trades: run.trades,
        equity_curve: run.equity_curve,
        holds: run.holds,
        final_position: run.final_position,
        last_snapshot: run.last_snapshot,
    })
}

/// Backtest every code on a pool of `workers` threads (0 = one per CPU).
/// Outcomes come back sorted by code.
pub fn run_batch<N: NavPort + Sync>(
    nav: &N,
    codes: &[String],
    config: &BacktestConfig,
    params: &StrategyParams,
    workers: usize,
) -> Result<Vec<InstrumentOutcome>, FundgridError> {
    let pool = build_pool(workers)?;
    info!(instruments = codes.len(), threads = pool.current_num_threads(), "starting backtests");

    let mut outcomes: Vec<InstrumentOutcome> = pool.install(|| {
        codes
            .par_iter()
            .map(|code| {
                let result = isolate(|| run_instrument(nav, code, config, params))
                    .inspect_err(|e| warn!(code = code.as_str(), error = %e, "instrument failed"));
                InstrumentOutcome {
                    code: code.clone(),
                    result,
                }
            })
            .collect()
    });

    outcomes.sort_by(|a, b| a.code.cmp(&b.code));
    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    info!(succeeded = outcomes.len() - failed, failed, "backtests finished");
    Ok(outcomes)
}

/// Screen every code on the same kind of pool as [`run_batch`]. Outcomes are
/// sorted by code; ranking is left to the caller.
pub fn screen_batch<N: NavPort + Sync>(
    nav: &N,
    codes: &[String],
    params: &StrategyParams,
    workers: usize,
) -> Result<Vec<ScreenOutcome>, FundgridError> {
    let pool = build_pool(workers)?;

    let mut outcomes: Vec<ScreenOutcome> = pool.install(|| {
        codes
            .par_iter()
            .map(|code| {
                let result = isolate(|| {
                    nav.fetch_nav(code)
                        .and_then(|series| screen::screen(&series, params))
                })
                .inspect_err(|e| warn!(code = code.as_str(), error = %e, "screen skipped"));
                ScreenOutcome {
                    code: code.clone(),
                    result,
                }
            })
            .collect()
    });

    outcomes.sort_by(|a, b| a.code.cmp(&b.code));
    Ok(outcomes)
}

/// Run one instrument's work, turning both its error and any panic into a
/// message. A panic on one worker must not unwind through `par_iter`.
fn isolate<T>(work: impl FnOnce() -> Result<T, FundgridError>) -> Result<T, String> {
    match panic::catch_unwind(AssertUnwindSafe(work)) {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

fn build_pool(workers: usize) -> Result<rayon::ThreadPool, FundgridError> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if workers > 0 {
        builder = builder.num_threads(workers);
    }
    builder.build().map_err(|e| {
        FundgridError::Io(std::io::Error::other(format!(
            "failed to build thread pool: {}",
            e
        )))
    })
}
