//! Typed configuration loading and validation.
//!
//! Every value is read, parsed and range-checked before any instrument is
//! simulated. A bad value is a `ConfigInvalid` naming its `[section] key`.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::FundgridError;
use crate::domain::strategy::{Preset, RsiWindows, StrategyParams};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_DATA_DIR: &str = "fund_data";
pub const DEFAULT_OUTPUT_DIR: &str = "reports";
pub const MIN_TREND_WINDOW: usize = 20;
pub const MAX_TREND_WINDOW: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Csv => f.write_str("csv"),
            ReportFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ReportFormat::Csv),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("unknown report format '{}' (expected csv or json)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSettings {
    pub output_dir: PathBuf,
    pub format: ReportFormat,
}

/// Everything one invocation needs, fully validated.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub backtest: BacktestConfig,
    pub strategy: StrategyParams,
    pub data_dir: PathBuf,
    /// Empty means every instrument found in `data_dir`.
    pub codes: Vec<String>,
    /// 0 lets the pool pick one worker per CPU.
    pub workers: usize,
    pub report: ReportSettings,
}

pub fn load_run_config(config: &dyn ConfigPort) -> Result<RunConfig, FundgridError> {
    let backtest = load_backtest_config(config)?;
    let strategy = load_strategy_params(config)?;
    validate_backtest_config(&backtest)?;
    validate_strategy_params(&strategy, backtest.initial_capital)?;

    let data_dir = config
        .get_string("backtest", "data_dir")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
    let codes = parse_codes(config.get_string("backtest", "codes").as_deref());
    let workers = config.get_usize("backtest", "workers", 0)?;

    let output_dir = config
        .get_string("report", "output_dir")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string());
    let format = match config.get_string("report", "format") {
        Some(s) => s
            .parse::<ReportFormat>()
            .map_err(|e| FundgridError::invalid("report", "format", e))?,
        None => ReportFormat::default(),
    };

    Ok(RunConfig {
        backtest,
        strategy,
        data_dir: PathBuf::from(data_dir.trim()),
        codes,
        workers,
        report: ReportSettings {
            output_dir: PathBuf::from(output_dir.trim()),
            format,
        },
    })
}

pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, FundgridError> {
    let defaults = BacktestConfig::default();
    Ok(BacktestConfig {
        start_date: read_date(config, "start_date")?,
        end_date: read_date(config, "end_date")?,
        initial_capital: config.get_f64("backtest", "initial_capital", defaults.initial_capital)?,
        risk_free_rate: config.get_f64("backtest", "risk_free_rate", defaults.risk_free_rate)?,
    })
}

/// The preset named by `[strategy] preset`, with any explicit key overriding it.
pub fn load_strategy_params(config: &dyn ConfigPort) -> Result<StrategyParams, FundgridError> {
    let preset = match config.get_string("strategy", "preset") {
        Some(s) => s
            .parse::<Preset>()
            .map_err(|e| FundgridError::invalid("strategy", "preset", e))?,
        None => Preset::GridV4,
    };
    let base = StrategyParams::preset(preset);

    let rsi_windows = match config.get_string("strategy", "rsi_windows") {
        Some(s) => s
            .parse::<RsiWindows>()
            .map_err(|e| FundgridError::invalid("strategy", "rsi_windows", e))?,
        None => base.rsi_windows,
    };

    let f = |key: &str, default: f64| config.get_f64("strategy", key, default);
    Ok(StrategyParams {
        preset,
        rsi_windows,
        oversold_threshold: f("oversold_threshold", base.oversold_threshold)?,
        rsi_extreme_threshold: f("rsi_extreme_threshold", base.rsi_extreme_threshold)?,
        trend_health_threshold: f("trend_health_threshold", base.trend_health_threshold)?,
        trend_window: config.get_usize("strategy", "trend_window", base.trend_window)?,
        trend_slope_threshold: f("trend_slope_threshold", base.trend_slope_threshold)?,
        grid_step_pct: f("grid_step_pct", base.grid_step_pct)?,
        stop_loss_pct: f("stop_loss_pct", base.stop_loss_pct)?,
        take_profit_pct: f("take_profit_pct", base.take_profit_pct)?,
        trailing_stop_pct: f("trailing_stop_pct", base.trailing_stop_pct)?,
        buy_increment: f("buy_increment", base.buy_increment)?,
        require_trend_data: config.get_bool(
            "strategy",
            "require_trend_data",
            base.require_trend_data,
        )?,
        reenter_after_exit: config.get_bool(
            "strategy",
            "reenter_after_exit",
            base.reenter_after_exit,
        )?,
    })
}

pub fn validate_backtest_config(config: &BacktestConfig) -> Result<(), FundgridError> {
    if !config.initial_capital.is_finite() || config.initial_capital <= 0.0 {
        return Err(FundgridError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    if !(0.0..1.0).contains(&config.risk_free_rate) {
        return Err(FundgridError::invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be in [0, 1)",
        ));
    }
    match (config.start_date, config.end_date) {
        (Some(start), Some(end)) if start >= end => Err(FundgridError::invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        )),
        _ => Ok(()),
    }
}

pub fn validate_strategy_params(
    params: &StrategyParams,
    initial_capital: f64,
) -> Result<(), FundgridError> {
    let RsiWindows { long, short } = params.rsi_windows;
    if long < 2 || short < 2 {
        return Err(FundgridError::invalid(
            "strategy",
            "rsi_windows",
            "RSI windows must be at least 2",
        ));
    }
    if long <= short {
        return Err(FundgridError::invalid(
            "strategy",
            "rsi_windows",
            "the long RSI window must be longer than the short one",
        ));
    }
    validate_rsi_level("oversold_threshold", params.oversold_threshold)?;
    validate_rsi_level("rsi_extreme_threshold", params.rsi_extreme_threshold)?;
    validate_fraction("trend_health_threshold", params.trend_health_threshold, true)?;

    if !(MIN_TREND_WINDOW..=MAX_TREND_WINDOW).contains(&params.trend_window) {
        return Err(FundgridError::invalid(
            "strategy",
            "trend_window",
            format!(
                "trend_window must be between {} and {}",
                MIN_TREND_WINDOW, MAX_TREND_WINDOW
            ),
        ));
    }
    if !params.trend_slope_threshold.is_finite() || params.trend_slope_threshold <= 0.0 {
        return Err(FundgridError::invalid(
            "strategy",
            "trend_slope_threshold",
            "trend_slope_threshold must be positive",
        ));
    }

    validate_fraction("grid_step_pct", params.grid_step_pct, false)?;
    validate_fraction("stop_loss_pct", params.stop_loss_pct, false)?;
    validate_fraction("take_profit_pct", params.take_profit_pct, false)?;
    if !(0.0..1.0).contains(&params.trailing_stop_pct) {
        return Err(FundgridError::invalid(
            "strategy",
            "trailing_stop_pct",
            "trailing_stop_pct must be in [0, 1), 0 disables it",
        ));
    }

    if !params.buy_increment.is_finite() || params.buy_increment <= 0.0 {
        return Err(FundgridError::invalid(
            "strategy",
            "buy_increment",
            "buy_increment must be positive",
        ));
    }
    if params.buy_increment > initial_capital {
        return Err(FundgridError::invalid(
            "strategy",
            "buy_increment",
            "buy_increment must not exceed initial_capital",
        ));
    }
    Ok(())
}

fn validate_rsi_level(key: &str, value: f64) -> Result<(), FundgridError> {
    if value > 0.0 && value < 100.0 {
        Ok(())
    } else {
        Err(FundgridError::invalid(
            "strategy",
            key,
            format!("{} must be strictly between 0 and 100", key),
        ))
    }
}

/// `(0, 1)`, or `(0, 1]` when `inclusive_one`.
fn validate_fraction(key: &str, value: f64, inclusive_one: bool) -> Result<(), FundgridError> {
    let upper_ok = if inclusive_one { value <= 1.0 } else { value < 1.0 };
    if value > 0.0 && upper_ok {
        Ok(())
    } else {
        let range = if inclusive_one { "(0, 1]" } else { "(0, 1)" };
        Err(FundgridError::invalid(
            "strategy",
            key,
            format!("{} must be in {}", key, range),
        ))
    }
}

fn read_date(config: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDate>, FundgridError> {
    match config.get_string("backtest", key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                FundgridError::invalid(
                    "backtest",
                    key,
                    format!("invalid {} format, expected YYYY-MM-DD", key),
                )
            }),
    }
}

pub fn parse_codes(value: Option<&str>) -> Vec<String> {
    value
        .map(|s| {
            s.split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
