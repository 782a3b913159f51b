//! CSV report adapter: `summary.csv`, `trades.csv` and `screen.csv`.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::batch::InstrumentOutcome;
use crate::domain::error::FundgridError;
use crate::domain::metrics::RatioValue;
use crate::domain::screen::ScreenRow;
use crate::ports::report_port::ReportPort;

pub const SUMMARY_FILE: &str = "summary.csv";
pub const TRADES_FILE: &str = "trades.csv";
pub const SCREEN_FILE: &str = "screen.csv";

const SUMMARY_HEADER: &[&str] = &[
    "code",
    "status",
    "start_date",
    "end_date",
    "days",
    "final_equity",
    "total_return",
    "annualized_return",
    "max_drawdown",
    "drawdown_recovery_days",
    "annualized_volatility",
    "sharpe_ratio",
    "sortino_ratio",
    "win_rate",
    "buy_count",
    "sell_count",
    "take_profit_count",
    "stop_loss_count",
    "trailing_stop_count",
    "error",
];

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn report_err(path: &Path, e: impl std::fmt::Display) -> FundgridError {
    FundgridError::Report {
        reason: format!("{}: {}", path.display(), e),
    }
}

fn opt(v: Option<f64>) -> String {
    v.map(|x| format!("{:.6}", x)).unwrap_or_default()
}

/// Ranking key: real ratios first (highest first), then zero-risk, then
/// undefined, then failures.
fn sharpe_rank(outcome: &InstrumentOutcome) -> (u8, f64) {
    match &outcome.result {
        Ok(report) => match report.result.sharpe_ratio {
            RatioValue::Value(v) => (0, -v),
            RatioValue::ZeroRisk => (1, 0.0),
            RatioValue::InsufficientData => (2, 0.0),
        },
        Err(_) => (3, 0.0),
    }
}

fn by_sharpe_desc(a: &InstrumentOutcome, b: &InstrumentOutcome) -> Ordering {
    let (ga, va) = sharpe_rank(a);
    let (gb, vb) = sharpe_rank(b);
    ga.cmp(&gb)
        .then(va.total_cmp(&vb))
        .then_with(|| a.code.cmp(&b.code))
}

fn summary_record(outcome: &InstrumentOutcome) -> Vec<String> {
    match &outcome.result {
        Ok(report) => {
            let r = &report.result;
            vec![
                outcome.code.clone(),
                "ok".to_string(),
                r.start_date.map(|d| d.to_string()).unwrap_or_default(),
                r.end_date.map(|d| d.to_string()).unwrap_or_default(),
                r.days.to_string(),
                format!("{:.2}", r.final_equity),
                format!("{:.6}", r.total_return),
                opt(r.annualized_return),
                format!("{:.6}", r.max_drawdown),
                r.drawdown_recovery_days.render(),
                opt(r.annualized_volatility),
                r.sharpe_ratio.render(),
                r.sortino_ratio.render(),
                opt(r.win_rate),
                r.buy_count.to_string(),
                r.sell_count.to_string(),
                r.take_profit_count.to_string(),
                r.stop_loss_count.to_string(),
                r.trailing_stop_count.to_string(),
                String::new(),
            ]
        }
        Err(reason) => {
            let mut row = vec![String::new(); SUMMARY_HEADER.len()];
            row[0] = outcome.code.clone();
            row[1] = "failed".to_string();
            row[SUMMARY_HEADER.len() - 1] = reason.clone();
            row
        }
    }
}

fn write_summary(outcomes: &[InstrumentOutcome], path: &Path) -> Result<(), FundgridError> {
    let mut ranked: Vec<&InstrumentOutcome> = outcomes.iter().collect();
    ranked.sort_by(|a, b| by_sharpe_desc(a, b));

    let mut wtr = csv::Writer::from_path(path).map_err(|e| report_err(path, e))?;
    wtr.write_record(SUMMARY_HEADER)
        .map_err(|e| report_err(path, e))?;
    for outcome in ranked {
        wtr.write_record(summary_record(outcome))
            .map_err(|e| report_err(path, e))?;
    }
    wtr.flush().map_err(|e| report_err(path, e))
}

fn write_trades(outcomes: &[InstrumentOutcome], path: &Path) -> Result<(), FundgridError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| report_err(path, e))?;
    wtr.write_record([
        "code",
        "date",
        "action",
        "price",
        "shares_delta",
        "cash_delta",
        "reason",
    ])
    .map_err(|e| report_err(path, e))?;

    for report in outcomes.iter().filter_map(|o| o.result.as_ref().ok()) {
        for trade in &report.trades {
            wtr.write_record([
                report.code.clone(),
                trade.date.to_string(),
                trade.action.as_str().to_string(),
                format!("{:.4}", trade.price),
                format!("{:.4}", trade.shares_delta),
                format!("{:.2}", trade.cash_delta),
                trade.reason.to_string(),
            ])
            .map_err(|e| report_err(path, e))?;
        }
    }
    wtr.flush().map_err(|e| report_err(path, e))
}

fn screen_record(row: &ScreenRow) -> Vec<String> {
    let snap = &row.snapshot;
    let join = |items: Vec<&str>| items.join(";");
    vec![
        row.code.clone(),
        row.tier.as_str().to_string(),
        format!("{:.1}", row.score),
        snap.date.to_string(),
        format!("{:.4}", snap.nav),
        opt(snap.rsi_short),
        opt(snap.rsi_long),
        format!("{:.4}", row.month_drawdown),
        row.consecutive_drops.to_string(),
        row.recent_consecutive_drops.to_string(),
        snap.trend_direction.as_str().to_string(),
        if row.trend_healthy { "yes" } else { "no" }.to_string(),
        snap.bollinger_position.as_str().to_string(),
        snap.macd_cross.map(|c| c.as_str()).unwrap_or_default().to_string(),
        join(row.signals.iter().map(|s| s.as_str()).collect()),
        join(row.exit_hints.iter().map(|h| h.as_str()).collect()),
        format!("{:.4}", row.trial_buy_price),
    ]
}

impl ReportPort for CsvReportAdapter {
    fn write_backtest(
        &self,
        outcomes: &[InstrumentOutcome],
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, FundgridError> {
        fs::create_dir_all(output_dir)?;
        let summary = output_dir.join(SUMMARY_FILE);
        let trades = output_dir.join(TRADES_FILE);
        write_summary(outcomes, &summary)?;
        write_trades(outcomes, &trades)?;
        Ok(vec![summary, trades])
    }

    fn write_screen(
        &self,
        rows: &[ScreenRow],
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, FundgridError> {
        fs::create_dir_all(output_dir)?;
        let path = output_dir.join(SCREEN_FILE);
        let mut wtr = csv::Writer::from_path(&path).map_err(|e| report_err(&path, e))?;
        wtr.write_record([
            "code",
            "tier",
            "score",
            "date",
            "nav",
            "rsi_short",
            "rsi_long",
            "month_drawdown",
            "consecutive_drops",
            "recent_consecutive_drops",
            "trend",
            "trend_healthy",
            "bollinger",
            "macd_cross",
            "signals",
            "exit_hints",
            "trial_buy_price",
        ])
        .map_err(|e| report_err(&path, e))?;
        for row in rows {
            wtr.write_record(screen_record(row))
                .map_err(|e| report_err(&path, e))?;
        }
        wtr.flush().map_err(|e| report_err(&path, e))?;
        Ok(vec![path])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::HoldTally;
    use crate::domain::batch::InstrumentReport;
    use crate::domain::metrics::{BacktestResult, Recovery};
    use crate::domain::portfolio::{TradeAction, TradeRecord};
    use crate::domain::position::PositionState;
    use crate::domain::signal::ReasonCode;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn result(sharpe: RatioValue) -> BacktestResult {
        BacktestResult {
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2023, 12, 31),
            days: 365,
            initial_capital: 100_000.0,
            final_equity: 105_000.0,
            total_return: 0.05,
            annualized_return: Some(0.05),
            max_drawdown: 0.03,
            drawdown_recovery_days: Recovery::Unrecovered,
            annualized_volatility: Some(0.1),
            sharpe_ratio: sharpe,
            sortino_ratio: RatioValue::ZeroRisk,
            win_rate: None,
            buy_count: 1,
            sell_count: 0,
            take_profit_count: 0,
            stop_loss_count: 0,
            trailing_stop_count: 0,
        }
    }

    fn ok(code: &str, sharpe: RatioValue) -> InstrumentOutcome {
        InstrumentOutcome {
            code: code.to_string(),
            result: Ok(InstrumentReport {
                code: code.to_string(),
                result: result(sharpe),
                trades: vec![TradeRecord {
                    date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                    action: TradeAction::Buy,
                    price: 1.0,
                    shares_delta: 10_000.0,
                    cash_delta: -10_000.0,
                    reason: ReasonCode::InitialEntry,
                }],
                equity_curve: Vec::new(),
                holds: HoldTally::default(),
                final_position: PositionState::new(90_000.0),
                last_snapshot: None,
            }),
        }
    }

    fn failed(code: &str) -> InstrumentOutcome {
        InstrumentOutcome {
            code: code.to_string(),
            result: Err("insufficient data for x: have 3 rows, need 60".to_string()),
        }
    }

    #[test]
    fn summary_sorted_by_sharpe_descending() {
        let dir = TempDir::new().unwrap();
        let outcomes = vec![
            failed("a"),
            ok("b", RatioValue::Value(0.4)),
            ok("c", RatioValue::ZeroRisk),
            ok("d", RatioValue::Value(1.2)),
            ok("e", RatioValue::InsufficientData),
        ];
        let files = CsvReportAdapter::new()
            .write_backtest(&outcomes, dir.path())
            .unwrap();
        assert_eq!(files.len(), 2);

        let mut rdr = csv::Reader::from_path(dir.path().join(SUMMARY_FILE)).unwrap();
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        let codes: Vec<&str> = rows.iter().map(|r| &r[0]).collect();
        assert_eq!(codes, vec!["d", "b", "c", "e", "a"]);
        assert_eq!(&rows[0][11], "1.2000");
        assert_eq!(&rows[2][11], "zero_risk");
        assert_eq!(&rows[3][11], "");
        assert_eq!(&rows[0][9], "unrecovered");
        assert_eq!(&rows[0][13], "");
        assert_eq!(&rows[4][1], "failed");
        assert!(rows[4][19].contains("insufficient data"));
    }

    #[test]
    fn trades_file_lists_successful_runs() {
        let dir = TempDir::new().unwrap();
        let outcomes = vec![ok("b", RatioValue::Value(0.4)), failed("a")];
        CsvReportAdapter::new()
            .write_backtest(&outcomes, dir.path())
            .unwrap();
        let content = fs::read_to_string(dir.path().join(TRADES_FILE)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "code,date,action,price,shares_delta,cash_delta,reason");
        assert_eq!(lines[1], "b,2023-01-01,buy,1.0000,10000.0000,-10000.00,initial_entry");
    }

    #[test]
    fn creates_missing_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        CsvReportAdapter::new()
            .write_backtest(&[failed("x")], &nested)
            .unwrap();
        assert!(nested.join(SUMMARY_FILE).exists());
    }
}
