//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvNavAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::batch::{self, InstrumentOutcome};
use crate::domain::config_validation::{ReportFormat, RunConfig, load_run_config, parse_codes};
use crate::domain::error::FundgridError;
use crate::domain::screen::{self, ScreenRow};
use crate::ports::nav_port::NavPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "fundgrid",
    about = "Grid-trading backtester and signal screener for fund NAV series"
)]
pub struct Cli {
    /// Log at debug level (per-trade events)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest the grid strategy over every configured instrument
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated fund codes, overriding `[backtest] codes`
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Report directory, overriding `[report] output_dir`
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        format: Option<ReportFormat>,
        /// Worker threads (0 = one per CPU)
        #[arg(short, long)]
        jobs: Option<usize>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Rank instruments by today's buy/sell signals
    Screen {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        code: Option<String>,
        /// Also write the ranked table into this directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without running anything
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the date range of each NAV file
    Info {
        #[arg(long)]
        data_dir: PathBuf,
        #[arg(long)]
        code: Option<String>,
    },
}

/// Flags that override values read from the INI file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub codes: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub format: Option<ReportFormat>,
    pub jobs: Option<usize>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            code,
            data_dir,
            output,
            format,
            jobs,
            dry_run,
        } => {
            let overrides = Overrides {
                codes: code,
                data_dir,
                output,
                format,
                jobs,
            };
            if dry_run {
                run_dry_run(&config, &overrides)
            } else {
                run_backtest(&config, &overrides)
            }
        }
        Command::Screen {
            config,
            data_dir,
            code,
            output,
        } => {
            let overrides = Overrides {
                codes: code,
                data_dir,
                output,
                ..Overrides::default()
            };
            run_screen(&config, &overrides)
        }
        Command::Validate { config } => run_validate(&config),
        Command::Info { data_dir, code } => run_info(&data_dir, code.as_deref()),
    }
}

fn fail(e: &FundgridError) -> ExitCode {
    eprintln!("error: {e}");
    e.into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| fail(&e))
}

/// Read, validate and apply command-line overrides.
pub fn load_run(path: &Path, overrides: &Overrides) -> Result<RunConfig, ExitCode> {
    info!(path = %path.display(), "loading config");
    let adapter = load_config(path)?;
    let mut run = load_run_config(&adapter).map_err(|e| fail(&e))?;
    apply_overrides(&mut run, overrides);
    Ok(run)
}

pub fn apply_overrides(run: &mut RunConfig, overrides: &Overrides) {
    if let Some(codes) = overrides.codes.as_deref() {
        run.codes = parse_codes(Some(codes));
    }
    if let Some(dir) = &overrides.data_dir {
        run.data_dir = dir.clone();
    }
    if let Some(dir) = &overrides.output {
        run.report.output_dir = dir.clone();
    }
    if let Some(format) = overrides.format {
        run.report.format = format;
    }
    if let Some(jobs) = overrides.jobs {
        run.workers = jobs;
    }
}

/// Configured codes, or every instrument the data source knows about.
pub fn resolve_codes(run: &RunConfig, nav: &dyn NavPort) -> Result<Vec<String>, FundgridError> {
    let codes = if run.codes.is_empty() {
        nav.list_codes()?
    } else {
        run.codes.clone()
    };
    if codes.is_empty() {
        return Err(FundgridError::DataSource {
            reason: format!("no instruments found in {}", run.data_dir.display()),
        });
    }
    Ok(codes)
}

pub fn report_adapter(format: ReportFormat) -> Box<dyn ReportPort> {
    match format {
        ReportFormat::Csv => Box::new(CsvReportAdapter::new()),
        ReportFormat::Json => Box::new(JsonReportAdapter::new()),
    }
}

fn run_backtest(config_path: &Path, overrides: &Overrides) -> ExitCode {
    // Stage 1: Load and validate config
    let run = match load_run(config_path, overrides) {
        Ok(r) => r,
        Err(code) => return code,
    };
    info!(preset = %run.strategy.preset, "config loaded");

    // Stage 2: Resolve instruments
    let nav = CsvNavAdapter::new(&run.data_dir);
    let codes = match resolve_codes(&run, &nav) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    // Stage 3: Simulate
    let outcomes = match batch::run_batch(&nav, &codes, &run.backtest, &run.strategy, run.workers)
    {
        Ok(o) => o,
        Err(e) => return fail(&e),
    };

    // Stage 4: Console summary
    print_backtest_summary(&outcomes);

    // Stage 5: Reports
    let adapter = report_adapter(run.report.format);
    match adapter.write_backtest(&outcomes, &run.report.output_dir) {
        Ok(files) => {
            for file in files {
                info!(path = %file.display(), "report written");
            }
        }
        Err(e) => return fail(&e),
    }

    if outcomes.iter().any(InstrumentOutcome::is_ok) {
        ExitCode::SUCCESS
    } else {
        eprintln!("error: no instrument produced a result");
        ExitCode::from(5)
    }
}

fn print_backtest_summary(outcomes: &[InstrumentOutcome]) {
    println!(
        "{:<10} {:>10} {:>10} {:>9} {:>11} {:>10} {:>10} {:>6}",
        "code", "return", "annual", "max_dd", "recovery", "sharpe", "sortino", "trades"
    );
    for outcome in outcomes {
        match &outcome.result {
            Ok(report) => {
                let r = &report.result;
                let annual = r
                    .annualized_return
                    .map(|v| format!("{:.2}%", v * 100.0))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<10} {:>9.2}% {:>10} {:>8.2}% {:>11} {:>10} {:>10} {:>6}",
                    outcome.code,
                    r.total_return * 100.0,
                    annual,
                    r.max_drawdown * 100.0,
                    r.drawdown_recovery_days.render(),
                    or_dash(r.sharpe_ratio.render()),
                    or_dash(r.sortino_ratio.render()),
                    r.buy_count + r.sell_count,
                );
            }
            Err(reason) => println!("{:<10} failed: {}", outcome.code, reason),
        }
    }
}

fn or_dash(s: String) -> String {
    if s.is_empty() { "-".to_string() } else { s }
}

pub fn run_dry_run(config_path: &Path, overrides: &Overrides) -> ExitCode {
    let run = match load_run(config_path, overrides) {
        Ok(r) => r,
        Err(code) => return code,
    };

    let s = &run.strategy;
    println!("Strategy preset: {}", s.preset);
    println!("  rsi_windows:            {},{}", s.rsi_windows.long, s.rsi_windows.short);
    println!("  oversold_threshold:     {}", s.oversold_threshold);
    println!("  rsi_extreme_threshold:  {}", s.rsi_extreme_threshold);
    println!("  trend_health_threshold: {}", s.trend_health_threshold);
    println!("  trend_window:           {}", s.trend_window);
    println!("  trend_slope_threshold:  {}", s.trend_slope_threshold);
    println!("  grid_step_pct:          {}", s.grid_step_pct);
    println!("  stop_loss_pct:          {}", s.stop_loss_pct);
    println!("  take_profit_pct:        {}", s.take_profit_pct);
    println!("  trailing_stop_pct:      {}", s.trailing_stop_pct);
    println!("  buy_increment:          {}", s.buy_increment);

    let b = &run.backtest;
    println!("\nBacktest:");
    println!("  initial_capital: {}", b.initial_capital);
    println!("  risk_free_rate:  {}", b.risk_free_rate);
    let date = |d: Option<chrono::NaiveDate>| {
        d.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())
    };
    println!("  window:          {} .. {}", date(b.start_date), date(b.end_date));
    println!("  data_dir:        {}", run.data_dir.display());

    let nav = CsvNavAdapter::new(&run.data_dir);
    match resolve_codes(&run, &nav) {
        Ok(codes) => println!("  codes:           {}", codes.join(", ")),
        Err(e) => return fail(&e),
    }

    println!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_screen(config_path: &Path, overrides: &Overrides) -> ExitCode {
    let run = match load_run(config_path, overrides) {
        Ok(r) => r,
        Err(code) => return code,
    };

    let nav = CsvNavAdapter::new(&run.data_dir);
    let codes = match resolve_codes(&run, &nav) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let outcomes = match batch::screen_batch(&nav, &codes, &run.strategy, run.workers) {
        Ok(o) => o,
        Err(e) => return fail(&e),
    };
    let mut rows: Vec<ScreenRow> = outcomes.into_iter().filter_map(|o| o.result.ok()).collect();
    if rows.is_empty() {
        eprintln!("error: no instrument could be screened");
        return ExitCode::from(5);
    }
    screen::rank(&mut rows);
    print_screen_table(&rows);

    if let Some(dir) = &overrides.output {
        match report_adapter(run.report.format).write_screen(&rows, dir) {
            Ok(files) => {
                for file in files {
                    info!(path = %file.display(), "screen written");
                }
            }
            Err(e) => return fail(&e),
        }
    }
    ExitCode::SUCCESS
}

fn print_screen_table(rows: &[ScreenRow]) {
    println!(
        "{:<10} {:<17} {:>5} {:>8} {:>7} {:>7} {:>8}  signals",
        "code", "tier", "score", "nav", "rsi6", "rsi14", "month_dd"
    );
    for row in rows {
        let rsi = |v: Option<f64>| v.map(|x| format!("{:.1}", x)).unwrap_or_else(|| "-".to_string());
        let signals: Vec<&str> = row
            .signals
            .iter()
            .map(|s| s.as_str())
            .chain(row.exit_hints.iter().map(|h| h.as_str()))
            .collect();
        println!(
            "{:<10} {:<17} {:>5.1} {:>8.4} {:>7} {:>7} {:>7.2}%  {}",
            row.code,
            row.tier.as_str(),
            row.score,
            row.snapshot.nav,
            rsi(row.snapshot.rsi_short),
            rsi(row.snapshot.rsi_long),
            row.month_drawdown * 100.0,
            signals.join(","),
        );
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    match load_run(config_path, &Overrides::default()) {
        Ok(run) => {
            println!(
                "{}: valid (preset {}, capital {}, increment {})",
                config_path.display(),
                run.strategy.preset,
                run.backtest.initial_capital,
                run.strategy.buy_increment
            );
            ExitCode::SUCCESS
        }
        Err(code) => code,
    }
}

fn run_info(data_dir: &Path, code: Option<&str>) -> ExitCode {
    let nav = CsvNavAdapter::new(data_dir);
    let codes = match code {
        Some(c) => parse_codes(Some(c)),
        None => match nav.list_codes() {
            Ok(c) => c,
            Err(e) => return fail(&e),
        },
    };
    if codes.is_empty() {
        println!("No NAV files found in {}", data_dir.display());
        return ExitCode::SUCCESS;
    }

    println!("{:<10} {:<12} {:<12} {:>6}", "code", "first", "last", "rows");
    for code in &codes {
        match nav.data_range(code) {
            Ok(Some((first, last, rows))) => {
                println!("{:<10} {:<12} {:<12} {:>6}", code, first, last, rows);
            }
            Ok(None) => println!("{:<10} (empty)", code),
            Err(e) => warn!(code = code.as_str(), error = %e, "cannot read"),
        }
    }
    ExitCode::SUCCESS
}
