//! CLI integration tests: INI and NAV files on disk, full command pipelines.

mod common;

use common::*;
use fundgrid::adapters::csv_adapter::CsvNavAdapter;
use fundgrid::cli::{self, Cli, Command, Overrides};
use fundgrid::domain::config_validation::ReportFormat;
use fundgrid::domain::strategy::Preset;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// A data directory with two usable funds and one too short to simulate.
fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("000001.csv"), nav_csv(&wave(320))).unwrap();
    let mut decline = vec![1.0];
    decline.extend(ramp(1.0, 0.85, 30));
    decline.extend(flat(150, 0.85));
    fs::write(dir.path().join("110022.csv"), nav_csv(&decline)).unwrap();
    fs::write(dir.path().join("161725.csv"), nav_csv(&flat(12, 1.0))).unwrap();
    dir
}

fn ini(data: &Path, output: &Path, extra: &str) -> String {
    format!(
        r#"
[backtest]
initial_capital = 100000
risk_free_rate = 0.02
data_dir = {}
workers = 2

[strategy]
preset = grid_v4
stop_loss_pct = 0.08
{}

[report]
output_dir = {}
format = csv
"#,
        data.display(),
        extra,
        output.display()
    )
}

/// `ExitCode` has no `PartialEq`; compare its debug form.
fn assert_exit(actual: ExitCode, expected: ExitCode) {
    assert_eq!(format!("{:?}", actual), format!("{:?}", expected));
}

fn backtest_cmd(config: PathBuf) -> Command {
    Command::Backtest {
        config,
        code: None,
        data_dir: None,
        output: None,
        format: None,
        jobs: None,
        dry_run: false,
    }
}

mod config_loading {
    use super::*;

    #[test]
    fn load_run_reads_file() {
        let data = data_dir();
        let out = TempDir::new().unwrap();
        let file = write_temp_ini(&ini(data.path(), out.path(), "trailing_stop_pct = 0.05"));
        let run = cli::load_run(file.path(), &Overrides::default()).unwrap();
        assert_eq!(run.strategy.preset, Preset::GridV4);
        assert_eq!(run.strategy.trailing_stop_pct, 0.05);
        assert_eq!(run.workers, 2);
        assert_eq!(run.data_dir, data.path());
    }

    #[test]
    fn load_run_rejects_invalid_value() {
        let data = data_dir();
        let out = TempDir::new().unwrap();
        let file = write_temp_ini(&ini(data.path(), out.path(), "take_profit_pct = 2.5"));
        let code = cli::load_run(file.path(), &Overrides::default()).unwrap_err();
        assert_exit(code, ExitCode::from(2));
    }

    #[test]
    fn missing_config_file_is_config_error() {
        let code = cli::load_config(Path::new("/nonexistent/fundgrid.ini")).unwrap_err();
        assert_exit(code, ExitCode::from(2));
    }

    #[test]
    fn overrides_replace_file_values() {
        let data = data_dir();
        let out = TempDir::new().unwrap();
        let file = write_temp_ini(&ini(data.path(), out.path(), ""));
        let overrides = Overrides {
            codes: Some("000001, 110022".to_string()),
            data_dir: Some(PathBuf::from("/tmp/other")),
            output: Some(PathBuf::from("/tmp/out")),
            format: Some(ReportFormat::Json),
            jobs: Some(8),
        };
        let run = cli::load_run(file.path(), &overrides).unwrap();
        assert_eq!(run.codes, vec!["000001", "110022"]);
        assert_eq!(run.data_dir, PathBuf::from("/tmp/other"));
        assert_eq!(run.report.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(run.report.format, ReportFormat::Json);
        assert_eq!(run.workers, 8);
    }
}

mod code_resolution {
    use super::*;

    #[test]
    fn empty_codes_lists_data_dir() {
        let data = data_dir();
        let out = TempDir::new().unwrap();
        let file = write_temp_ini(&ini(data.path(), out.path(), ""));
        let run = cli::load_run(file.path(), &Overrides::default()).unwrap();
        let nav = CsvNavAdapter::new(&run.data_dir);
        assert_eq!(
            cli::resolve_codes(&run, &nav).unwrap(),
            vec!["000001", "110022", "161725"]
        );
    }

    #[test]
    fn configured_codes_win() {
        let data = data_dir();
        let out = TempDir::new().unwrap();
        let file = write_temp_ini(&ini(data.path(), out.path(), ""));
        let overrides = Overrides {
            codes: Some("110022".to_string()),
            ..Overrides::default()
        };
        let run = cli::load_run(file.path(), &overrides).unwrap();
        let nav = CsvNavAdapter::new(&run.data_dir);
        assert_eq!(cli::resolve_codes(&run, &nav).unwrap(), vec!["110022"]);
    }

    #[test]
    fn empty_data_dir_is_error() {
        let data = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let file = write_temp_ini(&ini(data.path(), out.path(), ""));
        let run = cli::load_run(file.path(), &Overrides::default()).unwrap();
        let nav = CsvNavAdapter::new(&run.data_dir);
        assert!(cli::resolve_codes(&run, &nav).is_err());
    }
}

mod pipeline {
    use super::*;

    #[test]
    fn backtest_writes_csv_reports() {
        let data = data_dir();
        let out = TempDir::new().unwrap();
        let file = write_temp_ini(&ini(data.path(), out.path(), ""));

        let code = cli::run(Cli {
            verbose: false,
            command: backtest_cmd(file.path().to_path_buf()),
        });
        assert_exit(code, ExitCode::SUCCESS);

        let summary = fs::read_to_string(out.path().join("summary.csv")).unwrap();
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("code,status,"));
        assert!(lines[3].starts_with("161725,failed,"));
        assert!(lines[3].contains("insufficient data"));

        let trades = fs::read_to_string(out.path().join("trades.csv")).unwrap();
        assert!(trades.contains("110022"));
        assert!(trades.contains("stop_loss"));
    }

    #[test]
    fn backtest_json_format_override() {
        let data = data_dir();
        let out = TempDir::new().unwrap();
        let file = write_temp_ini(&ini(data.path(), out.path(), ""));
        let json_dir = out.path().join("json");

        let code = cli::run(Cli {
            verbose: false,
            command: Command::Backtest {
                config: file.path().to_path_buf(),
                code: Some("000001".to_string()),
                data_dir: None,
                output: Some(json_dir.clone()),
                format: Some(ReportFormat::Json),
                jobs: Some(1),
                dry_run: false,
            },
        });
        assert_exit(code, ExitCode::SUCCESS);

        let content = fs::read_to_string(json_dir.join("results.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(json["instruments"].as_array().unwrap().len(), 1);
        assert_eq!(json["instruments"][0]["status"], "ok");
    }

    #[test]
    fn backtest_with_only_failures_exits_with_data_error() {
        let data = data_dir();
        let out = TempDir::new().unwrap();
        let file = write_temp_ini(&ini(data.path(), out.path(), ""));
        let code = cli::run(Cli {
            verbose: false,
            command: Command::Backtest {
                config: file.path().to_path_buf(),
                code: Some("161725".to_string()),
                data_dir: None,
                output: None,
                format: None,
                jobs: None,
                dry_run: false,
            },
        });
        assert_exit(code, ExitCode::from(5));
        // the failure is still reported
        assert!(out.path().join("summary.csv").exists());
    }

    #[test]
    fn dry_run_writes_nothing() {
        let data = data_dir();
        let out = TempDir::new().unwrap();
        let report_dir = out.path().join("reports");
        let file = write_temp_ini(&ini(data.path(), &report_dir, ""));
        let code = cli::run(Cli {
            verbose: false,
            command: Command::Backtest {
                config: file.path().to_path_buf(),
                code: None,
                data_dir: None,
                output: None,
                format: None,
                jobs: None,
                dry_run: true,
            },
        });
        assert_exit(code, ExitCode::SUCCESS);
        assert!(!report_dir.exists());
    }

    #[test]
    fn validate_command() {
        let data = data_dir();
        let out = TempDir::new().unwrap();
        let good = write_temp_ini(&ini(data.path(), out.path(), ""));
        let bad = write_temp_ini(&ini(data.path(), out.path(), "trend_window = 5"));
        let run_validate = |path: &Path| {
            cli::run(Cli {
                verbose: false,
                command: Command::Validate {
                    config: path.to_path_buf(),
                },
            })
        };
        assert_exit(run_validate(good.path()), ExitCode::SUCCESS);
        assert_exit(run_validate(bad.path()), ExitCode::from(2));
    }

    #[test]
    fn screen_writes_ranked_table() {
        let data = data_dir();
        let out = TempDir::new().unwrap();
        let file = write_temp_ini(&ini(data.path(), out.path(), ""));
        let screen_dir = out.path().join("screen");
        let code = cli::run(Cli {
            verbose: false,
            command: Command::Screen {
                config: file.path().to_path_buf(),
                data_dir: None,
                code: None,
                output: Some(screen_dir.clone()),
            },
        });
        assert_exit(code, ExitCode::SUCCESS);

        let mut rdr = csv::Reader::from_path(screen_dir.join("screen.csv")).unwrap();
        let codes: Vec<String> = rdr
            .records()
            .map(|r| r.unwrap()[0].to_string())
            .collect();
        // the short file is skipped, the rest are ranked
        assert_eq!(codes.len(), 2);
        assert!(codes.contains(&"000001".to_string()));
        assert!(codes.contains(&"110022".to_string()));
    }

    #[test]
    fn info_lists_ranges() {
        let data = data_dir();
        let code = cli::run(Cli {
            verbose: false,
            command: Command::Info {
                data_dir: data.path().to_path_buf(),
                code: None,
            },
        });
        assert_exit(code, ExitCode::SUCCESS);
    }
}
