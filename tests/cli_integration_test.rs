//! CLI integration tests.
//!
//! Tests cover:
//! - Signal parsing from INI config (parse_signals)
//! - Evaluation and CSV output (evaluate_signals, write_signals_csv)
//! - The `functions` listing (describe_function)
//! - `eval` and `check` end to end with real files on disk

mod common;

use common::*;
use std::process::ExitCode;
use stratlang::adapters::file_config_adapter::FileConfigAdapter;
use stratlang::cli::{self, Cli, Command};
use stratlang::domain::error::StratlangError;
use stratlang::domain::registry::Registry;
use tempfile::TempDir;

fn same_code(a: ExitCode, b: ExitCode) -> bool {
    format!("{:?}", a) == format!("{:?}", b)
}

const SIGNALS_INI: &str = r#"
[data]
candles = candles.csv
resolution = 1h

[signals]
rising = close > close[1]
sma = SMA(2)
both = close > close[1] AND SMA(2) > 0
"#;

mod signal_parsing {
    use super::*;

    #[test]
    fn signals_parse_in_file_order() {
        let config = FileConfigAdapter::from_string(SIGNALS_INI).unwrap();
        let signals = cli::parse_signals(&config).unwrap();
        let names: Vec<&str> = signals.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["rising", "sma", "both"]);
        assert_eq!(signals[1].source, "SMA(2)");
        assert_eq!(signals[0].ast.to_string(), "(close > close[1])");
    }

    #[test]
    fn bad_signal_is_parse_error() {
        let config =
            FileConfigAdapter::from_string("[signals]\nok = RSI(14) > 70\nbad = RSI(14) >\n")
                .unwrap();
        let err = cli::parse_signals(&config).unwrap_err();
        assert!(matches!(err, StratlangError::Parse(_)));
        assert!(same_code((&err).into(), ExitCode::from(4)));
    }

    #[test]
    fn missing_signals_section() {
        let config = FileConfigAdapter::from_string("[data]\ncandles = c.csv\n").unwrap();
        let err = cli::parse_signals(&config).unwrap_err();
        assert!(matches!(err, StratlangError::ConfigMissing { .. }));
    }
}

mod output {
    use super::*;

    #[test]
    fn csv_has_one_row_per_bar_and_blank_nan() {
        let config = FileConfigAdapter::from_string(SIGNALS_INI).unwrap();
        let signals = cli::parse_signals(&config).unwrap();
        let data = hourly_data(&[1.0, 2.0, 3.0]);
        let results = cli::evaluate_signals(&data, &signals).unwrap();

        let mut buf = Vec::new();
        cli::write_signals_csv(&mut buf, &data, &signals, &results).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "timestamp,rising,sma,both");
        assert_eq!(lines[1], "2024-01-01T00:00:00Z,0,,0");
        assert_eq!(lines[2], "2024-01-01T01:00:00Z,1,1.5,1");
        assert_eq!(lines[3], "2024-01-01T02:00:00Z,1,2.5,1");
    }

    #[test]
    fn evaluation_error_is_reported() {
        let config =
            FileConfigAdapter::from_string("[signals]\noi = OI_CHANGE(4) > 0\n").unwrap();
        let signals = cli::parse_signals(&config).unwrap();
        let data = hourly_data(&[1.0, 2.0]);
        let err = cli::evaluate_signals(&data, &signals).unwrap_err();
        assert!(matches!(err, StratlangError::Eval(_)));
        assert!(same_code((&err).into(), ExitCode::from(5)));
    }
}

mod functions_listing {
    use super::*;

    #[test]
    fn describes_dependencies() {
        let registry = Registry::standard();
        let whale = cli::describe_function(registry.get("WHALE_DELTA").unwrap());
        assert!(whale.starts_with("WHALE_DELTA"));
        assert!(whale.contains("requires: candles, agg trades"));

        let delta = cli::describe_function(registry.get("DELTA").unwrap());
        assert!(delta.contains("uses agg trades when available"));

        let macd = cli::describe_function(registry.get("MACD").unwrap());
        assert!(macd.contains("components: line, signal, histogram; default line"));
    }
}

mod end_to_end {
    use super::*;

    #[test]
    fn eval_writes_output_file() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "candles.csv", &candles_csv(&wave(30)));
        let config = write_file(dir.path(), "strategy.ini", SIGNALS_INI);
        let output = dir.path().join("signals.csv");

        let code = cli::run(Cli {
            command: Command::Eval {
                config,
                output: Some(output.clone()),
            },
        });
        assert!(same_code(code, ExitCode::SUCCESS));

        let text = std::fs::read_to_string(&output).unwrap();
        assert_eq!(text.lines().count(), 31);
        assert!(text.starts_with("timestamp,rising,sma,both\n"));
    }

    #[test]
    fn eval_with_missing_candles_is_data_error() {
        let dir = TempDir::new().unwrap();
        let config = write_file(dir.path(), "strategy.ini", SIGNALS_INI);
        let code = cli::run(Cli {
            command: Command::Eval {
                config,
                output: None,
            },
        });
        assert!(same_code(code, ExitCode::from(3)));
    }

    #[test]
    fn eval_with_missing_config_is_config_error() {
        let dir = TempDir::new().unwrap();
        let code = cli::run(Cli {
            command: Command::Eval {
                config: dir.path().join("absent.ini"),
                output: None,
            },
        });
        assert!(same_code(code, ExitCode::from(2)));
    }

    #[test]
    fn check_exit_codes() {
        let ok = cli::run(Cli {
            command: Command::Check {
                expression: "RSI(14) > 70".into(),
            },
        });
        assert!(same_code(ok, ExitCode::SUCCESS));

        let bad = cli::run(Cli {
            command: Command::Check {
                expression: "close > open > high".into(),
            },
        });
        assert!(same_code(bad, ExitCode::from(4)));
    }
}
