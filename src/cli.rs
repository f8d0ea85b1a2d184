//! CLI definition and dispatch.

use chrono::SecondsFormat;
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::ast::AstNode;
use crate::domain::context::MarketData;
use crate::domain::error::StratlangError;
use crate::domain::eval::{EvaluatedSeries, Evaluator};
use crate::domain::parser;
use crate::domain::registry::{IndicatorSpec, Registry};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "stratlang", about = "Strategy expression compiler and indicator evaluator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse an expression and print its normalized form
    Check { expression: String },
    /// Evaluate every [signals] entry of a config against its market data
    Eval {
        #[arg(short, long)]
        config: PathBuf,
        /// CSV destination (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the registered functions and the data they need
    Functions,
}

/// A named expression from the `[signals]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub name: String,
    pub source: String,
    pub ast: AstNode,
}

/// Installs the stderr log subscriber; `RUST_LOG` overrides the `warn` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Check { expression } => run_check(&expression),
        Command::Eval { config, output } => run_eval(&config, output.as_deref()),
        Command::Functions => run_functions(),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, StratlangError> {
    FileConfigAdapter::from_file(path).map_err(|e| StratlangError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn run_check(expression: &str) -> ExitCode {
    match parser::parse(expression) {
        Ok(ast) => {
            println!("{}", ast);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e.display_with_context(expression));
            (&StratlangError::from(e)).into()
        }
    }
}

/// Parses every `[signals]` entry in file order, reporting the first failure
/// with a caret under the offending position.
pub fn parse_signals(config: &dyn ConfigPort) -> Result<Vec<Signal>, StratlangError> {
    let entries = config.entries("signals");
    if entries.is_empty() {
        return Err(StratlangError::ConfigMissing {
            section: "signals".into(),
            key: "<name>".into(),
        });
    }
    entries
        .into_iter()
        .map(|(name, source)| match parser::parse(&source) {
            Ok(ast) => Ok(Signal { name, source, ast }),
            Err(e) => {
                eprintln!("error: signal '{}':\n{}", name, e.display_with_context(&source));
                Err(StratlangError::from(e))
            }
        })
        .collect()
}

/// Evaluates all signals with one evaluator so shared calls are computed once.
pub fn evaluate_signals(
    data: &MarketData,
    signals: &[Signal],
) -> Result<Vec<EvaluatedSeries>, StratlangError> {
    let mut evaluator = Evaluator::new(data.context());
    let mut results = Vec::with_capacity(signals.len());
    for signal in signals {
        debug!(signal = %signal.name, expression = %signal.ast, "evaluating signal");
        let series = evaluator.evaluate(&signal.ast).map_err(|e| {
            eprintln!("error: signal '{}': {}", signal.name, e);
            StratlangError::from(e)
        })?;
        results.push(series);
    }
    let stats = evaluator.cache_stats();
    debug!(
        hits = stats.hits,
        misses = stats.misses,
        computations = stats.computations,
        "evaluation finished"
    );
    Ok(results)
}

/// Writes `timestamp,<signal>...` rows; NaN becomes an empty cell.
pub fn write_signals_csv<W: Write>(
    writer: W,
    data: &MarketData,
    signals: &[Signal],
    results: &[EvaluatedSeries],
) -> Result<(), StratlangError> {
    let csv_err = |e: csv::Error| StratlangError::Data {
        reason: format!("failed to write CSV: {}", e),
    };
    let mut wtr = csv::Writer::from_writer(writer);
    let mut header = vec!["timestamp".to_string()];
    header.extend(signals.iter().map(|s| s.name.clone()));
    wtr.write_record(&header).map_err(csv_err)?;

    for (i, candle) in data.candles.iter().enumerate() {
        let mut row = vec![candle.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)];
        row.extend(results.iter().map(|series| {
            let value = series.value_at(i);
            if value.is_nan() {
                String::new()
            } else {
                value.to_string()
            }
        }));
        wtr.write_record(&row).map_err(csv_err)?;
    }
    wtr.flush()?;
    Ok(())
}

fn eval_pipeline(config_path: &Path, output: Option<&Path>) -> Result<(), StratlangError> {
    eprintln!("Loading config from {}", config_path.display());
    let config = load_config(config_path)?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let signals = parse_signals(&config)?;
    eprintln!("Parsed {} signal(s)", signals.len());

    let data = CsvAdapter::from_config(&config, base_dir)?.load_market_data()?;
    eprintln!("Loaded {} candles", data.candles.len());

    let results = evaluate_signals(&data, &signals)?;

    match output {
        Some(path) => {
            write_signals_csv(File::create(path)?, &data, &signals, &results)?;
            eprintln!("Signals written to {}", path.display());
        }
        None => write_signals_csv(io::stdout().lock(), &data, &signals, &results)?,
    }
    Ok(())
}

fn run_eval(config_path: &Path, output: Option<&Path>) -> ExitCode {
    match eval_pipeline(config_path, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // parse and evaluation failures were already reported in context
            if !matches!(e, StratlangError::Parse(_) | StratlangError::Eval(_)) {
                eprintln!("error: {e}");
            }
            (&e).into()
        }
    }
}

/// One `functions` listing line: id, hard dependencies, optional ones.
pub fn describe_function(spec: &IndicatorSpec) -> String {
    let join = |deps: &[crate::domain::context::DataDependency]| {
        deps.iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mut line = format!("{:<24} requires: {}", spec.id, join(spec.dependencies));
    if !spec.optional_dependencies.is_empty() {
        line.push_str(&format!(" (uses {} when available)", join(spec.optional_dependencies)));
    }
    if let Some(default) = spec.default_component {
        line.push_str(&format!(
            " [components: {}; default {}]",
            spec.components.join(", "),
            default
        ));
    }
    line
}

fn run_functions() -> ExitCode {
    let registry = Registry::standard();
    for spec in registry.specs() {
        println!("{}", describe_function(spec));
    }
    eprintln!("\n{} functions registered", registry.len());
    ExitCode::SUCCESS
}
