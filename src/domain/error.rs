//! Domain error types.

use crate::domain::context::DataDependency;

/// A lexical error: an unrecognized character or an identifier missing from
/// the keyword table.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("lex error at position {position}: {message}")]
pub struct LexError {
    pub message: String,
    pub position: usize,
}

/// A parse error with position information for expression parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with the offending input line and a caret under the
    /// error position within that line.
    pub fn display_with_context(&self, input: &str) -> String {
        let position = self.position.min(input.len());
        let before = input.get(..position).unwrap_or(input);
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let line_end = input[line_start..]
            .find('\n')
            .map_or(input.len(), |i| line_start + i);
        let line = input[line_start..line_end].trim_end_matches('\r');
        let column = before[line_start..].chars().count();
        let caret = " ".repeat(column) + "^";
        format!("{line}\n{caret}\n{err}", err = self)
    }
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        ParseError {
            message: err.message,
            position: err.position,
        }
    }
}

/// A failure while evaluating an expression against market data.
///
/// Insufficient history is never an error: it shows up as NaN in the series.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("{function} requires {dependency} data, which is not available")]
    MissingDependency {
        function: String,
        dependency: DataDependency,
    },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("invalid parameters for {function}: {reason}")]
    InvalidParameters { function: String, reason: String },
}

/// Top-level error type for stratlang.
#[derive(Debug, thiserror::Error)]
pub enum StratlangError {
    #[error("data error: {reason}")]
    Data { reason: String },

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

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StratlangError> for std::process::ExitCode {
    fn from(err: &StratlangError) -> Self {
        let code: u8 = match err {
            StratlangError::Io(_) => 1,
            StratlangError::ConfigParse { .. }
            | StratlangError::ConfigMissing { .. }
            | StratlangError::ConfigInvalid { .. } => 2,
            StratlangError::Data { .. } => 3,
            StratlangError::Parse(_) => 4,
            StratlangError::Eval(_) => 5,
        };
        std::process::ExitCode::from(code)
    }
}
