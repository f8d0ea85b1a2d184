//! MACD (Moving Average Convergence Divergence).
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line, seeded once the line is defined
//! Histogram = MACD Line - Signal Line
//!
//! Warmup: the line is NaN for the first max(fast, slow) - 1 bars, the
//! signal and histogram for a further signal - 1 bars.

use crate::domain::context::DataContext;
use crate::domain::error::EvalError;
use crate::domain::indicator::{closes, ema, period_param, ResultSeries};

pub struct Macd {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(values: &[f64], fast: usize, slow: usize, signal_period: usize) -> Macd {
    let ema_fast = ema(values, fast);
    let ema_slow = ema(values, slow);
    let line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal = ema(&line, signal_period);
    let histogram = line.iter().zip(&signal).map(|(l, s)| l - s).collect();
    Macd {
        line,
        signal,
        histogram,
    }
}

pub fn compute(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let fast = period_param("MACD", params, 0)?;
    let slow = period_param("MACD", params, 1)?;
    let signal = period_param("MACD", params, 2)?;
    let result = macd(&closes(ctx), fast, slow, signal);
    Ok(ResultSeries::Composite(vec![
        ("line", result.line),
        ("signal", result.signal),
        ("histogram", result.histogram),
    ]))
}
