//! Indicator computations.
//!
//! Every computation takes the evaluation's [`DataContext`] plus the call's
//! numeric parameters and returns a [`ResultSeries`] with one value per
//! candle. Bars without enough history hold NaN.
//!
//! The per-family modules expose two layers:
//! - pure series functions over `&[f64]` or candles (`ema`, `rsi`, ...)
//! - `compute_*` adapters with the registry's compute signature

pub mod atr;
pub mod bollinger;
pub mod calendar;
pub mod candle;
pub mod cci;
pub mod derivatives;
pub mod ema;
pub mod exchange;
pub mod footprint;
pub mod macd;
pub mod order_flow;
pub mod profile;
pub mod range;
pub mod rays;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod stddev;
pub mod stochastic;
pub mod volume;
pub mod williams;
pub mod wma;

use crate::domain::context::DataContext;
use crate::domain::error::EvalError;

pub use ema::ema;
pub use sma::sma;

/// Output of one indicator computation.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultSeries {
    Flat(Vec<f64>),
    /// Named components, e.g. MACD's line/signal/histogram.
    Composite(Vec<(&'static str, Vec<f64>)>),
}

impl ResultSeries {
    pub fn len(&self) -> usize {
        match self {
            ResultSeries::Flat(values) => values.len(),
            ResultSeries::Composite(parts) => parts.first().map_or(0, |(_, v)| v.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Named component of a composite result.
    pub fn component(&self, name: &str) -> Option<&[f64]> {
        match self {
            ResultSeries::Flat(_) => None,
            ResultSeries::Composite(parts) => parts
                .iter()
                .find(|(part, _)| *part == name)
                .map(|(_, values)| values.as_slice()),
        }
    }

    pub fn as_flat(&self) -> Option<&[f64]> {
        match self {
            ResultSeries::Flat(values) => Some(values),
            ResultSeries::Composite(_) => None,
        }
    }
}

pub(crate) fn closes(ctx: &DataContext<'_>) -> Vec<f64> {
    ctx.candles.iter().map(|c| c.close).collect()
}

pub(crate) fn volumes(ctx: &DataContext<'_>) -> Vec<f64> {
    ctx.candles.iter().map(|c| c.volume).collect()
}

/// Parameter `index` as a positive whole number.
pub(crate) fn period_param(
    function: &str,
    params: &[f64],
    index: usize,
) -> Result<usize, EvalError> {
    let value = param(function, params, index)?;
    if value.fract() != 0.0 || value < 1.0 {
        return Err(EvalError::InvalidParameters {
            function: function.to_string(),
            reason: format!("parameter {} must be a positive whole number, got {}", index + 1, value),
        });
    }
    Ok(value as usize)
}

/// Parameter `index` as a non-negative whole number.
pub(crate) fn count_param(
    function: &str,
    params: &[f64],
    index: usize,
) -> Result<usize, EvalError> {
    let value = param(function, params, index)?;
    if value.fract() != 0.0 || value < 0.0 {
        return Err(EvalError::InvalidParameters {
            function: function.to_string(),
            reason: format!(
                "parameter {} must be a non-negative whole number, got {}",
                index + 1,
                value
            ),
        });
    }
    Ok(value as usize)
}

/// Parameter `index` as a strictly positive number.
pub(crate) fn positive_param(
    function: &str,
    params: &[f64],
    index: usize,
) -> Result<f64, EvalError> {
    let value = param(function, params, index)?;
    if value.is_nan() || value <= 0.0 {
        return Err(EvalError::InvalidParameters {
            function: function.to_string(),
            reason: format!("parameter {} must be positive, got {}", index + 1, value),
        });
    }
    Ok(value)
}

fn param(function: &str, params: &[f64], index: usize) -> Result<f64, EvalError> {
    params
        .get(index)
        .copied()
        .ok_or_else(|| EvalError::InvalidParameters {
            function: function.to_string(),
            reason: format!("expected at least {} parameter(s), got {}", index + 1, params.len()),
        })
}

/// Trailing-window reduction: `f(window)` at every bar with `period` values
/// behind it, NaN elsewhere and wherever the window holds NaN.
pub(crate) fn rolling(values: &[f64], period: usize, f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 {
        return out;
    }
    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[i] = f(window);
    }
    out
}

pub(crate) fn bool_value(flag: bool) -> f64 {
    if flag { 1.0 } else { 0.0 }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::market::Candle;
    use chrono::{TimeDelta, TimeZone, Utc};

    /// Hourly candles starting 2024-01-01 00:00 UTC with open = high = low =
    /// close = price.
    pub fn flat_candles(prices: &[f64]) -> Vec<Candle> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &p)| candle(i, p, p, p, p, 1000.0))
            .collect()
    }

    pub fn candle(index: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + TimeDelta::hours(index as i64),
            open,
            high,
            low,
            close,
            volume,
            taker_buy_volume: None,
            trade_count: None,
        }
    }
}
