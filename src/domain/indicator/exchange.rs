//! Cross-exchange comparison against reference candles of the same
//! instrument on another venue. Reference bars are matched by open time;
//! bars without a match are NaN.

use crate::domain::context::{DataContext, DataDependency};
use crate::domain::error::EvalError;
use crate::domain::indicator::stddev::population_stddev;
use crate::domain::indicator::{bool_value, period_param, rolling, ResultSeries};
use crate::domain::market::Candle;

fn reference<'a>(ctx: &DataContext<'a>, function: &str) -> Result<Vec<Option<&'a Candle>>, EvalError> {
    let reference = ctx
        .reference_candles
        .ok_or_else(|| EvalError::MissingDependency {
            function: function.to_string(),
            dependency: DataDependency::ReferenceCandles,
        })?;
    Ok(ctx
        .candles
        .iter()
        .map(|c| {
            reference
                .binary_search_by(|r| r.timestamp.cmp(&c.timestamp))
                .ok()
                .map(|idx| &reference[idx])
        })
        .collect())
}

/// Percent premium of the primary close over the reference close.
pub fn spread(ctx: &DataContext<'_>, function: &str) -> Result<Vec<f64>, EvalError> {
    Ok(reference(ctx, function)?
        .iter()
        .zip(ctx.candles)
        .map(|(r, c)| match r {
            Some(r) if r.close != 0.0 => (c.close - r.close) / r.close * 100.0,
            _ => f64::NAN,
        })
        .collect())
}

pub fn compute_exchange_spread(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(ResultSeries::Flat(spread(ctx, "EXCHANGE_SPREAD")?))
}

/// 1 when the two venues closed the bar in opposite directions.
pub fn compute_exchange_divergence(
    ctx: &DataContext<'_>,
    _: &[f64],
) -> Result<ResultSeries, EvalError> {
    let direction = |c: &Candle| (c.close - c.open).signum() * bool_value(c.close != c.open);
    Ok(ResultSeries::Flat(
        reference(ctx, "EXCHANGE_DIVERGENCE")?
            .iter()
            .zip(ctx.candles)
            .map(|(r, c)| match r {
                Some(r) => bool_value(direction(c) * direction(r) < 0.0),
                None => f64::NAN,
            })
            .collect(),
    ))
}

/// Z-score of the spread over a trailing window; 0 when the window is flat.
pub fn compute_exchange_spread_z(
    ctx: &DataContext<'_>,
    params: &[f64],
) -> Result<ResultSeries, EvalError> {
    let period = period_param("EXCHANGE_SPREAD_Z", params, 0)?;
    let spread = spread(ctx, "EXCHANGE_SPREAD_Z")?;
    Ok(ResultSeries::Flat(rolling(&spread, period, |window| {
        let mean = window.iter().sum::<f64>() / window.len() as f64;
        let deviation = population_stddev(window);
        if deviation == 0.0 {
            0.0
        } else {
            (window[window.len() - 1] - mean) / deviation
        }
    })))
}
