//! Derivatives metrics: funding rate, premium index and open interest.
//!
//! Each series is sparse and gets forward-filled onto the bar grid; bars
//! before the first observation are NaN. All of these require their own
//! data series.

use crate::domain::context::{DataContext, DataDependency};
use crate::domain::error::EvalError;
use crate::domain::indicator::{period_param, rolling, ResultSeries};

fn missing(function: &str, dependency: DataDependency) -> EvalError {
    EvalError::MissingDependency {
        function: function.to_string(),
        dependency,
    }
}

fn mean(window: &[f64]) -> f64 {
    window.iter().sum::<f64>() / window.len() as f64
}

fn funding(ctx: &DataContext<'_>, function: &str) -> Result<Vec<f64>, EvalError> {
    let rates = ctx
        .funding_rates
        .ok_or_else(|| missing(function, DataDependency::Funding))?;
    Ok(ctx.align(rates))
}

fn premium(ctx: &DataContext<'_>, function: &str) -> Result<Vec<f64>, EvalError> {
    let points = ctx
        .premium_index
        .ok_or_else(|| missing(function, DataDependency::Premium))?;
    Ok(ctx.align(points))
}

fn open_interest(ctx: &DataContext<'_>, function: &str) -> Result<Vec<f64>, EvalError> {
    let points = ctx
        .open_interest
        .ok_or_else(|| missing(function, DataDependency::OpenInterest))?;
    Ok(ctx.align(points))
}

pub fn compute_funding(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(ResultSeries::Flat(funding(ctx, "FUNDING")?))
}

pub fn compute_funding_avg(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let period = period_param("FUNDING_AVG", params, 0)?;
    let values = funding(ctx, "FUNDING_AVG")?;
    Ok(ResultSeries::Flat(rolling(&values, period, mean)))
}

pub fn compute_premium(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(ResultSeries::Flat(premium(ctx, "PREMIUM")?))
}

pub fn compute_premium_avg(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let period = period_param("PREMIUM_AVG", params, 0)?;
    let values = premium(ctx, "PREMIUM_AVG")?;
    Ok(ResultSeries::Flat(rolling(&values, period, mean)))
}

pub fn compute_oi(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(ResultSeries::Flat(open_interest(ctx, "OI")?))
}

/// OI[i] - OI[i - n].
pub fn compute_oi_change(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let period = if params.is_empty() {
        1
    } else {
        period_param("OI_CHANGE", params, 0)?
    };
    let values = open_interest(ctx, "OI_CHANGE")?;
    Ok(ResultSeries::Flat(
        (0..values.len())
            .map(|i| {
                if i < period {
                    f64::NAN
                } else {
                    values[i] - values[i - period]
                }
            })
            .collect(),
    ))
}
