//! Williams %R.
//!
//! %R = (highest high - C) / (highest high - lowest low) * -100, in [-100, 0].
//! A flat window yields -50.

use crate::domain::context::DataContext;
use crate::domain::error::EvalError;
use crate::domain::indicator::{period_param, ResultSeries};
use crate::domain::market::Candle;

pub fn williams_r(candles: &[Candle], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; candles.len()];
    if period == 0 {
        return out;
    }
    for i in (period - 1)..candles.len() {
        let window = &candles[i + 1 - period..=i];
        let high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        let range = high - low;
        out[i] = if range == 0.0 {
            -50.0
        } else {
            (high - candles[i].close) / range * -100.0
        };
    }
    out
}

pub fn compute(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let period = period_param("WILLIAMS_R", params, 0)?;
    Ok(ResultSeries::Flat(williams_r(ctx.candles, period)))
}
