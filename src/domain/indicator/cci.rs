//! Commodity Channel Index.
//!
//! CCI = (TP - SMA(TP)) / (0.015 * mean absolute deviation of TP).
//! Zero deviation yields 0.

use crate::domain::context::DataContext;
use crate::domain::error::EvalError;
use crate::domain::indicator::{period_param, rolling, ResultSeries};
use crate::domain::market::Candle;

const LAMBERT: f64 = 0.015;

pub fn cci(candles: &[Candle], period: usize) -> Vec<f64> {
    let typical: Vec<f64> = candles.iter().map(Candle::typical_price).collect();
    rolling(&typical, period, |window| {
        let n = window.len() as f64;
        let mean = window.iter().sum::<f64>() / n;
        let deviation = window.iter().map(|v| (v - mean).abs()).sum::<f64>() / n;
        let current = window[window.len() - 1];
        if deviation == 0.0 {
            0.0
        } else {
            (current - mean) / (LAMBERT * deviation)
        }
    })
}

pub fn compute(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let period = period_param("CCI", params, 0)?;
    Ok(ResultSeries::Flat(cci(ctx.candles, period)))
}
