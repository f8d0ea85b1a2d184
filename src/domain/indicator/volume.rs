//! Candle volume functions.
//!
//! `AVG_VOLUME(n)` / `RELATIVE_VOLUME(n)` average the bar volume. The
//! OHLCV volume family splits each bar's volume into aggressive buy and sell
//! sides using the candle's taker-buy field (half/half when absent):
//! `BUY_VOLUME`, `SELL_VOLUME`, `OHLCV_DELTA`, `OHLCV_CVD` (running sum of
//! the delta) and `TRADES` (trade count, NaN when the feed has none).

use crate::domain::context::DataContext;
use crate::domain::error::EvalError;
use crate::domain::indicator::{period_param, sma, volumes, ResultSeries};

pub fn relative_volume(volumes: &[f64], period: usize) -> Vec<f64> {
    let average = sma(volumes, period);
    volumes
        .iter()
        .zip(&average)
        .map(|(v, avg)| if *avg == 0.0 { f64::NAN } else { v / avg })
        .collect()
}

pub fn compute_avg_volume(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let period = period_param("AVG_VOLUME", params, 0)?;
    Ok(ResultSeries::Flat(sma(&volumes(ctx), period)))
}

pub fn compute_relative_volume(
    ctx: &DataContext<'_>,
    params: &[f64],
) -> Result<ResultSeries, EvalError> {
    let period = period_param("RELATIVE_VOLUME", params, 0)?;
    Ok(ResultSeries::Flat(relative_volume(&volumes(ctx), period)))
}

pub fn compute_buy_volume(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(ResultSeries::Flat(
        ctx.candles.iter().map(|c| c.buy_volume()).collect(),
    ))
}

pub fn compute_sell_volume(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(ResultSeries::Flat(
        ctx.candles.iter().map(|c| c.sell_volume()).collect(),
    ))
}

pub fn ohlcv_delta(ctx: &DataContext<'_>) -> Vec<f64> {
    ctx.candles
        .iter()
        .map(|c| c.buy_volume() - c.sell_volume())
        .collect()
}

pub fn compute_ohlcv_delta(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(ResultSeries::Flat(ohlcv_delta(ctx)))
}

pub fn compute_ohlcv_cvd(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    let cvd = ohlcv_delta(ctx)
        .into_iter()
        .scan(0.0, |total, delta| {
            *total += delta;
            Some(*total)
        })
        .collect();
    Ok(ResultSeries::Flat(cvd))
}

pub fn compute_trades(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(ResultSeries::Flat(
        ctx.candles
            .iter()
            .map(|c| c.trade_count.map_or(f64::NAN, |n| n as f64))
            .collect(),
    ))
}
