//! Single- and two-bar candle shapes.
//!
//! Patterns return 1.0/0.0 and take an optional ratio:
//! - `DOJI(r)`: body at most r × range
//! - `HAMMER(r)`: lower wick at least r × body, upper wick no longer than the body
//! - `SHOOTING_STAR(r)`: the mirror image of a hammer
//! - `BULLISH_ENGULFING(r)` / `BEARISH_ENGULFING(r)`: the body reverses and
//!   covers the previous body, and is at least r × its size; NaN on bar 0
//!
//! Properties are plain per-bar magnitudes or flags.

use crate::domain::context::DataContext;
use crate::domain::error::EvalError;
use crate::domain::indicator::{bool_value, positive_param, ResultSeries};
use crate::domain::market::Candle;

pub fn default_ratio(name: &str) -> f64 {
    match name {
        "DOJI" => 0.1,
        "HAMMER" | "SHOOTING_STAR" => 2.0,
        _ => 1.0,
    }
}

fn ratio(name: &str, params: &[f64]) -> Result<f64, EvalError> {
    if params.is_empty() {
        Ok(default_ratio(name))
    } else {
        positive_param(name, params, 0)
    }
}

fn per_candle(ctx: &DataContext<'_>, f: impl Fn(&Candle) -> f64) -> ResultSeries {
    ResultSeries::Flat(ctx.candles.iter().map(f).collect())
}

pub fn is_doji(c: &Candle, ratio: f64) -> bool {
    c.range() > 0.0 && c.body() <= ratio * c.range()
}

pub fn is_hammer(c: &Candle, ratio: f64) -> bool {
    c.lower_wick() > 0.0 && c.lower_wick() >= ratio * c.body() && c.upper_wick() <= c.body()
}

pub fn is_shooting_star(c: &Candle, ratio: f64) -> bool {
    c.upper_wick() > 0.0 && c.upper_wick() >= ratio * c.body() && c.lower_wick() <= c.body()
}

pub fn is_bullish_engulfing(prev: &Candle, c: &Candle, ratio: f64) -> bool {
    prev.close < prev.open
        && c.close > c.open
        && c.open <= prev.close
        && c.close >= prev.open
        && c.body() >= ratio * prev.body()
}

pub fn is_bearish_engulfing(prev: &Candle, c: &Candle, ratio: f64) -> bool {
    prev.close > prev.open
        && c.close < c.open
        && c.open >= prev.close
        && c.close <= prev.open
        && c.body() >= ratio * prev.body()
}

fn two_bar(ctx: &DataContext<'_>, f: impl Fn(&Candle, &Candle) -> bool) -> ResultSeries {
    let candles = ctx.candles;
    ResultSeries::Flat(
        (0..candles.len())
            .map(|i| {
                if i == 0 {
                    f64::NAN
                } else {
                    bool_value(f(&candles[i - 1], &candles[i]))
                }
            })
            .collect(),
    )
}

pub fn compute_doji(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let r = ratio("DOJI", params)?;
    Ok(per_candle(ctx, |c| bool_value(is_doji(c, r))))
}

pub fn compute_hammer(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let r = ratio("HAMMER", params)?;
    Ok(per_candle(ctx, |c| bool_value(is_hammer(c, r))))
}

pub fn compute_shooting_star(
    ctx: &DataContext<'_>,
    params: &[f64],
) -> Result<ResultSeries, EvalError> {
    let r = ratio("SHOOTING_STAR", params)?;
    Ok(per_candle(ctx, |c| bool_value(is_shooting_star(c, r))))
}

pub fn compute_bullish_engulfing(
    ctx: &DataContext<'_>,
    params: &[f64],
) -> Result<ResultSeries, EvalError> {
    let r = ratio("BULLISH_ENGULFING", params)?;
    Ok(two_bar(ctx, |prev, c| is_bullish_engulfing(prev, c, r)))
}

pub fn compute_bearish_engulfing(
    ctx: &DataContext<'_>,
    params: &[f64],
) -> Result<ResultSeries, EvalError> {
    let r = ratio("BEARISH_ENGULFING", params)?;
    Ok(two_bar(ctx, |prev, c| is_bearish_engulfing(prev, c, r)))
}

pub fn compute_body_size(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(per_candle(ctx, Candle::body))
}

pub fn compute_upper_wick(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(per_candle(ctx, Candle::upper_wick))
}

pub fn compute_lower_wick(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(per_candle(ctx, Candle::lower_wick))
}

pub fn compute_candle_range(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(per_candle(ctx, Candle::range))
}

/// Body as a percentage of the range; 0 for a zero-range bar.
pub fn compute_body_pct(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(per_candle(ctx, |c| {
        if c.range() == 0.0 {
            0.0
        } else {
            c.body() / c.range() * 100.0
        }
    }))
}

pub fn compute_is_bullish(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(per_candle(ctx, |c| bool_value(c.close > c.open)))
}

pub fn compute_is_bearish(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(per_candle(ctx, |c| bool_value(c.close < c.open)))
}
