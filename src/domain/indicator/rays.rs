//! Horizontal support/resistance rays.
//!
//! A resistance ray starts at a swing high: a bar whose high is strictly
//! above the two bars before it and at least the two bars after it (swing
//! lows mirror this for support). Rays are collected from the window of
//! `lookback` bars ending `skip` bars ago; a swing only counts once its
//! confirming bars are inside that window, so no value looks ahead.
//!
//! - `*_RAY_COUNT(lookback, skip)`: swings in the window
//! - `*_RAYS_BROKEN(lookback, skip)`: rays the current close has crossed
//! - `*_RAY(n, lookback, skip)`: level of the n-th most recent ray
//! - `*_RAY_DISTANCE(n, lookback, skip)`: percent distance of close from it

use crate::domain::context::DataContext;
use crate::domain::error::EvalError;
use crate::domain::indicator::{count_param, period_param, ResultSeries};
use crate::domain::market::Candle;

pub const SWING_STRENGTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Resistance,
    Support,
}

fn is_swing(candles: &[Candle], j: usize, side: Side) -> bool {
    if j < SWING_STRENGTH || j + SWING_STRENGTH >= candles.len() {
        return false;
    }
    let level = |c: &Candle| match side {
        Side::Resistance => c.high,
        Side::Support => -c.low,
    };
    let pivot = level(&candles[j]);
    let before = candles[j - SWING_STRENGTH..j].iter().all(|c| pivot > level(c));
    let after = candles[j + 1..=j + SWING_STRENGTH]
        .iter()
        .all(|c| pivot >= level(c));
    before && after
}

/// Ray levels visible at each bar, most recent first; `None` during warm-up.
pub fn ray_levels(
    candles: &[Candle],
    side: Side,
    lookback: usize,
    skip: usize,
) -> Vec<Option<Vec<f64>>> {
    let swings: Vec<bool> = (0..candles.len())
        .map(|j| is_swing(candles, j, side))
        .collect();
    (0..candles.len())
        .map(|i| {
            if lookback == 0 || i + 1 < lookback.saturating_add(skip) {
                return None;
            }
            let end = i - skip;
            let start = end + 1 - lookback;
            let levels = (start..=end)
                .rev()
                .filter(|&j| swings[j] && j + SWING_STRENGTH <= end)
                .map(|j| match side {
                    Side::Resistance => candles[j].high,
                    Side::Support => candles[j].low,
                })
                .collect();
            Some(levels)
        })
        .collect()
}

fn side_of(name: &str) -> Side {
    if name.starts_with("RESISTANCE") {
        Side::Resistance
    } else {
        Side::Support
    }
}

fn window_params(name: &str, params: &[f64], offset: usize) -> Result<(usize, usize), EvalError> {
    Ok((
        period_param(name, params, offset)?,
        count_param(name, params, offset + 1)?,
    ))
}

fn ray_count(name: &str, ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let (lookback, skip) = window_params(name, params, 0)?;
    Ok(ResultSeries::Flat(
        ray_levels(ctx.candles, side_of(name), lookback, skip)
            .iter()
            .map(|levels| levels.as_ref().map_or(f64::NAN, |l| l.len() as f64))
            .collect(),
    ))
}

fn rays_broken(name: &str, ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let (lookback, skip) = window_params(name, params, 0)?;
    let side = side_of(name);
    Ok(ResultSeries::Flat(
        ray_levels(ctx.candles, side, lookback, skip)
            .iter()
            .zip(ctx.candles)
            .map(|(levels, candle)| {
                levels.as_ref().map_or(f64::NAN, |l| {
                    l.iter()
                        .filter(|&&level| match side {
                            Side::Resistance => candle.close > level,
                            Side::Support => candle.close < level,
                        })
                        .count() as f64
                })
            })
            .collect(),
    ))
}

fn nth_ray(name: &str, ctx: &DataContext<'_>, params: &[f64]) -> Result<Vec<f64>, EvalError> {
    let ray = period_param(name, params, 0)?;
    let (lookback, skip) = window_params(name, params, 1)?;
    Ok(ray_levels(ctx.candles, side_of(name), lookback, skip)
        .iter()
        .map(|levels| {
            levels
                .as_ref()
                .and_then(|l| l.get(ray - 1).copied())
                .unwrap_or(f64::NAN)
        })
        .collect())
}

fn ray_distance(name: &str, ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let levels = nth_ray(name, ctx, params)?;
    Ok(ResultSeries::Flat(
        levels
            .iter()
            .zip(ctx.candles)
            .map(|(level, candle)| {
                if *level == 0.0 {
                    f64::NAN
                } else {
                    (candle.close - level) / level * 100.0
                }
            })
            .collect(),
    ))
}

pub fn compute_resistance_ray_count(
    ctx: &DataContext<'_>,
    params: &[f64],
) -> Result<ResultSeries, EvalError> {
    ray_count("RESISTANCE_RAY_COUNT", ctx, params)
}

pub fn compute_support_ray_count(
    ctx: &DataContext<'_>,
    params: &[f64],
) -> Result<ResultSeries, EvalError> {
    ray_count("SUPPORT_RAY_COUNT", ctx, params)
}

pub fn compute_resistance_rays_broken(
    ctx: &DataContext<'_>,
    params: &[f64],
) -> Result<ResultSeries, EvalError> {
    rays_broken("RESISTANCE_RAYS_BROKEN", ctx, params)
}

pub fn compute_support_rays_broken(
    ctx: &DataContext<'_>,
    params: &[f64],
) -> Result<ResultSeries, EvalError> {
    rays_broken("SUPPORT_RAYS_BROKEN", ctx, params)
}

pub fn compute_resistance_ray(
    ctx: &DataContext<'_>,
    params: &[f64],
) -> Result<ResultSeries, EvalError> {
    Ok(ResultSeries::Flat(nth_ray("RESISTANCE_RAY", ctx, params)?))
}

pub fn compute_support_ray(
    ctx: &DataContext<'_>,
    params: &[f64],
) -> Result<ResultSeries, EvalError> {
    Ok(ResultSeries::Flat(nth_ray("SUPPORT_RAY", ctx, params)?))
}

pub fn compute_resistance_ray_distance(
    ctx: &DataContext<'_>,
    params: &[f64],
) -> Result<ResultSeries, EvalError> {
    ray_distance("RESISTANCE_RAY_DISTANCE", ctx, params)
}

pub fn compute_support_ray_distance(
    ctx: &DataContext<'_>,
    params: &[f64],
) -> Result<ResultSeries, EvalError> {
    ray_distance("SUPPORT_RAY_DISTANCE", ctx, params)
}
