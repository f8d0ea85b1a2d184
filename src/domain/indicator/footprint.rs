//! Footprint-style functions.
//!
//! `ABSORPTION(volume_multiple, max_range_pct)` flags bars that traded at
//! least `volume_multiple` times the 20-bar average volume while the range
//! stayed within `max_range_pct` percent of the close. It only needs candles.
//!
//! `STACKED_BUY_IMBALANCES(ratio, min_stack)` and its sell mirror split each
//! bar into price levels and compare diagonally: level l is a buy imbalance
//! when ask-side volume at l is at least `ratio` times bid-side volume at
//! l - 1. The result is the longest run of consecutive imbalanced levels,
//! or 0 when that run is shorter than `min_stack`. Requires trade data.

use crate::domain::context::{DataContext, DataDependency};
use crate::domain::error::EvalError;
use crate::domain::indicator::{bool_value, period_param, positive_param, sma, volumes, ResultSeries};
use crate::domain::market::{AggTrade, Candle};

pub const ABSORPTION_VOLUME_PERIOD: usize = 20;
pub const FOOTPRINT_LEVELS: usize = 10;

pub fn compute_absorption(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let multiple = positive_param("ABSORPTION", params, 0)?;
    let max_range_pct = positive_param("ABSORPTION", params, 1)?;
    let average = sma(&volumes(ctx), ABSORPTION_VOLUME_PERIOD);
    Ok(ResultSeries::Flat(
        ctx.candles
            .iter()
            .zip(&average)
            .map(|(c, avg)| {
                if avg.is_nan() || c.close == 0.0 {
                    return f64::NAN;
                }
                let range_pct = c.range() / c.close * 100.0;
                bool_value(c.volume >= multiple * avg && range_pct <= max_range_pct)
            })
            .collect(),
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImbalanceSide {
    Buy,
    Sell,
}

/// Aggressive (buy, sell) quantity per price level of one bar, low to high.
pub fn footprint(candle: &Candle, trades: &[AggTrade]) -> Vec<(f64, f64)> {
    let mut levels = vec![(0.0, 0.0); FOOTPRINT_LEVELS];
    let range = candle.range();
    for t in trades {
        let idx = if range <= 0.0 {
            0
        } else {
            let raw = ((t.price - candle.low) / range * FOOTPRINT_LEVELS as f64).floor();
            if raw <= 0.0 {
                0
            } else {
                (raw as usize).min(FOOTPRINT_LEVELS - 1)
            }
        };
        if t.is_buyer_maker {
            levels[idx].1 += t.quantity;
        } else {
            levels[idx].0 += t.quantity;
        }
    }
    levels
}

pub fn longest_stack(levels: &[(f64, f64)], side: ImbalanceSide, ratio: f64) -> usize {
    let mut longest = 0;
    let mut run = 0;
    for l in 0..levels.len() {
        let imbalanced = match side {
            ImbalanceSide::Buy => {
                l > 0 && levels[l].0 > 0.0 && levels[l].0 >= ratio * levels[l - 1].1
            }
            ImbalanceSide::Sell => {
                l + 1 < levels.len() && levels[l].1 > 0.0 && levels[l].1 >= ratio * levels[l + 1].0
            }
        };
        if imbalanced {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    longest
}

fn stacked(
    function: &str,
    side: ImbalanceSide,
    ctx: &DataContext<'_>,
    params: &[f64],
) -> Result<ResultSeries, EvalError> {
    let ratio = positive_param(function, params, 0)?;
    let min_stack = if params.len() > 1 {
        period_param(function, params, 1)?
    } else {
        3
    };
    let buckets = ctx
        .trades_per_bar()
        .ok_or_else(|| EvalError::MissingDependency {
            function: function.to_string(),
            dependency: DataDependency::AggTrades,
        })?;
    Ok(ResultSeries::Flat(
        ctx.candles
            .iter()
            .zip(buckets)
            .map(|(candle, trades)| {
                let stack = longest_stack(&footprint(candle, trades), side, ratio);
                if stack >= min_stack { stack as f64 } else { 0.0 }
            })
            .collect(),
    ))
}

pub fn compute_stacked_buy_imbalances(
    ctx: &DataContext<'_>,
    params: &[f64],
) -> Result<ResultSeries, EvalError> {
    stacked("STACKED_BUY_IMBALANCES", ImbalanceSide::Buy, ctx, params)
}

pub fn compute_stacked_sell_imbalances(
    ctx: &DataContext<'_>,
    params: &[f64],
) -> Result<ResultSeries, EvalError> {
    stacked("STACKED_SELL_IMBALANCES", ImbalanceSide::Sell, ctx, params)
}
