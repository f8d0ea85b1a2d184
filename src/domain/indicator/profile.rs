//! Rolling volume profile: `POC`, `VAH`, `VAL`.
//!
//! The price span of the trailing window is split into fixed bins. Trade
//! quantity lands in the bin of its price; without trade data each candle's
//! volume is spread evenly over the bins its high/low range touches.
//! The value area grows outward from the point of control, taking the
//! heavier neighbour first, until it holds 70% of the window's volume.

use crate::domain::context::DataContext;
use crate::domain::error::EvalError;
use crate::domain::indicator::{period_param, ResultSeries};

pub const PROFILE_BINS: usize = 50;
pub const VALUE_AREA_SHARE: f64 = 0.70;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileLevels {
    pub poc: f64,
    pub vah: f64,
    pub val: f64,
}

fn bin_index(price: f64, low: f64, bin_size: f64) -> usize {
    let idx = ((price - low) / bin_size).floor();
    if idx <= 0.0 {
        0
    } else {
        (idx as usize).min(PROFILE_BINS - 1)
    }
}

fn levels_from_bins(bins: &[f64], low: f64, bin_size: f64) -> Option<ProfileLevels> {
    let total: f64 = bins.iter().sum();
    if total <= 0.0 {
        return None;
    }
    let mut poc = 0;
    for (i, volume) in bins.iter().enumerate() {
        if *volume > bins[poc] {
            poc = i;
        }
    }

    let (mut lo, mut hi) = (poc, poc);
    let mut covered = bins[poc];
    while covered < VALUE_AREA_SHARE * total && (lo > 0 || hi < bins.len() - 1) {
        let below = if lo > 0 { bins[lo - 1] } else { f64::NEG_INFINITY };
        let above = if hi < bins.len() - 1 { bins[hi + 1] } else { f64::NEG_INFINITY };
        if above >= below {
            hi += 1;
            covered += bins[hi];
        } else {
            lo -= 1;
            covered += bins[lo];
        }
    }

    Some(ProfileLevels {
        poc: low + (poc as f64 + 0.5) * bin_size,
        vah: low + (hi + 1) as f64 * bin_size,
        val: low + lo as f64 * bin_size,
    })
}

pub fn volume_profile(ctx: &DataContext<'_>, period: usize) -> Vec<Option<ProfileLevels>> {
    let candles = ctx.candles;
    let trades = ctx.trades_per_bar();
    let mut out = vec![None; candles.len()];
    if period == 0 {
        return out;
    }

    for i in (period - 1)..candles.len() {
        let start = i + 1 - period;
        let window = &candles[start..=i];
        let high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        if high <= low {
            out[i] = Some(ProfileLevels {
                poc: high,
                vah: high,
                val: high,
            });
            continue;
        }

        let bin_size = (high - low) / PROFILE_BINS as f64;
        let mut bins = [0.0; PROFILE_BINS];
        match &trades {
            Some(buckets) => {
                for bucket in &buckets[start..=i] {
                    for t in bucket.iter() {
                        bins[bin_index(t.price, low, bin_size)] += t.quantity;
                    }
                }
            }
            None => {
                for c in window {
                    // inverted bars (high < low) still spread over their span
                    let a = bin_index(c.low, low, bin_size);
                    let b = bin_index(c.high, low, bin_size);
                    let (first, last) = (a.min(b), a.max(b));
                    let share = c.volume / (last - first + 1) as f64;
                    for bin in &mut bins[first..=last] {
                        *bin += share;
                    }
                }
            }
        }
        out[i] = levels_from_bins(&bins, low, bin_size);
    }
    out
}

fn profile_series(
    function: &str,
    ctx: &DataContext<'_>,
    params: &[f64],
    pick: fn(&ProfileLevels) -> f64,
) -> Result<ResultSeries, EvalError> {
    let period = period_param(function, params, 0)?;
    Ok(ResultSeries::Flat(
        volume_profile(ctx, period)
            .iter()
            .map(|levels| levels.as_ref().map_or(f64::NAN, pick))
            .collect(),
    ))
}

pub fn compute_poc(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    profile_series("POC", ctx, params, |l| l.poc)
}

pub fn compute_vah(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    profile_series("VAH", ctx, params, |l| l.vah)
}

pub fn compute_val(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    profile_series("VAL", ctx, params, |l| l.val)
}
