//! Order-flow functions.
//!
//! `DELTA`, `CUM_DELTA`, `TRADE_COUNT`, `VWAP` and the session family read
//! aggregated trades when the context has them and otherwise approximate
//! from the candles (taker-buy volume, or a half/half split). Both paths
//! produce full-length series with the same NaN placement.
//!
//! `TRADE_COUNT` falls back to the candles' own `trade_count` column; a bar
//! without one is NaN. When neither trades nor any candle count is present
//! the call fails with a missing aggregated-trades dependency instead of
//! returning a series that is NaN everywhere.
//!
//! The whale family (`WHALE_DELTA`, `WHALE_BUY_VOL`, `WHALE_SELL_VOL`,
//! `LARGE_TRADE_COUNT`) only makes sense per trade and requires trade data.

use crate::domain::context::{DataContext, DataDependency};
use crate::domain::error::EvalError;
use crate::domain::indicator::{positive_param, ResultSeries};
use crate::domain::market::AggTrade;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Flow {
    pub buy: f64,
    pub sell: f64,
}

impl Flow {
    pub fn delta(&self) -> f64 {
        self.buy - self.sell
    }

    fn from_trades<'t>(trades: impl IntoIterator<Item = &'t AggTrade>) -> Self {
        trades.into_iter().fold(Flow::default(), |mut flow, t| {
            if t.is_buyer_maker {
                flow.sell += t.quantity;
            } else {
                flow.buy += t.quantity;
            }
            flow
        })
    }
}

/// Aggressive buy/sell volume per bar.
pub fn bar_flow(ctx: &DataContext<'_>) -> Vec<Flow> {
    match ctx.trades_per_bar() {
        Some(buckets) => buckets.into_iter().map(Flow::from_trades).collect(),
        None => ctx
            .candles
            .iter()
            .map(|c| Flow {
                buy: c.buy_volume(),
                sell: c.sell_volume(),
            })
            .collect(),
    }
}

fn cumulative(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    values
        .into_iter()
        .scan(0.0, |total, v| {
            *total += v;
            Some(*total)
        })
        .collect()
}

/// Running sum that restarts at every UTC day boundary.
fn session_cumulative(ctx: &DataContext<'_>, values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut total = 0.0;
    for (i, value) in values.iter().enumerate() {
        if i > 0 && ctx.candles[i].timestamp.date_naive() != ctx.candles[i - 1].timestamp.date_naive() {
            total = 0.0;
        }
        total += value;
        out.push(total);
    }
    out
}

pub fn compute_delta(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(ResultSeries::Flat(
        bar_flow(ctx).iter().map(Flow::delta).collect(),
    ))
}

pub fn compute_cum_delta(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    Ok(ResultSeries::Flat(cumulative(
        bar_flow(ctx).iter().map(Flow::delta),
    )))
}

pub fn compute_trade_count(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    let counted = ctx.candles.iter().any(|c| c.trade_count.is_some());
    let counts = match ctx.trades_per_bar() {
        Some(buckets) => buckets.iter().map(|b| b.len() as f64).collect(),
        None if !counted && !ctx.candles.is_empty() => {
            return Err(EvalError::MissingDependency {
                function: "TRADE_COUNT".to_string(),
                dependency: DataDependency::AggTrades,
            });
        }
        None => ctx
            .candles
            .iter()
            .map(|c| c.trade_count.map_or(f64::NAN, |n| n as f64))
            .collect(),
    };
    Ok(ResultSeries::Flat(counts))
}

/// Volume-weighted average price anchored at each UTC day. NaN until the
/// session has traded.
pub fn compute_vwap(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    let (notional, volume): (Vec<f64>, Vec<f64>) = match ctx.trades_per_bar() {
        Some(buckets) => buckets
            .iter()
            .map(|b| {
                (
                    b.iter().map(AggTrade::notional).sum::<f64>(),
                    b.iter().map(|t| t.quantity).sum::<f64>(),
                )
            })
            .unzip(),
        None => ctx
            .candles
            .iter()
            .map(|c| (c.typical_price() * c.volume, c.volume))
            .unzip(),
    };
    let notional = session_cumulative(ctx, &notional);
    let volume = session_cumulative(ctx, &volume);
    Ok(ResultSeries::Flat(
        notional
            .iter()
            .zip(&volume)
            .map(|(n, v)| if *v == 0.0 { f64::NAN } else { n / v })
            .collect(),
    ))
}

pub fn compute_session_delta(ctx: &DataContext<'_>, _: &[f64]) -> Result<ResultSeries, EvalError> {
    let delta: Vec<f64> = bar_flow(ctx).iter().map(Flow::delta).collect();
    Ok(ResultSeries::Flat(session_cumulative(ctx, &delta)))
}

pub fn compute_session_buy_volume(
    ctx: &DataContext<'_>,
    _: &[f64],
) -> Result<ResultSeries, EvalError> {
    let buy: Vec<f64> = bar_flow(ctx).iter().map(|f| f.buy).collect();
    Ok(ResultSeries::Flat(session_cumulative(ctx, &buy)))
}

pub fn compute_session_sell_volume(
    ctx: &DataContext<'_>,
    _: &[f64],
) -> Result<ResultSeries, EvalError> {
    let sell: Vec<f64> = bar_flow(ctx).iter().map(|f| f.sell).collect();
    Ok(ResultSeries::Flat(session_cumulative(ctx, &sell)))
}

fn whale_trades<'a>(
    function: &str,
    ctx: &DataContext<'a>,
    params: &[f64],
) -> Result<(Vec<&'a [AggTrade]>, f64), EvalError> {
    let threshold = positive_param(function, params, 0)?;
    let buckets = ctx
        .trades_per_bar()
        .ok_or_else(|| EvalError::MissingDependency {
            function: function.to_string(),
            dependency: DataDependency::AggTrades,
        })?;
    Ok((buckets, threshold))
}

fn whale_flow(function: &str, ctx: &DataContext<'_>, params: &[f64]) -> Result<Vec<Flow>, EvalError> {
    let (buckets, threshold) = whale_trades(function, ctx, params)?;
    Ok(buckets
        .into_iter()
        .map(|b| Flow::from_trades(b.iter().filter(|t| t.notional() >= threshold)))
        .collect())
}

pub fn compute_whale_delta(ctx: &DataContext<'_>, params: &[f64]) -> Result<ResultSeries, EvalError> {
    let flow = whale_flow("WHALE_DELTA", ctx, params)?;
    Ok(ResultSeries::Flat(flow.iter().map(Flow::delta).collect()))
}

pub fn compute_whale_buy_vol(
    ctx: &DataContext<'_>,
    params: &[f64],
) -> Result<ResultSeries, EvalError> {
    let flow = whale_flow("WHALE_BUY_VOL", ctx, params)?;
    Ok(ResultSeries::Flat(flow.iter().map(|f| f.buy).collect()))
}

pub fn compute_whale_sell_vol(
    ctx: &DataContext<'_>,
    params: &[f64],
) -> Result<ResultSeries, EvalError> {
    let flow = whale_flow("WHALE_SELL_VOL", ctx, params)?;
    Ok(ResultSeries::Flat(flow.iter().map(|f| f.sell).collect()))
}

pub fn compute_large_trade_count(
    ctx: &DataContext<'_>,
    params: &[f64],
) -> Result<ResultSeries, EvalError> {
    let (buckets, threshold) = whale_trades("LARGE_TRADE_COUNT", ctx, params)?;
    Ok(ResultSeries::Flat(
        buckets
            .iter()
            .map(|b| b.iter().filter(|t| t.notional() >= threshold).count() as f64)
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::candle;
    use crate::domain::market::Candle;
    use approx::assert_relative_eq;
    use chrono::{TimeDelta, TimeZone, Utc};

    fn trade(hour: u32, minute: u32, price: f64, quantity: f64, is_buyer_maker: bool) -> AggTrade {
        AggTrade {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap(),
            price,
            quantity,
            is_buyer_maker,
        }
    }

    fn candles() -> Vec<Candle> {
        vec![
            candle(0, 100.0, 102.0, 99.0, 101.0, 10.0),
            candle(1, 101.0, 103.0, 100.0, 102.0, 20.0),
            candle(2, 102.0, 104.0, 101.0, 103.0, 30.0),
        ]
    }

    fn trades() -> Vec<AggTrade> {
        vec![
            trade(0, 10, 100.0, 4.0, false),
            trade(0, 20, 101.0, 1.0, true),
            trade(1, 5, 102.0, 2.0, true),
            trade(2, 30, 103.0, 6.0, false),
            trade(2, 45, 103.0, 0.5, true),
        ]
    }

    fn flat(series: ResultSeries) -> Vec<f64> {
        series.as_flat().unwrap().to_vec()
    }

    #[test]
    fn delta_from_trades() {
        let c = candles();
        let t = trades();
        let ctx = DataContext::new(&c, TimeDelta::hours(1)).with_agg_trades(&t);
        assert_eq!(flat(compute_delta(&ctx, &[]).unwrap()), vec![3.0, -2.0, 5.5]);
        assert_eq!(flat(compute_cum_delta(&ctx, &[]).unwrap()), vec![3.0, 1.0, 6.5]);
        assert_eq!(flat(compute_trade_count(&ctx, &[]).unwrap()), vec![2.0, 1.0, 2.0]);
    }

    #[test]
    fn delta_fallback_matches_shape() {
        let mut c = candles();
        c[1].taker_buy_volume = Some(15.0);
        let ctx = DataContext::new(&c, TimeDelta::hours(1));
        let delta = flat(compute_delta(&ctx, &[]).unwrap());
        assert_eq!(delta, vec![0.0, 10.0, 0.0]);
        let cum = flat(compute_cum_delta(&ctx, &[]).unwrap());
        assert_eq!(cum.len(), c.len());
        assert!(cum.iter().all(|v| !v.is_nan()));
    }

    #[test]
    fn trade_count_from_candle_column() {
        let mut c = candles();
        let ctx = DataContext::new(&c, TimeDelta::hours(1));
        assert_eq!(
            compute_trade_count(&ctx, &[]).unwrap_err(),
            EvalError::MissingDependency {
                function: "TRADE_COUNT".to_string(),
                dependency: DataDependency::AggTrades,
            }
        );

        c[0].trade_count = Some(7);
        c[2].trade_count = Some(3);
        let ctx = DataContext::new(&c, TimeDelta::hours(1));
        let counts = flat(compute_trade_count(&ctx, &[]).unwrap());
        assert_eq!(counts[0], 7.0);
        assert!(counts[1].is_nan());
        assert_eq!(counts[2], 3.0);
    }

    #[test]
    fn vwap_from_candles_and_trades() {
        let c = candles();
        let ctx = DataContext::new(&c, TimeDelta::hours(1));
        let vwap = flat(compute_vwap(&ctx, &[]).unwrap());
        let tp0 = c[0].typical_price();
        let tp1 = c[1].typical_price();
        assert_relative_eq!(vwap[0], tp0);
        assert_relative_eq!(vwap[1], (tp0 * 10.0 + tp1 * 20.0) / 30.0);

        let t = trades();
        let ctx = ctx.with_agg_trades(&t);
        let vwap = flat(compute_vwap(&ctx, &[]).unwrap());
        assert_relative_eq!(vwap[0], (400.0 + 101.0) / 5.0);
    }

    #[test]
    fn session_delta_resets_each_day() {
        let mut c = candles();
        c[2].timestamp = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        c[0].taker_buy_volume = Some(8.0);
        c[1].taker_buy_volume = Some(12.0);
        c[2].taker_buy_volume = Some(20.0);
        let ctx = DataContext::new(&c, TimeDelta::hours(1));
        assert_eq!(flat(compute_session_delta(&ctx, &[]).unwrap()), vec![6.0, 10.0, 10.0]);
        assert_eq!(flat(compute_session_buy_volume(&ctx, &[]).unwrap()), vec![8.0, 20.0, 20.0]);
        assert_eq!(flat(compute_session_sell_volume(&ctx, &[]).unwrap()), vec![2.0, 10.0, 10.0]);
    }

    #[test]
    fn whale_filters_by_notional() {
        let c = candles();
        let t = trades();
        let ctx = DataContext::new(&c, TimeDelta::hours(1)).with_agg_trades(&t);
        // notionals: 400, 101, 204, 618, 51.5
        let params = [200.0];
        assert_eq!(flat(compute_whale_delta(&ctx, &params).unwrap()), vec![4.0, -2.0, 6.0]);
        assert_eq!(flat(compute_whale_buy_vol(&ctx, &params).unwrap()), vec![4.0, 0.0, 6.0]);
        assert_eq!(flat(compute_whale_sell_vol(&ctx, &params).unwrap()), vec![0.0, 2.0, 0.0]);
        assert_eq!(flat(compute_large_trade_count(&ctx, &params).unwrap()), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn whale_without_trades_is_missing_dependency() {
        let c = candles();
        let ctx = DataContext::new(&c, TimeDelta::hours(1));
        let err = compute_whale_delta(&ctx, &[1000.0]).unwrap_err();
        assert!(matches!(
            err,
            EvalError::MissingDependency {
                dependency: DataDependency::AggTrades,
                ..
            }
        ));
    }
}
