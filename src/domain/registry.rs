//! Indicator registry.
//!
//! A flat table of [`IndicatorSpec`] records keyed by the DSL function name.
//! The standard registry is built once per process; custom registries can be
//! assembled with [`Registry::empty`] and [`Registry::with`].

use crate::domain::context::{DataContext, DataDependency};
use crate::domain::error::EvalError;
use crate::domain::indicator::{
    atr, bollinger, calendar, candle, cci, derivatives, ema, exchange, footprint, macd, order_flow,
    profile, range, rays, roc, rsi, sma, stddev, stochastic, volume, williams, wma, ResultSeries,
};
use std::collections::HashMap;
use std::sync::LazyLock;

pub type ComputeFn = fn(&DataContext<'_>, &[f64]) -> Result<ResultSeries, EvalError>;
pub type CacheKeyFn = fn(&[f64]) -> String;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    Numeric,
    /// 0/1 per bar (NaN during warm-up).
    Boolean,
}

#[derive(Debug, Clone, Copy)]
pub struct IndicatorSpec {
    pub id: &'static str,
    pub dependencies: &'static [DataDependency],
    /// Used when present; the computation falls back to candles otherwise.
    pub optional_dependencies: &'static [DataDependency],
    pub cache_key: CacheKeyFn,
    pub compute: ComputeFn,
    pub result_type: ResultType,
    pub components: &'static [&'static str],
    pub default_component: Option<&'static str>,
}

/// Canonical cache key: every parameter in `Display` form, comma separated.
pub fn param_key(params: &[f64]) -> String {
    params
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

const CANDLES: &[DataDependency] = &[DataDependency::Candles];
const TRADES_OPTIONAL: &[DataDependency] = &[DataDependency::AggTrades];

impl IndicatorSpec {
    /// Numeric, candle-only spec with the canonical cache key.
    pub fn new(id: &'static str, compute: ComputeFn) -> Self {
        Self {
            id,
            dependencies: CANDLES,
            optional_dependencies: &[],
            cache_key: param_key,
            compute,
            result_type: ResultType::Numeric,
            components: &[],
            default_component: None,
        }
    }

    pub fn requires(mut self, dependencies: &'static [DataDependency]) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn optional(mut self, dependencies: &'static [DataDependency]) -> Self {
        self.optional_dependencies = dependencies;
        self
    }

    pub fn boolean(mut self) -> Self {
        self.result_type = ResultType::Boolean;
        self
    }

    pub fn composite(
        mut self,
        components: &'static [&'static str],
        default_component: &'static str,
    ) -> Self {
        self.components = components;
        self.default_component = Some(default_component);
        self
    }

    /// First hard dependency the context lacks.
    pub fn missing_dependency(&self, ctx: &DataContext<'_>) -> Option<DataDependency> {
        self.dependencies.iter().copied().find(|dep| !ctx.has(*dep))
    }

    /// The series a bare call reads: the flat result or the default component.
    pub fn values<'s>(&self, series: &'s ResultSeries) -> Option<&'s [f64]> {
        match series {
            ResultSeries::Flat(values) => Some(values),
            ResultSeries::Composite(_) => series.component(self.default_component?),
        }
    }

    pub fn value_at(&self, series: &ResultSeries, index: usize) -> f64 {
        self.values(series)
            .and_then(|values| values.get(index).copied())
            .unwrap_or(f64::NAN)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    specs: HashMap<&'static str, IndicatorSpec>,
}

static STANDARD: LazyLock<Registry> = LazyLock::new(|| {
    standard_specs()
        .into_iter()
        .fold(Registry::empty(), Registry::with)
});

impl Registry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds or replaces the spec registered under `spec.id`.
    pub fn with(mut self, spec: IndicatorSpec) -> Self {
        self.specs.insert(spec.id, spec);
        self
    }

    pub fn standard() -> &'static Registry {
        &STANDARD
    }

    pub fn get(&self, id: &str) -> Option<&IndicatorSpec> {
        self.specs.get(id)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Specs sorted by id.
    pub fn specs(&self) -> Vec<&IndicatorSpec> {
        let mut specs: Vec<&IndicatorSpec> = self.specs.values().collect();
        specs.sort_by_key(|spec| spec.id);
        specs
    }
}

fn standard_specs() -> Vec<IndicatorSpec> {
    use DataDependency::*;
    const WITH_TRADES: &[DataDependency] = &[Candles, AggTrades];
    const WITH_FUNDING: &[DataDependency] = &[Candles, Funding];
    const WITH_PREMIUM: &[DataDependency] = &[Candles, Premium];
    const WITH_OI: &[DataDependency] = &[Candles, OpenInterest];
    const WITH_REFERENCE: &[DataDependency] = &[Candles, ReferenceCandles];

    vec![
        // moving averages and oscillators
        IndicatorSpec::new("SMA", sma::compute),
        IndicatorSpec::new("EMA", ema::compute),
        IndicatorSpec::new("WMA", wma::compute),
        IndicatorSpec::new("RSI", rsi::compute),
        IndicatorSpec::new("ATR", atr::compute),
        IndicatorSpec::new("ROC", roc::compute),
        IndicatorSpec::new("STDDEV", stddev::compute),
        IndicatorSpec::new("CCI", cci::compute),
        IndicatorSpec::new("WILLIAMS_R", williams::compute),
        IndicatorSpec::new("MACD", macd::compute)
            .composite(&["line", "signal", "histogram"], "line"),
        IndicatorSpec::new("BBANDS", bollinger::compute)
            .composite(&["upper", "middle", "lower"], "middle"),
        IndicatorSpec::new("STOCHASTIC", stochastic::compute).composite(&["k", "d"], "k"),
        // range and volume
        IndicatorSpec::new("HIGH_OF", range::compute_high_of),
        IndicatorSpec::new("LOW_OF", range::compute_low_of),
        IndicatorSpec::new("RANGE_POSITION", range::compute_range_position),
        IndicatorSpec::new("AVG_VOLUME", volume::compute_avg_volume),
        IndicatorSpec::new("RELATIVE_VOLUME", volume::compute_relative_volume),
        IndicatorSpec::new("BUY_VOLUME", volume::compute_buy_volume),
        IndicatorSpec::new("SELL_VOLUME", volume::compute_sell_volume),
        IndicatorSpec::new("OHLCV_DELTA", volume::compute_ohlcv_delta),
        IndicatorSpec::new("OHLCV_CVD", volume::compute_ohlcv_cvd),
        IndicatorSpec::new("TRADES", volume::compute_trades),
        // calendar
        IndicatorSpec::new("HOUR", calendar::compute_hour),
        IndicatorSpec::new("MINUTE", calendar::compute_minute),
        IndicatorSpec::new("DAY_OF_WEEK", calendar::compute_day_of_week),
        IndicatorSpec::new("DAY_OF_MONTH", calendar::compute_day_of_month),
        IndicatorSpec::new("MONTH", calendar::compute_month),
        IndicatorSpec::new("MOON_PHASE", calendar::compute_moon_phase),
        IndicatorSpec::new("IS_FULL_MOON", calendar::compute_is_full_moon).boolean(),
        IndicatorSpec::new("IS_NEW_MOON", calendar::compute_is_new_moon).boolean(),
        IndicatorSpec::new("IS_HOLIDAY", calendar::compute_is_holiday).boolean(),
        IndicatorSpec::new("DAYS_TO_HOLIDAY", calendar::compute_days_to_holiday),
        IndicatorSpec::new("IS_FOMC_DAY", calendar::compute_is_fomc_day).boolean(),
        IndicatorSpec::new("DAYS_TO_FOMC", calendar::compute_days_to_fomc),
        IndicatorSpec::new("DAYS_SINCE_FOMC", calendar::compute_days_since_fomc),
        // order flow
        IndicatorSpec::new("VWAP", order_flow::compute_vwap).optional(TRADES_OPTIONAL),
        IndicatorSpec::new("DELTA", order_flow::compute_delta).optional(TRADES_OPTIONAL),
        IndicatorSpec::new("CUM_DELTA", order_flow::compute_cum_delta).optional(TRADES_OPTIONAL),
        IndicatorSpec::new("TRADE_COUNT", order_flow::compute_trade_count)
            .optional(TRADES_OPTIONAL),
        IndicatorSpec::new("POC", profile::compute_poc).optional(TRADES_OPTIONAL),
        IndicatorSpec::new("VAH", profile::compute_vah).optional(TRADES_OPTIONAL),
        IndicatorSpec::new("VAL", profile::compute_val).optional(TRADES_OPTIONAL),
        IndicatorSpec::new("WHALE_DELTA", order_flow::compute_whale_delta).requires(WITH_TRADES),
        IndicatorSpec::new("WHALE_BUY_VOL", order_flow::compute_whale_buy_vol)
            .requires(WITH_TRADES),
        IndicatorSpec::new("WHALE_SELL_VOL", order_flow::compute_whale_sell_vol)
            .requires(WITH_TRADES),
        IndicatorSpec::new("LARGE_TRADE_COUNT", order_flow::compute_large_trade_count)
            .requires(WITH_TRADES),
        IndicatorSpec::new("SESSION_DELTA", order_flow::compute_session_delta)
            .optional(TRADES_OPTIONAL),
        IndicatorSpec::new("SESSION_BUY_VOLUME", order_flow::compute_session_buy_volume)
            .optional(TRADES_OPTIONAL),
        IndicatorSpec::new("SESSION_SELL_VOLUME", order_flow::compute_session_sell_volume)
            .optional(TRADES_OPTIONAL),
        // derivatives
        IndicatorSpec::new("FUNDING", derivatives::compute_funding).requires(WITH_FUNDING),
        IndicatorSpec::new("FUNDING_AVG", derivatives::compute_funding_avg).requires(WITH_FUNDING),
        IndicatorSpec::new("PREMIUM", derivatives::compute_premium).requires(WITH_PREMIUM),
        IndicatorSpec::new("PREMIUM_AVG", derivatives::compute_premium_avg).requires(WITH_PREMIUM),
        IndicatorSpec::new("OI", derivatives::compute_oi).requires(WITH_OI),
        IndicatorSpec::new("OI_CHANGE", derivatives::compute_oi_change).requires(WITH_OI),
        // rays
        IndicatorSpec::new("RESISTANCE_RAY_COUNT", rays::compute_resistance_ray_count),
        IndicatorSpec::new("SUPPORT_RAY_COUNT", rays::compute_support_ray_count),
        IndicatorSpec::new("RESISTANCE_RAYS_BROKEN", rays::compute_resistance_rays_broken),
        IndicatorSpec::new("SUPPORT_RAYS_BROKEN", rays::compute_support_rays_broken),
        IndicatorSpec::new("RESISTANCE_RAY", rays::compute_resistance_ray),
        IndicatorSpec::new("SUPPORT_RAY", rays::compute_support_ray),
        IndicatorSpec::new("RESISTANCE_RAY_DISTANCE", rays::compute_resistance_ray_distance),
        IndicatorSpec::new("SUPPORT_RAY_DISTANCE", rays::compute_support_ray_distance),
        // candles
        IndicatorSpec::new("DOJI", candle::compute_doji).boolean(),
        IndicatorSpec::new("HAMMER", candle::compute_hammer).boolean(),
        IndicatorSpec::new("SHOOTING_STAR", candle::compute_shooting_star).boolean(),
        IndicatorSpec::new("BULLISH_ENGULFING", candle::compute_bullish_engulfing).boolean(),
        IndicatorSpec::new("BEARISH_ENGULFING", candle::compute_bearish_engulfing).boolean(),
        IndicatorSpec::new("BODY_SIZE", candle::compute_body_size),
        IndicatorSpec::new("UPPER_WICK", candle::compute_upper_wick),
        IndicatorSpec::new("LOWER_WICK", candle::compute_lower_wick),
        IndicatorSpec::new("CANDLE_RANGE", candle::compute_candle_range),
        IndicatorSpec::new("BODY_PCT", candle::compute_body_pct),
        IndicatorSpec::new("IS_BULLISH", candle::compute_is_bullish).boolean(),
        IndicatorSpec::new("IS_BEARISH", candle::compute_is_bearish).boolean(),
        // footprint
        IndicatorSpec::new("ABSORPTION", footprint::compute_absorption).boolean(),
        IndicatorSpec::new("STACKED_BUY_IMBALANCES", footprint::compute_stacked_buy_imbalances)
            .requires(WITH_TRADES),
        IndicatorSpec::new("STACKED_SELL_IMBALANCES", footprint::compute_stacked_sell_imbalances)
            .requires(WITH_TRADES),
        // cross-exchange
        IndicatorSpec::new("EXCHANGE_DIVERGENCE", exchange::compute_exchange_divergence)
            .requires(WITH_REFERENCE)
            .boolean(),
        IndicatorSpec::new("EXCHANGE_SPREAD", exchange::compute_exchange_spread)
            .requires(WITH_REFERENCE),
        IndicatorSpec::new("EXCHANGE_SPREAD_Z", exchange::compute_exchange_spread_z)
            .requires(WITH_REFERENCE),
    ]
}
