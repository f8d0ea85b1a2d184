//! Read-only market data bundle for one evaluation pass.
//!
//! Candles define the bar grid. Every optional series is assumed sorted by
//! timestamp and is aligned to that grid on demand:
//! - trades are bucketed into `[bar.timestamp, bar.timestamp + resolution)`
//! - sparse metrics are forward-filled, taking the latest point strictly
//!   before the bar's close time (NaN until the first point)

use crate::domain::market::{AggTrade, Candle, FundingRate, OpenInterest, PremiumIndex, TimedValue};
use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataDependency {
    Candles,
    AggTrades,
    Funding,
    OpenInterest,
    Premium,
    ReferenceCandles,
}

impl fmt::Display for DataDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataDependency::Candles => "candles",
            DataDependency::AggTrades => "agg trades",
            DataDependency::Funding => "funding rate",
            DataDependency::OpenInterest => "open interest",
            DataDependency::Premium => "premium index",
            DataDependency::ReferenceCandles => "reference exchange candles",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DataContext<'a> {
    pub candles: &'a [Candle],
    pub resolution: TimeDelta,
    pub agg_trades: Option<&'a [AggTrade]>,
    pub funding_rates: Option<&'a [FundingRate]>,
    pub open_interest: Option<&'a [OpenInterest]>,
    pub premium_index: Option<&'a [PremiumIndex]>,
    /// The same instrument on another venue, one candle per bar.
    pub reference_candles: Option<&'a [Candle]>,
}

impl<'a> DataContext<'a> {
    pub fn new(candles: &'a [Candle], resolution: TimeDelta) -> Self {
        Self {
            candles,
            resolution,
            agg_trades: None,
            funding_rates: None,
            open_interest: None,
            premium_index: None,
            reference_candles: None,
        }
    }

    pub fn with_agg_trades(mut self, trades: &'a [AggTrade]) -> Self {
        self.agg_trades = Some(trades);
        self
    }

    pub fn with_funding_rates(mut self, rates: &'a [FundingRate]) -> Self {
        self.funding_rates = Some(rates);
        self
    }

    pub fn with_open_interest(mut self, points: &'a [OpenInterest]) -> Self {
        self.open_interest = Some(points);
        self
    }

    pub fn with_premium_index(mut self, points: &'a [PremiumIndex]) -> Self {
        self.premium_index = Some(points);
        self
    }

    pub fn with_reference_candles(mut self, candles: &'a [Candle]) -> Self {
        self.reference_candles = Some(candles);
        self
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn has(&self, dependency: DataDependency) -> bool {
        match dependency {
            DataDependency::Candles => true,
            DataDependency::AggTrades => self.agg_trades.is_some(),
            DataDependency::Funding => self.funding_rates.is_some(),
            DataDependency::OpenInterest => self.open_interest.is_some(),
            DataDependency::Premium => self.premium_index.is_some(),
            DataDependency::ReferenceCandles => self.reference_candles.is_some(),
        }
    }

    pub fn bar_end(&self, index: usize) -> DateTime<Utc> {
        self.candles[index].timestamp + self.resolution
    }

    /// Slice of trades falling inside each bar, or `None` without trade data.
    pub fn trades_per_bar(&self) -> Option<Vec<&'a [AggTrade]>> {
        let trades = self.agg_trades?;
        let buckets = self
            .candles
            .iter()
            .map(|candle| {
                let start = trades.partition_point(|t| t.timestamp < candle.timestamp);
                let end_ts = candle.timestamp + self.resolution;
                let end = trades.partition_point(|t| t.timestamp < end_ts);
                &trades[start..end.max(start)]
            })
            .collect();
        Some(buckets)
    }

    /// Forward-filled metric value per bar.
    pub fn align<T: TimedValue>(&self, points: &[T]) -> Vec<f64> {
        (0..self.candles.len())
            .map(|i| {
                let end = self.bar_end(i);
                let idx = points.partition_point(|p| p.timestamp() < end);
                if idx == 0 {
                    f64::NAN
                } else {
                    points[idx - 1].value()
                }
            })
            .collect()
    }
}

/// Owned market data loaded by a [`crate::ports::data_port::DataPort`].
#[derive(Debug, Clone, PartialEq)]
pub struct MarketData {
    pub candles: Vec<Candle>,
    pub resolution: TimeDelta,
    pub agg_trades: Option<Vec<AggTrade>>,
    pub funding_rates: Option<Vec<FundingRate>>,
    pub open_interest: Option<Vec<OpenInterest>>,
    pub premium_index: Option<Vec<PremiumIndex>>,
    pub reference_candles: Option<Vec<Candle>>,
}

impl MarketData {
    pub fn new(candles: Vec<Candle>, resolution: TimeDelta) -> Self {
        Self {
            candles,
            resolution,
            agg_trades: None,
            funding_rates: None,
            open_interest: None,
            premium_index: None,
            reference_candles: None,
        }
    }

    /// Borrowed view for one evaluation pass.
    pub fn context(&self) -> DataContext<'_> {
        DataContext {
            candles: &self.candles,
            resolution: self.resolution,
            agg_trades: self.agg_trades.as_deref(),
            funding_rates: self.funding_rates.as_deref(),
            open_interest: self.open_interest.as_deref(),
            premium_index: self.premium_index.as_deref(),
            reference_candles: self.reference_candles.as_deref(),
        }
    }
}

/// Parse a bar resolution such as `15m`, `4h` or `1d`.
pub fn parse_resolution(input: &str) -> Option<TimeDelta> {
    let input = input.trim();
    if input.len() < 2 {
        return None;
    }
    let (amount, unit) = input.split_at(input.len() - 1);
    let amount: i64 = amount.parse().ok().filter(|n| *n > 0)?;
    match unit {
        "m" => TimeDelta::try_minutes(amount),
        "h" => TimeDelta::try_hours(amount),
        "d" => TimeDelta::try_days(amount),
        "w" => TimeDelta::try_weeks(amount),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candle_at(hour: u32) -> Candle {
        Candle {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap(),
            open: 10.0,
            high: 11.0,
            low: 9.0,
            close: 10.5,
            volume: 100.0,
            taker_buy_volume: None,
            trade_count: None,
        }
    }

    fn trade_at(hour: u32, minute: u32, qty: f64) -> AggTrade {
        AggTrade {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0).unwrap(),
            price: 10.0,
            quantity: qty,
            is_buyer_maker: false,
        }
    }

    #[test]
    fn parse_resolution_units() {
        assert_eq!(parse_resolution("15m"), Some(TimeDelta::minutes(15)));
        assert_eq!(parse_resolution("4h"), Some(TimeDelta::hours(4)));
        assert_eq!(parse_resolution("1d"), Some(TimeDelta::days(1)));
        assert_eq!(parse_resolution("1w"), Some(TimeDelta::weeks(1)));
        assert_eq!(parse_resolution("0h"), None);
        assert_eq!(parse_resolution("h"), None);
        assert_eq!(parse_resolution("10x"), None);
    }

    #[test]
    fn trades_bucketed_by_bar() {
        let candles = vec![candle_at(0), candle_at(1), candle_at(2)];
        let trades = vec![
            trade_at(0, 5, 1.0),
            trade_at(0, 59, 2.0),
            trade_at(1, 0, 3.0),
            trade_at(2, 30, 4.0),
        ];
        let ctx = DataContext::new(&candles, TimeDelta::hours(1)).with_agg_trades(&trades);
        let buckets = ctx.trades_per_bar().unwrap();
        assert_eq!(buckets[0].len(), 2);
        assert_eq!(buckets[1].len(), 1);
        assert_eq!(buckets[2].len(), 1);
    }

    #[test]
    fn trades_per_bar_none_without_trades() {
        let candles = vec![candle_at(0)];
        let ctx = DataContext::new(&candles, TimeDelta::hours(1));
        assert!(ctx.trades_per_bar().is_none());
        assert!(!ctx.has(DataDependency::AggTrades));
        assert!(ctx.has(DataDependency::Candles));
    }

    #[test]
    fn align_forward_fills_and_starts_nan() {
        let candles = vec![candle_at(0), candle_at(1), candle_at(2), candle_at(3)];
        let rates = vec![
            FundingRate {
                timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 1, 0, 0).unwrap(),
                rate: 0.0001,
            },
            FundingRate {
                timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 2, 30, 0).unwrap(),
                rate: 0.0003,
            },
        ];
        let ctx = DataContext::new(&candles, TimeDelta::hours(1)).with_funding_rates(&rates);
        let aligned = ctx.align(&rates);
        assert!(aligned[0].is_nan());
        assert_eq!(aligned[1], 0.0001);
        assert_eq!(aligned[2], 0.0003);
        assert_eq!(aligned[3], 0.0003);
    }

    #[test]
    fn market_data_context_borrows_present_series() {
        let mut data = MarketData::new(vec![candle_at(0), candle_at(1)], TimeDelta::hours(1));
        data.agg_trades = Some(vec![trade_at(0, 10, 1.0)]);
        let ctx = data.context();
        assert_eq!(ctx.len(), 2);
        assert!(ctx.has(DataDependency::AggTrades));
        assert!(!ctx.has(DataDependency::Funding));
        assert!(!ctx.has(DataDependency::ReferenceCandles));
    }
}
