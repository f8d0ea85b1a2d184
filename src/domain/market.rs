//! Market data records consumed by the evaluator.
//!
//! Candles are dense (one per bar); trades and the derivative metrics are
//! sparse and get aligned to bars by [`crate::domain::context`].

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub taker_buy_volume: Option<f64>,
    pub trade_count: Option<u64>,
}

impl Candle {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// Aggressive buy volume: the taker-buy field when present, otherwise half
    /// the bar volume.
    pub fn buy_volume(&self) -> f64 {
        self.taker_buy_volume.unwrap_or(self.volume / 2.0)
    }

    pub fn sell_volume(&self) -> f64 {
        self.volume - self.buy_volume()
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }
}

/// A single aggregated trade. `is_buyer_maker` means the seller was the
/// aggressor.
#[derive(Debug, Clone, PartialEq)]
pub struct AggTrade {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub quantity: f64,
    pub is_buyer_maker: bool,
}

impl AggTrade {
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }
}

/// A sparse, timestamped scalar metric (funding, open interest, premium).
pub trait TimedValue {
    fn timestamp(&self) -> DateTime<Utc>;
    fn value(&self) -> f64;
}

#[derive(Debug, Clone, PartialEq)]
pub struct FundingRate {
    pub timestamp: DateTime<Utc>,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenInterest {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PremiumIndex {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl TimedValue for FundingRate {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn value(&self) -> f64 {
        self.rate
    }
}

impl TimedValue for OpenInterest {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn value(&self) -> f64 {
        self.value
    }
}

impl TimedValue for PremiumIndex {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn value(&self) -> f64 {
        self.value
    }
}
