#![allow(dead_code)]

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use stratlang::domain::context::MarketData;
use stratlang::domain::error::StratlangError;
pub use stratlang::domain::market::{AggTrade, Candle, FundingRate};
use stratlang::ports::data_port::DataPort;
use std::path::{Path, PathBuf};

pub struct MockDataPort {
    pub data: Option<MarketData>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(data: MarketData) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            data: None,
            error: Some(reason.to_string()),
        }
    }
}

impl DataPort for MockDataPort {
    fn load_market_data(&self) -> Result<MarketData, StratlangError> {
        if let Some(reason) = &self.error {
            return Err(StratlangError::Data {
                reason: reason.clone(),
            });
        }
        self.data.clone().ok_or_else(|| StratlangError::Data {
            reason: "no data".into(),
        })
    }
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn hour(index: usize) -> DateTime<Utc> {
    start() + TimeDelta::hours(index as i64)
}

pub fn make_candle(index: usize, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
    Candle {
        timestamp: hour(index),
        open,
        high,
        low,
        close,
        volume,
        taker_buy_volume: None,
        trade_count: None,
    }
}

/// Hourly candles with a one-point range around each close.
pub fn generate_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_candle(i, c, c + 0.5, c - 0.5, c, 1000.0))
        .collect()
}

/// `count` hourly closes oscillating around 100.
pub fn wave(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| 100.0 + (i as f64 * 0.4).sin() * 10.0)
        .collect()
}

pub fn hourly_data(closes: &[f64]) -> MarketData {
    MarketData::new(generate_candles(closes), TimeDelta::hours(1))
}

/// One trade per bar at minute 30, alternating aggressor side.
pub fn alternating_trades(bars: usize, quantity: f64) -> Vec<AggTrade> {
    (0..bars)
        .map(|i| AggTrade {
            timestamp: hour(i) + TimeDelta::minutes(30),
            price: 100.0,
            quantity,
            is_buyer_maker: i % 2 == 1,
        })
        .collect()
}

pub fn candles_csv(closes: &[f64]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for (i, c) in closes.iter().enumerate() {
        out.push_str(&format!(
            "{},{},{},{},{},1000\n",
            hour(i).timestamp_millis(),
            c,
            c + 0.5,
            c - 0.5,
            c
        ));
    }
    out
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}
