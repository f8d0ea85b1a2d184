//! CSV file data adapter.
//!
//! File layouts (header row required, extra columns ignored):
//! - candles: `timestamp,open,high,low,close,volume[,taker_buy_volume,trade_count]`
//! - agg trades: `timestamp,price,quantity,is_buyer_maker`
//! - metrics (funding, open interest, premium): `timestamp,value`
//!
//! Timestamps are epoch milliseconds or RFC 3339. Rows that fail to parse
//! are skipped with a warning; every series is sorted by timestamp.

use crate::domain::context::{parse_resolution, MarketData};
use crate::domain::error::StratlangError;
use crate::domain::market::{AggTrade, Candle, FundingRate, OpenInterest, PremiumIndex, TimedValue};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use chrono::{DateTime, TimeDelta, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where each series lives on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPaths {
    pub candles: PathBuf,
    pub resolution: TimeDelta,
    pub agg_trades: Option<PathBuf>,
    pub funding_rates: Option<PathBuf>,
    pub open_interest: Option<PathBuf>,
    pub premium_index: Option<PathBuf>,
    pub reference_candles: Option<PathBuf>,
}

pub struct CsvAdapter {
    paths: DataPaths,
}

impl CsvAdapter {
    pub fn new(paths: DataPaths) -> Self {
        Self { paths }
    }

    /// Reads the `[data]` section. Relative paths resolve against `base_dir`.
    pub fn from_config(config: &dyn ConfigPort, base_dir: &Path) -> Result<Self, StratlangError> {
        let path = |key: &str| {
            config
                .get_string("data", key)
                .filter(|v| !v.trim().is_empty())
                .map(|v| base_dir.join(v.trim()))
        };
        let candles = path("candles").ok_or_else(|| StratlangError::ConfigMissing {
            section: "data".into(),
            key: "candles".into(),
        })?;
        let resolution_str =
            config
                .get_string("data", "resolution")
                .ok_or_else(|| StratlangError::ConfigMissing {
                    section: "data".into(),
                    key: "resolution".into(),
                })?;
        let resolution =
            parse_resolution(&resolution_str).ok_or_else(|| StratlangError::ConfigInvalid {
                section: "data".into(),
                key: "resolution".into(),
                reason: format!(
                    "unsupported resolution '{}' (expected e.g. 1m, 15m, 1h, 4h, 1d)",
                    resolution_str
                ),
            })?;
        Ok(Self::new(DataPaths {
            candles,
            resolution,
            agg_trades: path("agg_trades"),
            funding_rates: path("funding_rates"),
            open_interest: path("open_interest"),
            premium_index: path("premium_index"),
            reference_candles: path("reference_candles"),
        }))
    }
}

impl DataPort for CsvAdapter {
    fn load_market_data(&self) -> Result<MarketData, StratlangError> {
        let candles = read_candles(&self.paths.candles)?;
        if candles.is_empty() {
            return Err(StratlangError::Data {
                reason: format!("no candles in {}", self.paths.candles.display()),
            });
        }
        let mut data = MarketData::new(candles, self.paths.resolution);
        data.agg_trades = self.paths.agg_trades.as_deref().map(read_agg_trades).transpose()?;
        data.funding_rates = self
            .paths
            .funding_rates
            .as_deref()
            .map(|p| read_metric(p, |timestamp, rate| FundingRate { timestamp, rate }))
            .transpose()?;
        data.open_interest = self
            .paths
            .open_interest
            .as_deref()
            .map(|p| read_metric(p, |timestamp, value| OpenInterest { timestamp, value }))
            .transpose()?;
        data.premium_index = self
            .paths
            .premium_index
            .as_deref()
            .map(|p| read_metric(p, |timestamp, value| PremiumIndex { timestamp, value }))
            .transpose()?;
        data.reference_candles = self
            .paths
            .reference_candles
            .as_deref()
            .map(read_candles)
            .transpose()?;
        debug!(
            candles = data.candles.len(),
            agg_trades = data.agg_trades.as_ref().map_or(0, Vec::len),
            "loaded market data"
        );
        Ok(data)
    }
}

/// Epoch milliseconds or RFC 3339.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(millis) = value.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn read_records(path: &Path) -> Result<Vec<csv::StringRecord>, StratlangError> {
    let content = fs::read_to_string(path).map_err(|e| StratlangError::Data {
        reason: format!("failed to read {}: {}", path.display(), e),
    })?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());
    rdr.records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StratlangError::Data {
            reason: format!("CSV parse error in {}: {}", path.display(), e),
        })
}

fn field<T: std::str::FromStr>(record: &csv::StringRecord, index: usize) -> Option<T> {
    record.get(index)?.parse().ok()
}

/// Optional column: absent or empty is `Some(None)`, garbage is `None`.
fn optional_field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    index: usize,
) -> Option<Option<T>> {
    match record.get(index) {
        None | Some("") => Some(None),
        Some(v) => v.parse().ok().map(Some),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Parses every record with `parse_row`, warning about and skipping rows it
/// rejects.
fn parse_rows<T>(
    path: &Path,
    records: Vec<csv::StringRecord>,
    timestamp: impl Fn(&T) -> DateTime<Utc>,
    parse_row: impl Fn(&csv::StringRecord) -> Option<T>,
) -> Vec<T> {
    let mut rows: Vec<T> = records
        .iter()
        .enumerate()
        .filter_map(|(i, record)| {
            let row = parse_row(record);
            if row.is_none() {
                // +2: header row and 1-based numbering
                warn!(file = %path.display(), line = i + 2, "skipping malformed row");
            }
            row
        })
        .collect();
    rows.sort_by_key(|r| timestamp(r));
    rows
}

pub fn read_candles(path: &Path) -> Result<Vec<Candle>, StratlangError> {
    let records = read_records(path)?;
    Ok(parse_rows(path, records, |c: &Candle| c.timestamp, |r| {
        let candle = Candle {
            timestamp: parse_timestamp(r.get(0)?)?,
            open: field(r, 1)?,
            high: field(r, 2)?,
            low: field(r, 3)?,
            close: field(r, 4)?,
            volume: field(r, 5)?,
            taker_buy_volume: optional_field(r, 6)?,
            trade_count: optional_field(r, 7)?,
        };
        (candle.high >= candle.low).then_some(candle)
    }))
}

pub fn read_agg_trades(path: &Path) -> Result<Vec<AggTrade>, StratlangError> {
    let records = read_records(path)?;
    Ok(parse_rows(path, records, |t: &AggTrade| t.timestamp, |r| {
        Some(AggTrade {
            timestamp: parse_timestamp(r.get(0)?)?,
            price: field(r, 1)?,
            quantity: field(r, 2)?,
            is_buyer_maker: parse_bool(r.get(3)?)?,
        })
    }))
}

fn read_metric<T: TimedValue>(
    path: &Path,
    build: impl Fn(DateTime<Utc>, f64) -> T,
) -> Result<Vec<T>, StratlangError> {
    let records = read_records(path)?;
    Ok(parse_rows(path, records, T::timestamp, |r| {
        Some(build(parse_timestamp(r.get(0)?)?, field(r, 1)?))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn timestamps_in_millis_or_rfc3339() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("1704067200000"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T00:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-01T01:00:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn candles_with_optional_columns_and_bad_rows() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "candles.csv",
            "timestamp,open,high,low,close,volume,taker_buy_volume,trade_count\n\
             1704070800000,101,102,100,101.5,20,12,40\n\
             1704067200000,100,101,99,100.5,10,,\n\
             1704074400000,oops,1,1,1,1\n\
             1704078000000,100,99,101,100,5\n",
        );
        let candles = read_candles(&path).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(
            candles[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(candles[0].taker_buy_volume, None);
        assert_eq!(candles[1].taker_buy_volume, Some(12.0));
        assert_eq!(candles[1].trade_count, Some(40));
    }

    #[test]
    fn agg_trades_parse_side() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "trades.csv",
            "timestamp,price,quantity,is_buyer_maker\n\
             2024-01-01T00:00:05Z,100.0,0.5,true\n\
             2024-01-01T00:00:01Z,100.5,1.5,false\n\
             2024-01-01T00:00:09Z,100.5,1.5,maybe\n",
        );
        let trades = read_agg_trades(&path).unwrap();
        assert_eq!(trades.len(), 2);
        assert!(!trades[0].is_buyer_maker);
        assert_eq!(trades[0].quantity, 1.5);
        assert!(trades[1].is_buyer_maker);
    }

    #[test]
    fn load_market_data_from_config() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "candles.csv",
            "timestamp,open,high,low,close,volume\n\
             1704067200000,100,101,99,100.5,10\n\
             1704070800000,101,102,100,101.5,20\n",
        );
        write(
            &dir,
            "funding.csv",
            "timestamp,value\n1704067200000,0.0001\n",
        );
        let config = crate::adapters::file_config_adapter::FileConfigAdapter::from_string(
            "[data]\ncandles = candles.csv\nfunding_rates = funding.csv\nresolution = 1h\n",
        )
        .unwrap();
        let adapter = CsvAdapter::from_config(&config, dir.path()).unwrap();
        let data = adapter.load_market_data().unwrap();
        assert_eq!(data.candles.len(), 2);
        assert_eq!(data.resolution, TimeDelta::hours(1));
        let funding = data.funding_rates.unwrap();
        assert_eq!(funding.len(), 1);
        assert_eq!(funding[0].rate, 0.0001);
        assert!(data.agg_trades.is_none());
    }

    #[test]
    fn config_errors() {
        let dir = TempDir::new().unwrap();
        let missing = crate::adapters::file_config_adapter::FileConfigAdapter::from_string(
            "[data]\nresolution = 1h\n",
        )
        .unwrap();
        assert!(matches!(
            CsvAdapter::from_config(&missing, dir.path()),
            Err(StratlangError::ConfigMissing { .. })
        ));
        let bad = crate::adapters::file_config_adapter::FileConfigAdapter::from_string(
            "[data]\ncandles = c.csv\nresolution = 7x\n",
        )
        .unwrap();
        assert!(matches!(
            CsvAdapter::from_config(&bad, dir.path()),
            Err(StratlangError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn missing_file_is_data_error() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvAdapter::new(DataPaths {
            candles: dir.path().join("absent.csv"),
            resolution: TimeDelta::hours(1),
            agg_trades: None,
            funding_rates: None,
            open_interest: None,
            premium_index: None,
            reference_candles: None,
        });
        assert!(matches!(
            adapter.load_market_data(),
            Err(StratlangError::Data { .. })
        ));
    }
}
