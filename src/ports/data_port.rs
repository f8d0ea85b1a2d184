//! Market data access port trait.

use crate::domain::context::MarketData;
use crate::domain::error::StratlangError;

pub trait DataPort {
    /// Loads the candles plus whichever optional series the source provides.
    fn load_market_data(&self) -> Result<MarketData, StratlangError>;
}
