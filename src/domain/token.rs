//! Token model and the static keyword table.
//!
//! The DSL has no user-defined names: every identifier must appear in one of
//! the family tables below, and its family decides the token kind.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Operator,
    Logical,
    CrossOperator,
    LParen,
    RParen,
    Comma,
    Dot,
    LBracket,
    RBracket,
    Plus,
    Minus,
    Star,
    Slash,
    Number,
    Boolean,
    PriceField,
    Property,
    Indicator,
    Range,
    Volume,
    Time,
    Moon,
    Holiday,
    Fomc,
    OrderFlow,
    Funding,
    Premium,
    SessionOrderFlow,
    OhlcvVolume,
    OpenInterest,
    Ray,
    Aggregate,
    Math,
    CandlePattern,
    CandleProperty,
    Footprint,
    Exchange,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Operator => "comparison operator",
            TokenKind::Logical => "logical operator",
            TokenKind::CrossOperator => "cross operator",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Number => "number",
            TokenKind::Boolean => "boolean",
            TokenKind::PriceField => "price field",
            TokenKind::Property => "property name",
            TokenKind::Indicator => "indicator",
            TokenKind::Range => "range function",
            TokenKind::Volume => "volume function",
            TokenKind::Time => "time function",
            TokenKind::Moon => "moon function",
            TokenKind::Holiday => "holiday function",
            TokenKind::Fomc => "FOMC function",
            TokenKind::OrderFlow => "order flow function",
            TokenKind::Funding => "funding function",
            TokenKind::Premium => "premium function",
            TokenKind::SessionOrderFlow => "session order flow function",
            TokenKind::OhlcvVolume => "OHLCV volume function",
            TokenKind::OpenInterest => "open interest function",
            TokenKind::Ray => "ray function",
            TokenKind::Aggregate => "aggregate function",
            TokenKind::Math => "math function",
            TokenKind::CandlePattern => "candle pattern",
            TokenKind::CandleProperty => "candle property",
            TokenKind::Footprint => "footprint function",
            TokenKind::Exchange => "exchange function",
            TokenKind::Eof => "end of input",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the first character in the source.
    pub offset: usize,
    /// 1-based source line.
    pub line: usize,
}

impl Token {
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

pub const INDICATORS: &[&str] = &[
    "SMA",
    "EMA",
    "WMA",
    "RSI",
    "ATR",
    "ROC",
    "STDDEV",
    "CCI",
    "WILLIAMS_R",
    "MACD",
    "BBANDS",
    "STOCHASTIC",
];
pub const RANGE_FUNCTIONS: &[&str] = &["HIGH_OF", "LOW_OF", "RANGE_POSITION"];
pub const VOLUME_FUNCTIONS: &[&str] = &["AVG_VOLUME", "RELATIVE_VOLUME"];
pub const TIME_FUNCTIONS: &[&str] = &["HOUR", "MINUTE", "DAY_OF_WEEK", "DAY_OF_MONTH", "MONTH"];
pub const MOON_FUNCTIONS: &[&str] = &["MOON_PHASE", "IS_FULL_MOON", "IS_NEW_MOON"];
pub const HOLIDAY_FUNCTIONS: &[&str] = &["IS_HOLIDAY", "DAYS_TO_HOLIDAY"];
pub const FOMC_FUNCTIONS: &[&str] = &["IS_FOMC_DAY", "DAYS_TO_FOMC", "DAYS_SINCE_FOMC"];
pub const ORDER_FLOW_FUNCTIONS: &[&str] = &[
    "VWAP",
    "DELTA",
    "CUM_DELTA",
    "TRADE_COUNT",
    "POC",
    "VAH",
    "VAL",
    "WHALE_DELTA",
    "WHALE_BUY_VOL",
    "WHALE_SELL_VOL",
    "LARGE_TRADE_COUNT",
];
pub const FUNDING_FUNCTIONS: &[&str] = &["FUNDING", "FUNDING_AVG"];
pub const PREMIUM_FUNCTIONS: &[&str] = &["PREMIUM", "PREMIUM_AVG"];
pub const SESSION_ORDER_FLOW_FUNCTIONS: &[&str] =
    &["SESSION_DELTA", "SESSION_BUY_VOLUME", "SESSION_SELL_VOLUME"];
pub const OHLCV_VOLUME_FUNCTIONS: &[&str] =
    &["BUY_VOLUME", "SELL_VOLUME", "OHLCV_DELTA", "OHLCV_CVD", "TRADES"];
pub const OPEN_INTEREST_FUNCTIONS: &[&str] = &["OI", "OI_CHANGE"];
pub const RAY_FUNCTIONS: &[&str] = &[
    "RESISTANCE_RAY_COUNT",
    "SUPPORT_RAY_COUNT",
    "RESISTANCE_RAYS_BROKEN",
    "SUPPORT_RAYS_BROKEN",
    "RESISTANCE_RAY",
    "SUPPORT_RAY",
    "RESISTANCE_RAY_DISTANCE",
    "SUPPORT_RAY_DISTANCE",
];
pub const AGGREGATE_FUNCTIONS: &[&str] = &["LOWEST", "HIGHEST", "PERCENTILE"];
pub const MATH_FUNCTIONS: &[&str] = &["abs", "min", "max"];
pub const CANDLE_PATTERNS: &[&str] = &[
    "DOJI",
    "HAMMER",
    "SHOOTING_STAR",
    "BULLISH_ENGULFING",
    "BEARISH_ENGULFING",
];
pub const CANDLE_PROPERTIES: &[&str] = &[
    "BODY_SIZE",
    "UPPER_WICK",
    "LOWER_WICK",
    "CANDLE_RANGE",
    "BODY_PCT",
    "IS_BULLISH",
    "IS_BEARISH",
];
pub const FOOTPRINT_FUNCTIONS: &[&str] = &[
    "ABSORPTION",
    "STACKED_BUY_IMBALANCES",
    "STACKED_SELL_IMBALANCES",
];
pub const EXCHANGE_FUNCTIONS: &[&str] =
    &["EXCHANGE_DIVERGENCE", "EXCHANGE_SPREAD", "EXCHANGE_SPREAD_Z"];
pub const PRICE_FIELDS: &[&str] = &[
    "OPEN", "HIGH", "LOW", "CLOSE", "VOLUME", "open", "high", "low", "close", "volume",
];
pub const PROPERTIES: &[&str] = &["line", "signal", "histogram", "upper", "middle", "lower", "k", "d"];

static KEYWORDS: LazyLock<HashMap<&'static str, TokenKind>> = LazyLock::new(|| {
    let families: &[(&[&str], TokenKind)] = &[
        (&["AND", "OR"], TokenKind::Logical),
        (&["crosses_above", "crosses_below"], TokenKind::CrossOperator),
        (&["true", "false", "TRUE", "FALSE"], TokenKind::Boolean),
        (PRICE_FIELDS, TokenKind::PriceField),
        (PROPERTIES, TokenKind::Property),
        (INDICATORS, TokenKind::Indicator),
        (RANGE_FUNCTIONS, TokenKind::Range),
        (VOLUME_FUNCTIONS, TokenKind::Volume),
        (TIME_FUNCTIONS, TokenKind::Time),
        (MOON_FUNCTIONS, TokenKind::Moon),
        (HOLIDAY_FUNCTIONS, TokenKind::Holiday),
        (FOMC_FUNCTIONS, TokenKind::Fomc),
        (ORDER_FLOW_FUNCTIONS, TokenKind::OrderFlow),
        (FUNDING_FUNCTIONS, TokenKind::Funding),
        (PREMIUM_FUNCTIONS, TokenKind::Premium),
        (SESSION_ORDER_FLOW_FUNCTIONS, TokenKind::SessionOrderFlow),
        (OHLCV_VOLUME_FUNCTIONS, TokenKind::OhlcvVolume),
        (OPEN_INTEREST_FUNCTIONS, TokenKind::OpenInterest),
        (RAY_FUNCTIONS, TokenKind::Ray),
        (AGGREGATE_FUNCTIONS, TokenKind::Aggregate),
        (MATH_FUNCTIONS, TokenKind::Math),
        (CANDLE_PATTERNS, TokenKind::CandlePattern),
        (CANDLE_PROPERTIES, TokenKind::CandleProperty),
        (FOOTPRINT_FUNCTIONS, TokenKind::Footprint),
        (EXCHANGE_FUNCTIONS, TokenKind::Exchange),
    ];
    let mut table = HashMap::new();
    for (names, kind) in families {
        for name in names.iter() {
            table.insert(*name, *kind);
        }
    }
    table
});

/// Token kind for an identifier, or `None` if it is not a keyword.
pub fn keyword_kind(text: &str) -> Option<TokenKind> {
    KEYWORDS.get(text).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup_by_family() {
        assert_eq!(keyword_kind("SMA"), Some(TokenKind::Indicator));
        assert_eq!(keyword_kind("AND"), Some(TokenKind::Logical));
        assert_eq!(keyword_kind("crosses_above"), Some(TokenKind::CrossOperator));
        assert_eq!(keyword_kind("close"), Some(TokenKind::PriceField));
        assert_eq!(keyword_kind("CLOSE"), Some(TokenKind::PriceField));
        assert_eq!(keyword_kind("histogram"), Some(TokenKind::Property));
        assert_eq!(keyword_kind("WHALE_DELTA"), Some(TokenKind::OrderFlow));
        assert_eq!(keyword_kind("abs"), Some(TokenKind::Math));
        assert_eq!(keyword_kind("EXCHANGE_DIVERGENCE"), Some(TokenKind::Exchange));
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert_eq!(keyword_kind("sma"), None);
        assert_eq!(keyword_kind("And"), None);
        assert_eq!(keyword_kind("ABS"), None);
    }

    #[test]
    fn no_name_belongs_to_two_families() {
        let total: usize = [
            INDICATORS,
            RANGE_FUNCTIONS,
            VOLUME_FUNCTIONS,
            TIME_FUNCTIONS,
            MOON_FUNCTIONS,
            HOLIDAY_FUNCTIONS,
            FOMC_FUNCTIONS,
            ORDER_FLOW_FUNCTIONS,
            FUNDING_FUNCTIONS,
            PREMIUM_FUNCTIONS,
            SESSION_ORDER_FLOW_FUNCTIONS,
            OHLCV_VOLUME_FUNCTIONS,
            OPEN_INTEREST_FUNCTIONS,
            RAY_FUNCTIONS,
            AGGREGATE_FUNCTIONS,
            MATH_FUNCTIONS,
            CANDLE_PATTERNS,
            CANDLE_PROPERTIES,
            FOOTPRINT_FUNCTIONS,
            EXCHANGE_FUNCTIONS,
            PRICE_FIELDS,
            PROPERTIES,
        ]
        .iter()
        .map(|family| family.len())
        .sum();
        // 2 logical + 2 cross + 4 boolean
        assert_eq!(KEYWORDS.len(), total + 8);
    }
}
