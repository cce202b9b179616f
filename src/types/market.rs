use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A tradable security on the equities side.
#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Instrument {
    pub id: String,
    pub url: String,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub simple_name: Option<String>,
    #[serde(default)]
    pub tradeable: bool,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub quote: Option<String>,
    #[serde(default)]
    pub fundamentals: Option<String>,
    #[serde(default)]
    pub min_tick_size: Option<Decimal>,
    #[serde(default)]
    pub day_trade_ratio: Option<Decimal>,
    #[serde(default)]
    pub list_date: Option<String>,
}

#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Quote {
    pub symbol: String,
    #[serde(default)]
    pub ask_price: Option<Decimal>,
    #[serde(default)]
    pub ask_size: u64,
    #[serde(default)]
    pub bid_price: Option<Decimal>,
    #[serde(default)]
    pub bid_size: u64,
    #[serde(default)]
    pub last_trade_price: Option<Decimal>,
    #[serde(default)]
    pub last_extended_hours_trade_price: Option<Decimal>,
    #[serde(default)]
    pub previous_close: Option<Decimal>,
    #[serde(default)]
    pub trading_halted: bool,
    #[serde(default)]
    pub instrument: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
