use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Equity position held in a brokerage account.
#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Position {
    pub url: String,
    pub instrument: String,
    #[serde(default)]
    pub account: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub average_buy_price: Option<Decimal>,
    #[serde(default)]
    pub shares_held_for_buys: Option<Decimal>,
    #[serde(default)]
    pub shares_held_for_sells: Option<Decimal>,
    #[serde(default)]
    pub intraday_quantity: Option<Decimal>,
    #[serde(default)]
    pub intraday_average_buy_price: Option<Decimal>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
