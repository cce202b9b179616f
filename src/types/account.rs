use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Brokerage (equities) account.
#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Account {
    pub url: String,
    #[serde(default)]
    pub account_number: String,
    #[serde(default, rename = "type")]
    pub account_type: String,
    #[serde(default)]
    pub buying_power: Option<Decimal>,
    #[serde(default)]
    pub cash: Option<Decimal>,
    #[serde(default)]
    pub cash_available_for_withdrawal: Option<Decimal>,
    #[serde(default)]
    pub portfolio: Option<String>,
    #[serde(default)]
    pub positions: Option<String>,
    #[serde(default)]
    pub deactivated: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Crypto account. Crypto orders are placed against its `id`, not a URL.
#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CryptoAccount {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub status_reason_code: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
