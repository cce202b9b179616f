use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const TRADABLE: &str = "tradable";

/// A crypto asset quoted in a currency. Crypto orders reference its `id`.
#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CryptoCurrencyPair {
    pub id: String,
    pub asset_currency: AssetCurrency,
    pub quote_currency: QuoteCurrency,
    #[serde(default)]
    pub max_order_size: Option<Decimal>,
    #[serde(default)]
    pub min_order_size: Option<Decimal>,
    #[serde(default)]
    pub min_order_price_increment: Option<Decimal>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub tradability: String,
}

impl CryptoCurrencyPair {
    #[must_use]
    pub fn is_tradable(&self) -> bool {
        self.tradability == TRADABLE
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct AssetCurrency {
    pub code: String,
    pub id: String,
    #[serde(default)]
    pub increment: Option<Decimal>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub brand_color: Option<String>,
}

#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct QuoteCurrency {
    pub code: String,
    pub id: String,
    #[serde(default)]
    pub increment: Option<Decimal>,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub currency_type: String,
}

#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CryptoQuote {
    pub id: String,
    pub symbol: String,
    pub ask_price: Decimal,
    pub bid_price: Decimal,
    pub mark_price: Decimal,
    #[serde(default)]
    pub high_price: Option<Decimal>,
    #[serde(default)]
    pub low_price: Option<Decimal>,
    #[serde(default)]
    pub open_price: Option<Decimal>,
    #[serde(default)]
    pub volume: Option<Decimal>,
}

/// Crypto holding in the crypto account.
#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CryptoHolding {
    pub id: String,
    pub account_id: String,
    pub currency: AssetCurrency,
    pub quantity: Decimal,
    #[serde(default)]
    pub quantity_available: Option<Decimal>,
    #[serde(default)]
    pub quantity_held_for_buy: Option<Decimal>,
    #[serde(default)]
    pub quantity_held_for_sell: Option<Decimal>,
    #[serde(default)]
    pub cost_bases: Vec<CostBasis>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CostBasis {
    pub id: String,
    pub currency_id: String,
    #[serde(default)]
    pub direct_cost_basis: Option<Decimal>,
    #[serde(default)]
    pub direct_quantity: Option<Decimal>,
    #[serde(default)]
    pub intraday_cost_basis: Option<Decimal>,
    #[serde(default)]
    pub intraday_quantity: Option<Decimal>,
    #[serde(default)]
    pub marked_cost_basis: Option<Decimal>,
    #[serde(default)]
    pub marked_quantity: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn currency_pair_decodes_string_decimals() {
        let pair: CryptoCurrencyPair = serde_json::from_str(
            r#"{
                "id": "3d961844-d360-45fc-989b-f6fca761d511",
                "asset_currency": {"code": "BTC", "id": "d674efea", "increment": "0.000000010000000000", "name": "Bitcoin", "brand_color": "EA963D"},
                "quote_currency": {"code": "USD", "id": "1072fc76", "increment": "0.010000000000000000", "name": "US Dollar", "type": "fiat"},
                "max_order_size": "20.0000000000000000",
                "min_order_size": "0.000001000000000000",
                "min_order_price_increment": "0.010000000000000000",
                "name": "Bitcoin to US Dollar",
                "symbol": "BTC-USD",
                "tradability": "tradable"
            }"#,
        )
        .expect("pair");

        assert!(pair.is_tradable(), "tradable");
        assert_eq!(pair.min_order_price_increment, Some(dec!(0.01)), "increment");
        assert_eq!(pair.quote_currency.currency_type, "fiat", "renamed field");
    }
}
