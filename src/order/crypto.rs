use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::Result;
use crate::client::{Client, ListQuery};
use crate::error::Error;
use crate::order::{
    CancelAck, OrderState, OrderType, RejectedOrder, Side, TimeInForce, rejected_submission,
    resolve_size,
};
use crate::pagination::{Incomplete, Page, collect_pages};
use crate::response::empty_as_none;
use crate::types::CryptoCurrencyPair;

/// Crypto order payload. Placed against the crypto account id and a currency pair id.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CryptoOrder {
    pub account_id: String,
    pub currency_pair_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub ref_id: Uuid,
    pub side: Side,
    pub time_in_force: TimeInForce,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    /// Target notional, used to derive `quantity` when it is zero.
    #[serde(skip)]
    pub amount_in_dollars: Option<Decimal>,
    /// The pair's minimum price increment, if known.
    #[serde(skip)]
    pub price_increment: Option<Decimal>,
}

impl CryptoOrder {
    #[must_use]
    pub fn new(account_id: String, currency_pair_id: String) -> Self {
        Self {
            account_id,
            currency_pair_id,
            price: None,
            quantity: Decimal::ZERO,
            ref_id: Uuid::new_v4(),
            side: Side::Buy,
            time_in_force: TimeInForce::Gtc,
            order_type: OrderType::Market,
            amount_in_dollars: None,
            price_increment: None,
        }
    }

    #[must_use]
    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    #[must_use]
    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self
    }

    #[must_use]
    pub fn with_amount_in_dollars(mut self, amount: Decimal, price: Decimal) -> Self {
        self.quantity = Decimal::ZERO;
        self.amount_in_dollars = Some(amount);
        self.price = Some(price);
        self
    }

    #[must_use]
    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    #[must_use]
    pub fn with_limit_price(mut self, price: Decimal) -> Self {
        self.order_type = OrderType::Limit;
        self.price = Some(price);
        self
    }

    #[must_use]
    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }

    #[must_use]
    pub fn with_ref_id(mut self, ref_id: Uuid) -> Self {
        self.ref_id = ref_id;
        self
    }

    /// The payload as it will be transmitted.
    pub fn prepared(&self) -> Result<Self> {
        let (quantity, price) = resolve_size(
            self.quantity,
            self.amount_in_dollars,
            self.price,
            self.price_increment,
        )?;

        Ok(Self {
            quantity,
            price,
            ..self.clone()
        })
    }
}

#[non_exhaustive]
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CryptoExecution {
    pub id: String,
    pub effective_price: Decimal,
    pub quantity: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// The server's view of a crypto order.
#[non_exhaustive]
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CryptoOrderOutput {
    pub id: String,
    pub account_id: String,
    pub currency_pair_id: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub cancel_url: Option<String>,
    #[serde(default)]
    pub ref_id: Option<String>,
    pub state: OrderState,
    pub side: Side,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub entered_price: Option<Decimal>,
    #[serde(default)]
    pub stop_price: Option<Decimal>,
    pub quantity: Decimal,
    #[serde(default)]
    pub cumulative_quantity: Decimal,
    #[serde(default)]
    pub average_price: Option<Decimal>,
    #[serde(default)]
    pub rounded_executed_notional: Option<Decimal>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub reject_reason: Option<String>,
    #[serde(default)]
    pub executions: Vec<CryptoExecution>,
    #[serde(default)]
    pub initiator_id: Option<serde_json::Value>,
    #[serde(default)]
    pub initiator_type: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_transaction_at: Option<DateTime<Utc>>,
}

impl CryptoOrderOutput {
    /// Replaces every field with the server's current view of this order.
    pub async fn update(&mut self, client: &Client) -> Result<()> {
        *self = client.crypto_order(&self.id).await?;
        Ok(())
    }

    /// Requests cancellation. A reply carrying a reject reason is a failure.
    pub async fn cancel(&self, client: &Client) -> Result<CancelAck> {
        let Some(cancel_url) = &self.cancel_url else {
            return Err(Error::validation(format!(
                "crypto order {} is {} and cannot be cancelled",
                self.id, self.state
            )));
        };

        let ack: CancelAck = client.post_empty(Url::parse(cancel_url)?).await?;
        ack.accepted(&self.id)
    }
}

impl Client {
    /// Builds a market GTC buy for `pair` against the session's crypto account.
    pub fn create_crypto_order(&self, pair: &CryptoCurrencyPair) -> Result<CryptoOrder> {
        let account = self
            .crypto_account()
            .ok_or_else(|| Error::validation("session has no crypto account"))?;

        let mut order = CryptoOrder::new(account.id.clone(), pair.id.clone());
        order.price_increment = pair.min_order_price_increment;
        Ok(order)
    }

    /// Places a crypto order. Like [`Client::submit_order`], nothing is retried.
    pub async fn submit_crypto_order(&self, order: &CryptoOrder) -> Result<CryptoOrderOutput> {
        let payload = order.prepared()?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            pair = %payload.currency_pair_id,
            side = %payload.side,
            quantity = %payload.quantity,
            price = ?payload.price,
            ref_id = %payload.ref_id,
            "submitting crypto order"
        );

        let output: CryptoOrderOutput = self
            .post(self.endpoints().crypto_orders.clone(), &payload)
            .await?;
        match output.reject_reason.clone() {
            Some(reason) => Err(rejected_submission(
                reason,
                RejectedOrder::Crypto(Box::new(output)),
            )),
            None => Ok(output),
        }
    }

    pub async fn crypto_order(&self, id: &str) -> Result<CryptoOrderOutput> {
        self.get(self.endpoints().crypto_orders.join(&format!("{id}/"))?)
            .await
    }

    /// One page of crypto orders. A `cursor` takes precedence over `page_size`.
    pub async fn get_crypto_orders(
        &self,
        cursor: Option<&str>,
        page_size: Option<u32>,
    ) -> Result<Page<CryptoOrderOutput>> {
        let url = match cursor {
            Some(cursor) => Url::parse(cursor)?,
            None => ListQuery {
                page_size,
                ..ListQuery::default()
            }
            .apply(self.endpoints().crypto_orders.clone())?,
        };

        self.get(url).await
    }

    pub async fn all_crypto_orders(
        &self,
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<CryptoOrderOutput>, Incomplete<CryptoOrderOutput>> {
        collect_pages(self.pages(self.endpoints().crypto_orders.clone()), cancel).await
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;
    use crate::order::Order;
    use crate::types::Instrument;

    #[test]
    fn derives_whole_unit_quantity() {
        let order = CryptoOrder::new("acct".to_owned(), "pair".to_owned())
            .with_amount_in_dollars(dec!(250), dec!(100))
            .with_ref_id(Uuid::nil());

        let payload = serde_json::to_value(order.prepared().expect("prepared")).expect("json");
        assert_eq!(
            payload,
            json!({
                "account_id": "acct",
                "currency_pair_id": "pair",
                "price": "100",
                "quantity": "3",
                "ref_id": "00000000-0000-0000-0000-000000000000",
                "side": "buy",
                "time_in_force": "gtc",
                "type": "market",
            })
        );
    }

    #[test]
    fn equity_and_crypto_derive_the_same_quantity() {
        let instrument: Instrument = serde_json::from_value(json!({
            "id": "i", "url": "u", "symbol": "S",
        }))
        .expect("instrument");

        for (amount, price) in [
            (dec!(100), dec!(40)),
            (dec!(99.99), dec!(33.33)),
            (dec!(1000), dec!(7.77)),
        ] {
            let equity = Order::new("a".to_owned(), &instrument)
                .with_amount_in_dollars(amount, price)
                .prepared()
                .expect("equity");
            let crypto = CryptoOrder::new("a".to_owned(), "p".to_owned())
                .with_amount_in_dollars(amount, price)
                .prepared()
                .expect("crypto");

            assert_eq!(equity.quantity, crypto.quantity, "{amount} / {price}");
        }
    }

    #[test]
    fn price_follows_pair_increment() {
        let mut order = CryptoOrder::new("acct".to_owned(), "pair".to_owned())
            .with_quantity(dec!(1))
            .with_limit_price(dec!(43251.987));
        order.price_increment = Some(dec!(0.01));

        assert_eq!(
            order.prepared().expect("prepared").price,
            Some(dec!(43251.99)),
            "rounded to increment"
        );

        order.price_increment = None;
        assert_eq!(
            order.prepared().expect("prepared").price,
            Some(dec!(43251.987)),
            "unknown increment leaves price alone"
        );
    }
}
