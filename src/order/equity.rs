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
    CancelAck, EQUITY_PRICE_INCREMENT, Money, OrderState, OrderType, RejectedOrder, Side,
    TimeInForce, Trigger, normalize_price, rejected_submission, resolve_size,
};
use crate::pagination::{Incomplete, Page, collect_pages};
use crate::response::empty_as_none;
use crate::types::Instrument;

const ORDER_FORM_VERSION: u32 = 2;

/// Equity order payload, built client side and not yet sent.
///
/// Start from [`Client::create_order`], then adjust with the `with_*` methods.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Order {
    pub account: String,
    pub instrument: String,
    pub symbol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub ref_id: Uuid,
    pub side: Side,
    pub time_in_force: TimeInForce,
    pub trigger: Trigger,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_price: Option<Decimal>,
    pub extended_hours: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub override_day_trade_checks: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub override_dtbp_checks: bool,
    pub order_form_version: u32,
    /// Target notional, used to derive `quantity` when it is zero.
    #[serde(skip)]
    pub amount_in_dollars: Option<Decimal>,
}

impl Order {
    #[must_use]
    pub fn new(account_url: String, instrument: &Instrument) -> Self {
        Self {
            account: account_url,
            instrument: instrument.url.clone(),
            symbol: instrument.symbol.clone(),
            price: None,
            quantity: Decimal::ZERO,
            ref_id: Uuid::new_v4(),
            side: Side::Buy,
            time_in_force: TimeInForce::Gtc,
            trigger: Trigger::Immediate,
            order_type: OrderType::Market,
            stop_price: None,
            extended_hours: false,
            override_day_trade_checks: false,
            override_dtbp_checks: false,
            order_form_version: ORDER_FORM_VERSION,
            amount_in_dollars: None,
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

    /// Sizes the order by notional. `price` is used to derive the quantity.
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

    /// Turns the order into a limit order at `price`.
    #[must_use]
    pub fn with_limit_price(mut self, price: Decimal) -> Self {
        self.order_type = OrderType::Limit;
        self.price = Some(price);
        self
    }

    /// Turns the order into a stop order triggered at `stop_price`.
    #[must_use]
    pub fn with_stop_price(mut self, stop_price: Decimal) -> Self {
        self.trigger = Trigger::Stop;
        self.stop_price = Some(stop_price);
        self
    }

    #[must_use]
    pub fn with_time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }

    #[must_use]
    pub fn with_extended_hours(mut self, extended_hours: bool) -> Self {
        self.extended_hours = extended_hours;
        self
    }

    #[must_use]
    pub fn with_ref_id(mut self, ref_id: Uuid) -> Self {
        self.ref_id = ref_id;
        self
    }

    /// The payload as it will be transmitted: quantity resolved, prices in whole cents.
    pub fn prepared(&self) -> Result<Self> {
        let (quantity, price) = resolve_size(
            self.quantity,
            self.amount_in_dollars,
            self.price,
            Some(EQUITY_PRICE_INCREMENT),
        )?;
        let stop_price = self
            .stop_price
            .map(|p| normalize_price(p, EQUITY_PRICE_INCREMENT))
            .transpose()?;

        Ok(Self {
            quantity,
            price,
            stop_price,
            ..self.clone()
        })
    }
}

/// A fill. Never changes once reported.
#[non_exhaustive]
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Execution {
    pub id: String,
    pub price: Decimal,
    pub quantity: Decimal,
    #[serde(default)]
    pub settlement_date: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// The server's view of an equity order.
#[non_exhaustive]
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct OrderOutput {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub ref_id: Option<String>,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub position: Option<String>,
    /// Cancellation handle. Absent once the order can no longer be cancelled.
    #[serde(default, rename = "cancel", deserialize_with = "empty_as_none")]
    pub cancel_url: Option<String>,
    #[serde(default)]
    pub instrument: String,
    #[serde(default)]
    pub symbol: Option<String>,
    pub state: OrderState,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub side: Side,
    pub time_in_force: TimeInForce,
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub stop_price: Option<Decimal>,
    pub quantity: Decimal,
    #[serde(default)]
    pub cumulative_quantity: Decimal,
    #[serde(default)]
    pub average_price: Option<Decimal>,
    #[serde(default)]
    pub fees: Option<Decimal>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub reject_reason: Option<String>,
    #[serde(default)]
    pub response_category: Option<String>,
    #[serde(default)]
    pub executions: Vec<Execution>,
    #[serde(default)]
    pub extended_hours: bool,
    #[serde(default)]
    pub dollar_based_amount: Option<Money>,
    #[serde(default)]
    pub total_notional: Option<Money>,
    #[serde(default)]
    pub executed_notional: Option<Money>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_transaction_at: Option<DateTime<Utc>>,
}

impl OrderOutput {
    /// Replaces every field with the server's current view of this order.
    pub async fn update(&mut self, client: &Client) -> Result<()> {
        *self = client.get(Url::parse(&self.url)?).await?;
        Ok(())
    }

    /// Requests cancellation through the order's own cancel handle.
    ///
    /// A reply carrying a reject reason is reported as [`Kind::Rejected`](crate::error::Kind::Rejected)
    /// even though the HTTP exchange succeeded.
    pub async fn cancel(&self, client: &Client) -> Result<CancelAck> {
        let Some(cancel_url) = &self.cancel_url else {
            return Err(Error::validation(format!(
                "order {} is {} and cannot be cancelled",
                self.id, self.state
            )));
        };

        client.cancel_at(Url::parse(cancel_url)?, &self.id).await
    }
}

impl Client {
    /// Builds a market GTC buy for `instrument` against the session's brokerage account.
    pub fn create_order(&self, instrument: &Instrument) -> Result<Order> {
        let account = self
            .account()
            .ok_or_else(|| Error::validation("session has no brokerage account"))?;
        Ok(Order::new(account.url.clone(), instrument))
    }

    /// Places an equity order. Cancelling the surrounding future only abandons the HTTP
    /// request; an order the server already accepted stays placed.
    pub async fn submit_order(&self, order: &Order) -> Result<OrderOutput> {
        let payload = order.prepared()?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            symbol = %payload.symbol,
            side = %payload.side,
            quantity = %payload.quantity,
            price = ?payload.price,
            ref_id = %payload.ref_id,
            "submitting order"
        );

        let output: OrderOutput = self.post(self.endpoints().orders.clone(), &payload).await?;
        match output.reject_reason.clone() {
            Some(reason) => Err(rejected_submission(
                reason,
                RejectedOrder::Equity(Box::new(output)),
            )),
            None => Ok(output),
        }
    }

    pub async fn order(&self, id: &str) -> Result<OrderOutput> {
        self.get(self.endpoints().orders.join(&format!("{id}/"))?)
            .await
    }

    pub async fn cancel_order_by_id(&self, id: &str) -> Result<CancelAck> {
        self.cancel_at(self.endpoints().orders.join(&format!("{id}/cancel/"))?, id)
            .await
    }

    pub(crate) async fn cancel_at(&self, cancel_url: Url, order_id: &str) -> Result<CancelAck> {
        let ack: CancelAck = self.post_empty(cancel_url).await?;
        ack.accepted(order_id)
    }

    /// First page of orders, newest first.
    pub async fn recent_orders(&self) -> Result<Vec<OrderOutput>> {
        let page: Page<OrderOutput> = self.get(self.endpoints().orders.clone()).await?;
        Ok(page.results)
    }

    /// One page of orders. A `cursor` from a previous page takes precedence over the
    /// size and state filters, which it already carries.
    pub async fn get_orders(
        &self,
        cursor: Option<&str>,
        page_size: Option<u32>,
        state: Option<OrderState>,
    ) -> Result<Page<OrderOutput>> {
        let url = match cursor {
            Some(cursor) => Url::parse(cursor)?,
            None => ListQuery {
                page_size,
                state,
                ..ListQuery::default()
            }
            .apply(self.endpoints().orders.clone())?,
        };

        self.get(url).await
    }

    /// Every order, following `next` cursors until the last page.
    pub async fn all_orders(
        &self,
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<OrderOutput>, Incomplete<OrderOutput>> {
        collect_pages(self.pages(self.endpoints().orders.clone()), cancel).await
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use serde_json::json;

    use super::*;

    fn instrument() -> Instrument {
        serde_json::from_value(json!({
            "id": "450dfc6d",
            "url": "https://api.robinhood.com/instruments/450dfc6d/",
            "symbol": "AAPL",
        }))
        .expect("instrument")
    }

    #[test]
    fn new_order_defaults() {
        let order = Order::new("https://api.robinhood.com/accounts/5QR/".to_owned(), &instrument());

        assert_eq!(order.order_type, OrderType::Market, "type");
        assert_eq!(order.time_in_force, TimeInForce::Gtc, "tif");
        assert_eq!(order.trigger, Trigger::Immediate, "trigger");
        assert_eq!(order.symbol, "AAPL", "symbol");
        assert_eq!(order.order_form_version, 2, "form version");
    }

    #[test]
    fn prepared_payload_is_whole_cents_and_sized() {
        let ref_id = Uuid::nil();
        let order = Order::new("acct".to_owned(), &instrument())
            .with_amount_in_dollars(dec!(100), dec!(24.995))
            .with_stop_price(dec!(24.504))
            .with_ref_id(ref_id);

        let payload = serde_json::to_value(order.prepared().expect("prepared")).expect("json");

        assert_eq!(
            payload,
            json!({
                "account": "acct",
                "instrument": "https://api.robinhood.com/instruments/450dfc6d/",
                "symbol": "AAPL",
                "price": "25",
                "quantity": "4",
                "ref_id": "00000000-0000-0000-0000-000000000000",
                "side": "buy",
                "time_in_force": "gtc",
                "trigger": "stop",
                "type": "market",
                "stop_price": "24.5",
                "extended_hours": false,
                "order_form_version": 2,
            })
        );
    }

    #[test]
    fn prepared_keeps_explicit_quantity() {
        let order = Order::new("acct".to_owned(), &instrument())
            .with_quantity(dec!(3))
            .with_limit_price(dec!(187.126));
        let prepared = order.prepared().expect("prepared");

        assert_eq!(prepared.quantity, dec!(3), "quantity");
        assert_eq!(prepared.price, Some(dec!(187.13)), "price");
        assert_eq!(order.price, Some(dec!(187.126)), "original untouched");
    }

    #[test]
    fn output_decodes_with_nulls() {
        let output: OrderOutput = serde_json::from_value(json!({
            "id": "ord-1",
            "url": "https://api.robinhood.com/orders/ord-1/",
            "cancel": null,
            "state": "filled",
            "type": "limit",
            "side": "sell",
            "time_in_force": "gfd",
            "trigger": "immediate",
            "price": "10.00",
            "stop_price": null,
            "quantity": "2.00000",
            "cumulative_quantity": "2.00000",
            "average_price": "10.01",
            "reject_reason": null,
            "executions": [{
                "id": "exec-1",
                "price": "10.01",
                "quantity": "2.00000",
                "settlement_date": "2024-01-04",
                "timestamp": "2024-01-02T15:04:05.123456Z"
            }],
            "created_at": "2024-01-02T15:04:00Z",
            "updated_at": "2024-01-02T15:04:06Z",
        }))
        .expect("output");

        assert_eq!(output.state, OrderState::Filled, "state");
        assert_eq!(output.cancel_url, None, "not cancellable");
        assert_eq!(output.reject_reason, None, "no reject");
        assert_eq!(output.executions.len(), 1, "fills");
        assert_eq!(output.executions[0].price, dec!(10.01), "fill price");
    }
}
