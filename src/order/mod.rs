//! Equity and crypto orders.
//!
//! Both families go through [`resolve_size`] before they are serialized, so quantity
//! derivation and price rounding cannot drift between them.

mod crypto;
mod equity;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

pub use crypto::{CryptoExecution, CryptoOrder, CryptoOrderOutput};
pub use equity::{Execution, Order, OrderOutput};

use crate::Result;
use crate::error::{Error, Rejected};
use crate::response::empty_as_none;

/// Equities trade in whole cents.
pub const EQUITY_PRICE_INCREMENT: Decimal = dec!(0.01);

/// Rounding rule for prices and derived quantities: half away from zero, on the exact
/// decimal value (`1.005 -> 1.01`, `2.5 -> 3`).
pub const ROUNDING: RoundingStrategy = RoundingStrategy::MidpointAwayFromZero;

#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    #[default]
    Buy,
    Sell,
}

#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderType {
    #[default]
    Market,
    Limit,
}

#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimeInForce {
    /// Good till cancelled.
    #[default]
    Gtc,
    /// Good for day.
    Gfd,
    /// Immediate or cancel.
    Ioc,
    /// At the opening.
    Opg,
}

#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Trigger {
    #[default]
    Immediate,
    Stop,
}

/// Order state as reported by the API. The client never sets it locally.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderState {
    #[default]
    Queued,
    Unconfirmed,
    Confirmed,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
    Failed,
    /// A state this client does not know about yet.
    #[serde(other)]
    Unknown,
}

impl OrderState {
    /// Filled, cancelled, rejected and failed orders never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderState::Filled | OrderState::Cancelled | OrderState::Rejected | OrderState::Failed
        )
    }
}

/// Dollar amount block used across order records.
#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Money {
    pub amount: Decimal,
    #[serde(default)]
    pub currency_code: String,
    #[serde(default)]
    pub currency_id: Option<String>,
}

/// Resolves the size that goes on the wire.
///
/// A zero `quantity` is derived as `amount / price` rounded to a whole unit, using the
/// price as given. A price, when present, is rounded to the nearest `increment`.
pub fn resolve_size(
    quantity: Decimal,
    amount: Option<Decimal>,
    price: Option<Decimal>,
    increment: Option<Decimal>,
) -> Result<(Decimal, Option<Decimal>)> {
    if let Some(price) = price {
        if price.is_sign_negative() {
            return Err(Error::validation(format!("price {price} must not be negative")));
        }
    }
    if quantity.is_sign_negative() {
        return Err(Error::validation(format!(
            "quantity {quantity} must not be negative"
        )));
    }

    let quantity = if quantity.is_zero() {
        derive_quantity(amount, price)?
    } else {
        quantity
    };

    let price = match (price, increment) {
        (Some(price), Some(increment)) => Some(normalize_price(price, increment)?),
        (price, None) => price,
        (None, Some(_)) => None,
    };

    Ok((quantity, price))
}

fn derive_quantity(amount: Option<Decimal>, price: Option<Decimal>) -> Result<Decimal> {
    let (Some(amount), Some(price)) = (amount, price) else {
        return Err(Error::validation(
            "quantity is zero and no amount/price pair to derive it from",
        ));
    };
    if price.is_zero() {
        return Err(Error::validation(
            "cannot derive quantity from an amount with a zero price",
        ));
    }

    let quantity = amount
        .checked_div(price)
        .ok_or_else(|| Error::validation(format!("{amount} / {price} overflows")))?
        .round_dp_with_strategy(0, ROUNDING);
    if quantity.is_zero() || quantity.is_sign_negative() {
        return Err(Error::validation(format!(
            "amount {amount} at price {price} rounds to a quantity of {quantity}"
        )));
    }
    Ok(quantity)
}

/// Rounds `price` to the nearest multiple of `increment`.
pub fn normalize_price(price: Decimal, increment: Decimal) -> Result<Decimal> {
    if increment <= Decimal::ZERO {
        return Err(Error::validation(format!(
            "price increment {increment} must be positive"
        )));
    }

    let steps = price
        .checked_div(increment)
        .ok_or_else(|| Error::validation(format!("{price} / {increment} overflows")))?
        .round_dp_with_strategy(0, ROUNDING);
    steps
        .checked_mul(increment)
        .map(|d| d.normalize())
        .ok_or_else(|| Error::validation(format!("{steps} * {increment} overflows")))
}

/// The decoded record of a submission the API refused. Carried by
/// [`Rejected`](crate::error::Rejected) so callers can still `update` it.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub enum RejectedOrder {
    Equity(Box<OrderOutput>),
    Crypto(Box<CryptoOrderOutput>),
}

impl RejectedOrder {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            RejectedOrder::Equity(order) => &order.id,
            RejectedOrder::Crypto(order) => &order.id,
        }
    }
}

/// A submitted order that came back with a reject reason. It exists remotely, so the
/// error keeps the whole record.
pub(crate) fn rejected_submission(reason: String, order: RejectedOrder) -> Error {
    #[cfg(feature = "tracing")]
    tracing::warn!(order_id = order.id(), %reason, "order rejected");

    Rejected {
        reason,
        order_id: Some(order.id().to_owned()),
        order: Some(order),
    }
    .into()
}

/// Reply to a cancel request.
///
/// The API answers with anything from `{}` to a full order record, so every field is
/// optional. Only a non-empty `reject_reason` means the cancel failed.
#[non_exhaustive]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CancelAck {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub state: Option<OrderState>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub reject_reason: Option<String>,
}

impl CancelAck {
    /// Fails with [`Kind::Rejected`](crate::error::Kind::Rejected) when the reply carries
    /// a reject reason, even though the HTTP exchange succeeded.
    pub(crate) fn accepted(self, order_id: &str) -> Result<Self> {
        let Some(reason) = &self.reject_reason else {
            return Ok(self);
        };
        let order_id = self.id.as_deref().unwrap_or(order_id);

        #[cfg(feature = "tracing")]
        tracing::warn!(order_id, %reason, "cancel rejected");

        Err(Error::rejected(reason.clone(), Some(order_id.to_owned())))
    }
}
