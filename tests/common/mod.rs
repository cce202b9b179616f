#![allow(dead_code, reason = "each test binary uses a different subset")]

use chrono::{TimeDelta, Utc};
use httpmock::prelude::*;
use robinhood_client_sdk::auth::{StaticToken, Token};
use robinhood_client_sdk::{Client, ClientConfig};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

pub const TOKEN: &str = "test-token";
pub const BEARER: &str = "Bearer test-token";

pub fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::from_raw(
        &format!("{}/", server.base_url()),
        &format!("{}/crypto/", server.base_url()),
    )
    .and_then(|config| {
        config.with_bonfire_host(server.url("/bonfire/").parse().expect("bonfire url"))
    })
    .expect("mock server hosts are valid")
}

pub fn token() -> StaticToken {
    StaticToken(Token::new(TOKEN, Utc::now() + TimeDelta::hours(1)))
}

/// Routes crate logs to the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn client(server: &MockServer) -> Client {
    init_tracing();
    Client::new(&config(server), token()).expect("client")
}

/// Mocks the account lookups and dials a client bound to them.
pub async fn dialed(server: &MockServer) -> Client {
    init_tracing();
    server
        .mock_async(|when, then| {
            when.method(GET).path("/accounts/").header("authorization", BEARER);
            then.status(200).json_body(json!({
                "next": null,
                "results": [{
                    "url": server.url("/accounts/5QR24141/"),
                    "account_number": "5QR24141",
                    "type": "margin",
                    "buying_power": "1500.0000",
                }],
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/crypto/accounts/");
            then.status(200).json_body(json!({
                "next": null,
                "results": [{ "id": "crypto-acct-1", "status": "active" }],
            }));
        })
        .await;

    Client::dial(&config(server), token()).await.expect("dial")
}

pub fn order_json(server: &MockServer, id: &str, state: &str, reject_reason: Option<&str>) -> Value {
    json!({
        "id": id,
        "url": server.url(format!("/orders/{id}/")),
        "cancel": server.url(format!("/orders/{id}/cancel/")),
        "account": server.url("/accounts/5QR24141/"),
        "instrument": server.url("/instruments/450dfc6d/"),
        "symbol": "AAPL",
        "state": state,
        "type": "limit",
        "side": "buy",
        "time_in_force": "gtc",
        "trigger": "immediate",
        "price": "187.13",
        "stop_price": null,
        "quantity": "3.00000",
        "cumulative_quantity": "0.00000",
        "average_price": null,
        "fees": "0.00",
        "reject_reason": reject_reason,
        "executions": [],
        "extended_hours": false,
        "created_at": "2024-03-01T14:30:00.000000Z",
        "updated_at": "2024-03-01T14:30:00.000000Z",
        "last_transaction_at": "2024-03-01T14:30:00.000000Z",
    })
}

pub fn crypto_order_json(server: &MockServer, id: &str, state: &str, reject_reason: Option<&str>) -> Value {
    json!({
        "id": id,
        "account_id": "crypto-acct-1",
        "currency_pair_id": "3d961844",
        "cancel_url": server.url(format!("/crypto/orders/{id}/cancel/")),
        "ref_id": null,
        "state": state,
        "side": "buy",
        "type": "market",
        "time_in_force": "gtc",
        "price": "100.00",
        "quantity": "3.000000000000000000",
        "cumulative_quantity": "0",
        "average_price": null,
        "reject_reason": reject_reason,
        "executions": [],
        "initiator_id": null,
        "initiator_type": null,
        "created_at": "2024-03-01T14:30:00Z",
        "updated_at": "2024-03-01T14:30:00Z",
        "last_transaction_at": null,
    })
}

pub fn instrument_json(server: &MockServer) -> Value {
    json!({
        "id": "450dfc6d",
        "url": server.url("/instruments/450dfc6d/"),
        "symbol": "AAPL",
        "name": "Apple Inc. Common Stock",
        "tradeable": true,
        "state": "active",
        "min_tick_size": null,
    })
}
