mod common;

use std::time::{Duration, Instant};

use chrono::{TimeDelta, Utc};
use httpmock::prelude::*;
use robinhood_client_sdk::auth::{StaticToken, Token};
use robinhood_client_sdk::error::{InsecureRedirect, Kind, Malformed, TooManyRedirects};
use robinhood_client_sdk::order::OrderOutput;
use robinhood_client_sdk::{Client, ClientConfig};
use serde_json::{Value, json};
use url::Url;

use crate::common::{BEARER, config, order_json};

#[tokio::test]
async fn back_to_back_calls_are_spaced_by_100ms() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let client = common::client(&server);
    server
        .mock_async(|when, then| {
            when.method(GET).path("/ping/");
            then.status(200).json_body(json!({}));
        })
        .await;
    let url = Url::parse(&server.url("/ping/"))?;

    let start = Instant::now();
    for _ in 0..4 {
        let _: Value = client.get(url.clone()).await?;
    }

    assert!(
        start.elapsed() >= Duration::from_millis(300),
        "elapsed {:?}",
        start.elapsed()
    );
    Ok(())
}

#[tokio::test]
async fn separate_clients_have_separate_throttles() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let config = config(&server).with_min_call_spacing(Duration::from_secs(5));
    let first = Client::new(&config, common::token())?;
    let second = Client::new(&config, common::token())?;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/ping/");
            then.status(200).json_body(json!({}));
        })
        .await;
    let url = Url::parse(&server.url("/ping/"))?;

    let start = Instant::now();
    let _: Value = first.get(url.clone()).await?;
    let _: Value = second.get(url).await?;

    assert!(start.elapsed() < Duration::from_secs(5), "no cross-client wait");
    Ok(())
}

#[tokio::test]
async fn relative_redirect_is_followed_with_the_token() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let client = common::client(&server);

    server
        .mock_async(|when, then| {
            when.method(GET).path("/orders/legacy-id/");
            then.status(301).header("location", "/orders/ord-1/");
        })
        .await;
    let target = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/orders/ord-1/")
                .header("authorization", BEARER);
            then.status(200)
                .json_body(order_json(&server, "ord-1", "queued", None));
        })
        .await;

    let order: OrderOutput = client.get(Url::parse(&server.url("/orders/legacy-id/"))?).await?;

    target.assert_async().await;
    assert_eq!(order.id, "ord-1");
    Ok(())
}

#[tokio::test]
async fn insecure_redirect_is_a_transport_error() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let client = common::client(&server);

    server
        .mock_async(|when, then| {
            when.method(GET).path("/orders/");
            then.status(302)
                .header("location", "http://downgrade.example.com/orders/");
        })
        .await;

    let err = client
        .get::<Value>(Url::parse(&server.url("/orders/"))?)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Kind::Transport);
    assert_eq!(
        err.downcast_ref::<InsecureRedirect>().map(|r| r.location.as_str()),
        Some("http://downgrade.example.com/orders/")
    );
    Ok(())
}

#[tokio::test]
async fn redirect_loops_are_cut_off() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let client = Client::new(&config(&server).with_max_redirects(3), common::token())?;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/loop/");
            then.status(302).header("location", "/loop/");
        })
        .await;

    let err = client
        .get::<Value>(Url::parse(&server.url("/loop/"))?)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Kind::Transport);
    assert_eq!(
        err.downcast_ref::<TooManyRedirects>().map(|r| r.limit),
        Some(3)
    );
    Ok(())
}

#[tokio::test]
async fn expired_token_is_never_sent() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let stale = StaticToken(Token::new("stale", Utc::now() - TimeDelta::minutes(1)));
    let client = Client::new(&config(&server), stale)?;

    let err = client
        .get::<Value>(Url::parse(&server.url("/accounts/"))?)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Kind::Validation);
    Ok(())
}

#[tokio::test]
async fn success_with_unexpected_shape_is_malformed() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let client = common::client(&server);

    server
        .mock_async(|when, then| {
            when.method(GET).path("/orders/ord-1/");
            then.status(200).json_body(json!({ "id": "ord-1", "state": 7 }));
        })
        .await;

    let err = client
        .get::<OrderOutput>(Url::parse(&server.url("/orders/ord-1/"))?)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), Kind::Malformed);
    let malformed = err.downcast_ref::<Malformed>().expect("malformed source");
    assert_eq!(malformed.status.as_u16(), 200);
    assert!(malformed.body.contains("\"state\":7"), "{}", malformed.body);
    Ok(())
}

#[tokio::test]
async fn connection_failure_is_a_transport_error() -> anyhow::Result<()> {
    let config = ClientConfig::from_raw("http://127.0.0.1:9/", "http://127.0.0.1:9/")?
        .with_timeout(Duration::from_secs(2));
    let client = Client::new(&config, common::token())?;

    let err = client.accounts().await.unwrap_err();

    assert_eq!(err.kind(), Kind::Transport);
    Ok(())
}
