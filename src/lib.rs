//! Client for the Robinhood private REST API.
//!
//! Every call goes through the same pipeline: a [`TokenSource`](auth::TokenSource)
//! supplies a bearer token, the [`Transport`](transport::Transport) spaces calls at
//! least 100 ms apart and only follows secure redirects, and the response is decoded
//! into a typed value or an [`Error`] whose [`Kind`](error::Kind) tells transport
//! failures, API rejections and malformed bodies apart.
//!
//! Nothing is retried automatically. Submitting an order twice places two orders.
//!
//! ```no_run
//! use robinhood_client_sdk::auth::{CachedTokenSource, Credentials, PasswordAuth};
//! use robinhood_client_sdk::error::Kind;
//! use robinhood_client_sdk::{Client, ClientConfig};
//! use rust_decimal_macros::dec;
//!
//! # async fn run() -> robinhood_client_sdk::Result<()> {
//! let config = ClientConfig::default();
//! let credentials = Credentials::builder()
//!     .username("alice@example.com")
//!     .password("hunter2")
//!     .device_id("8f1c5e4a-0000-4000-8000-000000000000")
//!     .build();
//!
//! let source = CachedTokenSource::new(PasswordAuth::new(credentials.clone(), &config)?);
//! let client = match Client::dial(&config, source).await {
//!     Err(e) if e.kind() == Kind::MfaRequired => {
//!         let auth = PasswordAuth::new(credentials.with_mfa_code("123456"), &config)?;
//!         Client::dial(&config, CachedTokenSource::new(auth)).await?
//!     }
//!     other => other?,
//! };
//!
//! let aapl = client.instrument_by_symbol("AAPL").await?;
//! let order = client.create_order(&aapl)?.with_limit_price(dec!(187.50)).with_quantity(dec!(1));
//! let placed = client.submit_order(&order).await?;
//! placed.cancel(&client).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod order;
pub mod pagination;
pub mod response;
pub mod transport;
pub mod types;

pub use client::{Client, Session};
pub use config::ClientConfig;
pub use error::Error;

pub type Result<T> = std::result::Result<T, Error>;
