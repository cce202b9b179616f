//! Credential handling and bearer token minting.
//!
//! A [`TokenSource`] is the only thing that mints tokens. The transport asks it for a
//! token before every call and refuses one that has already expired.

mod cache;
mod password;

use std::sync::Arc;

use async_trait::async_trait;
use bon::Builder;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret as _, SecretString};

pub use cache::CachedTokenSource;
pub use password::PasswordAuth;

use crate::Result;

/// Client id used by the web app.
pub const DEFAULT_CLIENT_ID: &str = "c82SH0WZOsabOXGP2sxqcj34FxkvfnWRZBKlBjFS";

/// Login material. Immutable once built; use [`Credentials::with_mfa_code`] to retry a
/// login that came back with [`Kind::MfaRequired`](crate::error::Kind::MfaRequired).
#[derive(Clone, Debug, Builder)]
pub struct Credentials {
    #[builder(into)]
    username: String,
    #[builder(into)]
    password: SecretString,
    #[builder(into)]
    device_id: String,
    #[builder(into)]
    mfa_code: Option<String>,
    #[builder(into, default = DEFAULT_CLIENT_ID.to_owned())]
    client_id: String,
}

impl Credentials {
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn mfa_code(&self) -> Option<&str> {
        self.mfa_code.as_deref()
    }

    pub(crate) fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Returns a copy carrying the given MFA code.
    #[must_use]
    pub fn with_mfa_code<S: Into<String>>(&self, code: S) -> Self {
        Self {
            mfa_code: Some(code.into()),
            ..self.clone()
        }
    }
}

/// Opaque bearer credential with an absolute expiry.
#[derive(Clone, Debug)]
pub struct Token {
    access_token: SecretString,
    refresh_token: Option<SecretString>,
    token_type: String,
    expiry: DateTime<Utc>,
}

impl Token {
    pub fn new<S: Into<SecretString>>(access_token: S, expiry: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: "Bearer".to_owned(),
            expiry,
        }
    }

    #[must_use]
    pub fn with_refresh_token<S: Into<SecretString>>(mut self, refresh_token: S) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    #[must_use]
    pub fn with_token_type<S: Into<String>>(mut self, token_type: S) -> Self {
        self.token_type = token_type.into();
        self
    }

    #[must_use]
    pub fn access_token(&self) -> &SecretString {
        &self.access_token
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<&SecretString> {
        self.refresh_token.as_ref()
    }

    #[must_use]
    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    #[must_use]
    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_within(TimeDelta::zero())
    }

    /// True if the token is expired now or will be within `leeway`.
    #[must_use]
    pub fn expires_within(&self, leeway: TimeDelta) -> bool {
        Utc::now() + leeway >= self.expiry
    }

    pub(crate) fn authorization(&self) -> Result<HeaderValue> {
        let mut value = HeaderValue::from_str(&format!(
            "{} {}",
            self.token_type,
            self.access_token.expose_secret()
        ))?;
        value.set_sensitive(true);
        Ok(value)
    }
}

/// Hands out a currently valid bearer token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<Token>;
}

#[async_trait]
impl<S: TokenSource + ?Sized> TokenSource for Arc<S> {
    async fn token(&self) -> Result<Token> {
        (**self).token().await
    }
}

/// A token obtained elsewhere, e.g. restored from a credential store.
#[derive(Clone, Debug)]
pub struct StaticToken(pub Token);

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<Token> {
        Ok(self.0.clone())
    }
}
