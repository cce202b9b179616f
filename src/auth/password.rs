use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use reqwest::Client as ReqwestClient;
use reqwest::redirect::Policy;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Result;
use crate::auth::{Credentials, Token, TokenSource};
use crate::config::ClientConfig;
use crate::error::Error;
use crate::response;

/// Lifetime requested for new tokens.
const REQUESTED_EXPIRES_IN: i64 = 24 * 60 * 60;

#[derive(Serialize)]
struct LoginRequest<'a> {
    device_token: &'a str,
    client_id: &'a str,
    expires_in: i64,
    grant_type: &'static str,
    scope: &'static str,
    username: &'a str,
    password: &'a str,
    mfa_code: &'a str,
}

#[derive(Deserialize)]
struct MfaChallenge {
    #[serde(default)]
    mfa_required: bool,
    #[serde(default)]
    mfa_type: Option<String>,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    expires_in: i64,
}

/// Password grant against the login endpoint.
///
/// Every call performs one unauthenticated POST and has no other side effect, so it is
/// safe to call again after a transient failure. Wrap it in a
/// [`CachedTokenSource`](crate::auth::CachedTokenSource) to avoid logging in per request.
#[derive(Clone, Debug)]
pub struct PasswordAuth {
    credentials: Credentials,
    login_url: Url,
    client: ReqwestClient,
}

impl PasswordAuth {
    pub fn new(credentials: Credentials, config: &ClientConfig) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .redirect(Policy::none())
            .build()?;

        Self::with_client(credentials, config, client)
    }

    pub fn with_client(
        credentials: Credentials,
        config: &ClientConfig,
        client: ReqwestClient,
    ) -> Result<Self> {
        Ok(Self {
            credentials,
            login_url: config.api_host.join("oauth2/token/")?,
            client,
        })
    }

    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

#[async_trait]
impl TokenSource for PasswordAuth {
    async fn token(&self) -> Result<Token> {
        let creds = &self.credentials;
        let body = LoginRequest {
            device_token: creds.device_id(),
            client_id: creds.client_id(),
            expires_in: REQUESTED_EXPIRES_IN,
            grant_type: "password",
            scope: "internal",
            username: creds.username(),
            password: creds.password(),
            mfa_code: creds.mfa_code().unwrap_or_default(),
        };

        #[cfg(feature = "tracing")]
        tracing::info!(username = %creds.username(), mfa = creds.mfa_code().is_some(), "logging in");

        let response = self
            .client
            .post(self.login_url.clone())
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        // The challenge can arrive with a success or an error status.
        if let Ok(challenge) = serde_json::from_str::<MfaChallenge>(&text) {
            if challenge.mfa_required {
                #[cfg(feature = "tracing")]
                tracing::warn!(mfa_type = ?challenge.mfa_type, "login requires an MFA code");
                return Err(Error::mfa_required(challenge.mfa_type));
            }
        }

        let login: LoginResponse = response::decode_body(status, &text)?;
        let expiry = TimeDelta::try_seconds(login.expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                Error::validation(format!(
                    "token lifetime of {}s is out of range",
                    login.expires_in
                ))
            })?;
        let mut token = Token::new(login.access_token, expiry);
        if let Some(refresh) = login.refresh_token {
            token = token.with_refresh_token(refresh);
        }
        if let Some(token_type) = login.token_type {
            token = token.with_token_type(token_type);
        }

        Ok(token)
    }
}
