use async_trait::async_trait;
use chrono::TimeDelta;
use tokio::sync::Mutex;

use crate::Result;
use crate::auth::{Token, TokenSource};

/// Reuses the last minted token until it comes within `leeway` of its expiry.
#[derive(Debug)]
pub struct CachedTokenSource<S> {
    inner: S,
    leeway: TimeDelta,
    cached: Mutex<Option<Token>>,
}

impl<S: TokenSource> CachedTokenSource<S> {
    pub const DEFAULT_LEEWAY: TimeDelta = TimeDelta::seconds(60);

    pub fn new(inner: S) -> Self {
        Self::with_leeway(inner, Self::DEFAULT_LEEWAY)
    }

    pub fn with_leeway(inner: S, leeway: TimeDelta) -> Self {
        Self {
            inner,
            leeway,
            cached: Mutex::new(None),
        }
    }

    /// Seeds the cache, e.g. with a token restored from a credential store.
    #[must_use]
    pub fn with_token(self, token: Token) -> Self {
        Self {
            cached: Mutex::new(Some(token)),
            ..self
        }
    }

    /// Drops the cached token so the next call mints a new one.
    pub async fn invalidate(&self) {
        self.cached.lock().await.take();
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: TokenSource> TokenSource for CachedTokenSource<S> {
    async fn token(&self) -> Result<Token> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.expires_within(self.leeway) {
                return Ok(token.clone());
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("minting a new token");

        let fresh = self.inner.token().await?;
        *cached = Some(fresh.clone());
        Ok(fresh)
    }
}
