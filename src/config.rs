use std::time::Duration;

use url::Url;

use crate::Result;
use crate::error::Error;

pub const API_HOST: &str = "https://api.robinhood.com/";
pub const CRYPTO_HOST: &str = "https://nummus.robinhood.com/";
pub const BONFIRE_HOST: &str = "https://bonfire.robinhood.com/";

/// Minimum spacing between two calls issued through one client.
pub const DEFAULT_MIN_CALL_SPACING: Duration = Duration::from_millis(100);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Hosts and transport settings for a [`Client`](crate::Client).
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_host: Url,
    pub crypto_host: Url,
    /// Host of the portfolio chart service.
    pub bonfire_host: Url,
    pub min_call_spacing: Duration,
    pub timeout: Duration,
    pub max_redirects: usize,
}

impl ClientConfig {
    pub fn from_raw(api_host: &str, crypto_host: &str) -> Result<Self> {
        Self::new(Url::parse(api_host)?, Url::parse(crypto_host)?)
    }

    pub fn new(api_host: Url, crypto_host: Url) -> Result<Self> {
        check_base(&api_host)?;
        check_base(&crypto_host)?;

        Ok(Self {
            api_host,
            crypto_host,
            bonfire_host: Url::parse(BONFIRE_HOST)?,
            min_call_spacing: DEFAULT_MIN_CALL_SPACING,
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        })
    }

    pub fn with_bonfire_host(mut self, bonfire_host: Url) -> Result<Self> {
        check_base(&bonfire_host)?;
        self.bonfire_host = bonfire_host;
        Ok(self)
    }

    #[must_use]
    pub const fn with_min_call_spacing(mut self, spacing: Duration) -> Self {
        self.min_call_spacing = spacing;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }
}

fn check_base(host: &Url) -> Result<()> {
    if host.cannot_be_a_base() || !host.path().ends_with('/') {
        return Err(Error::validation(format!(
            "host `{host}` must be a base URL ending in `/`"
        )));
    }
    Ok(())
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_raw(API_HOST, CRYPTO_HOST).unwrap_or_else(|_| unreachable!("static hosts parse"))
    }
}
