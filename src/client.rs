use std::sync::Arc;

use async_stream::try_stream;
use futures::Stream;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::Result;
use crate::auth::TokenSource;
use crate::config::ClientConfig;
use crate::error::Error;
use crate::order::OrderState;
use crate::pagination::{Incomplete, Page, collect_pages};
use crate::response;
use crate::transport::Transport;
use crate::types::{
    Account, CryptoAccount, CryptoCurrencyPair, CryptoHolding, CryptoQuote, DisplaySpan,
    Instrument, PortfolioHistory, Position, Quote,
};

/// Resolved endpoint URLs.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct Endpoints {
    pub accounts: Url,
    pub instruments: Url,
    pub quotes: Url,
    pub positions: Url,
    pub orders: Url,
    pub forex_quotes: Url,
    pub crypto_accounts: Url,
    pub crypto_orders: Url,
    pub currency_pairs: Url,
    pub crypto_holdings: Url,
    pub portfolio_charts: Url,
}

impl Endpoints {
    fn new(config: &ClientConfig) -> Result<Self> {
        let api = &config.api_host;
        let crypto = &config.crypto_host;

        Ok(Self {
            accounts: api.join("accounts/")?,
            instruments: api.join("instruments/")?,
            quotes: api.join("quotes/")?,
            positions: api.join("positions/")?,
            orders: api.join("orders/")?,
            forex_quotes: api.join("marketdata/forex/quotes/")?,
            crypto_accounts: crypto.join("accounts/")?,
            crypto_orders: crypto.join("orders/")?,
            currency_pairs: crypto.join("currency_pairs/")?,
            crypto_holdings: crypto.join("holdings/")?,
            portfolio_charts: config.bonfire_host.join("portfolio/")?,
        })
    }
}

/// Accounts bound to this client. Resolved once by [`Client::dial`].
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub account: Option<Account>,
    pub crypto_account: Option<CryptoAccount>,
}

/// Filters shared by the list endpoints.
#[derive(Clone, Debug, Default, Serialize)]
pub(crate) struct ListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<OrderState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonzero: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbols: Option<String>,
}

#[derive(Serialize)]
struct HistoryQuery {
    display_span: DisplaySpan,
}

impl ListQuery {
    pub(crate) fn apply(&self, mut url: Url) -> Result<Url> {
        let query = serde_html_form::to_string(self)
            .map_err(|e| Error::validation(format!("unable to encode query: {e}")))?;
        if !query.is_empty() {
            url.set_query(Some(&query));
        }
        Ok(url)
    }
}

/// Authenticated client for one session.
///
/// Clones share the same token source and throttle.
#[derive(Clone, Debug)]
pub struct Client {
    transport: Transport,
    endpoints: Arc<Endpoints>,
    session: Session,
}

impl Client {
    /// Builds a client without touching the network. Order creation needs the session
    /// accounts, so most callers want [`Client::dial`].
    pub fn new<S: TokenSource + 'static>(config: &ClientConfig, source: S) -> Result<Self> {
        Ok(Self {
            transport: Transport::new(config, Arc::new(source))?,
            endpoints: Arc::new(Endpoints::new(config)?),
            session: Session::default(),
        })
    }

    /// Builds a client and binds the first brokerage and first crypto account to it.
    pub async fn dial<S: TokenSource + 'static>(config: &ClientConfig, source: S) -> Result<Self> {
        let mut client = Self::new(config, source)?;
        client.resolve_session().await?;
        Ok(client)
    }

    /// Looks up the session accounts and caches them on this client.
    pub async fn resolve_session(&mut self) -> Result<&Session> {
        let account = self.accounts().await?.into_iter().next();
        let crypto_account = self.crypto_accounts().await?.into_iter().next();

        #[cfg(feature = "tracing")]
        tracing::info!(
            account = account.as_ref().map(|a| a.account_number.as_str()),
            crypto_account = crypto_account.as_ref().map(|a| a.id.as_str()),
            "session resolved"
        );

        self.session = Session {
            account,
            crypto_account,
        };
        Ok(&self.session)
    }

    #[must_use]
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn account(&self) -> Option<&Account> {
        self.session.account.as_ref()
    }

    #[must_use]
    pub fn crypto_account(&self) -> Option<&CryptoAccount> {
        self.session.crypto_account.as_ref()
    }

    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// GETs `url` and decodes the body into `T`.
    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let request = self.transport.http().request(Method::GET, url).build()?;
        self.send(request).await
    }

    /// POSTs `body` as JSON and decodes the reply into `T`.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T> {
        let mut request = self.transport.http().request(Method::POST, url).build()?;
        *request.body_mut() = Some(serde_json::to_vec(body)?.into());
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.send(request).await
    }

    /// POSTs with an empty body and decodes the reply into `T`.
    pub async fn post_empty<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let request = self.transport.http().request(Method::POST, url).build()?;
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::Request) -> Result<T> {
        #[cfg(feature = "tracing")]
        let (method, path) = (request.method().clone(), request.url().path().to_owned());

        let response = self.transport.execute(request).await?;
        let result = response::decode(response).await;

        #[cfg(feature = "tracing")]
        if let Err(e) = &result {
            tracing::warn!(%method, %path, kind = ?e.kind(), error = %e, "API request failed");
        }

        result
    }

    /// Lazily fetches the pages of a list endpoint, starting at `start`.
    ///
    /// Nothing is requested until the stream is polled, one page per poll.
    pub fn pages<T>(&self, start: Url) -> impl Stream<Item = Result<Vec<T>>> + '_
    where
        T: DeserializeOwned + 'static,
    {
        try_stream! {
            let mut next = Some(start);
            while let Some(url) = next.take() {
                let page: Page<T> = self.get(url).await?;
                next = page.next.as_deref().map(Url::parse).transpose()?;
                yield page.results;
            }
        }
    }

    pub async fn accounts(&self) -> Result<Vec<Account>> {
        let page: Page<Account> = self.get(self.endpoints.accounts.clone()).await?;
        Ok(page.results)
    }

    pub async fn crypto_accounts(&self) -> Result<Vec<CryptoAccount>> {
        let page: Page<CryptoAccount> = self.get(self.endpoints.crypto_accounts.clone()).await?;
        Ok(page.results)
    }

    pub async fn instrument(&self, url: &str) -> Result<Instrument> {
        self.get(Url::parse(url)?).await
    }

    /// Finds the instrument for a ticker symbol.
    pub async fn instrument_by_symbol(&self, symbol: &str) -> Result<Instrument> {
        let url = ListQuery {
            symbol: Some(symbol.to_owned()),
            ..ListQuery::default()
        }
        .apply(self.endpoints.instruments.clone())?;

        let page: Page<Instrument> = self.get(url).await?;
        page.results
            .into_iter()
            .find(|i| i.symbol.eq_ignore_ascii_case(symbol))
            .ok_or_else(|| Error::validation(format!("no instrument for symbol {symbol}")))
    }

    pub async fn quotes(&self, symbols: &[&str]) -> Result<Vec<Quote>> {
        let url = ListQuery {
            symbols: Some(symbols.join(",")),
            ..ListQuery::default()
        }
        .apply(self.endpoints.quotes.clone())?;

        let page: Page<Quote> = self.get(url).await?;
        Ok(page.results)
    }

    /// Every equity position, optionally only the non-zero ones.
    pub async fn positions(
        &self,
        nonzero: bool,
        cancel: &CancellationToken,
    ) -> std::result::Result<Vec<Position>, Incomplete<Position>> {
        let url = ListQuery {
            nonzero: nonzero.then_some(true),
            ..ListQuery::default()
        }
        .apply(self.endpoints.positions.clone())
        .map_err(|error| Incomplete {
            partial: Vec::new(),
            error,
        })?;

        collect_pages(self.pages(url), cancel).await
    }

    pub async fn crypto_currency_pairs(&self) -> Result<Vec<CryptoCurrencyPair>> {
        let page: Page<CryptoCurrencyPair> =
            self.get(self.endpoints.currency_pairs.clone()).await?;
        Ok(page.results)
    }

    /// Finds the currency pair whose asset code is `code`, e.g. `BTC`.
    pub async fn crypto_currency_pair(&self, code: &str) -> Result<CryptoCurrencyPair> {
        self.crypto_currency_pairs()
            .await?
            .into_iter()
            .find(|p| p.asset_currency.code == code)
            .ok_or_else(|| Error::validation(format!("no currency pair for asset {code}")))
    }

    pub async fn crypto_quote(&self, currency_pair_id: &str) -> Result<CryptoQuote> {
        self.get(
            self.endpoints
                .forex_quotes
                .join(&format!("{currency_pair_id}/"))?,
        )
        .await
    }

    pub async fn crypto_holdings(&self, nonzero: bool) -> Result<Vec<CryptoHolding>> {
        let url = ListQuery {
            nonzero: nonzero.then_some(true),
            ..ListQuery::default()
        }
        .apply(self.endpoints.crypto_holdings.clone())?;

        let page: Page<CryptoHolding> = self.get(url).await?;
        Ok(page.results)
    }

    /// Portfolio value chart of the session account over `span`.
    pub async fn portfolio_history(&self, span: DisplaySpan) -> Result<PortfolioHistory> {
        let account = self
            .account()
            .ok_or_else(|| Error::validation("portfolio history needs a brokerage account"))?;

        let mut url = self
            .endpoints
            .portfolio_charts
            .join(&format!("{}/historical-chart/", account.account_number))?;
        let query = serde_html_form::to_string(&HistoryQuery { display_span: span })
            .map_err(|e| Error::validation(format!("unable to encode query: {e}")))?;
        url.set_query(Some(&query));

        self.get(url).await
    }
}
