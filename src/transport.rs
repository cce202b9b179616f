//! Authenticated, throttled HTTP transport.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client as ReqwestClient, Method, Request, Response, StatusCode};
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use url::Url;

use crate::Result;
use crate::auth::TokenSource;
use crate::config::ClientConfig;
use crate::error::{Error, Kind, TooManyRedirects};

/// Soft global throttle: consecutive calls start at least `spacing` apart.
///
/// The lock is held while waiting, so concurrent callers queue up behind each other.
#[derive(Debug)]
pub struct RateLimiter {
    spacing: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(spacing: Duration) -> Self {
        Self {
            spacing,
            last_call: Mutex::new(None),
        }
    }

    /// Waits until the spacing since the previous call has elapsed, then records this call.
    pub async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let ready_at = previous + self.spacing;
            if ready_at > Instant::now() {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    wait_ms = (ready_at - Instant::now()).as_millis(),
                    "throttling call"
                );
                sleep_until(ready_at).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

/// Sends requests with a bearer token, one throttle slot per call, following redirects
/// only to relative or `https` locations.
#[derive(Clone)]
pub struct Transport {
    client: ReqwestClient,
    source: Arc<dyn TokenSource>,
    limiter: Arc<RateLimiter>,
    max_redirects: usize,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("limiter", &self.limiter)
            .field("max_redirects", &self.max_redirects)
            .finish_non_exhaustive()
    }
}

impl Transport {
    pub fn new(config: &ClientConfig, source: Arc<dyn TokenSource>) -> Result<Self> {
        // Redirects are followed by hand so the raw `Location` can be inspected.
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            client,
            source,
            limiter: Arc::new(RateLimiter::new(config.min_call_spacing)),
            max_redirects: config.max_redirects,
        })
    }

    pub(crate) fn http(&self) -> &ReqwestClient {
        &self.client
    }

    pub async fn execute(&self, mut request: Request) -> Result<Response> {
        self.limiter.acquire().await;

        let token = self.source.token().await?;
        if token.is_expired() {
            return Err(Error::validation(format!(
                "token source returned a token that expired at {}",
                token.expiry()
            )));
        }
        let authorization = token.authorization()?;
        let origin = request.url().origin();

        #[cfg(feature = "tracing")]
        tracing::debug!(method = %request.method(), url = %request.url(), "dispatching request");

        let mut hops = 0;
        loop {
            if request.url().origin() == origin {
                request
                    .headers_mut()
                    .insert(AUTHORIZATION, authorization.clone());
            } else {
                request.headers_mut().remove(AUTHORIZATION);
            }

            let replay = request.try_clone();
            let current = request.url().clone();
            let response = self.client.execute(request).await?;

            if !response.status().is_redirection() {
                return Ok(response);
            }
            let Some(location) = response.headers().get(LOCATION) else {
                return Ok(response);
            };

            hops += 1;
            if hops > self.max_redirects {
                return Err(Error::with_source(
                    Kind::Transport,
                    TooManyRedirects {
                        limit: self.max_redirects,
                    },
                ));
            }

            let location = location
                .to_str()
                .map_err(|e| Error::with_source(Kind::Transport, e))?;
            let target = redirect_target(&current, location)?;

            #[cfg(feature = "tracing")]
            tracing::debug!(status = %response.status(), to = %target, "following redirect");

            request = follow(replay, response.status(), target)?;
        }
    }
}

/// Resolves a `Location` header. Relative locations inherit the current URL; absolute
/// ones must be `https`.
pub(crate) fn redirect_target(current: &Url, location: &str) -> Result<Url> {
    match Url::parse(location) {
        Ok(url) if url.scheme() == "https" => Ok(url),
        Ok(_) => Err(Error::insecure_redirect(location)),
        Err(url::ParseError::RelativeUrlWithoutBase) => current
            .join(location)
            .map_err(|_e| Error::insecure_redirect(location)),
        Err(_) => Err(Error::insecure_redirect(location)),
    }
}

fn follow(replay: Option<Request>, status: StatusCode, target: Url) -> Result<Request> {
    match status {
        StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT => {
            let mut request = replay.ok_or_else(|| {
                Error::validation("request body cannot be replayed across a redirect")
            })?;
            *request.url_mut() = target;
            Ok(request)
        }
        _ => Ok(Request::new(Method::GET, target)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InsecureRedirect;

    #[test]
    fn relative_location_inherits_current_url() {
        let current = Url::parse("http://127.0.0.1:8080/orders/").expect("url");

        let target = redirect_target(&current, "/orders/abc/").expect("relative");
        assert_eq!(target.as_str(), "http://127.0.0.1:8080/orders/abc/", "joined");

        let target = redirect_target(&current, "next/").expect("path relative");
        assert_eq!(target.as_str(), "http://127.0.0.1:8080/orders/next/", "joined");
    }

    #[test]
    fn secure_absolute_location_is_followed() {
        let current = Url::parse("https://api.robinhood.com/orders/").expect("url");
        let target = redirect_target(&current, "HTTPS://nummus.robinhood.com/orders/")
            .expect("https");
        assert_eq!(target.host_str(), Some("nummus.robinhood.com"), "host");
    }

    #[test]
    fn insecure_absolute_location_is_refused() {
        let current = Url::parse("https://api.robinhood.com/orders/").expect("url");

        for location in ["http://api.robinhood.com/orders/", "ftp://example.com/x"] {
            let err = redirect_target(&current, location).expect_err(location);
            assert_eq!(err.kind(), Kind::Transport, "kind");
            let source = err.downcast_ref::<InsecureRedirect>().expect("source");
            assert_eq!(source.location, location, "location kept");
        }
    }

    #[test]
    fn see_other_switches_to_get() {
        let target = Url::parse("https://api.robinhood.com/orders/abc/").expect("url");
        let request = follow(None, StatusCode::SEE_OTHER, target.clone()).expect("get");

        assert_eq!(request.method(), Method::GET, "method");
        assert_eq!(request.url(), &target, "url");
    }

    #[test]
    fn temporary_redirect_needs_a_replayable_request() {
        let target = Url::parse("https://api.robinhood.com/orders/").expect("url");
        let err = follow(None, StatusCode::TEMPORARY_REDIRECT, target).expect_err("no replay");
        assert_eq!(err.kind(), Kind::Validation, "kind");
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_calls_are_spaced() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        let start = Instant::now();

        let mut dispatched = Vec::new();
        for _ in 0..5 {
            limiter.acquire().await;
            dispatched.push(Instant::now());
        }

        assert!(
            dispatched[4] - start >= Duration::from_millis(400),
            "span {:?}",
            dispatched[4] - start
        );
        for pair in dispatched.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(100), "spacing");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_throttle() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(100)));
        let start = Instant::now();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.expect("task"));
        }
        times.sort();

        assert!(
            times[3] - start >= Duration::from_millis(300),
            "span {:?}",
            times[3] - start
        );
    }

    #[tokio::test(start_paused = true)]
    async fn idle_limiter_does_not_wait() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        limiter.acquire().await;
        tokio::time::advance(Duration::from_millis(250)).await;

        let before = Instant::now();
        limiter.acquire().await;
        assert_eq!(Instant::now(), before, "no wait after idle period");
    }
}
