//! Cursor-following over `{results, next}` list endpoints.

use std::error::Error as StdError;
use std::fmt;

use futures::{Stream, StreamExt as _, pin_mut};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::error::Error;
use crate::response::empty_as_none;

/// One page of a list endpoint. `next` is `None` on the last page.
#[non_exhaustive]
#[derive(Clone, Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub next: Option<String>,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(results: Vec<T>, next: Option<String>) -> Self {
        Self { results, next }
    }
}

/// A walk that stopped early. Holds everything gathered before the failure.
pub struct Incomplete<T> {
    pub partial: Vec<T>,
    pub error: Error,
}

impl<T> Incomplete<T> {
    pub fn into_parts(self) -> (Vec<T>, Error) {
        (self.partial, self.error)
    }
}

impl<T> fmt::Debug for Incomplete<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Incomplete")
            .field("partial", &self.partial.len())
            .field("error", &self.error)
            .finish()
    }
}

impl<T> fmt::Display for Incomplete<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "page walk stopped after {} results: {}",
            self.partial.len(),
            self.error
        )
    }
}

impl<T> StdError for Incomplete<T> {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.error)
    }
}

impl<T> From<Incomplete<T>> for Error {
    fn from(e: Incomplete<T>) -> Self {
        e.error
    }
}

/// Drains a stream of pages into one vector.
///
/// Cancellation is checked before each page is pulled, never in the middle of a fetch.
/// A cancelled or failed walk hands back the results gathered so far.
pub async fn collect_pages<T, S>(
    pages: S,
    cancel: &CancellationToken,
) -> std::result::Result<Vec<T>, Incomplete<T>>
where
    S: Stream<Item = Result<Vec<T>>>,
{
    pin_mut!(pages);
    let mut results = Vec::new();

    loop {
        if cancel.is_cancelled() {
            #[cfg(feature = "tracing")]
            tracing::debug!(gathered = results.len(), "page walk cancelled");
            return Err(Incomplete {
                partial: results,
                error: Error::cancelled(),
            });
        }

        match pages.next().await {
            Some(Ok(batch)) => results.extend(batch),
            Some(Err(error)) => {
                return Err(Incomplete {
                    partial: results,
                    error,
                });
            }
            None => return Ok(results),
        }
    }
}
