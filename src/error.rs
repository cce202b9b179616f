use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;

use reqwest::StatusCode;

use crate::order::RejectedOrder;
use crate::response::ErrorMap;

/// Broad category of an [`Error`]. Callers branch on this rather than on message text.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kind {
    /// Network failure, refused redirect, or any other failed HTTP exchange.
    Transport,
    /// The remote answered `>= 400` with a decodable field/message body.
    Api,
    /// The body matched neither the expected success shape nor the error shape.
    Malformed,
    /// Login needs a multi-factor code. Recoverable: supply one and retry.
    MfaRequired,
    /// The remote accepted the request but reported a non-empty reject reason.
    Rejected,
    /// A page walk was cancelled between page fetches.
    Cancelled,
    /// Local input was refused before anything was sent.
    Validation,
    Internal,
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    backtrace: Backtrace,
}

impl Error {
    pub fn with_source<S: StdError + Send + Sync + 'static>(kind: Kind, source: S) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
            backtrace: Backtrace::capture(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Returns the typed source of this error, e.g. [`ApiError`] for [`Kind::Api`].
    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        let e = self.source.as_deref()?;
        e.downcast_ref::<E>()
    }

    pub fn validation<S: Into<String>>(reason: S) -> Self {
        Validation {
            reason: reason.into(),
        }
        .into()
    }

    pub fn api(status: StatusCode, fields: ErrorMap) -> Self {
        ApiError { status, fields }.into()
    }

    pub fn malformed<B: Into<String>>(
        status: StatusCode,
        body: B,
        source: serde_path_to_error::Error<serde_json::Error>,
    ) -> Self {
        Malformed {
            status,
            body: body.into(),
            source,
        }
        .into()
    }

    pub fn mfa_required(mfa_type: Option<String>) -> Self {
        MfaRequired { mfa_type }.into()
    }

    pub fn rejected<R: Into<String>>(reason: R, order_id: Option<String>) -> Self {
        Rejected {
            reason: reason.into(),
            order_id,
            order: None,
        }
        .into()
    }

    #[must_use]
    pub fn cancelled() -> Self {
        Cancelled.into()
    }

    pub fn insecure_redirect<L: Into<String>>(location: L) -> Self {
        Error::with_source(
            Kind::Transport,
            InsecureRedirect {
                location: location.into(),
            },
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(f, "{:?}: {}", self.kind, src),
            None => write!(f, "{:?}", self.kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

/// Structured rejection returned by the API for a `>= 400` response.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: StatusCode,
    pub fields: ErrorMap,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields)
    }
}

impl StdError for ApiError {}

/// A response body that could not be decoded. Raw status and body are kept for diagnosis.
#[non_exhaustive]
#[derive(Debug)]
pub struct Malformed {
    pub status: StatusCode,
    pub body: String,
    pub source: serde_path_to_error::Error<serde_json::Error>,
}

impl fmt::Display for Malformed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "got response {:?} and could not decode body {:?} at `{}`: {}",
            self.status.to_string(),
            self.body,
            self.source.path(),
            self.source.inner()
        )
    }
}

impl StdError for Malformed {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source.inner())
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsecureRedirect {
    pub location: String,
}

impl fmt::Display for InsecureRedirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "refusing redirect to insecure location {:?}", self.location)
    }
}

impl StdError for InsecureRedirect {}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TooManyRedirects {
    pub limit: usize,
}

impl fmt::Display for TooManyRedirects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stopped after {} redirects", self.limit)
    }
}

impl StdError for TooManyRedirects {}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MfaRequired {
    pub mfa_type: Option<String>,
}

impl fmt::Display for MfaRequired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.mfa_type {
            Some(t) => write!(f, "two factor auth code ({t}) required and not supplied"),
            None => write!(f, "two factor auth code required and not supplied"),
        }
    }
}

impl StdError for MfaRequired {}

/// The order exists remotely but the API refused it, or refused to cancel it.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub reason: String,
    pub order_id: Option<String>,
    /// The submitted order as the API recorded it. `None` for a refused cancel.
    pub order: Option<RejectedOrder>,
}

impl fmt::Display for Rejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.order_id {
            Some(id) => write!(f, "order {id} rejected: {}", self.reason),
            None => write!(f, "order rejected: {}", self.reason),
        }
    }
}

impl StdError for Rejected {}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("operation cancelled")
    }
}

impl StdError for Cancelled {}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub reason: String,
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid: {}", self.reason)
    }
}

impl StdError for Validation {}

impl From<ApiError> for Error {
    fn from(e: ApiError) -> Self {
        Error::with_source(Kind::Api, e)
    }
}

impl From<Malformed> for Error {
    fn from(e: Malformed) -> Self {
        Error::with_source(Kind::Malformed, e)
    }
}

impl From<MfaRequired> for Error {
    fn from(e: MfaRequired) -> Self {
        Error::with_source(Kind::MfaRequired, e)
    }
}

impl From<Rejected> for Error {
    fn from(e: Rejected) -> Self {
        Error::with_source(Kind::Rejected, e)
    }
}

impl From<Cancelled> for Error {
    fn from(e: Cancelled) -> Self {
        Error::with_source(Kind::Cancelled, e)
    }
}

impl From<Validation> for Error {
    fn from(e: Validation) -> Self {
        Error::with_source(Kind::Validation, e)
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::with_source(Kind::Transport, e)
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::with_source(Kind::Validation, e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}

impl From<reqwest::header::InvalidHeaderValue> for Error {
    fn from(e: reqwest::header::InvalidHeaderValue) -> Self {
        Error::with_source(Kind::Internal, e)
    }
}
