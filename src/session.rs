//! Transport sessions: the opaque handle identifying which underlying HTTP
//! client and configuration a request uses.
//!
//! A [`Session`] wraps a `reqwest::Client` together with an optional base
//! URL, default headers, and a default timeout. Sessions are cheap to clone
//! and are carried inside every [`RequestParameters`](crate::RequestParameters)
//! value, so different requests through the same pipeline can target
//! different clients.

use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// An opaque transport-session handle.
///
/// The session owns the connection pool; reuse one session across requests
/// that share a backend. Use [`SessionBuilder`] to configure one.
///
/// # Examples
///
/// ```no_run
/// use chaincall::Session;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), chaincall::Error> {
/// let session = Session::builder()
///     .base_url("https://api.example.com")?
///     .default_header("User-Agent", "my-app/1.0")?
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    client: reqwest::Client,
    base_url: Option<Url>,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
}

impl Session {
    /// Creates a session with a default client and no base URL.
    ///
    /// Requests through such a session must use absolute paths.
    ///
    /// # Panics
    ///
    /// Panics if the TLS backend cannot be initialized (the same condition
    /// under which `reqwest::Client::new` panics).
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                client: reqwest::Client::new(),
                base_url: None,
                default_headers: HeaderMap::new(),
                timeout: None,
            }),
        }
    }

    /// Creates a new `SessionBuilder` for configuring a session.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// The base URL relative paths resolve against, if configured.
    pub fn base_url(&self) -> Option<&Url> {
        self.inner.base_url.as_ref()
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.inner.client
    }

    pub(crate) fn default_headers(&self) -> &HeaderMap {
        &self.inner.default_headers
    }

    pub(crate) fn timeout(&self) -> Option<Duration> {
        self.inner.timeout
    }

    /// Resolves a request path into a full URL.
    ///
    /// Absolute paths are used as-is; relative paths are joined onto the
    /// session's base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] carrying the offending path when it is
    /// neither absolute nor resolvable against a base URL.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        if let Ok(url) = Url::parse(path) {
            if !url.cannot_be_a_base() {
                return Ok(url);
            }
        }

        match &self.inner.base_url {
            Some(base) => base.join(path).map_err(|source| Error::InvalidUrl {
                path: path.to_string(),
                source,
            }),
            None => Err(Error::InvalidUrl {
                path: path.to_string(),
                source: url::ParseError::RelativeUrlWithoutBase,
            }),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for configuring and creating a [`Session`].
pub struct SessionBuilder {
    base_url: Option<Url>,
    default_headers: HeaderMap,
    timeout: Option<Duration>,
}

impl SessionBuilder {
    /// Creates a new `SessionBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HeaderMap::new(),
            timeout: None,
        }
    }

    /// Sets the base URL relative request paths resolve against.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let url = Url::parse(url.as_ref()).map_err(|source| Error::InvalidUrl {
            path: url.as_ref().to_string(),
            source,
        })?;
        self.base_url = Some(url);
        Ok(self)
    }

    /// Adds a default header included in every request through this session.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the default request timeout.
    ///
    /// Timeouts are enforced by the underlying transport, not the pipeline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the configured `Session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn build(self) -> Result<Session> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            Error::Configuration(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Session {
            inner: Arc::new(SessionInner {
                client,
                base_url: self.base_url,
                default_headers: self.default_headers,
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
