//! Response types that preserve raw bytes and their originating parameters.
//!
//! A [`Response`] always carries the exact [`RequestParameters`] that
//! produced it, even after passing through multiple post-request steps, so
//! any logged response is self-diagnosing. Convenience views (string, JSON,
//! typed decode) are computed on demand rather than eagerly.

use crate::{Error, RequestParameters, Result};
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::borrow::Cow;

/// The outcome of one successful transport attempt.
///
/// Created once per network call; replaced wholesale when a post-request
/// hook orders a retry.
///
/// # Examples
///
/// ```no_run
/// use chaincall::{Pipeline, RequestParameters, Session};
/// use http::Method;
///
/// # async fn example() -> Result<(), chaincall::Error> {
/// let session = Session::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
/// let pipeline = Pipeline::new();
///
/// let params = RequestParameters::new(session, Method::GET, "/users/1");
/// let response = pipeline.execute(params).await?;
///
/// println!("status: {}", response.status);
/// println!("body: {}", response.text());
/// let id = response.json()?["id"].clone();
/// // The parameters that produced this response travel with it.
/// println!("requested path: {}", response.params.path);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    /// The HTTP status code.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The raw response body, possibly empty.
    pub body: Bytes,

    /// The exact parameters that produced this response.
    ///
    /// After a post-request hook retries, these are the retried parameters,
    /// not the pipeline's original input.
    pub params: RequestParameters,
}

impl Response {
    /// Creates a new `Response`.
    pub fn new(
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
        params: RequestParameters,
    ) -> Self {
        Self {
            status,
            headers,
            body,
            params,
        }
    }

    /// The body as text, replacing invalid UTF-8 lossily.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// The body as a generic JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decoding`] if the body is not valid JSON.
    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Decoding {
            response: Box::new(self.clone()),
            source: Box::new(e),
        })
    }

    /// Decodes the body into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decoding`] carrying this response and the cause if
    /// the body does not match the expected shape.
    pub fn json_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| Error::Decoding {
            response: Box::new(self.clone()),
            source: Box::new(e),
        })
    }

    /// Returns a response header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Returns `true` for 2xx status codes.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// A decoded response: the typed payload together with the raw [`Response`]
/// it was decoded from.
///
/// Produced by the typed pipeline entry points. Dereferences to the data
/// for convenience.
#[derive(Debug, Clone)]
pub struct Decoded<T> {
    /// The decoded payload.
    pub data: T,

    /// The response the payload was decoded from.
    pub response: Response,
}

impl<T> Decoded<T> {
    /// Maps the decoded data to a different type, preserving the response.
    pub fn map<U, F>(self, f: F) -> Decoded<U>
    where
        F: FnOnce(T) -> U,
    {
        Decoded {
            data: f(self.data),
            response: self.response,
        }
    }
}

impl<T> AsRef<T> for Decoded<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Decoded<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
