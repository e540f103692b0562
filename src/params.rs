//! Request parameters: the immutable bundle describing one HTTP call.
//!
//! A [`RequestParameters`] value is never mutated in place. Every modifier
//! consumes the value and returns a new one, and every hook step does the
//! same, which is what makes concurrent pipeline executions safe to share
//! hook instances without locks.

use crate::{Error, Result, Session};
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};

/// The body of a request.
#[derive(Debug, Clone, Default)]
pub enum Body {
    /// No body.
    #[default]
    Empty,

    /// A key-value map, sent as a JSON object.
    Fields(serde_json::Map<String, serde_json::Value>),

    /// Raw bytes with an explicit content type.
    Raw {
        /// The payload.
        bytes: Bytes,
        /// The value for the `Content-Type` header.
        content_type: String,
    },

    /// A pre-encoded structured value, sent as JSON.
    Json(serde_json::Value),
}

impl Body {
    /// Returns `true` if no body will be sent.
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}

/// The immutable description of one HTTP call.
///
/// Constructed by the caller or by a pre-request hook; consumed by the next
/// hook or by the transport. A `Clone` is cheap: the session handle is
/// reference-counted and raw bodies share their bytes.
///
/// # Examples
///
/// ```no_run
/// use chaincall::{RequestParameters, Session};
/// use http::Method;
///
/// # fn example() -> Result<(), chaincall::Error> {
/// let session = Session::new();
/// let params = RequestParameters::new(session, Method::POST, "https://api.example.com/users")
///     .with_header("x-api-key", "secret")?
///     .with_field("name", "Alice");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RequestParameters {
    /// The transport session to dispatch through.
    pub session: Session,

    /// The request path, relative to the session's base URL or absolute.
    pub path: String,

    /// The HTTP method.
    pub method: Method,

    /// The request body.
    pub body: Body,

    /// Headers for this request, layered over the session's defaults.
    pub headers: HeaderMap,
}

impl RequestParameters {
    /// Creates new parameters with the given session, method, and path.
    pub fn new(session: Session, method: Method, path: impl Into<String>) -> Self {
        Self {
            session,
            path: path.into(),
            method,
            body: Body::Empty,
            headers: HeaderMap::new(),
        }
    }

    /// Creates new parameters from a case-insensitive verb string.
    ///
    /// # Errors
    ///
    /// Returns an error if the verb is not a valid HTTP method.
    pub fn from_verb(session: Session, verb: &str, path: impl Into<String>) -> Result<Self> {
        let method = Method::from_bytes(verb.to_ascii_uppercase().as_bytes())
            .map_err(|e| Error::Configuration(format!("Invalid HTTP method {:?}: {}", verb, e)))?;
        Ok(Self::new(session, method, path))
    }

    /// Returns a copy with the given path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Returns a copy with the given method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Returns a copy with the given body, replacing any existing one.
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Returns a copy with the given key added to a key-value body.
    ///
    /// Upgrades an empty body to [`Body::Fields`]; replaces any other body
    /// kind with a fresh map containing just this entry.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        let mut fields = match self.body {
            Body::Fields(fields) => fields,
            _ => serde_json::Map::new(),
        };
        fields.insert(key.into(), value.into());
        self.body = Body::Fields(fields);
        self
    }

    /// Returns a copy with the given header added.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
        Ok(self.with_header_value(name, value))
    }

    /// Returns a copy with a pre-validated header added.
    pub fn with_header_value(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}
