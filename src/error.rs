//! Error types for pipeline executions.
//!
//! Every failure a pipeline can produce is a variant of [`Error`], a closed
//! taxonomy. Variants preserve maximum debugging information: the offending
//! path, the full request parameters, and the response where applicable, so
//! a logged error is self-diagnosing.

use crate::{params::RequestParameters, response::Response};
use http::StatusCode;

/// A boxed error type used for raw transport and hook causes.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type for pipeline executions.
///
/// Exactly one of a [`Response`](crate::Response) or an `Error` is produced
/// per pipeline invocation, never both and never neither.
///
/// # Examples
///
/// ```no_run
/// use chaincall::{Error, Pipeline, RequestParameters, Session};
/// use http::Method;
///
/// # async fn example() -> Result<(), Error> {
/// let session = Session::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
/// let pipeline = Pipeline::new();
///
/// let params = RequestParameters::new(session, Method::GET, "/users/1");
/// match pipeline.execute(params).await {
///     Ok(response) => println!("status: {}", response.status),
///     Err(Error::NoInternet(cause)) => eprintln!("offline: {cause}"),
///     Err(Error::Decoding { response, source }) => {
///         eprintln!("bad payload (status {}): {source}", response.status);
///         eprintln!("  raw body: {}", response.text());
///     }
///     Err(e) => eprintln!("request failed: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The transport failed because connectivity is absent.
    ///
    /// Connection-level failures (refused, unreachable, DNS) classify here
    /// rather than as [`Error::Transport`].
    #[error("no internet connection: {0}")]
    NoInternet(#[source] BoxError),

    /// Any other transport-layer failure, wrapping the underlying cause.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// The path could not form a valid request target.
    ///
    /// Raised before any network call is attempted. Carries the offending
    /// path.
    #[error("invalid URL {path:?}: {source}")]
    InvalidUrl {
        /// The path that failed to resolve.
        path: String,
        /// The underlying parse failure.
        #[source]
        source: url::ParseError,
    },

    /// The transport reported success but returned no response object.
    ///
    /// Carries the parameters that were attempted.
    #[error("transport returned no response for {} {}", params.method, params.path)]
    EmptyResponse {
        /// The parameters of the attempt.
        params: Box<RequestParameters>,
    },

    /// The in-flight request was cancelled by the caller.
    #[error("request was cancelled")]
    Cancelled,

    /// The transport returned a response object with no payload, violating
    /// its contract.
    ///
    /// This variant exists for totality and should not occur with a
    /// well-behaved transport; its occurrence is logged at `error` level.
    #[error("transport returned neither a usable response nor an error for {} {}", params.method, params.path)]
    Unknown {
        /// The parameters of the attempt.
        params: Box<RequestParameters>,
    },

    /// Structured decode of the response body failed.
    ///
    /// The request worked at the HTTP level but the payload shape was
    /// unexpected. Carries the full [`Response`] (which embeds its
    /// originating parameters) and the decode cause.
    #[error("failed to decode response body (status {}): {source}", response.status)]
    Decoding {
        /// The response whose body failed to decode.
        response: Box<Response>,
        /// The underlying decode failure.
        #[source]
        source: BoxError,
    },

    /// An error deliberately raised from a pre- or post-request hook,
    /// propagated verbatim.
    #[error("hook error: {0}")]
    Hook(#[source] BoxError),

    /// Invalid configuration was provided, such as a malformed header name
    /// or an unserializable request body.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Wraps an arbitrary cause as a hook error.
    ///
    /// Hooks returning an already-classified [`Error`] propagate it as-is;
    /// this is the constructor for everything else.
    ///
    /// # Examples
    ///
    /// ```
    /// use chaincall::Error;
    ///
    /// let err = Error::hook("token store is empty");
    /// assert!(matches!(err, Error::Hook(_)));
    /// ```
    pub fn hook(source: impl Into<BoxError>) -> Self {
        Error::Hook(source.into())
    }

    /// Returns the HTTP status code if this error carries a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Decoding { response, .. } => Some(response.status),
            _ => None,
        }
    }

    /// Returns the response if this error carries one.
    pub fn response(&self) -> Option<&Response> {
        match self {
            Error::Decoding { response, .. } => Some(&**response),
            _ => None,
        }
    }

    /// Returns the request parameters this error carries, if any.
    ///
    /// Present for [`Error::EmptyResponse`], [`Error::Unknown`], and
    /// [`Error::Decoding`] (through the embedded response).
    pub fn params(&self) -> Option<&RequestParameters> {
        match self {
            Error::EmptyResponse { params } | Error::Unknown { params } => Some(&**params),
            Error::Decoding { response, .. } => Some(&response.params),
            _ => None,
        }
    }
}

/// A specialized `Result` type for pipeline executions.
pub type Result<T> = std::result::Result<T, Error>;
