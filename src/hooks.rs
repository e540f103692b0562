//! Pre- and post-request hooks: the pipeline's only extension points.
//!
//! A [`PreRequestHook`] transforms request parameters before dispatch. A
//! [`PostRequestHook`] inspects the response and decides whether the chain
//! continues, retries with new parameters, or terminates early. Both are
//! one-method traits with blanket implementations for closures, so ad-hoc
//! hooks need no named type.
//!
//! Hooks are shared between concurrent pipeline executions. The pipeline
//! guarantees ordering within a single request's chain only; a hook holding
//! mutable state must provide its own synchronization.

use crate::{RequestParameters, Response, Result};
use http::{HeaderName, HeaderValue, StatusCode};
use std::sync::Arc;
use url::Url;

/// A step that transforms request parameters before dispatch.
///
/// Steps run in configuration order, each consuming the previous step's
/// output. Returning an error aborts the whole pipeline before any
/// transport call is made.
///
/// # Examples
///
/// ```
/// use chaincall::{PreRequestHook, RequestParameters};
///
/// struct Authorize {
///     token: String,
/// }
///
/// impl PreRequestHook for Authorize {
///     fn prepare(&self, params: RequestParameters) -> chaincall::Result<RequestParameters> {
///         params.with_header("authorization", &format!("Bearer {}", self.token))
///     }
/// }
/// ```
pub trait PreRequestHook: Send + Sync {
    /// Consumes the current parameters and produces the next ones.
    fn prepare(&self, params: RequestParameters) -> Result<RequestParameters>;
}

impl<F> PreRequestHook for F
where
    F: Fn(RequestParameters) -> Result<RequestParameters> + Send + Sync,
{
    fn prepare(&self, params: RequestParameters) -> Result<RequestParameters> {
        self(params)
    }
}

/// What a post-request hook decided about the current response.
#[derive(Debug)]
pub enum Action {
    /// Pass the current response to the next step unchanged.
    Continue,

    /// Invoke the transport again with these parameters, bypassing the
    /// pre-request chain, and replace the current response with the result.
    MakeNewRequest(RequestParameters),

    /// Terminate the chain immediately with the current response; remaining
    /// steps are skipped.
    CompletedNow,
}

/// A step that inspects a response and steers the rest of the chain.
///
/// `original` is the parameter set that produced the first transport
/// attempt (the pre-request chain's output); the response itself embeds the
/// parameters of the attempt that produced it, which differ after a retry.
///
/// # Examples
///
/// ```
/// use chaincall::{Action, PostRequestHook, RequestParameters, Response};
///
/// struct FailOnServerError;
///
/// impl PostRequestHook for FailOnServerError {
///     fn inspect(&self, response: &Response, _original: &RequestParameters) -> chaincall::Result<Action> {
///         if response.status.is_server_error() {
///             Err(chaincall::Error::hook(format!("server error {}", response.status)))
///         } else {
///             Ok(Action::Continue)
///         }
///     }
/// }
/// ```
pub trait PostRequestHook: Send + Sync {
    /// Inspects the current response and returns the chain's next action.
    fn inspect(&self, response: &Response, original: &RequestParameters) -> Result<Action>;
}

impl<F> PostRequestHook for F
where
    F: Fn(&Response, &RequestParameters) -> Result<Action> + Send + Sync,
{
    fn inspect(&self, response: &Response, original: &RequestParameters) -> Result<Action> {
        self(response, original)
    }
}

/// Prepends a base URL to relative request paths.
///
/// Absolute paths pass through untouched.
#[derive(Debug, Clone)]
pub struct BaseUrl {
    base: String,
}

impl BaseUrl {
    /// Creates a hook that prepends `base` to relative paths.
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

impl PreRequestHook for BaseUrl {
    fn prepare(&self, params: RequestParameters) -> Result<RequestParameters> {
        let absolute = Url::parse(&params.path)
            .map(|u| !u.cannot_be_a_base())
            .unwrap_or(false);
        if absolute {
            return Ok(params);
        }

        let path = format!(
            "{}/{}",
            self.base.trim_end_matches('/'),
            params.path.trim_start_matches('/')
        );
        Ok(params.with_path(path))
    }
}

/// Adds a fixed header to every request.
#[derive(Debug, Clone)]
pub struct StaticHeader {
    name: HeaderName,
    value: HeaderValue,
}

impl StaticHeader {
    /// Creates a hook inserting the given header, validating it once.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn new(name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref()).map_err(|e| {
            crate::Error::Configuration(format!("Invalid header name: {}", e))
        })?;
        let value = HeaderValue::try_from(value.as_ref()).map_err(|e| {
            crate::Error::Configuration(format!("Invalid header value: {}", e))
        })?;
        Ok(Self { name, value })
    }
}

impl PreRequestHook for StaticHeader {
    fn prepare(&self, params: RequestParameters) -> Result<RequestParameters> {
        Ok(params.with_header_value(self.name.clone(), self.value.clone()))
    }
}

/// Retries the request once when the response has a specific status.
///
/// On a matching status the hook re-issues the response's own parameters,
/// optionally adjusted by a prepare function (for example to attach a
/// refreshed credential). Because the chain advances past this step after
/// the new request, a single instance retries at most once per execution.
///
/// # Examples
///
/// ```no_run
/// use chaincall::{hooks::RetryOnStatus, Pipeline};
/// use http::StatusCode;
///
/// let pipeline = Pipeline::builder()
///     .post_hook(RetryOnStatus::with_prepare(StatusCode::UNAUTHORIZED, |params| {
///         params
///             .with_header("authorization", "Bearer fresh-token")
///             .expect("static header is valid")
///     }))
///     .build();
/// ```
pub struct RetryOnStatus {
    status: StatusCode,
    prepare: Option<Arc<dyn Fn(RequestParameters) -> RequestParameters + Send + Sync>>,
}

impl RetryOnStatus {
    /// Retries the same request when the status matches.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            prepare: None,
        }
    }

    /// Retries with parameters adjusted by `prepare` when the status matches.
    pub fn with_prepare<F>(status: StatusCode, prepare: F) -> Self
    where
        F: Fn(RequestParameters) -> RequestParameters + Send + Sync + 'static,
    {
        Self {
            status,
            prepare: Some(Arc::new(prepare)),
        }
    }
}

impl PostRequestHook for RetryOnStatus {
    fn inspect(&self, response: &Response, _original: &RequestParameters) -> Result<Action> {
        if response.status != self.status {
            return Ok(Action::Continue);
        }

        let params = response.params.clone();
        let params = match &self.prepare {
            Some(prepare) => prepare(params),
            None => params,
        };
        Ok(Action::MakeNewRequest(params))
    }
}
