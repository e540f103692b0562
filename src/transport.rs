//! The transport invoker: exactly one network call per invocation.
//!
//! [`Transport`] is the collaborator contract the pipeline dispatches
//! through. The production implementation is [`HttpTransport`], backed by
//! the `reqwest` client inside each request's [`Session`](crate::Session);
//! tests inject scripted implementations.
//!
//! A transport hands back a [`TransportReply`] whose response and error
//! parts are independently optional, mirroring platform completion
//! callbacks. Interpreting a reply classifies raw failures into the closed
//! error taxonomy and enforces totality on the response side.

use crate::{
    error::BoxError,
    params::{Body, RequestParameters},
    Error, Response, Result,
};
use async_trait::async_trait;
use bytes::Bytes;
use http::{header::CONTENT_TYPE, HeaderMap, StatusCode};
use url::Url;

/// The status line and headers of a transport reply.
#[derive(Debug)]
pub struct ReplyHead {
    /// The HTTP status code.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,
}

/// The raw outcome of one transport attempt, before classification.
///
/// `head`, `body`, and `error` are independently optional: a well-behaved
/// transport supplies either `head` + `body` or `error`, but the pipeline
/// does not assume good behavior — the missing combinations map onto
/// [`Error::EmptyResponse`] and [`Error::Unknown`].
#[derive(Debug, Default)]
pub struct TransportReply {
    /// The response object, when the server answered.
    pub head: Option<ReplyHead>,

    /// The payload bytes, when any were read. Zero-length is a valid
    /// payload; `None` means the transport never supplied one.
    pub body: Option<Bytes>,

    /// The raw failure, when the attempt failed.
    pub error: Option<BoxError>,
}

impl TransportReply {
    /// A reply for a completed attempt.
    pub fn success(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            head: Some(ReplyHead { status, headers }),
            body: Some(body),
            error: None,
        }
    }

    /// A reply for a failed attempt.
    pub fn failure(error: impl Into<BoxError>) -> Self {
        Self {
            head: None,
            body: None,
            error: Some(error.into()),
        }
    }

    /// Interprets this reply into the pipeline's result type.
    ///
    /// Raw failures are classified; replies violating the transport
    /// contract become [`Error::EmptyResponse`] (no response object) or
    /// [`Error::Unknown`] (response object without a payload).
    pub(crate) fn into_response(self, params: &RequestParameters) -> Result<Response> {
        if let Some(raw) = self.error {
            return Err(classify_failure(raw));
        }

        match (self.head, self.body) {
            (Some(head), Some(body)) => Ok(Response::new(
                head.status,
                head.headers,
                body,
                params.clone(),
            )),
            (None, _) => Err(Error::EmptyResponse {
                params: Box::new(params.clone()),
            }),
            (Some(_), None) => Err(Error::Unknown {
                params: Box::new(params.clone()),
            }),
        }
    }
}

/// Maps a raw transport failure into the closed error taxonomy.
///
/// Connection-level reqwest failures become [`Error::NoInternet`], a
/// cancelled in-flight request becomes [`Error::Cancelled`], and everything
/// else becomes [`Error::Transport`].
pub(crate) fn classify_failure(raw: BoxError) -> Error {
    if let Some(e) = raw.downcast_ref::<reqwest::Error>() {
        if e.is_connect() {
            return Error::NoInternet(raw);
        }
        if is_cancelled(e) {
            return Error::Cancelled;
        }
    }
    Error::Transport(raw)
}

/// An aborted in-flight request surfaces as a canceled hyper error in the
/// reqwest error's source chain.
fn is_cancelled(err: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if let Some(h) = cause.downcast_ref::<hyper::Error>() {
            if h.is_canceled() {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

/// Performs exactly one network call for the given parameters.
///
/// Implementations receive the already-resolved URL; URL construction (and
/// its failure mode) belongs to the pipeline, which never calls a transport
/// with an invalid target.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Dispatches one attempt and reports its raw outcome.
    async fn send(&self, params: &RequestParameters, url: Url) -> TransportReply;
}

/// The reqwest-backed production transport.
///
/// Dispatches through the `reqwest::Client` of each request's session,
/// layering the session's default headers under the request's own and
/// applying the session's timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpTransport;

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, params: &RequestParameters, url: Url) -> TransportReply {
        let session = &params.session;

        tracing::debug!(
            method = %params.method,
            url = %url,
            "executing HTTP request"
        );

        let mut request = session.client().request(params.method.clone(), url);

        for (name, value) in session.default_headers() {
            request = request.header(name, value);
        }

        for (name, value) in &params.headers {
            request = request.header(name, value);
        }

        if let Some(timeout) = session.timeout() {
            request = request.timeout(timeout);
        }

        request = match &params.body {
            Body::Empty => request,
            Body::Fields(fields) => request.json(fields),
            Body::Json(value) => request.json(value),
            Body::Raw { bytes, content_type } => request
                .header(CONTENT_TYPE, content_type.as_str())
                .body(bytes.clone()),
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return TransportReply::failure(e),
        };

        let status = response.status();
        let headers = response.headers().clone();

        match response.bytes().await {
            Ok(body) => TransportReply::success(status, headers, body),
            Err(e) => TransportReply::failure(e),
        }
    }
}
