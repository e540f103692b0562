//! Single-value cancellable streams over pipeline executions.
//!
//! [`ResponseStream`] emits exactly one `Result<Response>` and then ends.
//! Cancelling it (through [`CancelHandle`] or by dropping the stream)
//! aborts the in-flight transport call and suppresses delivery entirely:
//! a cancelled stream yields nothing, not an error.

use crate::{
    codec::Codec,
    pipeline::{decode_response, executor, Pipeline},
    params::RequestParameters,
    response::{Decoded, Response},
    Result,
};
use futures::Stream;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A handle that requests cancellation of an in-flight stream execution.
///
/// Cloneable, so it can be kept after the stream is handed elsewhere.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// Requests cancellation. The in-flight transport call is aborted and
    /// no further chain steps or emissions occur.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A single-value stream of one pipeline execution.
///
/// Emits exactly one success or one error, then completes. Emission
/// happens wherever the caller polls the stream, so the delivery context
/// is the caller's to choose. Dropping the stream cancels the execution.
///
/// # Examples
///
/// ```no_run
/// use chaincall::{Pipeline, RequestParameters, Session};
/// use futures::StreamExt;
/// use http::Method;
///
/// # async fn example() -> Result<(), chaincall::Error> {
/// let session = Session::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
/// let pipeline = Pipeline::new();
///
/// let mut stream =
///     pipeline.execute_stream(RequestParameters::new(session, Method::GET, "/users/1"));
/// let handle = stream.cancel_handle();
///
/// if let Some(result) = stream.next().await {
///     let response = result?;
///     println!("status: {}", response.status);
/// }
/// # let _ = handle;
/// # Ok(())
/// # }
/// ```
pub struct ResponseStream {
    rx: oneshot::Receiver<Result<Response>>,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
    finished: bool,
}

impl ResponseStream {
    pub(crate) fn spawn(pipeline: Pipeline, params: RequestParameters) -> Self {
        let token = CancellationToken::new();
        let (tx, rx) = oneshot::channel();

        let task = match executor() {
            Ok(handle) => {
                let child = token.clone();
                Some(handle.spawn(async move {
                    tokio::select! {
                        // Dropping the execute future here aborts the
                        // in-flight transport call; nothing is delivered.
                        _ = child.cancelled() => {}
                        result = pipeline.execute(params) => {
                            let _ = tx.send(result);
                        }
                    }
                }))
            }
            Err(e) => {
                let _ = tx.send(Err(e));
                None
            }
        };

        Self {
            rx,
            token,
            task,
            finished: false,
        }
    }

    pub(crate) fn failed(error: crate::Error) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(error));
        Self {
            rx,
            token: CancellationToken::new(),
            task: None,
            finished: false,
        }
    }

    /// Returns a handle that cancels this execution.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            token: self.token.clone(),
        }
    }

    /// Cancels this execution directly.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Stream for ResponseStream {
    type Item = Result<Response>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(result)) => {
                this.finished = true;
                Poll::Ready(Some(result))
            }
            // Sender dropped without emitting: the execution was cancelled.
            Poll::Ready(Err(_)) => {
                this.finished = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ResponseStream {
    fn drop(&mut self) {
        self.token.cancel();
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

/// A single-value stream that decodes the response through the pipeline's
/// codec before emitting it.
pub struct DecodedStream<T> {
    inner: ResponseStream,
    codec: Arc<dyn Codec>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> DecodedStream<T> {
    pub(crate) fn new(inner: ResponseStream, codec: Arc<dyn Codec>) -> Self {
        Self {
            inner,
            codec,
            _marker: PhantomData,
        }
    }

    /// Returns a handle that cancels this execution.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.inner.cancel_handle()
    }

    /// Cancels this execution directly.
    pub fn cancel(&self) {
        self.inner.cancel();
    }
}

impl<T: DeserializeOwned> Stream for DecodedStream<T> {
    type Item = Result<Decoded<T>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(response))) => {
                Poll::Ready(Some(decode_response(&*this.codec, response)))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
