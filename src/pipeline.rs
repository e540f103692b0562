//! The pipeline orchestrator: pre-request chain, transport invocation, and
//! post-request chain composed into one request lifecycle.
//!
//! The lifecycle is implemented once, as the async [`Pipeline::execute`];
//! the blocking, callback, and stream entry points are thin scheduling
//! wrappers around that single function, so the chain invariants hold
//! identically across all three delivery modes.

use crate::{
    codec::{Codec, JsonCodec},
    hooks::{Action, PostRequestHook, PreRequestHook},
    params::{Body, RequestParameters},
    response::{Decoded, Response},
    stream::{DecodedStream, ResponseStream},
    transport::{HttpTransport, Transport},
    Error, Result, Session,
};
use http::Method;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio::runtime::Runtime;

/// A configured request pipeline.
///
/// A pipeline ties an ordered pre-request hook chain, a transport, an
/// ordered post-request hook chain, and a body codec into one reusable
/// unit. It is cheap to clone and safe to share: concurrent executions run
/// independently, and each execution's chains run strictly in order.
///
/// # Examples
///
/// ```no_run
/// use chaincall::{hooks::RetryOnStatus, Pipeline, RequestParameters, Session};
/// use http::{Method, StatusCode};
///
/// #[tokio::main]
/// async fn main() -> Result<(), chaincall::Error> {
///     let session = Session::builder()
///         .base_url("https://api.example.com")?
///         .build()?;
///
///     let pipeline = Pipeline::builder()
///         .pre_hook(|params: RequestParameters| params.with_header("x-api-key", "secret"))
///         .post_hook(RetryOnStatus::new(StatusCode::UNAUTHORIZED))
///         .build();
///
///     let params = RequestParameters::new(session, Method::GET, "/users/1");
///     let response = pipeline.execute(params).await?;
///     println!("status: {}, body: {}", response.status, response.text());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Pipeline {
    inner: Arc<PipelineInner>,
}

struct PipelineInner {
    transport: Arc<dyn Transport>,
    pre_hooks: Vec<Arc<dyn PreRequestHook>>,
    post_hooks: Vec<Arc<dyn PostRequestHook>>,
    codec: Arc<dyn Codec>,
}

impl Pipeline {
    /// Creates a pipeline with no hooks, the reqwest transport, and the
    /// JSON codec.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a new `PipelineBuilder`.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Executes one logical request through the full chain.
    ///
    /// The pre-request hooks fold the parameters in configuration order;
    /// the transport performs one call; the post-request hooks then fold
    /// the response, each able to continue, substitute a new request, or
    /// terminate the chain early. Exactly one of a [`Response`] or an
    /// [`Error`] results.
    ///
    /// Any hook or transport error aborts the remaining chain immediately.
    /// If a pre-request hook fails, no network call is made at all.
    pub async fn execute(&self, params: RequestParameters) -> Result<Response> {
        let start_time = Instant::now();

        let mut prepared = params;
        for (step, hook) in self.inner.pre_hooks.iter().enumerate() {
            prepared = match hook.prepare(prepared) {
                Ok(next) => next,
                Err(e) => {
                    tracing::warn!(
                        step = step,
                        error = %e,
                        "pre-request hook failed; aborting pipeline"
                    );
                    return Err(e);
                }
            };
        }

        let mut response = self.invoke(&prepared).await?;

        for (step, hook) in self.inner.post_hooks.iter().enumerate() {
            match hook.inspect(&response, &prepared) {
                Ok(Action::Continue) => {}
                Ok(Action::MakeNewRequest(next)) => {
                    tracing::debug!(
                        step = step,
                        method = %next.method,
                        path = %next.path,
                        "post-request hook ordered a new request"
                    );
                    response = self.invoke(&next).await?;
                }
                Ok(Action::CompletedNow) => {
                    tracing::debug!(step = step, "post-request hook completed the chain early");
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        step = step,
                        error = %e,
                        "post-request hook failed; aborting pipeline"
                    );
                    return Err(e);
                }
            }
        }

        tracing::info!(
            status = response.status.as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "pipeline completed"
        );

        Ok(response)
    }

    /// One transport invocation: resolve the URL, dispatch, interpret.
    async fn invoke(&self, params: &RequestParameters) -> Result<Response> {
        let url = params.session.resolve(&params.path)?;
        let reply = self.inner.transport.send(params, url).await;

        match reply.into_response(params) {
            Ok(response) => {
                tracing::info!(
                    status = response.status.as_u16(),
                    method = %params.method,
                    path = %params.path,
                    "received HTTP response"
                );
                Ok(response)
            }
            Err(e @ Error::Unknown { .. }) => {
                tracing::error!(error = %e, "transport contract violation");
                Err(e)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    method = %params.method,
                    path = %params.path,
                    "request failed"
                );
                Err(e)
            }
        }
    }

    /// Executes the pipeline synchronously on the calling thread.
    ///
    /// The calling thread is occupied for the duration of the request.
    /// There is no mid-flight cancellation in this mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] when called from within an async
    /// runtime, where blocking would stall the executor; use
    /// [`execute`](Self::execute) there instead.
    pub fn execute_blocking(&self, params: RequestParameters) -> Result<Response> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(Error::Configuration(
                "execute_blocking would stall the async runtime; use execute instead".to_string(),
            ));
        }
        shared_runtime()?.block_on(self.execute(params))
    }

    /// Executes the pipeline on a background execution context and invokes
    /// `on_complete` exactly once with the result.
    ///
    /// The callback runs on the executing runtime task. This mode offers no
    /// mid-flight cancellation; use [`execute_stream`](Self::execute_stream)
    /// when cancellation is required.
    pub fn execute_callback<F>(&self, params: RequestParameters, on_complete: F)
    where
        F: FnOnce(Result<Response>) + Send + 'static,
    {
        let pipeline = self.clone();
        match executor() {
            Ok(handle) => {
                handle.spawn(async move {
                    on_complete(pipeline.execute(params).await);
                });
            }
            Err(e) => on_complete(Err(e)),
        }
    }

    /// Executes the pipeline as a single-value cancellable stream.
    ///
    /// The stream emits exactly one success or one error and then
    /// completes. Cancelling it aborts the in-flight transport call and
    /// suppresses delivery entirely. Emissions surface wherever the caller
    /// polls the stream.
    pub fn execute_stream(&self, params: RequestParameters) -> ResponseStream {
        ResponseStream::spawn(self.clone(), params)
    }

    /// Executes the pipeline and decodes the response body into `T`
    /// through the pipeline's codec.
    ///
    /// When `body` is provided it is serialized through the codec into the
    /// request body before the pre-request chain runs. A decode failure is
    /// reported as [`Error::Decoding`], distinct from transport and HTTP
    /// failures.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use chaincall::{Pipeline, RequestParameters, Session};
    /// use http::Method;
    /// use serde::{Deserialize, Serialize};
    ///
    /// #[derive(Serialize)]
    /// struct CreateUser {
    ///     name: String,
    /// }
    ///
    /// #[derive(Deserialize)]
    /// struct User {
    ///     id: u64,
    ///     name: String,
    /// }
    ///
    /// # async fn example() -> Result<(), chaincall::Error> {
    /// let session = Session::builder()
    ///     .base_url("https://api.example.com")?
    ///     .build()?;
    /// let pipeline = Pipeline::new();
    ///
    /// let new_user = CreateUser { name: "Alice".to_string() };
    /// let params = RequestParameters::new(session, Method::POST, "/users");
    /// let created = pipeline.execute_typed::<_, User>(params, Some(&new_user)).await?;
    /// println!("created user {}", created.data.id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn execute_typed<B, T>(
        &self,
        params: RequestParameters,
        body: Option<&B>,
    ) -> Result<Decoded<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let prepared = self.prepare_typed(params, body)?;
        let response = self.execute(prepared).await?;
        decode_response(&*self.inner.codec, response)
    }

    /// Blocking variant of [`execute_typed`](Self::execute_typed).
    pub fn execute_typed_blocking<B, T>(
        &self,
        params: RequestParameters,
        body: Option<&B>,
    ) -> Result<Decoded<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let prepared = self.prepare_typed(params, body)?;
        let response = self.execute_blocking(prepared)?;
        decode_response(&*self.inner.codec, response)
    }

    /// Callback variant of [`execute_typed`](Self::execute_typed).
    pub fn execute_typed_callback<B, T, F>(
        &self,
        params: RequestParameters,
        body: Option<&B>,
        on_complete: F,
    ) where
        B: Serialize + ?Sized,
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(Result<Decoded<T>>) + Send + 'static,
    {
        let prepared = match self.prepare_typed(params, body) {
            Ok(prepared) => prepared,
            Err(e) => return on_complete(Err(e)),
        };

        let codec = self.inner.codec.clone();
        self.execute_callback(prepared, move |result| {
            on_complete(result.and_then(|response| decode_response(&*codec, response)));
        });
    }

    /// Stream variant of [`execute_typed`](Self::execute_typed).
    pub fn execute_typed_stream<B, T>(
        &self,
        params: RequestParameters,
        body: Option<&B>,
    ) -> DecodedStream<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let codec = self.inner.codec.clone();
        match self.prepare_typed(params, body) {
            Ok(prepared) => DecodedStream::new(self.execute_stream(prepared), codec),
            Err(e) => DecodedStream::new(ResponseStream::failed(e), codec),
        }
    }

    /// Makes a typed GET request through this pipeline.
    pub async fn get<T>(&self, session: &Session, path: impl Into<String>) -> Result<Decoded<T>>
    where
        T: DeserializeOwned,
    {
        let params = RequestParameters::new(session.clone(), Method::GET, path);
        self.execute_typed::<(), T>(params, None).await
    }

    /// Makes a typed POST request through this pipeline.
    pub async fn post<B, T>(
        &self,
        session: &Session,
        path: impl Into<String>,
        body: &B,
    ) -> Result<Decoded<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let params = RequestParameters::new(session.clone(), Method::POST, path);
        self.execute_typed(params, Some(body)).await
    }

    /// Makes a typed PUT request through this pipeline.
    pub async fn put<B, T>(
        &self,
        session: &Session,
        path: impl Into<String>,
        body: &B,
    ) -> Result<Decoded<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let params = RequestParameters::new(session.clone(), Method::PUT, path);
        self.execute_typed(params, Some(body)).await
    }

    /// Makes a typed DELETE request through this pipeline.
    pub async fn delete<T>(&self, session: &Session, path: impl Into<String>) -> Result<Decoded<T>>
    where
        T: DeserializeOwned,
    {
        let params = RequestParameters::new(session.clone(), Method::DELETE, path);
        self.execute_typed::<(), T>(params, None).await
    }

    /// Makes a typed PATCH request through this pipeline.
    pub async fn patch<B, T>(
        &self,
        session: &Session,
        path: impl Into<String>,
        body: &B,
    ) -> Result<Decoded<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let params = RequestParameters::new(session.clone(), Method::PATCH, path);
        self.execute_typed(params, Some(body)).await
    }

    /// Encodes a typed body into the parameters, if one was supplied.
    fn prepare_typed<B>(
        &self,
        params: RequestParameters,
        body: Option<&B>,
    ) -> Result<RequestParameters>
    where
        B: Serialize + ?Sized,
    {
        let Some(body) = body else {
            return Ok(params);
        };

        let value = serde_json::to_value(body)
            .map_err(|e| Error::Configuration(format!("failed to encode request body: {}", e)))?;
        let bytes = self
            .inner
            .codec
            .encode(&value)
            .map_err(|e| Error::Configuration(format!("failed to encode request body: {}", e)))?;

        Ok(params.with_body(Body::Raw {
            bytes,
            content_type: self.inner.codec.content_type().to_string(),
        }))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes a response body through a codec into a typed value.
pub(crate) fn decode_response<T: DeserializeOwned>(
    codec: &dyn Codec,
    response: Response,
) -> Result<Decoded<T>> {
    let value = codec.decode(&response.body).map_err(|source| Error::Decoding {
        response: Box::new(response.clone()),
        source,
    })?;

    let data = serde_json::from_value(value).map_err(|e| Error::Decoding {
        response: Box::new(response.clone()),
        source: Box::new(e),
    })?;

    Ok(Decoded { data, response })
}

/// The runtime used when no ambient runtime is available: one background
/// worker shared by all pipelines in the process.
fn shared_runtime() -> Result<&'static Runtime> {
    static RUNTIME: OnceLock<std::result::Result<Runtime, String>> = OnceLock::new();

    let runtime = RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("chaincall-pipeline")
            .enable_all()
            .build()
            .map_err(|e| format!("failed to build pipeline runtime: {}", e))
    });

    match runtime {
        Ok(runtime) => Ok(runtime),
        Err(e) => Err(Error::Configuration(e.clone())),
    }
}

/// The handle background executions spawn on: the ambient runtime when the
/// caller is inside one, the shared runtime otherwise.
pub(crate) fn executor() -> Result<tokio::runtime::Handle> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => Ok(handle),
        Err(_) => Ok(shared_runtime()?.handle().clone()),
    }
}

/// Builder for configuring and creating a [`Pipeline`].
///
/// Hooks run in the order they are added; there is no reordering or
/// priority mechanism.
pub struct PipelineBuilder {
    transport: Arc<dyn Transport>,
    pre_hooks: Vec<Arc<dyn PreRequestHook>>,
    post_hooks: Vec<Arc<dyn PostRequestHook>>,
    codec: Arc<dyn Codec>,
}

impl PipelineBuilder {
    /// Creates a new `PipelineBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            transport: Arc::new(HttpTransport),
            pre_hooks: Vec::new(),
            post_hooks: Vec::new(),
            codec: Arc::new(JsonCodec),
        }
    }

    /// Replaces the transport. Intended for tests and custom dispatch.
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    /// Appends a pre-request hook to the chain.
    pub fn pre_hook<H: PreRequestHook + 'static>(mut self, hook: H) -> Self {
        self.pre_hooks.push(Arc::new(hook));
        self
    }

    /// Appends a post-request hook to the chain.
    pub fn post_hook<H: PostRequestHook + 'static>(mut self, hook: H) -> Self {
        self.post_hooks.push(Arc::new(hook));
        self
    }

    /// Replaces the body codec used by the typed entry points.
    pub fn codec<C: Codec + 'static>(mut self, codec: C) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Builds the configured `Pipeline`.
    pub fn build(self) -> Pipeline {
        Pipeline {
            inner: Arc::new(PipelineInner {
                transport: self.transport,
                pre_hooks: self.pre_hooks,
                post_hooks: self.post_hooks,
                codec: self.codec,
            }),
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
