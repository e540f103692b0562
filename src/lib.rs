//! # Chaincall - a hook-chain HTTP request pipeline
//!
//! Chaincall executes a single logical HTTP request through a configurable
//! chain of pre-request transformations, one actual network call (via
//! `reqwest`), and a configurable chain of post-request decision steps that
//! can retry, substitute, or short-circuit the response. The same pipeline
//! is exposed through three delivery modes: a blocking call, a
//! callback-based call, and a cancellable single-value stream.
//!
//! ## Quick Start
//!
//! ```no_run
//! use chaincall::{hooks::RetryOnStatus, Pipeline, RequestParameters, Session};
//! use http::{Method, StatusCode};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), chaincall::Error> {
//!     // A session owns the underlying HTTP client and its configuration.
//!     let session = Session::builder()
//!         .base_url("https://api.example.com")?
//!         .default_header("User-Agent", "my-app/1.0")?
//!         .build()?;
//!
//!     // A pipeline ties hook chains, a transport, and a codec together.
//!     let pipeline = Pipeline::builder()
//!         .pre_hook(|params: RequestParameters| params.with_header("x-api-key", "secret"))
//!         .post_hook(RetryOnStatus::with_prepare(StatusCode::UNAUTHORIZED, |params| {
//!             params
//!                 .with_header("authorization", "Bearer refreshed")
//!                 .expect("static header is valid")
//!         }))
//!         .build();
//!
//!     // Raw execution: a Response carrying its originating parameters.
//!     let params = RequestParameters::new(session.clone(), Method::GET, "/users/1");
//!     let response = pipeline.execute(params).await?;
//!     println!("status {}: {}", response.status, response.text());
//!
//!     // Typed execution through the codec.
//!     let user: chaincall::Decoded<User> = pipeline.get(&session, "/users/1").await?;
//!     println!("user {} is {}", user.id, user.name);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Hook chains** - ordered pre-request transforms and post-request
//!   decision steps ([`PreRequestHook`], [`PostRequestHook`]); a post step
//!   can continue, order a new request, or complete the chain early
//! - **Immutable parameter threading** - every hook consumes a
//!   [`RequestParameters`] value and produces a new one; concurrent
//!   executions share hooks safely without locks
//! - **Self-diagnosing responses** - a [`Response`] always embeds the exact
//!   parameters that produced it, even across retries
//! - **Closed error taxonomy** - every failure is a classified [`Error`]
//!   variant with full diagnostic context
//! - **Three delivery modes** - one algorithm behind
//!   [`execute`](Pipeline::execute) /
//!   [`execute_blocking`](Pipeline::execute_blocking) /
//!   [`execute_callback`](Pipeline::execute_callback) /
//!   [`execute_stream`](Pipeline::execute_stream); only the stream mode
//!   supports mid-flight cancellation
//! - **Pluggable codec** - typed entry points serialize and decode through
//!   a per-pipeline [`Codec`], defaulting to JSON
//! - **Structured logging** - every stage traced via `tracing`
//!
//! ## Delivery Modes
//!
//! ```no_run
//! use chaincall::{Pipeline, RequestParameters, Session};
//! use futures::StreamExt;
//! use http::Method;
//!
//! # async fn example() -> Result<(), chaincall::Error> {
//! let session = Session::builder()
//!     .base_url("https://api.example.com")?
//!     .build()?;
//! let pipeline = Pipeline::new();
//! let params = RequestParameters::new(session, Method::GET, "/users/1");
//!
//! // Callback: runs on a background context, completes exactly once.
//! pipeline.execute_callback(params.clone(), |result| match result {
//!     Ok(response) => println!("status {}", response.status),
//!     Err(e) => eprintln!("failed: {e}"),
//! });
//!
//! // Stream: single value, cancellable mid-flight.
//! let mut stream = pipeline.execute_stream(params);
//! let handle = stream.cancel_handle();
//! if let Some(result) = stream.next().await {
//!     println!("delivered: {:?}", result.map(|r| r.status));
//! }
//! # let _ = handle;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every failure mode is a distinct [`Error`] variant: connectivity loss
//! (`NoInternet`), other transport failures (`Transport`), unresolvable
//! paths (`InvalidUrl`), hook-raised errors (`Hook`), cancelled executions
//! (`Cancelled`), and decode failures (`Decoding`) which carry the full
//! response so "the request worked but the payload shape was unexpected"
//! is distinguishable from HTTP-level failure.

mod codec;
mod error;
pub mod hooks;
mod params;
mod pipeline;
mod response;
mod session;
mod stream;
pub mod transport;

pub use codec::{Codec, JsonCodec};
pub use error::{BoxError, Error, Result};
pub use hooks::{Action, PostRequestHook, PreRequestHook};
pub use params::{Body, RequestParameters};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use response::{Decoded, Response};
pub use session::{Session, SessionBuilder};
pub use stream::{CancelHandle, DecodedStream, ResponseStream};
pub use transport::{HttpTransport, Transport};
