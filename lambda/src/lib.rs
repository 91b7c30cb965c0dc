#![deny(missing_docs)]

//! Runtime client for serverless functions.
//!
//! This crate polls a Lambda-compatible Runtime API for invocation events,
//! hands each one to a [`Handler`], and reports the result back. Most
//! functions only need [`handler_fn`] and [`run`]:
//!
//! ```no_run
//! use nowfn_runtime::{handler_fn, Context, Error};
//! use serde_json::Value;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     nowfn_runtime::run(handler_fn(echo)).await
//! }
//!
//! async fn echo(event: Value, _: Context) -> Result<Value, Error> {
//!     Ok(event)
//! }
//! ```
use futures_core::Stream;
use serde::{de::DeserializeOwned, Serialize};
use std::{convert::TryFrom, env, fmt, future::Future};
use tracing::{error, trace, trace_span, warn};
use tracing_futures::Instrument;

mod client;
mod requests;
#[cfg(feature = "simulated")]
pub mod simulated;
mod types;

use client::Client;
use requests::{EventCompletionRequest, EventErrorRequest, IntoRequest, NextEventRequest};
pub use types::Context;
use types::Diagnostic;

#[cfg(feature = "derive")]
pub use nowfn_attributes::function;

/// Error type that handlers may result in.
pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Configuration derived from environment variables.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Config {
    /// The host and port of the Runtime API.
    pub endpoint: String,
    /// The name of the function.
    pub function_name: String,
    /// The amount of memory available to the function in MB.
    pub memory: i32,
    /// The version of the function being executed.
    pub version: String,
    /// The name of the log stream for the function.
    pub log_stream: String,
    /// The name of the log group for the function.
    pub log_group: String,
}

impl Config {
    /// Attempts to read configuration from environment variables.
    pub fn from_env() -> Result<Self, Error> {
        let conf = Config {
            endpoint: env::var("AWS_LAMBDA_RUNTIME_API")?,
            function_name: env::var("AWS_LAMBDA_FUNCTION_NAME")?,
            memory: env::var("AWS_LAMBDA_FUNCTION_MEMORY_SIZE")?.parse::<i32>()?,
            version: env::var("AWS_LAMBDA_FUNCTION_VERSION")?,
            log_stream: env::var("AWS_LAMBDA_LOG_STREAM_NAME")?,
            log_group: env::var("AWS_LAMBDA_LOG_GROUP_NAME")?,
        };
        Ok(conf)
    }
}

/// A trait describing an asynchronous function `A` to `B`.
pub trait Handler<A, B> {
    /// Errors returned by this handler.
    type Error;
    /// Response of this handler.
    type Fut: Future<Output = Result<B, Self::Error>>;
    /// Handle the incoming event.
    fn call(&mut self, event: A, context: Context) -> Self::Fut;
}

/// Returns a new [`HandlerFn`] with the given closure.
pub fn handler_fn<F>(f: F) -> HandlerFn<F> {
    HandlerFn { f }
}

/// A [`Handler`] implemented by a closure.
#[derive(Clone, Debug)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F, A, B, E, Fut> Handler<A, B> for HandlerFn<F>
where
    F: Fn(A, Context) -> Fut,
    Fut: Future<Output = Result<B, E>>,
    E: Into<Error> + fmt::Display,
{
    type Error = E;
    type Fut = Fut;
    fn call(&mut self, req: A, ctx: Context) -> Self::Fut {
        (self.f)(req, ctx)
    }
}

/// Drives a [`Handler`] against a Runtime API endpoint.
#[derive(Debug)]
pub struct Runtime {
    client: Client,
    config: Config,
}

impl Runtime {
    /// Builds a runtime from environment configuration.
    pub fn from_env() -> Result<Self, Error> {
        trace!("Loading config from env");
        Self::new(Config::from_env()?)
    }

    /// Builds a runtime that talks to `config.endpoint`.
    pub fn new(config: Config) -> Result<Self, Error> {
        let client = Client::new(&config.endpoint)?;
        Ok(Runtime { client, config })
    }

    /// The configuration every invocation context is stamped with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Processes invocations until the Runtime API fails.
    pub async fn run<A, B, F>(&self, handler: F) -> Result<(), Error>
    where
        F: Handler<A, B>,
        F::Error: fmt::Display,
        A: DeserializeOwned,
        B: Serialize,
    {
        let incoming = incoming(&self.client);
        self.drive(incoming, handler).await
    }

    /// Processes exactly `count` invocations, then returns.
    pub async fn run_invocations<A, B, F>(&self, handler: F, count: usize) -> Result<(), Error>
    where
        F: Handler<A, B>,
        F::Error: fmt::Display,
        A: DeserializeOwned,
        B: Serialize,
    {
        use futures_util::StreamExt;
        let incoming = incoming(&self.client).take(count);
        self.drive(incoming, handler).await
    }

    async fn drive<A, B, F, S>(&self, incoming: S, mut handler: F) -> Result<(), Error>
    where
        F: Handler<A, B>,
        F::Error: fmt::Display,
        A: DeserializeOwned,
        B: Serialize,
        S: Stream<Item = Result<http::Response<hyper::Body>, Error>>,
    {
        use futures_util::StreamExt;
        tokio::pin!(incoming);

        while let Some(event) = incoming.next().await {
            trace!("New event arrived (run loop)");
            let event = event?;
            let (parts, body) = event.into_parts();

            let mut ctx = Context::try_from(parts.headers)?;
            ctx.env_config = self.config.clone();
            let body = hyper::body::to_bytes(body).await?;
            trace!("{}", String::from_utf8_lossy(&body));

            let request_id = ctx.request_id.clone();
            let span = trace_span!("Function invoke", requestId = %request_id);
            let handler = &mut handler;
            async {
                let deserializer = &mut serde_json::Deserializer::from_slice(&body);
                let req = match serde_path_to_error::deserialize::<_, A>(deserializer) {
                    Ok(event) => match handler.call(event, ctx).await {
                        Ok(response) => {
                            trace!("Ok response from handler (run loop)");
                            EventCompletionRequest {
                                request_id: &request_id,
                                body: response,
                            }
                            .into_req()
                        }
                        Err(err) => {
                            error!("{}", err);
                            EventErrorRequest {
                                request_id: &request_id,
                                diagnostic: Diagnostic {
                                    error_type: short_type_name(std::any::type_name::<F::Error>()),
                                    error_message: err.to_string(),
                                },
                            }
                            .into_req()
                        }
                    },
                    Err(err) => {
                        error!(path = %err.path(), "failed to deserialize event: {}", err);
                        EventErrorRequest {
                            request_id: &request_id,
                            diagnostic: Diagnostic {
                                error_type: "DeserializationError".to_owned(),
                                error_message: err.to_string(),
                            },
                        }
                        .into_req()
                    }
                }?;

                let res = self.client.call(req).await?;
                if !res.status().is_success() {
                    warn!(status = %res.status(), "Runtime API rejected the invocation result");
                }
                Ok::<(), Error>(())
            }
            .instrument(span)
            .await?;
        }

        Ok(())
    }
}

/// Drops module paths from a type name, so `alloc::boxed::Box<dyn core::error::Error>`
/// is reported as `Box<dyn Error>`.
fn short_type_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut path = String::new();
    for c in name.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            path.push(c);
            continue;
        }
        out.push_str(path.rsplit("::").next().unwrap_or_default());
        path.clear();
        out.push(c);
    }
    out.push_str(path.rsplit("::").next().unwrap_or_default());
    out
}

fn incoming(client: &Client) -> impl Stream<Item = Result<http::Response<hyper::Body>, Error>> + '_ {
    async_stream::stream! {
        loop {
            trace!("Waiting for next event (incoming loop)");
            let res = match NextEventRequest.into_req() {
                Ok(req) => client.call(req).await,
                Err(err) => Err(err),
            };
            yield res;
        }
    }
}

/// Starts the function runtime and begins polling for events on the Runtime API.
///
/// # Example
/// ```no_run
/// use nowfn_runtime::{handler_fn, Context, Error};
/// use serde_json::Value;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Error> {
///     let func = handler_fn(func);
///     nowfn_runtime::run(func).await?;
///     Ok(())
/// }
///
/// async fn func(event: Value, _: Context) -> Result<Value, Error> {
///     Ok(event)
/// }
/// ```
pub async fn run<A, B, F>(handler: F) -> Result<(), Error>
where
    F: Handler<A, B>,
    F::Error: fmt::Display,
    A: DeserializeOwned,
    B: Serialize,
{
    Runtime::from_env()?.run(handler).await
}
