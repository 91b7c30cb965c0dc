#![warn(missing_docs)]
//#![deny(warnings)]
//! HTTP bridge for serverless function invocations.
//!
//! The host delivers every HTTP request as an invocation event whose `body`
//! carries a JSON request payload. This crate turns that payload into an
//! [`http::Request`], hands it to your handler, and turns the handler's
//! [`http::Response`] back into the JSON result the host expects.
//!
//! # Examples
//!
//! The simplest case of an HTTP handler is a function of an `http::Request`
//! to a type that can be lifted into an `http::Response`.
//! ```rust,no_run
//! use nowfn_http::{function, IntoResponse, Request};
//! use nowfn_http::runtime::{Context, Error};
//!
//! #[function(http)]
//! #[tokio::main]
//! async fn main(_: Request, _: Context) -> Result<impl IntoResponse, Error> {
//!     Ok("👋 world!")
//! }
//! ```
//!
//! Handlers that should be built fresh for every request and answer by HTTP
//! method implement [`MethodHandler`] and are wired up with [`per_request`].
//!
//! ```rust,no_run
//! use nowfn_http::{handler, per_request, runtime, Body, MethodHandler, Request, Response};
//! use nowfn_http::runtime::Error;
//!
//! #[derive(Default)]
//! struct Pong;
//!
//! impl MethodHandler for Pong {
//!     fn post(&mut self, _: Request) -> Result<Response<Body>, Error> {
//!         Ok(Response::new(Body::from("pong")))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     runtime::run(handler(per_request::<Pong>())).await
//! }
//! ```

// only externed because maplit doesn't seem to play well with 2018 edition imports
#[cfg(test)]
#[macro_use]
extern crate maplit;

pub use aws_lambda_events::encodings::Body;
pub use http::{self, Response};
pub use nowfn_attributes::function;
pub use nowfn_runtime::{self as runtime, Context};

pub mod ext;
mod method;
pub mod request;
mod response;
mod strmap;

pub use crate::{
    ext::RequestExt,
    method::{per_request, MethodHandler, PerRequest},
    request::{InvocationEvent, RequestError},
    response::{IntoResponse, InvocationResult},
    strmap::StrMap,
};
use futures_util::future::{self, BoxFuture, FutureExt};
use std::future::Future;

/// Type alias for `http::Request`s with a fixed [`Body`] type
pub type Request = http::Request<Body>;

/// Functions serving as request handlers.
///
/// This can be viewed as a `nowfn_runtime::Handler` constrained to
/// `http::Request` and `http::Response` types.
pub trait Handler: Sized {
    /// The type of Error that this Handler will return
    type Error;
    /// The type of Response this Handler will return
    type Response: IntoResponse;
    /// The type of Future this Handler will return
    type Fut: Future<Output = Result<Self::Response, Self::Error>> + Send + 'static;
    /// Function used to execute handler behavior
    fn call(&mut self, event: Request, context: Context) -> Self::Fut;
}

/// Adapts a [`Handler`] to the `nowfn_runtime::run` interface
pub fn handler<H: Handler>(handler: H) -> Adapter<H> {
    Adapter { handler }
}

/// An implementation of `Handler` for a given closure return a `Future` representing the computed response
impl<F, R, Fut> Handler for F
where
    F: FnMut(Request, Context) -> Fut,
    R: IntoResponse,
    Fut: Future<Output = Result<R, runtime::Error>> + Send + 'static,
{
    type Response = R;
    type Error = runtime::Error;
    type Fut = Fut;
    fn call(&mut self, event: Request, context: Context) -> Self::Fut {
        (self)(event, context)
    }
}

/// Exists only to satisfy the trait cover rule for `nowfn_runtime::Handler` impl
///
/// Users should use the [`handler`] function to construct one.
#[derive(Debug)]
pub struct Adapter<H: Handler> {
    handler: H,
}

impl<H> Handler for Adapter<H>
where
    H: Handler,
{
    type Response = H::Response;
    type Error = H::Error;
    type Fut = H::Fut;
    fn call(&mut self, event: Request, context: Context) -> Self::Fut {
        self.handler.call(event, context)
    }
}

impl<H> runtime::Handler<InvocationEvent, InvocationResult> for Adapter<H>
where
    H: Handler,
    H::Error: Into<runtime::Error> + 'static,
    H::Response: Send + 'static,
{
    type Error = runtime::Error;
    type Fut = BoxFuture<'static, Result<InvocationResult, Self::Error>>;
    fn call(&mut self, event: InvocationEvent, context: Context) -> Self::Fut {
        let request = match event.into_request() {
            Ok(request) => request,
            Err(err) => return future::ready(Err(err.into())).boxed(),
        };
        tracing::debug!(method = %request.method(), uri = %request.uri(), "dispatching request");
        let fut = self.handler.call(request, context);
        async move {
            let response = fut.await.map_err(Into::<runtime::Error>::into)?;
            Ok::<_, runtime::Error>(InvocationResult::from_response(response.into_response()))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use serde_json::{json, Value};

    fn event(payload: Value) -> InvocationEvent {
        InvocationEvent {
            body: payload.to_string(),
        }
    }

    #[tokio::test]
    async fn closures_round_trip_through_the_bridge() {
        let mut adapter = handler(|request: Request, _: Context| async move {
            let name = request
                .query_string_parameters()
                .get("name")
                .unwrap_or("you")
                .to_owned();
            Ok::<_, runtime::Error>(format!("hi {}", name))
        });
        let result = runtime::Handler::call(
            &mut adapter,
            event(json!({ "method": "GET", "path": "/?name=%C3%BCn%C3%AF", "headers": {} })),
            Context::default(),
        )
        .await
        .expect("handler failed");

        assert_eq!(result.status_code, 200);
        assert_eq!(result.body, "hi ünï");
        assert_eq!(result.encoding, None);
    }

    #[tokio::test]
    async fn malformed_payloads_fail_the_invocation() {
        let mut adapter = handler(|_: Request, _: Context| async move { Ok::<_, runtime::Error>("unreachable") });
        let result = runtime::Handler::call(
            &mut adapter,
            InvocationEvent {
                body: "not json".to_owned(),
            },
            Context::default(),
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn handler_errors_fail_the_invocation() {
        let mut adapter =
            handler(|_: Request, _: Context| async move { Err::<&str, runtime::Error>("broken".into()) });
        let result = runtime::Handler::call(
            &mut adapter,
            event(json!({ "method": "POST", "path": "/", "headers": {}, "body": "{}" })),
            Context::default(),
        )
        .await;
        match result {
            Err(err) => assert_eq!(err.to_string(), "broken"),
            Ok(_) => panic!("expected the invocation to fail"),
        }
    }

    #[tokio::test]
    async fn responses_keep_their_status() {
        let mut adapter = handler(|_: Request, _: Context| async move {
            let response = Response::builder()
                .status(StatusCode::CREATED)
                .body(Body::Empty)
                .expect("failed to build response");
            Ok::<_, runtime::Error>(response)
        });
        let result = runtime::Handler::call(
            &mut adapter,
            event(json!({ "method": "PUT", "path": "/things/1", "headers": {} })),
            Context::default(),
        )
        .await
        .expect("handler failed");
        assert_eq!(result.status_code, 201);
        assert_eq!(result.body, "");
    }
}
