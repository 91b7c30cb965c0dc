//! Per-request handlers that answer by HTTP method.
use crate::{runtime::Error, Body, Context, Handler, Request};
use futures_util::future::{self, Ready};
use http::{header::CONTENT_TYPE, Method, Response, StatusCode};
use std::{fmt, marker::PhantomData};

/// A handler that is constructed fresh for every request and dispatches on
/// the request method.
///
/// Every method defaults to a `501 Not Implemented` response, so
/// implementors override only the methods they serve. Because a new value is
/// built per request, implementors never observe state from earlier requests.
pub trait MethodHandler: Default {
    /// Handle a `GET` request.
    fn get(&mut self, request: Request) -> Result<Response<Body>, Error> {
        Ok(unsupported(request.method()))
    }

    /// Handle a `HEAD` request.
    fn head(&mut self, request: Request) -> Result<Response<Body>, Error> {
        Ok(unsupported(request.method()))
    }

    /// Handle a `POST` request.
    fn post(&mut self, request: Request) -> Result<Response<Body>, Error> {
        Ok(unsupported(request.method()))
    }

    /// Handle a `PUT` request.
    fn put(&mut self, request: Request) -> Result<Response<Body>, Error> {
        Ok(unsupported(request.method()))
    }

    /// Handle a `PATCH` request.
    fn patch(&mut self, request: Request) -> Result<Response<Body>, Error> {
        Ok(unsupported(request.method()))
    }

    /// Handle a `DELETE` request.
    fn delete(&mut self, request: Request) -> Result<Response<Body>, Error> {
        Ok(unsupported(request.method()))
    }

    /// Handle an `OPTIONS` request.
    fn options(&mut self, request: Request) -> Result<Response<Body>, Error> {
        Ok(unsupported(request.method()))
    }
}

/// Returns a [`Handler`] that builds a new `H` for every request.
pub fn per_request<H: MethodHandler>() -> PerRequest<H> {
    PerRequest { _handler: PhantomData }
}

/// A [`Handler`] that builds a new [`MethodHandler`] for every request.
///
/// Users should use the [`per_request`] function to construct one.
pub struct PerRequest<H> {
    _handler: PhantomData<fn() -> H>,
}

impl<H> fmt::Debug for PerRequest<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerRequest")
            .field("handler", &std::any::type_name::<H>())
            .finish()
    }
}

impl<H> Handler for PerRequest<H>
where
    H: MethodHandler,
{
    type Error = Error;
    type Response = Response<Body>;
    type Fut = Ready<Result<Response<Body>, Error>>;

    fn call(&mut self, request: Request, _: Context) -> Self::Fut {
        let mut handler = H::default();
        let method = request.method().clone();
        let response = match method {
            Method::GET => handler.get(request),
            Method::HEAD => handler.head(request),
            Method::POST => handler.post(request),
            Method::PUT => handler.put(request),
            Method::PATCH => handler.patch(request),
            Method::DELETE => handler.delete(request),
            Method::OPTIONS => handler.options(request),
            _ => Ok(unsupported(&method)),
        };
        future::ready(response)
    }
}

fn unsupported(method: &Method) -> Response<Body> {
    let mut response = Response::new(Body::from(format!("Unsupported method ('{}')", method)));
    *response.status_mut() = StatusCode::NOT_IMPLEMENTED;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, http::HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}
