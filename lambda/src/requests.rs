use crate::{types::Diagnostic, Error};
use http::{Method, Request, Uri};
use hyper::Body;
use serde::Serialize;

const USER_AGENT: &str = concat!("nowfn_runtime/", env!("CARGO_PKG_VERSION"));

pub(crate) trait IntoRequest {
    fn into_req(self) -> Result<Request<Body>, Error>;
}

// /runtime/invocation/next
#[derive(Debug, PartialEq)]
pub(crate) struct NextEventRequest;

impl IntoRequest for NextEventRequest {
    fn into_req(self) -> Result<Request<Body>, Error> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(Uri::from_static("/2018-06-01/runtime/invocation/next"))
            .header("user-agent", USER_AGENT)
            .body(Body::empty())?;
        Ok(req)
    }
}

// /runtime/invocation/{AwsRequestId}/response
pub(crate) struct EventCompletionRequest<'a, T> {
    pub(crate) request_id: &'a str,
    pub(crate) body: T,
}

impl<'a, T> IntoRequest for EventCompletionRequest<'a, T>
where
    T: Serialize,
{
    fn into_req(self) -> Result<Request<Body>, Error> {
        let uri = format!("/2018-06-01/runtime/invocation/{}/response", self.request_id);
        let uri = Uri::from_maybe_shared(uri)?;
        let body = serde_json::to_vec(&self.body)?;
        let req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("user-agent", USER_AGENT)
            .header("content-type", "application/json")
            .body(Body::from(body))?;
        Ok(req)
    }
}

// /runtime/invocation/{AwsRequestId}/error
pub(crate) struct EventErrorRequest<'a> {
    pub(crate) request_id: &'a str,
    pub(crate) diagnostic: Diagnostic,
}

impl<'a> IntoRequest for EventErrorRequest<'a> {
    fn into_req(self) -> Result<Request<Body>, Error> {
        let uri = format!("/2018-06-01/runtime/invocation/{}/error", self.request_id);
        let uri = Uri::from_maybe_shared(uri)?;
        let body = serde_json::to_vec(&self.diagnostic)?;
        let req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("user-agent", USER_AGENT)
            .header("content-type", "application/json")
            .header("lambda-runtime-function-error-type", "unhandled")
            .body(Body::from(body))?;
        Ok(req)
    }
}
