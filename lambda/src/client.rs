use crate::Error;
use http::{uri::PathAndQuery, Request, Response, Uri};
use hyper::{client::HttpConnector, Body};

/// Runtime API client that resolves request paths against a fixed endpoint.
#[derive(Debug, Clone)]
pub(crate) struct Client {
    base: Uri,
    client: hyper::Client<HttpConnector>,
}

impl Client {
    /// `endpoint` is a bare `host:port`, as found in `AWS_LAMBDA_RUNTIME_API`.
    pub(crate) fn new(endpoint: &str) -> Result<Self, Error> {
        let base = Uri::builder()
            .scheme("http")
            .authority(endpoint)
            .path_and_query("/")
            .build()?;
        Ok(Client {
            base,
            client: hyper::Client::new(),
        })
    }

    pub(crate) async fn call(&self, req: Request<Body>) -> Result<Response<Body>, Error> {
        let req = self.set_origin(req)?;
        let res = self.client.request(req).await?;
        Ok(res)
    }

    fn set_origin(&self, req: Request<Body>) -> Result<Request<Body>, Error> {
        let (mut parts, body) = req.into_parts();
        let path = parts
            .uri
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));
        let mut uri = self.base.clone().into_parts();
        uri.path_and_query = Some(path);
        parts.uri = Uri::from_parts(uri)?;
        Ok(Request::from_parts(parts, body))
    }
}
