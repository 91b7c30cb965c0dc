//! Response types

use crate::Body;
use http::{header::CONTENT_TYPE, Response};
use serde::Serialize;
use std::collections::BTreeMap;

/// The JSON result the host expects back for every invocation.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    /// The HTTP status code.
    pub status_code: u16,
    /// Response headers grouped by name, in name order.
    pub headers: BTreeMap<String, Vec<String>>,
    /// The response body, base64 encoded when it isn't valid UTF-8.
    pub body: String,
    /// `Some("base64")` when `body` is base64 encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

/// tranformation from http type to internal type
impl InvocationResult {
    /// Builds the invocation result for an `http::Response`.
    pub fn from_response<T>(value: Response<T>) -> Self
    where
        T: Into<Body>,
    {
        let (parts, bod) = value.into_parts();

        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in parts.headers.iter() {
            headers
                .entry(name.as_str().to_owned())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        let (body, encoding) = match bod.into() {
            Body::Empty => (String::new(), None),
            Body::Text(text) => (text, None),
            Body::Binary(bytes) => match String::from_utf8(bytes) {
                Ok(text) => (text, None),
                Err(err) => (base64::encode(err.as_bytes()), Some("base64".to_owned())),
            },
        };

        InvocationResult {
            status_code: parts.status.as_u16(),
            headers,
            body,
            encoding,
        }
    }
}

/// A conversion of self into a `Response<Body>` for various types.
///
/// Implementations for `Response<B> where B: Into<Body>`,
/// `B where B: Into<Body>` and `serde_json::Value` are provided
/// by default.
pub trait IntoResponse {
    /// Return a translation of `self` into a `Response<Body>`
    fn into_response(self) -> Response<Body>;
}

impl<B> IntoResponse for Response<B>
where
    B: Into<Body>,
{
    fn into_response(self) -> Response<Body> {
        let (parts, body) = self.into_parts();
        Response::from_parts(parts, body.into())
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response<Body> {
        Response::new(Body::from(self))
    }
}

impl IntoResponse for &str {
    fn into_response(self) -> Response<Body> {
        Response::new(Body::from(self))
    }
}

impl IntoResponse for serde_json::Value {
    fn into_response(self) -> Response<Body> {
        let mut response = match serde_json::to_string(&self) {
            Ok(json) => Response::new(Body::from(json)),
            Err(err) => {
                let mut response = Response::new(Body::from(format!("Failed to encode response: {}", err)));
                *response.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
                return response;
            }
        };
        response
            .headers_mut()
            .insert(CONTENT_TYPE, http::HeaderValue::from_static("application/json"));
        response
    }
}
