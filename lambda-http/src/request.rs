//! Invocation event adaptations
//!
//! The host wraps every HTTP request in an invocation event. Its `body` is a
//! JSON document describing the request (method, path, headers and an
//! optionally base64 encoded body), which is converted here into an
//! `http::Request<Body>`. Query string parameters and the client address are
//! exposed through [`RequestExt`](crate::RequestExt).
use crate::{
    ext::{QueryStringParameters, RemoteAddr},
    strmap::StrMap,
    Body,
};
use http::header::{HeaderMap, HeaderName, HeaderValue, HOST};
use serde::Deserialize;
use std::{collections::HashMap, io::Read};

/// An invocation event as delivered by the host.
///
/// Only `body` is read; the host may send other fields alongside it.
#[derive(Deserialize, Debug, Clone)]
pub struct InvocationEvent {
    /// The JSON encoded [`RequestPayload`].
    pub body: String,
}

/// The HTTP request described by an invocation event.
#[doc(hidden)]
#[derive(Deserialize, Debug, Clone)]
pub struct RequestPayload {
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub headers: HashMap<String, HeaderValues>,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, rename = "true-client-ip")]
    pub true_client_ip: Option<String>,
}

/// Header values are sent as a plain string, or as a list when repeated.
#[doc(hidden)]
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum HeaderValues {
    One(String),
    Many(Vec<String>),
}

impl HeaderValues {
    fn iter(&self) -> impl Iterator<Item = &str> {
        let values: &[String] = match self {
            HeaderValues::One(value) => std::slice::from_ref(value),
            HeaderValues::Many(values) => values,
        };
        values.iter().map(String::as_str)
    }
}

/// Errors raised while turning an invocation event into a request.
#[derive(thiserror::Error, Debug)]
pub enum RequestError {
    /// The event body is not a valid request payload
    #[error("invalid request payload: {0}")]
    Payload(#[from] serde_json::Error),
    /// The payload names a method `http` can't represent
    #[error("invalid request method: {0}")]
    Method(#[from] http::method::InvalidMethod),
    /// A header name or value is not valid HTTP
    #[error("invalid request header {0}")]
    Header(String),
    /// The payload path is not absolute
    #[error("invalid request path {0:?}: expected a leading '/'")]
    Path(String),
    /// The request could not be assembled, typically due to the path
    #[error("invalid request: {0}")]
    Http(#[from] http::Error),
    /// The payload claims base64 encoding but the body isn't
    #[error("invalid base64 request body: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl InvocationEvent {
    /// Decodes the payload carried by this event into an `http::Request`.
    pub fn into_request(self) -> Result<crate::Request, RequestError> {
        let payload: RequestPayload = serde_json::from_str(&self.body)?;
        payload.into_request()
    }
}

impl RequestPayload {
    pub(crate) fn into_request(self) -> Result<crate::Request, RequestError> {
        let method = http::Method::from_bytes(self.method.as_bytes())?;
        let headers = into_header_map(&self.headers)?;
        if !self.path.starts_with('/') {
            return Err(RequestError::Path(self.path));
        }

        let uri = {
            let scheme = first(&headers, x_forwarded_proto()).unwrap_or("http");
            let host = first(&headers, HOST).unwrap_or("lambda");
            format!("{}://{}{}", scheme, host, self.path)
        };
        let remote_addr = first(&headers, x_forwarded_for())
            .or_else(|| first(&headers, x_real_ip()))
            .map(str::to_owned)
            .or(self.true_client_ip);

        let body = match (self.body, self.encoding.as_deref()) {
            (None, _) => Body::Empty,
            (Some(body), _) if body.is_empty() => Body::Empty,
            (Some(body), Some("base64")) => Body::Binary(base64::decode(body)?),
            (Some(body), _) => Body::Text(body),
        };

        let mut builder = http::Request::builder().method(method).uri(uri);
        if let Some(remote_addr) = remote_addr {
            builder = builder.extension(RemoteAddr(remote_addr));
        }
        let mut req = builder.body(body)?;

        let query = req
            .uri()
            .query()
            .map(|query| serde_urlencoded::from_str::<Vec<(String, String)>>(query).unwrap_or_default())
            .unwrap_or_default();
        req.extensions_mut()
            .insert(QueryStringParameters(query.into_iter().collect::<StrMap>()));

        // no builder method that sets headers in batch
        *req.headers_mut() = headers;

        Ok(req)
    }
}

fn into_header_map(headers: &HashMap<String, HeaderValues>) -> Result<HeaderMap, RequestError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, values) in headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| RequestError::Header(name.clone()))?;
        for value in values.iter() {
            let value = HeaderValue::from_bytes(value.as_bytes()).map_err(|_| RequestError::Header(name.clone()))?;
            map.append(header_name.clone(), value);
        }
    }
    Ok(map)
}

fn first<K: http::header::AsHeaderName>(headers: &HeaderMap, name: K) -> Option<&str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Deserializes a `Request` from a `Read` impl providing a JSON invocation event.
///
/// # Example
///
/// ```rust,no_run
/// use nowfn_http::request::from_reader;
/// use std::fs::File;
/// use std::error::Error;
///
/// fn main() -> Result<(), Box<dyn Error>> {
///     let request = from_reader(
///         File::open("path/to/event.json")?
///     )?;
///     Ok(println!("{:#?}", request))
/// }
/// ```
pub fn from_reader<R>(rdr: R) -> Result<crate::Request, RequestError>
where
    R: Read,
{
    let event: InvocationEvent = serde_json::from_reader(rdr)?;
    event.into_request()
}

/// Deserializes a `Request` from a string of JSON invocation event text.
///
/// # Example
///
/// ```rust,no_run
/// use nowfn_http::request::from_str;
/// use std::error::Error;
///
/// fn main() -> Result<(), Box<dyn Error>> {
///     let request = from_str(
///         r#"{ ...raw json here... }"#
///     )?;
///     Ok(println!("{:#?}", request))
/// }
/// ```
pub fn from_str(s: &str) -> Result<crate::Request, RequestError> {
    let event: InvocationEvent = serde_json::from_str(s)?;
    event.into_request()
}

fn x_forwarded_proto() -> HeaderName {
    HeaderName::from_static("x-forwarded-proto")
}

fn x_forwarded_for() -> HeaderName {
    HeaderName::from_static("x-forwarded-for")
}

fn x_real_ip() -> HeaderName {
    HeaderName::from_static("x-real-ip")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RequestExt;
    use serde_json::json;

    fn request(payload: serde_json::Value) -> crate::Request {
        let event = json!({ "Action": "Invoke", "body": payload.to_string() });
        from_str(&event.to_string()).expect("failed to build request")
    }

    #[test]
    fn builds_request_from_payload() {
        let req = request(json!({
            "method": "POST",
            "path": "/api/greet?lang=en&lang=fr",
            "headers": {
                "host": "example.com",
                "x-forwarded-proto": "https",
                "content-type": "application/json"
            },
            "body": "{\"name\":\"名前\"}"
        }));

        assert_eq!(req.method(), http::Method::POST);
        assert_eq!(req.uri().to_string(), "https://example.com/api/greet?lang=en&lang=fr");
        assert_eq!(req.headers()["content-type"], "application/json");
        assert_eq!(req.query_string_parameters().get_all("lang"), Some(vec!["en", "fr"]));
        match req.body() {
            Body::Text(text) => assert_eq!(text, "{\"name\":\"名前\"}"),
            _ => panic!("expected a text body"),
        }
    }

    #[test]
    fn defaults_scheme_and_host() {
        let req = request(json!({ "method": "GET", "path": "/" }));
        assert_eq!(req.uri().to_string(), "http://lambda/");
        assert!(matches!(req.body(), Body::Empty));
        assert!(req.query_string_parameters().is_empty());
        assert_eq!(req.remote_addr(), None);
    }

    #[test]
    fn decodes_base64_bodies() {
        let req = request(json!({
            "method": "POST",
            "path": "/",
            "headers": {},
            "encoding": "base64",
            "body": base64::encode("🎉".as_bytes())
        }));
        match req.body() {
            Body::Binary(bytes) => assert_eq!(bytes.as_slice(), "🎉".as_bytes()),
            _ => panic!("expected a binary body"),
        }
    }

    #[test]
    fn rejects_invalid_base64() {
        let event = json!({
            "body": json!({ "method": "POST", "path": "/", "encoding": "base64", "body": "***" }).to_string()
        });
        assert!(matches!(from_str(&event.to_string()), Err(RequestError::Base64(_))));
    }

    #[test]
    fn rejects_invalid_payload() {
        let event = json!({ "body": "{\"path\": \"/\"}" });
        assert!(matches!(from_str(&event.to_string()), Err(RequestError::Payload(_))));
    }

    #[test]
    fn rejects_invalid_method() {
        let event = json!({ "body": json!({ "method": "GE T", "path": "/" }).to_string() });
        assert!(matches!(from_str(&event.to_string()), Err(RequestError::Method(_))));
    }

    #[test]
    fn rejects_invalid_uri() {
        let event = json!({ "body": json!({ "method": "GET", "path": "/a b" }).to_string() });
        assert!(matches!(from_str(&event.to_string()), Err(RequestError::Http(_))));
    }

    #[test]
    fn rejects_relative_paths() {
        let event = json!({ "body": json!({ "method": "GET", "path": "api" }).to_string() });
        match from_str(&event.to_string()) {
            Err(RequestError::Path(path)) => assert_eq!(path, "api"),
            other => panic!("expected a path error, got {:?}", other),
        }
    }

    #[test]
    fn rejects_invalid_header() {
        let value = json!({ "body": json!({
            "method": "GET",
            "path": "/",
            "headers": { "x-name": "line\nbreak" }
        }).to_string() });
        match from_str(&value.to_string()) {
            Err(RequestError::Header(name)) => assert_eq!(name, "x-name"),
            other => panic!("expected a header error, got {:?}", other),
        }

        let name = json!({ "body": json!({
            "method": "GET",
            "path": "/",
            "headers": { "bad name": "value" }
        }).to_string() });
        assert!(matches!(from_str(&name.to_string()), Err(RequestError::Header(_))));
    }

    #[test]
    fn reads_events_from_readers() {
        let event = json!({ "body": json!({ "method": "POST", "path": "/greet", "body": "{}" }).to_string() });
        let bytes = event.to_string().into_bytes();
        let req = from_reader(bytes.as_slice()).expect("failed to read request");
        assert_eq!(req.method(), http::Method::POST);
        assert_eq!(req.uri().path(), "/greet");

        assert!(matches!(from_reader(&b"{"[..]), Err(RequestError::Payload(_))));
    }

    #[test]
    fn keeps_repeated_headers() {
        let req = request(json!({
            "method": "GET",
            "path": "/",
            "headers": { "accept": ["text/html", "application/json"] }
        }));
        let accept: Vec<_> = req.headers().get_all("accept").iter().collect();
        assert_eq!(accept, vec!["text/html", "application/json"]);
    }

    #[test]
    fn resolves_remote_addr() {
        let forwarded = request(json!({
            "method": "GET",
            "path": "/",
            "headers": { "x-forwarded-for": "10.0.0.1", "x-real-ip": "10.0.0.2" },
            "true-client-ip": "10.0.0.3"
        }));
        assert_eq!(forwarded.remote_addr(), Some("10.0.0.1"));

        let real = request(json!({
            "method": "GET",
            "path": "/",
            "headers": { "x-real-ip": "10.0.0.2" },
            "true-client-ip": "10.0.0.3"
        }));
        assert_eq!(real.remote_addr(), Some("10.0.0.2"));

        let client = request(json!({ "method": "GET", "path": "/", "true-client-ip": "10.0.0.3" }));
        assert_eq!(client.remote_addr(), Some("10.0.0.3"));
    }
}
