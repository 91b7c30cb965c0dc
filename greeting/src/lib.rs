#![deny(missing_docs)]

//! A JSON greeting function.
//!
//! `POST` a JSON object such as `{"name": "名前"}` and the function answers
//! `200` with `{"greeting": "hello, 名前"}`. When the body has no string
//! `name` the greeting goes to `someone`. Text is carried as UTF-8 end to end,
//! so any Unicode name comes back exactly as it was sent.
//!
//! Bodies that are not UTF-8 or not JSON fail the invocation with a
//! [`GreetingError`] instead of producing a greeting.

use nowfn_http::{
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    runtime::Error,
    Body, MethodHandler, Request, Response,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

pub mod json;

/// Who gets greeted when the request doesn't name anyone.
pub const DEFAULT_NAME: &str = "someone";

/// Text placed in front of the name.
pub const GREETING_PREFIX: &str = "hello, ";

/// Reasons a request body can't be greeted.
#[derive(thiserror::Error, Debug)]
pub enum GreetingError {
    /// The body is not UTF-8 text.
    #[error("request body is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),
    /// The body is not JSON.
    #[error("request body is not valid JSON: {0}")]
    Parse(#[source] serde_json::Error),
    /// The greeting could not be written out.
    #[error("failed to encode greeting: {0}")]
    Encode(#[source] serde_json::Error),
}

/// The response document.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    /// `"hello, "` followed by the resolved name.
    pub greeting: String,
}

impl Greeting {
    /// Greets `name` verbatim.
    pub fn for_name(name: &str) -> Self {
        let mut greeting = String::with_capacity(GREETING_PREFIX.len() + name.len());
        greeting.push_str(GREETING_PREFIX);
        greeting.push_str(name);
        Greeting { greeting }
    }
}

/// The string `name` of a JSON object, or [`DEFAULT_NAME`].
///
/// Anything other than an object with a string `name` falls back to the
/// default, including arrays, scalars and non-string names.
pub fn resolve_name(value: &Value) -> &str {
    value.get("name").and_then(Value::as_str).unwrap_or(DEFAULT_NAME)
}

/// Answers a `POST` body with a greeting.
pub fn greet(body: &[u8]) -> Result<Response<Body>, GreetingError> {
    let text = std::str::from_utf8(body)?;
    let value: Value = serde_json::from_str(text).map_err(GreetingError::Parse)?;
    let name = resolve_name(&value);
    debug!(name, "greeting");

    let body = json::to_string(&Greeting::for_name(name)).map_err(GreetingError::Encode)?;
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::OK;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}

/// Serves [`greet`] for `POST`; other methods answer `501`.
///
/// The handler holds no state, one is built for every request.
#[derive(Debug, Default)]
pub struct GreetingHandler;

impl MethodHandler for GreetingHandler {
    fn post(&mut self, request: Request) -> Result<Response<Body>, Error> {
        Ok(greet(request.body().as_ref())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nowfn_http::{http::Method, per_request, Context, Handler};
    use serde_json::json;

    fn body(response: &Response<Body>) -> &[u8] {
        response.body().as_ref()
    }

    fn greeted(input: &str) -> String {
        let response = greet(input.as_bytes()).expect("greet failed");
        String::from_utf8(body(&response).to_vec()).expect("response is not UTF-8")
    }

    #[test]
    fn defaults_to_someone() {
        assert_eq!(greeted("{}"), r#"{"greeting": "hello, someone"}"#);
    }

    #[test]
    fn greets_ascii_names() {
        assert_eq!(greeted(r#"{"name": "Alice"}"#), r#"{"greeting": "hello, Alice"}"#);
    }

    #[test]
    fn preserves_unicode_names() {
        let out = greeted(r#"{"name": "名前"}"#);
        assert_eq!(out, r#"{"greeting": "hello, 名前"}"#);
        let value: Value = serde_json::from_str(&out).expect("response is not JSON");
        assert_eq!(value, json!({ "greeting": "hello, 名前" }));
    }

    #[test]
    fn preserves_four_byte_sequences() {
        let response = greet(r#"{"name": "🎉"}"#.as_bytes()).expect("greet failed");
        let bytes = body(&response);
        assert!(bytes.ends_with(&[0xf0, 0x9f, 0x8e, 0x89, b'"', b'}']));
        assert_eq!(bytes, r#"{"greeting": "hello, 🎉"}"#.as_bytes());
    }

    #[test]
    fn sets_status_and_content_type() {
        for input in &["{}", r#"{"name": "Alice"}"#, r#"{"name": "名前"}"#, "[]"] {
            let response = greet(input.as_bytes()).expect("greet failed");
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
            assert_eq!(response.headers().len(), 1);
        }
    }

    #[test]
    fn is_idempotent() {
        let input = r#"{"name": "Zoë 🎉", "other": [1, 2]}"#.as_bytes();
        let first = greet(input).expect("greet failed");
        let second = greet(input).expect("greet failed");
        assert_eq!(body(&first), body(&second));
    }

    #[test]
    fn responds_with_exactly_one_key() {
        let out = greeted(r#"{"name": "Alice", "greeting": "ignored", "extra": 1}"#);
        let value: Value = serde_json::from_str(&out).expect("response is not JSON");
        assert_eq!(value.as_object().map(|o| o.len()), Some(1));
        assert_eq!(value["greeting"], "hello, Alice");
    }

    #[test]
    fn falls_back_for_non_string_names() {
        assert_eq!(greeted(r#"{"name": 5}"#), r#"{"greeting": "hello, someone"}"#);
        assert_eq!(greeted(r#"{"name": null}"#), r#"{"greeting": "hello, someone"}"#);
        assert_eq!(greeted(r#"["name"]"#), r#"{"greeting": "hello, someone"}"#);
        assert_eq!(greeted(r#""Alice""#), r#"{"greeting": "hello, someone"}"#);
    }

    #[test]
    fn escapes_names_as_json() {
        let out = greeted(r#"{"name": "say \"hi\"\\"}"#);
        assert_eq!(out, r#"{"greeting": "hello, say \"hi\"\\"}"#);
    }

    #[test]
    fn rejects_invalid_utf8() {
        let err = greet(&[b'{', 0xff, b'}']).expect_err("invalid UTF-8 was greeted");
        assert!(matches!(err, GreetingError::Decode(_)));
    }

    #[test]
    fn rejects_invalid_json() {
        for input in &["", "{", "name=Alice"] {
            let err = greet(input.as_bytes()).expect_err("invalid JSON was greeted");
            assert!(matches!(err, GreetingError::Parse(_)), "{:?}", err);
        }
    }

    #[tokio::test]
    async fn serves_post_per_request() {
        let mut handler = per_request::<GreetingHandler>();
        let request = nowfn_http::http::Request::builder()
            .method(Method::POST)
            .body(Body::from(r#"{"name": "名前"}"#))
            .expect("failed to build request");
        let response = handler
            .call(request, Context::default())
            .await
            .expect("handler failed");
        assert_eq!(body(&response), r#"{"greeting": "hello, 名前"}"#.as_bytes());
    }

    #[tokio::test]
    async fn rejects_other_methods() {
        let mut handler = per_request::<GreetingHandler>();
        let request = nowfn_http::http::Request::builder()
            .method(Method::GET)
            .body(Body::Empty)
            .expect("failed to build request");
        let response = handler
            .call(request, Context::default())
            .await
            .expect("handler failed");
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }
}
