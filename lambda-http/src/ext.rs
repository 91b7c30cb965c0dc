//! Extension methods for `http::Request` types

use crate::{strmap::StrMap, Body};
use serde::de::DeserializeOwned;

/// Request payload deserialization errors
///
/// Returned by [`RequestExt#payload()`](trait.RequestExt.html#tymethod.payload)
#[derive(thiserror::Error, Debug)]
pub enum PayloadError {
    /// Returned when `application/json` bodies fail to deserialize a payload
    #[error("failed to parse payload from application/json {0}")]
    Json(serde_json::Error),
    /// Returned when `application/x-www-form-urlencoded` bodies fail to deserialize a payload
    #[error("failed to parse payload from application/x-www-form-urlencoded {0}")]
    WwwFormUrlEncoded(serde_urlencoded::de::Error),
}

/// ALB/API gateway style query string parameters, parsed from the request path.
pub(crate) struct QueryStringParameters(pub(crate) StrMap);

/// The client address reported by the host.
#[derive(Clone, Debug)]
pub(crate) struct RemoteAddr(pub(crate) String);

/// Extensions for `nowfn_http::Request` structs that
/// provide access to data the host bridge attaches to every request.
///
/// # Examples
///
/// A request handler with access to query string parameters
///
/// ```rust,no_run
/// use nowfn_http::{function, IntoResponse, Request, RequestExt};
/// use nowfn_http::runtime::{Context, Error};
///
/// #[function(http)]
/// #[tokio::main]
/// async fn main(request: Request, _: Context) -> Result<impl IntoResponse, Error> {
///     Ok(format!(
///         "hello, {}",
///         request
///             .query_string_parameters()
///             .get("name")
///             .unwrap_or("someone")
///     ))
/// }
/// ```
///
/// Request handler with access to a typed payload
///
/// ```rust,no_run
/// use nowfn_http::{function, IntoResponse, Request, RequestExt};
/// use nowfn_http::runtime::{Context, Error};
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Debug, Deserialize, Default)]
/// struct Args {
///     name: String,
/// }
///
/// #[function(http)]
/// #[tokio::main]
/// async fn main(request: Request, _: Context) -> Result<impl IntoResponse, Error> {
///     let args: Args = request.payload()
///         .unwrap_or_else(|_parse_err| None)
///         .unwrap_or_default();
///     Ok(json!({ "greeting": format!("hello, {}", args.name) }))
/// }
/// ```
pub trait RequestExt {
    /// Return pre-parsed http query string parameters, parameters
    /// provided after the `?` portion of a url,
    /// associated with the request
    ///
    /// The yielded value represents both single and multi-valued
    /// parameters alike. When multiple query string parameters with the same
    /// name are expected, `query_string_parameters().get_all("many")` to retrieve them all.
    ///
    /// No query parameters
    /// will yield an empty `StrMap`.
    fn query_string_parameters(&self) -> StrMap;

    /// Configures instance with query string parameters under `#[cfg(test)]` configurations
    ///
    /// This is intended for use in mock testing contexts.
    fn with_query_string_parameters<Q>(self, parameters: Q) -> Self
    where
        Q: Into<StrMap>;

    /// Return the client address forwarded by the host, taken from
    /// `x-forwarded-for`, `x-real-ip` or the payload's `true-client-ip`
    /// in that order of preference.
    fn remote_addr(&self) -> Option<&str>;

    /// Return the Result of a payload parsed into a serde Deserializeable
    /// type
    ///
    /// Currently only `application/x-www-form-urlencoded`
    /// and `application/json` flavors of content type
    /// are supported
    ///
    /// A [PayloadError](enum.PayloadError.html) will be returned for undeserializable
    /// payloads. If no body is provided, `Ok(None)` will be returned.
    fn payload<D>(&self) -> Result<Option<D>, PayloadError>
    where
        for<'de> D: DeserializeOwned;
}

impl RequestExt for http::Request<Body> {
    fn query_string_parameters(&self) -> StrMap {
        self.extensions()
            .get::<QueryStringParameters>()
            .map(|ext| ext.0.clone())
            .unwrap_or_default()
    }

    fn with_query_string_parameters<Q>(self, parameters: Q) -> Self
    where
        Q: Into<StrMap>,
    {
        let mut s = self;
        s.extensions_mut().insert(QueryStringParameters(parameters.into()));
        s
    }

    fn remote_addr(&self) -> Option<&str> {
        self.extensions().get::<RemoteAddr>().map(|addr| addr.0.as_str())
    }

    fn payload<D>(&self) -> Result<Option<D>, PayloadError>
    where
        for<'de> D: DeserializeOwned,
    {
        if let Body::Empty = self.body() {
            return Ok(None);
        }
        self.headers()
            .get(http::header::CONTENT_TYPE)
            .map(|ct| match ct.to_str() {
                Ok(content_type) => {
                    if content_type.starts_with("application/x-www-form-urlencoded") {
                        return serde_urlencoded::from_bytes::<D>(self.body().as_ref())
                            .map_err(PayloadError::WwwFormUrlEncoded)
                            .map(Some);
                    } else if content_type.starts_with("application/json") {
                        return serde_json::from_slice::<D>(self.body().as_ref())
                            .map_err(PayloadError::Json)
                            .map(Some);
                    }

                    Ok(None)
                }
                _ => Ok(None),
            })
            .unwrap_or_else(|| Ok(None))
    }
}

#[cfg(test)]
mod tests {
    use crate::{Body, Request, RequestExt, StrMap};
    use serde::Deserialize;
    use std::collections::HashMap;

    #[test]
    fn requests_can_mock_query_string_parameters_ext() {
        let mocked: HashMap<String, String> = hashmap! {
            "foo".into() => "bar".into()
        };
        let request = Request::default().with_query_string_parameters(mocked.clone());
        assert_eq!(request.query_string_parameters(), StrMap::from(mocked));
    }

    #[test]
    fn requests_have_form_post_parsable_payloads() {
        #[derive(Deserialize, PartialEq, Debug)]
        struct Payload {
            foo: String,
            baz: usize,
        }
        let request = http::Request::builder()
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Body::from("foo=bar&baz=2"))
            .expect("failed to build request");
        let payload: Option<Payload> = request.payload().unwrap_or_default();
        assert_eq!(
            payload,
            Some(Payload {
                foo: "bar".into(),
                baz: 2
            })
        );
    }

    #[test]
    fn requests_have_json_parseable_payloads() {
        #[derive(Deserialize, PartialEq, Debug)]
        struct Payload {
            name: String,
        }
        let request = http::Request::builder()
            .header("Content-Type", "application/json")
            .body(Body::from(r#"{"name": "🎉"}"#))
            .expect("failed to build request");
        let payload: Option<Payload> = request.payload().unwrap_or_default();
        assert_eq!(payload, Some(Payload { name: "🎉".into() }));
    }

    #[test]
    fn requests_without_content_type_have_no_payload() {
        #[derive(Deserialize, PartialEq, Debug)]
        struct Payload {
            name: String,
        }
        let request = http::Request::builder()
            .body(Body::from(r#"{"name": "x"}"#))
            .expect("failed to build request");
        let payload: Option<Payload> = request.payload().expect("payload failed");
        assert_eq!(payload, None);
    }

    #[test]
    fn requests_report_malformed_json_payloads() {
        #[derive(Deserialize, Debug)]
        struct Payload {
            #[allow(dead_code)]
            name: String,
        }
        let request = http::Request::builder()
            .header("Content-Type", "application/json")
            .body(Body::from("{"))
            .expect("failed to build request");
        let payload: Result<Option<Payload>, _> = request.payload();
        assert!(matches!(payload, Err(super::PayloadError::Json(_))));
    }

    #[test]
    fn requests_without_remote_addr() {
        assert_eq!(Request::default().remote_addr(), None);
    }
}
