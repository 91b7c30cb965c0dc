//! An in-process Runtime API used to exercise functions without a real host.
//!
//! ```no_run
//! # async fn demo() -> Result<(), nowfn_runtime::Error> {
//! use nowfn_runtime::{handler_fn, simulated::Server, Context, Error, Runtime};
//! use serde_json::Value;
//!
//! let server = Server::start().await?;
//! server.enqueue("req-1", br#"{"hello":"world"}"#.to_vec());
//!
//! let runtime = Runtime::new(server.config())?;
//! let echo = handler_fn(|event: Value, _: Context| async move { Ok::<_, Error>(event) });
//! runtime.run_invocations(echo, 1).await?;
//!
//! assert!(server.response("req-1").is_some());
//! # Ok(())
//! # }
//! ```
use crate::{Config, Error};
use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use hyper::{
    service::{make_service_fn, service_fn},
    Body, Server as HyperServer,
};
use std::{
    collections::{HashMap, VecDeque},
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, Mutex},
};
use tracing::debug;

const INVOCATION_PREFIX: &str = "/2018-06-01/runtime/invocation/";

/// Deadline handed out with every simulated invocation.
pub const DEADLINE_MS: u64 = 1_542_409_706_888;

#[derive(Debug, Default)]
struct State {
    pending: VecDeque<(String, Bytes)>,
    responses: HashMap<String, Bytes>,
    errors: HashMap<String, Bytes>,
}

/// A running simulated Runtime API bound to a loopback port.
#[derive(Debug, Clone)]
pub struct Server {
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
}

impl Server {
    /// Binds an ephemeral loopback port and serves the Runtime API on it.
    pub async fn start() -> Result<Self, Error> {
        let state = Arc::new(Mutex::new(State::default()));
        let svc_state = state.clone();
        let make_svc = make_service_fn(move |_| {
            let state = svc_state.clone();
            async move { Ok::<_, Infallible>(service_fn(move |req| handle(req, state.clone()))) }
        });

        let server = HyperServer::try_bind(&SocketAddr::from(([127, 0, 0, 1], 0)))?.serve(make_svc);
        let addr = server.local_addr();
        tokio::spawn(async move {
            if let Err(err) = server.await {
                debug!("simulated runtime API stopped: {}", err);
            }
        });

        Ok(Server { addr, state })
    }

    /// The `host:port` the server listens on.
    pub fn endpoint(&self) -> String {
        self.addr.to_string()
    }

    /// A function configuration pointing at this server.
    pub fn config(&self) -> Config {
        Config {
            endpoint: self.endpoint(),
            function_name: "simulated".to_owned(),
            memory: 128,
            version: "$LATEST".to_owned(),
            log_stream: "simulated".to_owned(),
            log_group: "simulated".to_owned(),
        }
    }

    /// Queues an event to be returned by the next `invocation/next` poll.
    pub fn enqueue(&self, request_id: &str, event: impl Into<Bytes>) {
        self.lock().pending.push_back((request_id.to_owned(), event.into()));
    }

    /// The result the function posted for `request_id`, if any.
    pub fn response(&self, request_id: &str) -> Option<Bytes> {
        self.lock().responses.get(request_id).cloned()
    }

    /// The error the function posted for `request_id`, if any.
    pub fn error(&self, request_id: &str) -> Option<Bytes> {
        self.lock().errors.get(request_id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // a panicking test thread must not hide the recorded results
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn handle(req: Request<Body>, state: Arc<Mutex<State>>) -> Result<Response<Body>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let rest = match path.strip_prefix(INVOCATION_PREFIX) {
        Some(rest) => rest.to_owned(),
        None => return Ok(status(StatusCode::NOT_FOUND)),
    };

    if method == Method::GET && rest == "next" {
        let next = state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pending
            .pop_front();
        let res = match next {
            Some((request_id, event)) => Response::builder()
                .status(StatusCode::OK)
                .header("lambda-runtime-aws-request-id", request_id)
                .header("lambda-runtime-deadline-ms", DEADLINE_MS)
                .header("lambda-runtime-invoked-function-arn", "arn:aws:lambda:simulated")
                .header("lambda-runtime-trace-id", "Root=simulated")
                .body(Body::from(event))
                .unwrap_or_else(|_| status(StatusCode::INTERNAL_SERVER_ERROR)),
            None => status(StatusCode::NO_CONTENT),
        };
        return Ok(res);
    }

    if method != Method::POST {
        return Ok(status(StatusCode::METHOD_NOT_ALLOWED));
    }

    let mut segments = rest.splitn(2, '/');
    let (request_id, kind) = match (segments.next(), segments.next()) {
        (Some(id), Some(kind)) => (id.to_owned(), kind.to_owned()),
        _ => return Ok(status(StatusCode::NOT_FOUND)),
    };
    let body = match hyper::body::to_bytes(req.into_body()).await {
        Ok(body) => body,
        Err(_) => return Ok(status(StatusCode::BAD_REQUEST)),
    };

    let mut state = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    match kind.as_str() {
        "response" => {
            state.responses.insert(request_id, body);
        }
        "error" => {
            state.errors.insert(request_id, body);
        }
        _ => return Ok(status(StatusCode::NOT_FOUND)),
    }
    Ok(status(StatusCode::ACCEPTED))
}

fn status(code: StatusCode) -> Response<Body> {
    let mut res = Response::new(Body::empty());
    *res.status_mut() = code;
    res
}
