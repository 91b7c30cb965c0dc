use crate::{Config, Error};
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use std::{
    convert::TryFrom,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Diagnostic {
    pub(crate) error_type: String,
    pub(crate) error_message: String,
}

/// The invocation context sent to a function with every event.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Context {
    /// The request id generated by the Runtime API for this invocation.
    pub request_id: String,
    /// The execution deadline for the current invocation in milliseconds
    /// since the unix epoch.
    pub deadline: u64,
    /// The ARN of the function being invoked.
    pub invoked_function_arn: String,
    /// The X-Ray trace id for the current invocation.
    pub xray_trace_id: String,
    /// Configuration of the function's execution environment.
    pub env_config: Config,
}

impl Context {
    /// The deadline as a point in time.
    pub fn deadline(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.deadline)
    }
}

impl TryFrom<HeaderMap> for Context {
    type Error = Error;
    fn try_from(headers: HeaderMap) -> Result<Self, Self::Error> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
        };

        let request_id = header("lambda-runtime-aws-request-id").ok_or("missing lambda-runtime-aws-request-id header")?;
        let deadline = match header("lambda-runtime-deadline-ms") {
            Some(ms) => ms.parse::<u64>()?,
            None => 0,
        };

        Ok(Context {
            request_id,
            deadline,
            invoked_function_arn: header("lambda-runtime-invoked-function-arn").unwrap_or_default(),
            xray_trace_id: header("lambda-runtime-trace-id").unwrap_or_default(),
            env_config: Config::default(),
        })
    }
}
