//! Stratum protocol message definitions

use crate::core::{JobId, JobParams};
use crate::error::{Error, Result};
use crate::share::Submission;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stratum protocol methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StratumMethod {
    /// Client subscribes to mining notifications
    Subscribe,
    /// Client authorizes with credentials
    Authorize,
    /// Server notifies client of new work
    Notify,
    /// Client submits a share
    Submit,
    /// Server sets the share target
    SetTarget,
    /// Unknown method
    Unknown(String),
}

impl StratumMethod {
    /// Parse method from string
    pub fn parse_method(s: &str) -> Self {
        match s {
            "mining.subscribe" => Self::Subscribe,
            "mining.authorize" => Self::Authorize,
            "mining.notify" => Self::Notify,
            "mining.submit" => Self::Submit,
            "mining.set_target" => Self::SetTarget,
            _ => Self::Unknown(s.to_string()),
        }
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Subscribe => "mining.subscribe",
            Self::Authorize => "mining.authorize",
            Self::Notify => "mining.notify",
            Self::Submit => "mining.submit",
            Self::SetTarget => "mining.set_target",
            Self::Unknown(s) => s,
        }
    }
}

/// Stratum request message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StratumRequest {
    /// Request ID
    pub id: Value,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default)]
    pub params: Vec<Value>,
}

impl StratumRequest {
    /// Create a new request
    pub fn new(id: impl Into<Value>, method: &str, params: Vec<Value>) -> Self {
        Self {
            id: id.into(),
            method: method.to_string(),
            params,
        }
    }

    /// Get the method as enum
    pub fn method_enum(&self) -> StratumMethod {
        StratumMethod::parse_method(&self.method)
    }
}

/// Stratum response message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StratumResponse {
    /// Request ID this responds to
    pub id: Value,
    /// Result if successful
    pub result: Option<Value>,
    /// Error as `[code, message, null]` if failed
    pub error: Option<Value>,
}

impl StratumResponse {
    /// Create a successful response
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Value, code: i32, message: &str) -> Self {
        Self {
            id,
            result: None,
            error: Some(Value::Array(vec![
                Value::Number(code.into()),
                Value::String(message.to_string()),
                Value::Null,
            ])),
        }
    }

    /// Error code, if this is an error response
    pub fn error_code(&self) -> Option<i64> {
        self.error.as_ref()?.get(0)?.as_i64()
    }
}

/// Stratum notification (null ID)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StratumNotification {
    /// Method name
    pub method: String,
    /// Method parameters
    pub params: Vec<Value>,
    /// Always null for notifications
    pub id: Value,
}

impl StratumNotification {
    /// Create a new notification
    pub fn new(method: &str, params: Vec<Value>) -> Self {
        Self {
            method: method.to_string(),
            params,
            id: Value::Null,
        }
    }

    /// `mining.notify` for a job
    pub fn notify(job: &JobParams) -> Self {
        Self::new(StratumMethod::Notify.as_str(), job.to_params())
    }

    /// `mining.set_target` with a hex share target
    pub fn set_target(target_hex: &str) -> Self {
        Self::new(
            StratumMethod::SetTarget.as_str(),
            vec![Value::String(target_hex.to_string())],
        )
    }
}

fn string_param(params: &[Value], index: usize, name: &str) -> Result<String> {
    params
        .get(index)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::invalid_encoding(format!("Missing or non-string {} parameter", name)))
}

impl Submission {
    /// Parse `mining.submit` params `[worker, job_id, time, extranonce2, solution]`
    /// for a session whose extra-nonce prefix is `extranonce1`.
    ///
    /// Only the shape is checked here; sizes are checked by the share pipeline.
    pub fn from_params(params: &[Value], extranonce1: &str) -> Result<Self> {
        Ok(Self {
            worker: string_param(params, 0, "worker")?,
            job_id: JobId::from_string(string_param(params, 1, "job_id")?),
            time: string_param(params, 2, "time")?,
            extranonce1: extranonce1.to_string(),
            extranonce2: string_param(params, 3, "extranonce2")?,
            solution: string_param(params, 4, "solution")?,
        })
    }
}
