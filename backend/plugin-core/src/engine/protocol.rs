//! Newline-delimited JSON call frames.

use crate::error::RpcError;

use common::ErrorLocation;

use std::panic::Location;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One call, one line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Correlates the reply; chosen by the caller.
    pub id: u64,
    /// `<Type>.<Method>`
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Reply to one [`Request`]. Exactly one of `result` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl Request {
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }

    /// Parse a request from one NDJSON line.
    #[track_caller]
    pub fn from_ndjson_line(line: &str) -> Result<Self, RpcError> {
        Ok(serde_json::from_str(line)?)
    }

    /// Serialize to an NDJSON line, newline included.
    pub fn to_ndjson_line(&self) -> Result<String, RpcError> {
        to_line(self)
    }
}

impl Response {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(message.into()),
        }
    }

    /// Parse a response from one NDJSON line.
    #[track_caller]
    pub fn from_ndjson_line(line: &str) -> Result<Self, RpcError> {
        Ok(serde_json::from_str(line)?)
    }

    /// Serialize to an NDJSON line, newline included.
    pub fn to_ndjson_line(&self) -> Result<String, RpcError> {
        to_line(self)
    }
}

fn to_line<T: Serialize>(value: &T) -> Result<String, RpcError> {
    let json = serde_json::to_string(value).map_err(|e| RpcError::Encode {
        message: e.to_string(),
        location: ErrorLocation::from(Location::caller()),
    })?;
    Ok(format!("{json}\n"))
}
