//! The object this plugin exposes.

use plugin_core::{RpcError, RpcObject};

use log::debug;
use serde_json::Value;

pub const ECHO_TYPE_NAME: &str = "Echo";

/// `Echo.Echo` returns its params unchanged, `Echo.Upper` upper-cases a string.
pub struct EchoObject;

impl RpcObject for EchoObject {
    fn type_name(&self) -> &str {
        ECHO_TYPE_NAME
    }

    fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        debug!("{ECHO_TYPE_NAME}.{method}({params})");

        match method {
            "Echo" => Ok(params),
            "Upper" => params
                .as_str()
                .map(|text| Value::from(text.to_uppercase()))
                .ok_or_else(|| RpcError::call(format!("Upper expects a string, got {params}"))),
            _ => Err(RpcError::call(format!(
                "Unknown method '{ECHO_TYPE_NAME}.{method}'"
            ))),
        }
    }
}
