//! Control surface: lets the host end the plugin process remotely.

use crate::engine::RpcObject;
use crate::error::RpcError;
use crate::shutdown::ShutdownSignal;

use common::ErrorLocation;
use models::ShutdownMode;

use std::fs::remove_file;
use std::panic::Location;
use std::path::PathBuf;
use std::process::exit;
use std::sync::{Arc, OnceLock};

use log::{debug, info, warn};
use serde_json::Value;

/// Name under which the control object is exposed.
pub const CONTROL_TYPE_NAME: &str = "PluginControl";

/// Procedure that terminates the plugin.
pub const EXIT_METHOD: &str = "Exit";

/// Built-in object registered on every server.
///
/// `Exit` takes an integer status. In immediate mode the process ends on the
/// spot and the call never replies. In graceful mode the status is handed to
/// the shutdown signal, the call replies `null`, and the server drains.
///
/// `process::exit` runs no destructors, so the unix socket file recorded in
/// [`PluginControl::socket_path_slot`] is removed by hand before exiting.
pub struct PluginControl {
    mode: ShutdownMode,
    shutdown: ShutdownSignal,
    socket_path: Arc<OnceLock<PathBuf>>,
}

impl PluginControl {
    pub fn new(mode: ShutdownMode, shutdown: ShutdownSignal) -> Self {
        Self {
            mode,
            shutdown,
            socket_path: Arc::default(),
        }
    }

    /// Slot the server fills with the bound unix socket path once bootstrap succeeds.
    pub fn socket_path_slot(&self) -> Arc<OnceLock<PathBuf>> {
        Arc::clone(&self.socket_path)
    }

    pub(crate) fn release_socket(&self) {
        let Some(path) = self.socket_path.get() else {
            return;
        };

        match remove_file(path) {
            Ok(()) => debug!("Removed socket file {} before exit", path.display()),
            Err(e) => warn!("Failed to remove socket file {}: {e}", path.display()),
        }
    }

    #[track_caller]
    fn parse_status(params: &Value) -> Result<i32, RpcError> {
        params
            .as_i64()
            .and_then(|status| i32::try_from(status).ok())
            .ok_or_else(|| RpcError::Call {
                message: format!("{EXIT_METHOD} expects an integer status, got {params}"),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    fn exit(&self, status: i32) -> Result<Value, RpcError> {
        match self.mode {
            ShutdownMode::Immediate => {
                info!("Host requested exit with status {status}");
                self.release_socket();
                exit(status)
            }
            ShutdownMode::Graceful => {
                if self.shutdown.request(status) {
                    info!("Host requested graceful exit with status {status}");
                } else {
                    warn!("Exit({status}) ignored, shutdown already in progress");
                }
                Ok(Value::Null)
            }
        }
    }
}

impl RpcObject for PluginControl {
    fn type_name(&self) -> &str {
        CONTROL_TYPE_NAME
    }

    fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            EXIT_METHOD => {
                let status = Self::parse_status(&params)?;
                self.exit(status)
            }
            _ => Err(RpcError::UnknownMethod {
                message: format!("Unknown method '{CONTROL_TYPE_NAME}.{method}'"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}
