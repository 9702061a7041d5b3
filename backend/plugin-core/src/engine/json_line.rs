use crate::engine::protocol::{Request, Response};
use crate::engine::{CallEngine, RpcObject};
use crate::error::RpcError;
use crate::transport::BoxedConnection;

use common::ErrorLocation;

use std::collections::HashMap;
use std::panic::Location;
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, trace, warn};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, split};

/// Engine speaking newline-delimited JSON.
///
/// Each request line is answered by exactly one response line, in order.
/// A connection may carry any number of sequential calls; serving ends when
/// the peer closes its side.
#[derive(Default)]
pub struct JsonLineEngine {
    objects: RwLock<HashMap<String, Arc<dyn RpcObject>>>,
}

impl JsonLineEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a single request against the registered objects.
    pub fn dispatch(&self, request: Request) -> Response {
        match self.invoke(&request.method, request.params) {
            Ok(result) => Response::success(request.id, result),
            Err(e) => {
                debug!("Call {} (id {}) failed: {e}", request.method, request.id);
                Response::error(request.id, e.message())
            }
        }
    }

    /// Names of the objects this engine can route to.
    pub fn object_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    #[track_caller]
    fn invoke(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let (type_name, procedure) =
            method
                .split_once('.')
                .ok_or_else(|| RpcError::UnknownMethod {
                    message: format!("Malformed method name '{method}', expected Type.Method"),
                    location: ErrorLocation::from(Location::caller()),
                })?;

        let object = self
            .objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(type_name)
            .cloned()
            .ok_or_else(|| RpcError::UnknownMethod {
                message: format!("Unknown object '{type_name}'"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        trace!("Invoking {type_name}.{procedure}");
        object.call(procedure, params)
    }
}

impl CallEngine for JsonLineEngine {
    fn register(&self, object: Arc<dyn RpcObject>) {
        let name = object.type_name().to_string();
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);

        if objects.contains_key(&name) {
            warn!("Object '{name}' already registered, keeping the first one");
            return;
        }

        objects.insert(name, object);
    }

    async fn serve_conn(&self, conn: BoxedConnection) -> Result<(), RpcError> {
        let (reader, mut writer) = split(conn);
        let mut lines = BufReader::new(reader).lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let response = match Request::from_ndjson_line(&line) {
                Ok(request) => self.dispatch(request),
                Err(e) => Response::error(0, format!("Invalid request: {}", e.message())),
            };

            writer
                .write_all(response.to_ndjson_line()?.as_bytes())
                .await?;
            writer.flush().await?;
        }

        Ok(())
    }
}
