//! Call-dispatch engine seam.
//!
//! The transport layer only authenticates connections; parsing call frames
//! and invoking procedures on exposed objects is the engine's job. Any type
//! implementing [`CallEngine`] can be plugged into the server.
//! [`JsonLineEngine`] is the stock implementation.

mod json_line;
pub mod protocol;

pub use json_line::JsonLineEngine;

use crate::error::RpcError;
use crate::transport::BoxedConnection;

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

/// An object exposed to the host.
///
/// Procedures are addressed as `<type_name>.<method>` and take one request
/// value in, one reply value out.
pub trait RpcObject: Send + Sync {
    /// Name the host uses to address this object; also listed in the `objects` line.
    fn type_name(&self) -> &str;

    /// Invoke `method` with `params`.
    fn call(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

/// Parses call frames on an authenticated connection and invokes procedures.
pub trait CallEngine: Send + Sync + 'static {
    /// Make `object` callable on every connection served afterwards.
    fn register(&self, object: Arc<dyn RpcObject>);

    /// Serve calls on `conn` until the peer hangs up.
    fn serve_conn(&self, conn: BoxedConnection) -> impl Future<Output = Result<(), RpcError>> + Send;
}
