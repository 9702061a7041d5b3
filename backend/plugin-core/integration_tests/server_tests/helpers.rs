//! Test helpers for plugin server integration tests.
//!
//! - Starting a server with an in-memory handshake channel
//! - Waiting for the `ready` line and parsing the advertised address
//! - A line-oriented client speaking the JSON call protocol

use plugin_core::engine::protocol::{Request, Response};
use plugin_core::handshake::{KEY_AUTH_TOKEN, KEY_READY};
use plugin_core::transport::BoxedConnection;
use plugin_core::{
    JsonLineEngine, MemoryHandshake, PluginServer, RpcError, RpcObject, ServerError, Shutdown,
};

use models::ServerConfig;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, UnixStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

/// Exposed as `Echo`; `Echo.Echo` returns its params, `Echo.Upper` upper-cases a string.
pub struct EchoObject;

impl RpcObject for EchoObject {
    fn type_name(&self) -> &str {
        "Echo"
    }

    fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "Echo" => Ok(params),
            "Upper" => params
                .as_str()
                .map(|text| Value::from(text.to_uppercase()))
                .ok_or_else(|| RpcError::call("Upper expects a string")),
            other => Err(RpcError::call(format!("Unknown method '{other}'"))),
        }
    }
}

/// Test helper: Build a server with `Echo` registered, reporting into memory.
pub fn build_server(config: ServerConfig) -> (PluginServer, Arc<MemoryHandshake>) {
    let handshake = Arc::new(MemoryHandshake::new(config.prefix()));
    let mut server = PluginServer::with_parts(config, JsonLineEngine::new(), handshake.clone());
    server.register(Arc::new(EchoObject));
    (server, handshake)
}

/// Test helper: Run a server in the background.
pub fn start_server(
    config: ServerConfig,
) -> (JoinHandle<Result<Shutdown, ServerError>>, Arc<MemoryHandshake>) {
    let (mut server, handshake) = build_server(config);
    let handle = tokio::spawn(async move { server.run().await });
    (handle, handshake)
}

/// What the `auth-token` and `ready` lines announced.
pub struct Ready {
    pub token: String,
    pub proto: String,
    pub addr: String,
}

/// Test helper: Wait until the server announces readiness.
pub async fn wait_ready(handshake: &MemoryHandshake) -> Ready {
    let ready = timeout(Duration::from_secs(5), async {
        loop {
            if let Some(ready) = handshake.first(KEY_READY) {
                return ready;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("Server never reported ready");

    let (proto, addr) = ready
        .strip_prefix("proto=")
        .and_then(|rest| rest.split_once(" addr="))
        .expect("Malformed ready line");

    Ready {
        token: handshake.first(KEY_AUTH_TOKEN).expect("auth-token precedes ready"),
        proto: proto.to_string(),
        addr: addr.to_string(),
    }
}

/// Test helper: Open a raw connection to the advertised address.
pub async fn connect(ready: &Ready) -> BoxedConnection {
    match ready.proto.as_str() {
        "tcp" => Box::new(TcpStream::connect(&ready.addr).await.expect("TCP connect")),
        "unix" => Box::new(UnixStream::connect(&ready.addr).await.expect("Unix connect")),
        other => panic!("Unexpected proto {other}"),
    }
}

/// Authenticated client issuing sequential calls.
pub struct Client {
    stream: BufReader<BoxedConnection>,
    next_id: u64,
}

impl Client {
    /// Test helper: Connect and present the announced secret.
    pub async fn connect(ready: &Ready) -> Self {
        let mut conn = connect(ready).await;
        conn.write_all(ready.token.as_bytes())
            .await
            .expect("Failed to send secret");
        Self {
            stream: BufReader::new(conn),
            next_id: 1,
        }
    }

    pub async fn call(&mut self, method: &str, params: Value) -> Response {
        let id = self.next_id;
        self.next_id += 1;

        let line = Request::new(id, method, params)
            .to_ndjson_line()
            .expect("Failed to encode request");
        self.stream
            .write_all(line.as_bytes())
            .await
            .expect("Failed to send request");
        self.stream.flush().await.expect("Failed to flush");

        let mut reply = String::new();
        self.stream
            .read_line(&mut reply)
            .await
            .expect("Failed to read reply");
        let response = Response::from_ndjson_line(&reply).expect("Failed to decode reply");
        assert_eq!(response.id, id, "Reply must correlate to the request");
        response
    }
}
