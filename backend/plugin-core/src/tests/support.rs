// Shared fixtures for unit tests.

use crate::engine::{CallEngine, RpcObject};
use crate::error::RpcError;
use crate::transport::{Acceptor, BoxedConnection};

use std::io::Result as IoResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;
use tokio::io::AsyncReadExt;
use tokio::sync::{Mutex, mpsc};

/// Object that answers `Echo.Echo` with its params.
pub(crate) struct Echo;

impl RpcObject for Echo {
    fn type_name(&self) -> &str {
        "Echo"
    }

    fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "Echo" => Ok(params),
            "Fail" => Err(RpcError::call("asked to fail")),
            other => Err(RpcError::call(format!("no method {other}"))),
        }
    }
}

/// Object with a configurable type name and no procedures.
pub(crate) struct Named(pub &'static str);

impl RpcObject for Named {
    fn type_name(&self) -> &str {
        self.0
    }

    fn call(&self, method: &str, _params: Value) -> Result<Value, RpcError> {
        Err(RpcError::call(format!("no method {method}")))
    }
}

/// Engine that counts served connections and holds each until the peer closes.
#[derive(Default)]
pub(crate) struct CountingEngine {
    registered: AtomicUsize,
    served: AtomicUsize,
}

impl CountingEngine {
    pub(crate) fn served(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }

    pub(crate) fn registered(&self) -> usize {
        self.registered.load(Ordering::SeqCst)
    }
}

impl CallEngine for CountingEngine {
    fn register(&self, _object: Arc<dyn RpcObject>) {
        self.registered.fetch_add(1, Ordering::SeqCst);
    }

    async fn serve_conn(&self, mut conn: BoxedConnection) -> Result<(), RpcError> {
        self.served.fetch_add(1, Ordering::SeqCst);
        let mut sink = Vec::new();
        conn.read_to_end(&mut sink).await?;
        Ok(())
    }
}

pub(crate) type Accepted = IoResult<(BoxedConnection, String)>;

/// Acceptor fed from a channel; pends forever once the channel is drained and closed.
pub(crate) struct ChannelAcceptor {
    rx: Mutex<mpsc::UnboundedReceiver<Accepted>>,
}

impl ChannelAcceptor {
    pub(crate) fn new() -> (mpsc::UnboundedSender<Accepted>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx: Mutex::new(rx) })
    }
}

impl Acceptor for ChannelAcceptor {
    async fn accept(&self) -> Accepted {
        match self.rx.lock().await.recv().await {
            Some(accepted) => accepted,
            None => std::future::pending().await,
        }
    }
}
