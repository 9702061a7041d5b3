//! The plugin server: one explicit instance per process.
//!
//! Construct it at program entry, register the objects to expose, then call
//! [`PluginServer::run`] exactly once.
//!
//! # Example
//!
//! ```no_run
//! use plugin_core::PluginServer;
//! use models::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = PluginServer::new(ServerConfig::default());
//!     // server.register(Arc::new(MyObject));
//!     let shutdown = server.run().await?;
//!     std::process::exit(shutdown.status);
//! }
//! ```

use crate::SECRET_LEN;
use crate::control::PluginControl;
use crate::dispatcher::{DispatchContext, accept_loop};
use crate::engine::{CallEngine, JsonLineEngine, RpcObject};
use crate::error::ServerError;
use crate::handshake::{HandshakeChannel, StdoutHandshake};
use crate::registry::Registry;
use crate::shutdown::ShutdownSignal;
use crate::transport::{PluginListener, bootstrap};

use common::RedactedSecret;
use models::ServerConfig;

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use log::{info, warn};

/// Outcome of a server that stopped on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shutdown {
    /// Exit status requested by the host.
    pub status: i32,
}

/// Transport, bootstrap and dispatch for one plugin process.
pub struct PluginServer<E: CallEngine = JsonLineEngine> {
    config: ServerConfig,
    secret: Arc<RedactedSecret>,
    registry: Registry<E>,
    handshake: Arc<dyn HandshakeChannel>,
    shutdown: ShutdownSignal,
    socket_path: Arc<OnceLock<PathBuf>>,
}

impl PluginServer<JsonLineEngine> {
    /// Server with the stock JSON engine, reporting to stdout.
    pub fn new(config: ServerConfig) -> Self {
        let handshake = Arc::new(StdoutHandshake::new(config.prefix()));
        Self::with_parts(config, JsonLineEngine::new(), handshake)
    }
}

impl<E: CallEngine> PluginServer<E> {
    /// Server with an explicit engine and handshake channel.
    ///
    /// Generates the auth secret and registers the control object.
    pub fn with_parts(
        config: ServerConfig,
        engine: E,
        handshake: Arc<dyn HandshakeChannel>,
    ) -> Self {
        let shutdown = ShutdownSignal::new();
        let control = PluginControl::new(config.shutdown_mode(), shutdown.clone());
        let socket_path = control.socket_path_slot();
        let mut registry = Registry::new(engine);
        registry.register(Arc::new(control));

        Self {
            config,
            secret: Arc::new(RedactedSecret::generate(SECRET_LEN)),
            registry,
            handshake,
            shutdown,
            socket_path,
        }
    }

    /// Expose `object` to the host.
    ///
    /// # Panics
    ///
    /// Panics if [`PluginServer::run`] has already been called.
    pub fn register(&mut self, object: Arc<dyn RpcObject>) {
        self.registry.register(object);
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Exposed type names, in registration order.
    pub fn objects(&self) -> &[String] {
        self.registry.names()
    }

    pub fn is_running(&self) -> bool {
        self.registry.is_running()
    }

    /// Handle for requesting a graceful stop from outside (e.g. a signal handler).
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Bind, announce readiness and serve until shutdown.
    ///
    /// Freezes registration first; even a failed run leaves the server started.
    ///
    /// # Errors
    ///
    /// - [`ServerError::Bind`] if no candidate address could be bound
    /// - [`ServerError::Accept`] if the listener kept failing past the backoff window
    ///
    /// # Panics
    ///
    /// Panics if called a second time.
    pub async fn run(&mut self) -> Result<Shutdown, ServerError> {
        self.registry.start();

        let objects = self.registry.objects_line();
        info!(
            "Starting plugin server: scheme={} objects=[{objects}]",
            self.config.scheme()
        );

        let (listener, _bound) = bootstrap(
            &self.config,
            &objects,
            &self.secret,
            self.handshake.as_ref(),
            PluginListener::bind,
        )
        .await?;

        if let Some(path) = listener.socket_path() {
            if self.socket_path.set(path.to_path_buf()).is_err() {
                warn!("Socket path already recorded, keeping the first one");
            }
        }

        let context = DispatchContext {
            engine: self.registry.engine(),
            secret: Arc::clone(&self.secret),
            handshake: Arc::clone(&self.handshake),
            shutdown: self.shutdown.clone(),
        };

        let status = accept_loop(&listener, context, &self.config).await?;
        info!("Plugin server stopped with status {status}");

        Ok(Shutdown { status })
    }
}
