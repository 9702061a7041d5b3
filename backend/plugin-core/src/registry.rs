//! Bookkeeping of exposed objects and the once-only startup transition.

use crate::engine::{CallEngine, RpcObject};

use std::sync::Arc;

use log::debug;

const REGISTER_AFTER_START: &str = "register called after the plugin server started running";
const START_TWICE: &str = "the plugin server can only be started once";

/// Records exposed objects and forwards them to the call engine.
///
/// Registration is only legal before [`Registry::start`]. Past that point the
/// list is frozen: the engine and the host both already know the full set, so
/// a late registration is a programming error and panics.
pub struct Registry<E: CallEngine> {
    engine: Arc<E>,
    names: Vec<String>,
    running: bool,
}

impl<E: CallEngine> Registry<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine: Arc::new(engine),
            names: Vec::new(),
            running: false,
        }
    }

    /// Expose `object` to the host.
    ///
    /// # Panics
    ///
    /// Panics if called after [`Registry::start`].
    pub fn register(&mut self, object: Arc<dyn RpcObject>) {
        if self.running {
            panic!("{REGISTER_AFTER_START}");
        }

        let name = object.type_name().to_string();
        debug!("Registering object {name}");
        self.names.push(name);
        self.engine.register(object);
    }

    /// Freeze the registry. Irreversible.
    ///
    /// # Panics
    ///
    /// Panics if the registry was already started.
    pub fn start(&mut self) {
        if self.running {
            panic!("{START_TWICE}");
        }
        self.running = true;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Exposed type names, in registration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Names as announced on the `objects` handshake line.
    pub fn objects_line(&self) -> String {
        self.names.join(", ")
    }

    /// Shared handle to the engine for connection tasks.
    pub fn engine(&self) -> Arc<E> {
        Arc::clone(&self.engine)
    }
}
