//! Shutdown coordination between the control surface, the accept loop and
//! every connection task.

use std::future::pending;
use std::sync::Arc;

use tokio::sync::watch;

/// Sending half: requests a shutdown with an exit status. First request wins.
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<Option<i32>>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Ask everything observing this signal to wind down.
    ///
    /// Returns `false` if a shutdown had already been requested.
    pub fn request(&self, status: i32) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(status);
                true
            } else {
                false
            }
        })
    }

    /// Status of the pending shutdown, if one was requested.
    pub fn requested(&self) -> Option<i32> {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving half held by each observer.
#[derive(Debug)]
pub struct ShutdownListener {
    rx: watch::Receiver<Option<i32>>,
}

impl ShutdownListener {
    /// Resolve with the exit status once a shutdown is requested.
    ///
    /// Cancel-safe; returns immediately if the request already happened.
    pub async fn wait(&mut self) -> i32 {
        loop {
            let current = *self.rx.borrow();
            if let Some(status) = current {
                return status;
            }
            if self.rx.changed().await.is_err() {
                // Sender gone without a request: nothing will ever arrive.
                return pending().await;
            }
        }
    }
}
