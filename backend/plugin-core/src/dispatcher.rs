//! Accept loop and per-connection handling.
//!
//! Every accepted connection runs as its own task:
//! `Accepted -> Authenticating -> {Rejected | Queued -> Serving}`.
//! Authentication always precedes serving; a rejected connection is dropped
//! without a reply. The optional connection bound only counts authenticated
//! connections, so peers that never present a secret cannot starve the host.
//!
//! The loop itself only stops on a shutdown request (or when the listener has
//! been failing for longer than the accept backoff window). Accept errors are
//! reported on the handshake channel and retried with exponential backoff.

use crate::auth::authenticate;
use crate::engine::CallEngine;
use crate::error::ServerError;
use crate::handshake::{ERR_HTTP_SERVE, HandshakeChannel, KEY_FATAL};
use crate::shutdown::{ShutdownListener, ShutdownSignal};
use crate::transport::{Acceptor, BoxedConnection};

use common::{ErrorLocation, RedactedSecret};
use models::ServerConfig;

use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use log::{debug, error, info, trace, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::sleep as TokioSleep;

const ACCEPT_BACKOFF_INITIAL: Duration = Duration::from_millis(50);
const ACCEPT_BACKOFF_MAX_INTERVAL: Duration = Duration::from_secs(5);

/// Lifecycle of a single connection, for tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Accepted,
    Authenticating,
    /// Authenticated, waiting for a slot under the connection bound.
    Queued,
    Serving,
    Rejected,
}

/// Everything a connection task needs, shared across tasks.
pub struct DispatchContext<E: CallEngine> {
    pub engine: Arc<E>,
    pub secret: Arc<RedactedSecret>,
    pub handshake: Arc<dyn HandshakeChannel>,
    pub shutdown: ShutdownSignal,
}

impl<E: CallEngine> Clone for DispatchContext<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            secret: Arc::clone(&self.secret),
            handshake: Arc::clone(&self.handshake),
            shutdown: self.shutdown.clone(),
        }
    }
}

fn accept_backoff(window: Duration) -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: ACCEPT_BACKOFF_INITIAL,
        current_interval: ACCEPT_BACKOFF_INITIAL,
        max_interval: ACCEPT_BACKOFF_MAX_INTERVAL,
        max_elapsed_time: Some(window),
        ..Default::default()
    }
}

/// Accept connections until a shutdown is requested.
///
/// Returns the requested exit status once every in-flight connection has
/// finished or its drain window has elapsed.
///
/// # Errors
///
/// Returns [`ServerError::Accept`] if accepting keeps failing for longer than
/// the configured backoff window without a single success in between.
pub async fn accept_loop<A, E>(
    acceptor: &A,
    context: DispatchContext<E>,
    config: &ServerConfig,
) -> Result<i32, ServerError>
where
    A: Acceptor,
    E: CallEngine,
{
    let limiter = config
        .max_connections()
        .map(|max| Arc::new(Semaphore::new(max)));
    let mut backoff = accept_backoff(config.accept_backoff_max());
    let mut failing = false;
    let mut handlers = JoinSet::new();
    let mut shutdown = context.shutdown.subscribe();

    let status = loop {
        let accepted = tokio::select! {
            status = shutdown.wait() => break status,
            accepted = acceptor.accept() => accepted,
        };

        match accepted {
            Ok((conn, peer)) => {
                failing = false;
                trace!("{peer}: {:?}", ConnectionPhase::Accepted);
                handlers.spawn(handle_connection(
                    conn,
                    peer,
                    context.clone(),
                    limiter.clone(),
                    config.drain_timeout(),
                ));
            }
            Err(e) => {
                context
                    .handshake
                    .output(KEY_FATAL, &format!("{ERR_HTTP_SERVE}: {e}"));

                if !failing {
                    backoff.reset();
                    failing = true;
                }

                let Some(delay) = backoff.next_backoff() else {
                    error!("Accept kept failing for {:?}, giving up", config.accept_backoff_max());
                    return Err(ServerError::Accept {
                        message: format!(
                            "Accept failed for longer than {:?}: {e}",
                            config.accept_backoff_max()
                        ),
                        location: ErrorLocation::caller(),
                    });
                };

                warn!("Accept failed: {e}, retrying in {delay:?}");
                tokio::select! {
                    status = shutdown.wait() => break status,
                    _ = TokioSleep(delay) => {}
                }
            }
        }

        // Reap finished handlers so the set only tracks live connections.
        while let Some(finished) = handlers.try_join_next() {
            log_join(finished);
        }
    };

    info!(
        "Shutdown requested with status {status}, draining {} connection(s)",
        handlers.len()
    );
    while let Some(finished) = handlers.join_next().await {
        log_join(finished);
    }

    Ok(status)
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        error!("Connection task failed: {e}");
    }
}

/// Authenticate, then serve, one connection.
///
/// Once a shutdown is requested the connection gets `drain_timeout` to finish
/// on its own before it is dropped.
async fn handle_connection<E: CallEngine>(
    conn: BoxedConnection,
    peer: String,
    context: DispatchContext<E>,
    limiter: Option<Arc<Semaphore>>,
    drain_timeout: Duration,
) {
    let mut shutdown = context.shutdown.subscribe();
    let work = serve_authenticated(conn, peer.clone(), context, limiter);

    tokio::select! {
        _ = work => {}
        _ = drain_deadline(&mut shutdown, drain_timeout) => {
            debug!("{peer}: drain window elapsed, closing connection");
        }
    }
}

async fn drain_deadline(shutdown: &mut ShutdownListener, drain_timeout: Duration) {
    shutdown.wait().await;
    TokioSleep(drain_timeout).await;
}

async fn serve_authenticated<E: CallEngine>(
    mut conn: BoxedConnection,
    peer: String,
    context: DispatchContext<E>,
    limiter: Option<Arc<Semaphore>>,
) {
    trace!("{peer}: {:?}", ConnectionPhase::Authenticating);

    if !authenticate(&mut conn, &context.secret).await {
        trace!("{peer}: {:?}", ConnectionPhase::Rejected);
        return;
    }

    // Held until serving ends.
    let _permit = match limiter {
        Some(limiter) => {
            trace!("{peer}: {:?}", ConnectionPhase::Queued);
            match limiter.acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(e) => {
                    warn!("{peer}: connection limiter closed: {e}");
                    return;
                }
            }
        }
        None => None,
    };

    trace!("{peer}: {:?}", ConnectionPhase::Serving);
    match context.engine.serve_conn(conn).await {
        Ok(()) => trace!("{peer}: closed by peer"),
        Err(e) => debug!("{peer}: serving ended with error: {e}"),
    }
}
