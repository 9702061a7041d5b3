//! Listener bootstrap: announce objects, bind with retry, announce readiness.

use crate::error::ServerError;
use crate::handshake::{
    ERR_CONNECTION_FAILED, HandshakeChannel, KEY_AUTH_TOKEN, KEY_FATAL, KEY_OBJECTS, KEY_READY,
};
use crate::transport::allocator::{AddressAllocator, allocator_for};

use common::{ErrorLocation, RedactedSecret};
use models::{Scheme, ServerConfig};

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::future::Future;
use std::io::Result as IoResult;

use log::{debug, info};

/// Where the listener ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundAddress {
    pub scheme: Scheme,
    pub address: String,
}

impl Display for BoundAddress {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        write!(formatter, "proto={} addr={}", self.scheme, self.address)
    }
}

fn exhausted_message(attempts: usize, scheme: Scheme) -> String {
    format!("{ERR_CONNECTION_FAILED}: Could not connect in {attempts} attempts, using {scheme} protocol")
}

/// Try candidates from `allocator` until `bind` succeeds or the retry limit is hit.
///
/// `bind` receives the scheme and the candidate address. The last bind error is
/// kept in the returned [`ServerError::Bind`] message.
pub async fn bind_with_retry<L, F, Fut>(
    allocator: &mut dyn AddressAllocator,
    mut bind: F,
) -> Result<(L, BoundAddress), ServerError>
where
    F: FnMut(Scheme, String) -> Fut,
    Fut: Future<Output = IoResult<L>>,
{
    let scheme = allocator.scheme();
    let limit = allocator.retry_limit();
    let mut last_error = None;

    for attempt in 1..=limit {
        let address = allocator.next_address();

        match bind(scheme, address.clone()).await {
            Ok(listener) => {
                debug!("Bound {scheme} listener at {address} on attempt {attempt}");
                return Ok((listener, BoundAddress { scheme, address }));
            }
            Err(e) => {
                debug!("Bind attempt {attempt}/{limit} at {address} failed: {e}");
                last_error = Some(e);
            }
        }
    }

    let cause = last_error
        .map(|e| e.to_string())
        .unwrap_or_else(|| String::from("no candidates tried"));

    Err(ServerError::Bind {
        message: format!("{} (last error: {cause})", exhausted_message(limit, scheme)),
        location: ErrorLocation::caller(),
    })
}

/// Run the full bootstrap sequence against the handshake channel.
///
/// Emits `objects` (the rendered name list) before binding. On success emits
/// `auth-token` and `ready`; on exhaustion emits a `fatal` line and returns the
/// error to the caller.
pub async fn bootstrap<L, F, Fut>(
    config: &ServerConfig,
    objects: &str,
    secret: &RedactedSecret,
    handshake: &dyn HandshakeChannel,
    bind: F,
) -> Result<(L, BoundAddress), ServerError>
where
    F: FnMut(Scheme, String) -> Fut,
    Fut: Future<Output = IoResult<L>>,
{
    handshake.output(KEY_OBJECTS, objects);

    let mut allocator = allocator_for(config);

    match bind_with_retry(allocator.as_mut(), bind).await {
        Ok((listener, bound)) => {
            handshake.output(KEY_AUTH_TOKEN, secret.expose());
            handshake.output(KEY_READY, &bound.to_string());
            info!("Plugin listening: {bound}");
            Ok((listener, bound))
        }
        Err(e) => {
            handshake.output(
                KEY_FATAL,
                &exhausted_message(allocator.retry_limit(), allocator.scheme()),
            );
            Err(e)
        }
    }
}
