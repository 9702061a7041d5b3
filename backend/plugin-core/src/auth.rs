//! Secret-token authentication of fresh connections.

use crate::SECRET_LEN;

use common::RedactedSecret;

use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read exactly [`SECRET_LEN`] bytes from `conn` and compare them to `secret`.
///
/// A short read (peer closed early) or any I/O error fails authentication.
/// Nothing is ever written back; on `false` the caller drops the connection.
pub async fn authenticate<C>(conn: &mut C, secret: &RedactedSecret) -> bool
where
    C: AsyncRead + Unpin + ?Sized,
{
    let mut presented = [0u8; SECRET_LEN];

    match conn.read_exact(&mut presented).await {
        Ok(_) => secret.matches(&presented),
        Err(e) => {
            trace!("Auth read failed: {e}");
            false
        }
    }
}
