//! Listening sockets for both schemes behind one type.

use models::Scheme;

use std::fs::remove_file;
use std::future::Future;
use std::io::Result as IoResult;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, UnixListener};

/// Anything the call engine can read requests from and write replies to.
pub trait Connection: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> Connection for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Scheme-erased accepted connection.
pub type BoxedConnection = Box<dyn Connection>;

/// Source of inbound connections for the dispatcher.
pub trait Acceptor: Send + Sync {
    /// Wait for the next connection; the string describes the peer for logs.
    fn accept(&self) -> impl Future<Output = IoResult<(BoxedConnection, String)>> + Send;
}

/// A bound TCP or unix-domain listener.
#[derive(Debug)]
pub enum PluginListener {
    Tcp(TcpListener),
    Unix {
        listener: UnixListener,
        path: PathBuf,
    },
}

impl PluginListener {
    /// Bind a listening socket for `scheme` at `address`.
    ///
    /// Fails if the address is already taken; the socket file of a unix
    /// listener is removed again when the listener is dropped.
    pub async fn bind(scheme: Scheme, address: String) -> IoResult<Self> {
        match scheme {
            Scheme::Tcp => Ok(PluginListener::Tcp(TcpListener::bind(&address).await?)),
            Scheme::Unix => {
                let path = PathBuf::from(address);
                let listener = UnixListener::bind(&path)?;
                Ok(PluginListener::Unix { listener, path })
            }
        }
    }

    /// Socket file backing a unix listener.
    pub fn socket_path(&self) -> Option<&Path> {
        match self {
            PluginListener::Tcp(_) => None,
            PluginListener::Unix { path, .. } => Some(path),
        }
    }

    pub fn scheme(&self) -> Scheme {
        match self {
            PluginListener::Tcp(_) => Scheme::Tcp,
            PluginListener::Unix { .. } => Scheme::Unix,
        }
    }
}

impl Acceptor for PluginListener {
    async fn accept(&self) -> IoResult<(BoxedConnection, String)> {
        match self {
            PluginListener::Tcp(listener) => {
                let (stream, addr) = listener.accept().await?;
                Ok((Box::new(stream), addr.to_string()))
            }
            PluginListener::Unix { listener, path } => {
                let (stream, addr) = listener.accept().await?;
                let peer = addr
                    .as_pathname()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| format!("unnamed peer on {}", path.display()));
                Ok((Box::new(stream), peer))
            }
        }
    }
}

impl Drop for PluginListener {
    fn drop(&mut self) {
        if let PluginListener::Unix { path, .. } = self {
            match remove_file(&*path) {
                Ok(()) => debug!("Removed socket file {}", path.display()),
                Err(e) => warn!("Failed to remove socket file {}: {e}", path.display()),
            }
        }
    }
}
