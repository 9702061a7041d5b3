//! Candidate address strategies, one per scheme.

use crate::{TCP_HOST, UNIX_NAME_LEN};

use common::random_alphanumeric;
use models::{Scheme, ServerConfig};

use std::path::PathBuf;

/// Highest privileged port; the TCP cursor never hands out anything at or below it.
const TCP_PORT_FLOOR: u16 = 1023;
const TCP_RETRY_LIMIT: usize = 500;
const UNIX_RETRY_LIMIT: usize = 4;

/// Produces successive candidate addresses for one scheme.
pub trait AddressAllocator: Send {
    fn scheme(&self) -> Scheme;

    /// Next candidate to try binding.
    fn next_address(&mut self) -> String;

    /// How many candidates to try before giving up.
    fn retry_limit(&self) -> usize;
}

/// Monotonic scan of unprivileged loopback ports, starting at 1024.
#[derive(Debug, Default)]
pub struct TcpAllocator {
    cursor: u16,
}

impl TcpAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the scan right after `cursor`. Values below 1024 behave as unset.
    pub fn starting_after(cursor: u16) -> Self {
        Self { cursor }
    }
}

impl AddressAllocator for TcpAllocator {
    fn scheme(&self) -> Scheme {
        Scheme::Tcp
    }

    fn next_address(&mut self) -> String {
        self.cursor = self.cursor.max(TCP_PORT_FLOOR).saturating_add(1);
        format!("{TCP_HOST}:{}", self.cursor)
    }

    fn retry_limit(&self) -> usize {
        TCP_RETRY_LIMIT
    }
}

/// Random 8-character socket names, optionally rooted at a base directory.
#[derive(Debug, Default)]
pub struct UnixAllocator {
    base_dir: Option<PathBuf>,
}

impl UnixAllocator {
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self { base_dir }
    }
}

impl AddressAllocator for UnixAllocator {
    fn scheme(&self) -> Scheme {
        Scheme::Unix
    }

    fn next_address(&mut self) -> String {
        let name = random_alphanumeric(UNIX_NAME_LEN);
        match &self.base_dir {
            Some(dir) => dir.join(name).to_string_lossy().into_owned(),
            None => name,
        }
    }

    fn retry_limit(&self) -> usize {
        UNIX_RETRY_LIMIT
    }
}

/// Pick the allocator matching the configured scheme.
pub fn allocator_for(config: &ServerConfig) -> Box<dyn AddressAllocator> {
    match config.scheme() {
        Scheme::Tcp => Box::new(TcpAllocator::new()),
        Scheme::Unix => Box::new(UnixAllocator::new(config.unix_dir().map(PathBuf::from))),
    }
}
