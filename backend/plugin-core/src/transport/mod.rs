//! Socket transport: candidate addresses, listeners and the bind-with-retry bootstrap.

pub mod allocator;
pub mod bootstrap;
pub mod listener;

pub use allocator::{AddressAllocator, TcpAllocator, UnixAllocator, allocator_for};
pub use bootstrap::{BoundAddress, bind_with_retry, bootstrap};
pub use listener::{Acceptor, BoxedConnection, Connection, PluginListener};
