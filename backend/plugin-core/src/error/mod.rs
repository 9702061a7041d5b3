pub mod rpc;
pub mod server;

pub use rpc::RpcError;
pub use server::ServerError;
