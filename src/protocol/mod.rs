//! Upstream node communication

pub mod retry;
pub mod rpc;

pub use retry::RetryPolicy;
pub use rpc::{JsonRpcClient, UpstreamRpc};
