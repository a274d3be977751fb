//! # Pool Proxy
//!
//! Work distribution and share validation core for an Equihash mining pool
//! proxy sitting between stratum miners and a Zcash-style node.
//!
//! ## Features
//!
//! - **Work building** from `getblocktemplate` responses, with Merkle roots
//!   and 1487-byte Equihash headers
//! - **Atomic work replacement** with job broadcast to stratum sessions
//! - **Share validation** in a fixed order with one outcome per submission
//! - **Block submission** when a share also meets the network target
//! - **Structured logging** with plain or JSON output
//!
//! ## Architecture
//!
//! A [`refresher::WorkRefresher`] polls the upstream node, hands templates to
//! the [`builder::WorkBuilder`] and installs new [`core::Work`] in the
//! [`registry::WorkRegistry`]. The [`share::SharePipeline`] validates
//! submissions against the current work and talks back to the node when a
//! block is found.

#![warn(
    missing_docs,
    rust_2018_idioms,
    unused_lifetimes,
    unused_qualifications,
    clippy::all
)]
#![forbid(unsafe_code)]

pub mod builder;
pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod proxy;
pub mod refresher;
pub mod registry;
pub mod share;
pub mod storage;
pub mod stratum;
pub mod utils;

pub use crate::error::{Error, Result};
pub use builder::{BuildOutcome, WorkBuilder};
pub use config::Config;
pub use crate::core::{BlockTemplate, JobId, Network, Target, Work};
pub use protocol::{JsonRpcClient, UpstreamRpc};
pub use proxy::ProxyServer;
pub use share::{ShareOutcome, SharePipeline, Submission};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        builder::{BuildOutcome, WorkBuilder},
        config::Config,
        core::{BlockTemplate, JobId, JobParams, Network, Target, Work},
        error::{Error, Result},
        protocol::{JsonRpcClient, UpstreamRpc},
        proxy::ProxyServer,
        refresher::{RefreshOutcome, WorkRefresher},
        registry::WorkRegistry,
        share::{RejectReason, ShareKind, ShareOutcome, SharePipeline, Submission},
        storage::{InMemoryShareStore, ShareStore},
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
