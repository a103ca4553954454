//! Peerlink Client
//!
//! Outbound client handles to cluster peers, cached per node.
//!
//! - [`ClientPool`]: lazily creates, shares and evicts one client per
//!   [`NodeId`](peerlink_common::NodeId)
//! - [`ObjectManagerClient`]: the default client, a stub for a peer's object
//!   manager service
//! - [`CallManager`] / [`ClientConfig`]: shared context and settings for
//!   default clients
//!
//! Any client type can be pooled by supplying a factory to
//! [`ClientPool::with_factory`].

pub mod call_manager;
pub mod client;
pub mod config;
pub mod pool;
pub mod stats;

pub use call_manager::CallManager;
pub use client::ObjectManagerClient;
pub use config::ClientConfig;
pub use pool::{default_client_factory, ClientFactoryFn, ClientPool};
pub use stats::{PoolStats, PoolStatsSnapshot};
