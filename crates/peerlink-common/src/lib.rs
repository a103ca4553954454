//! Peerlink Common Types and Transport
//!
//! Shared vocabulary for peer-to-peer RPC inside a cluster:
//!
//! - [`id`] - fixed-size [`NodeId`] / [`ObjectId`] identifiers
//! - [`address`] - [`Address`], the endpoint a peer client connects to
//! - [`protocol`] - Request/Response types and [`PeerlinkError`]
//! - [`transport`] - length-prefixed JSON framing over TCP
//!
//! # Example
//!
//! ```
//! use peerlink_common::{Address, NodeId, Request, Response};
//! use serde_json::json;
//!
//! let node = NodeId::from_random();
//! let addr = Address::new("10.0.0.3", 8076).with_node_id(node);
//! assert_eq!(addr.pool_key(), node);
//!
//! let request = Request::new("Pull", json!({"object_id": "00"})).with_timeout(5000);
//! let response = Response::success(request.id, json!(null));
//! assert!(response.success);
//! ```

pub mod address;
pub mod id;
pub mod protocol;
pub mod transport;

pub use address::Address;
pub use id::{NodeId, ObjectId, UNIQUE_ID_SIZE};
pub use protocol::*;
