use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;

use crate::id::NodeId;
use crate::protocol::error::{PeerlinkError, Result};

/// Network endpoint of a peer's RPC service.
///
/// An address optionally names the node listening on it. Peers reached by
/// a bare endpoint are keyed by an id derived from `ip_address:port`, see
/// [`Address::pool_key`].
///
/// # Example
///
/// ```
/// use peerlink_common::{Address, NodeId};
///
/// let node_id = NodeId::from_random();
/// let addr = Address::new("10.0.0.7", 8076).with_node_id(node_id);
/// assert_eq!(addr.endpoint(), "10.0.0.7:8076");
/// assert_eq!(addr.pool_key(), node_id);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub ip_address: String,
    pub port: u16,
    /// Node listening on this endpoint, if the caller knows it
    pub node_id: Option<NodeId>,
}

impl Address {
    pub fn new(ip_address: impl Into<String>, port: u16) -> Self {
        Self {
            ip_address: ip_address.into(),
            port,
            node_id: None,
        }
    }

    pub fn with_node_id(mut self, node_id: NodeId) -> Self {
        self.node_id = Some(node_id);
        self
    }

    /// `ip:port` form handed to the transport.
    pub fn endpoint(&self) -> String {
        if self.ip_address.contains(':') {
            format!("[{}]:{}", self.ip_address, self.port)
        } else {
            format!("{}:{}", self.ip_address, self.port)
        }
    }

    /// Key this address is cached under: the carried node id, or an id
    /// derived from the endpoint when none is carried.
    pub fn pool_key(&self) -> NodeId {
        self.node_id
            .unwrap_or_else(|| NodeId::for_endpoint(&self.ip_address, self.port))
    }

    /// Parses an `ip:port` string (IPv6 hosts in brackets).
    pub fn parse(endpoint: &str) -> Result<Self> {
        let socket_addr: SocketAddr = endpoint.parse()?;
        Ok(Self::from(socket_addr))
    }

    /// Checks that the address names a reachable-looking endpoint.
    pub fn validate(&self) -> Result<()> {
        if self.ip_address.trim().is_empty() {
            return Err(PeerlinkError::InvalidAddress(
                "ip address is empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(PeerlinkError::InvalidAddress(format!(
                "port 0 is not connectable ({})",
                self.ip_address
            )));
        }
        Ok(())
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node_id {
            Some(id) => write!(f, "{}:{} ({})", self.ip_address, self.port, id),
            None => write!(f, "{}:{}", self.ip_address, self.port),
        }
    }
}
