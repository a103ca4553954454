use std::sync::Arc;

use peerlink_common::protocol::error::{PeerlinkError, Result};
use peerlink_common::protocol::{Request, Response};
use peerlink_common::{Address, NodeId, ObjectId};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::call_manager::CallManager;

/// Method names understood by a peer's object manager service.
pub mod methods {
    pub const PUSH: &str = "Push";
    pub const PULL: &str = "Pull";
    pub const FREE_OBJECTS: &str = "FreeObjects";
}

/// Client stub for the object manager service of one peer.
///
/// Construction does no I/O. The TCP connection is opened on the first call
/// and reused by every later call; calls issued concurrently on one client
/// are serialized over that connection. A call that fails on the transport
/// (or times out) drops the connection and the next call reconnects.
///
/// Dropping the last reference closes the connection.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use peerlink_client::{CallManager, ObjectManagerClient};
/// use peerlink_common::{Address, NodeId, ObjectId};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let manager = Arc::new(CallManager::default());
/// let client = ObjectManagerClient::new(Address::new("10.0.0.4", 8076), manager);
///
/// client.pull(ObjectId::from_random(), NodeId::from_random()).await?;
/// # Ok(())
/// # }
/// ```
pub struct ObjectManagerClient {
    address: Address,
    endpoint: String,
    call_manager: Arc<CallManager>,
    stream: Mutex<Option<TcpStream>>,
}

impl ObjectManagerClient {
    pub fn new(address: Address, call_manager: Arc<CallManager>) -> Self {
        let endpoint = address.endpoint();
        Self {
            address,
            endpoint,
            call_manager,
            stream: Mutex::new(None),
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Whether a connection is currently open.
    pub async fn is_connected(&self) -> bool {
        self.stream.lock().await.is_some()
    }

    /// Asks the peer to push `object_id` to node `node_id`.
    pub async fn push(&self, object_id: ObjectId, node_id: NodeId) -> Result<()> {
        self.call(
            methods::PUSH,
            json!({ "object_id": object_id, "node_id": node_id }),
        )
        .await
        .map(|_| ())
    }

    /// Asks the peer to pull `object_id` from node `node_id`.
    pub async fn pull(&self, object_id: ObjectId, node_id: NodeId) -> Result<()> {
        self.call(
            methods::PULL,
            json!({ "object_id": object_id, "node_id": node_id }),
        )
        .await
        .map(|_| ())
    }

    /// Asks the peer to release its copies of `object_ids`.
    pub async fn free_objects(&self, object_ids: &[ObjectId], local_only: bool) -> Result<()> {
        self.call(
            methods::FREE_OBJECTS,
            json!({ "object_ids": object_ids, "local_only": local_only }),
        )
        .await
        .map(|_| ())
    }

    /// Issues one request and returns the peer's result.
    ///
    /// # Errors
    ///
    /// - `Timeout` if the call (including connecting) exceeds the request
    ///   timeout
    /// - `Remote` if the peer answered with an error
    /// - any transport error from connecting or exchanging frames
    pub async fn call(&self, method: impl Into<String>, args: Value) -> Result<Value> {
        let timeout = self.call_manager.config().request_timeout();
        let request = Request::new(method, args).with_timeout(timeout.as_millis() as u64);

        let mut slot = self.stream.lock().await;
        match tokio::time::timeout(timeout, self.exchange(&mut slot, &request)).await {
            Ok(Ok(response)) => response.into_result(),
            Ok(Err(e)) => {
                tracing::debug!(addr = %self.address, error = %e, "Resetting object manager connection");
                *slot = None;
                Err(e)
            }
            Err(_) => {
                tracing::debug!(addr = %self.address, method = %request.method, "Object manager call timed out");
                *slot = None;
                Err(PeerlinkError::Timeout(timeout.as_millis() as u64))
            }
        }
    }

    async fn exchange(&self, slot: &mut Option<TcpStream>, request: &Request) -> Result<Response> {
        let transport = self.call_manager.transport();
        let stream = match slot {
            Some(stream) => stream,
            None => {
                let stream = transport.connect(&self.endpoint).await?;
                tracing::debug!(addr = %self.address, "Connected to object manager");
                slot.insert(stream)
            }
        };

        transport.send_request(stream, request).await
    }
}

impl std::fmt::Debug for ObjectManagerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectManagerClient")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
