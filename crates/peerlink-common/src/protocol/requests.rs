//! Request types sent by peer clients.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

pub type RequestId = u64;
pub type MethodName = String;
pub type RpcArgs = serde_json::Value;

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// A single remote call: method name plus JSON arguments.
///
/// `timeout_ms` is advisory for the receiving peer; the caller enforces its
/// own deadline independently.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub id: RequestId,
    pub method: MethodName,
    pub args: RpcArgs,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Request {
    pub fn new(method: impl Into<String>, args: RpcArgs) -> Self {
        Request {
            id: generate_request_id(),
            method: method.into(),
            args,
            timeout_ms: None,
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// Process-wide, starting at 1. A response is matched to its request on the
/// same connection, so ids only need to be distinct within one process.
fn generate_request_id() -> RequestId {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}
