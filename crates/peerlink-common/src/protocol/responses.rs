//! Response types returned by peers.

use serde::{Deserialize, Serialize};

use super::error::{PeerlinkError, Result};
use super::RequestId;

/// RPC method result (JSON value)
pub type RpcResult = serde_json::Value;

/// Reply to a [`Request`](super::Request), matched to it by `id`.
///
/// Exactly one of `result` / `error` is expected to be present, as
/// indicated by `success`.
///
/// # Example
///
/// ```
/// use peerlink_common::protocol::Response;
/// use serde_json::json;
///
/// let ok = Response::success(7, json!({"freed": 3}));
/// assert_eq!(ok.into_result().unwrap(), json!({"freed": 3}));
///
/// let failed = Response::error(7, "object not found");
/// assert!(failed.into_result().is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub id: RequestId,
    pub result: Option<RpcResult>,
    pub error: Option<String>,
    pub success: bool,
}

impl Response {
    pub fn success(id: RequestId, result: RpcResult) -> Self {
        Response {
            id,
            result: Some(result),
            error: None,
            success: true,
        }
    }

    pub fn error(id: RequestId, error: impl Into<String>) -> Self {
        Response {
            id,
            result: None,
            error: Some(error.into()),
            success: false,
        }
    }

    /// Converts the response into the call's outcome.
    ///
    /// A peer-reported failure becomes [`PeerlinkError::Remote`]; a success
    /// without a result is an [`PeerlinkError::InvalidResponse`].
    pub fn into_result(self) -> Result<RpcResult> {
        if self.success {
            self.result.ok_or_else(|| {
                PeerlinkError::InvalidResponse("Missing result in success response".to_string())
            })
        } else {
            Err(PeerlinkError::Remote(
                self.error.unwrap_or_else(|| "Unknown error".to_string()),
            ))
        }
    }
}
