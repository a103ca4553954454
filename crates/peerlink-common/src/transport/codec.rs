use crate::protocol::error::Result;
use crate::protocol::{Request, Response};

/// JSON codec for protocol messages.
///
/// Framing is the transport's job; this only maps messages to and from the
/// payload bytes.
///
/// # Example
///
/// ```
/// use peerlink_common::transport::JsonCodec;
/// use peerlink_common::protocol::Request;
/// use serde_json::json;
///
/// let request = Request::new("Push", json!({"object_id": "00"}));
/// let encoded = JsonCodec::encode_request(&request).unwrap();
/// assert_eq!(JsonCodec::decode_request(&encoded).unwrap(), request);
/// ```
pub struct JsonCodec;

impl JsonCodec {
    pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(request)?)
    }

    pub fn decode_request(data: &[u8]) -> Result<Request> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(response)?)
    }

    pub fn decode_response(data: &[u8]) -> Result<Response> {
        Ok(serde_json::from_slice(data)?)
    }
}
