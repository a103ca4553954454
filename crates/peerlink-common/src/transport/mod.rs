//! Peer transport layer.
//!
//! Every message travels as a length-prefixed JSON frame:
//!
//! ```text
//! [4-byte length as u32 big-endian] [JSON data]
//! ```
//!
//! - [`JsonCodec`]: maps protocol messages to frame payloads
//! - [`TcpTransportAsync`]: client side, connects and exchanges frames
//! - [`TcpServer`]: server side, accepts connections and answers requests
//!
//! Receivers reject frames larger than the configured maximum message size
//! (100 MB by default) before allocating for them.

pub mod codec;
pub mod tcp;
pub mod tcp_server;

pub use codec::JsonCodec;
pub use tcp::{TcpTransportAsync, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_MESSAGE_SIZE};
pub use tcp_server::TcpServer;
