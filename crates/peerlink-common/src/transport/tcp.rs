use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::protocol::error::{PeerlinkError, Result};
use crate::protocol::{Request, Response};
use crate::transport::codec::JsonCodec;

/// Default timeout for establishing a TCP connection (5 seconds)
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default upper bound on a single frame (100 MB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Async TCP transport used by peer clients.
///
/// The transport itself is stateless apart from its limits; streams are
/// owned by the caller so one transport can serve any number of
/// connections.
///
/// # Example
///
/// ```no_run
/// use peerlink_common::transport::TcpTransportAsync;
/// use peerlink_common::protocol::Request;
/// use serde_json::json;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = TcpTransportAsync::new();
/// let mut stream = transport.connect("127.0.0.1:8076").await?;
///
/// let request = Request::new("Pull", json!({"object_id": "00"}));
/// let response = transport.send_request(&mut stream, &request).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TcpTransportAsync {
    connect_timeout: Duration,
    max_message_size: usize,
}

impl TcpTransportAsync {
    pub fn new() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Connects to a remote endpoint.
    ///
    /// The endpoint is resolved and each resolved address is tried in turn
    /// until one accepts. The whole attempt is bounded by the connect
    /// timeout.
    ///
    /// # Errors
    ///
    /// - `Connection` if the endpoint cannot be resolved or every address
    ///   refuses
    /// - `Timeout` if the connect timeout elapses first
    pub async fn connect(&self, addr: &str) -> Result<TcpStream> {
        match tokio::time::timeout(self.connect_timeout, Self::connect_any(addr)).await {
            Ok(result) => result,
            Err(_) => Err(PeerlinkError::Timeout(self.connect_timeout.as_millis() as u64)),
        }
    }

    async fn connect_any(addr: &str) -> Result<TcpStream> {
        let socket_addrs = tokio::net::lookup_host(addr)
            .await
            .map_err(|e| PeerlinkError::Connection(format!("Invalid address '{}': {}", addr, e)))?;

        let mut last_err = None;
        for socket_addr in socket_addrs {
            match TcpStream::connect(socket_addr).await {
                Ok(stream) => {
                    // Requests are small and latency bound
                    stream.set_nodelay(true)?;
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }

        Err(PeerlinkError::Connection(format!(
            "Failed to connect to {}: {}",
            addr,
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no addresses resolved".to_string())
        )))
    }

    /// Sends a request and waits for its response on the same stream.
    ///
    /// # Errors
    ///
    /// Returns `InvalidResponse` if the peer answers with a different
    /// request id, besides any framing or I/O failure.
    pub async fn send_request(&self, stream: &mut TcpStream, request: &Request) -> Result<Response> {
        let encoded = JsonCodec::encode_request(request)?;
        Self::send_message(stream, &encoded).await?;

        let response_data = self.receive_message(stream).await?;
        let response = JsonCodec::decode_response(&response_data)?;

        if response.id != request.id {
            return Err(PeerlinkError::InvalidResponse(format!(
                "Response id {} does not match request id {}",
                response.id, request.id
            )));
        }

        Ok(response)
    }

    /// Writes one length-prefixed frame and flushes it.
    pub async fn send_message(stream: &mut TcpStream, data: &[u8]) -> Result<()> {
        let len = u32::try_from(data.len()).map_err(|_| {
            PeerlinkError::InvalidRequest(format!("Message too large to frame: {} bytes", data.len()))
        })?;

        stream
            .write_all(&len.to_be_bytes())
            .await
            .map_err(|e| Self::map_io_error(e, "writing length prefix"))?;
        stream
            .write_all(data)
            .await
            .map_err(|e| Self::map_io_error(e, "writing data"))?;
        stream
            .flush()
            .await
            .map_err(|e| Self::map_io_error(e, "flushing stream"))?;

        Ok(())
    }

    /// Reads one length-prefixed frame.
    ///
    /// # Errors
    ///
    /// - `InvalidResponse` if the announced length exceeds the maximum
    ///   message size
    /// - `Connection` if the peer closes or resets the stream
    pub async fn receive_message(&self, stream: &mut TcpStream) -> Result<Vec<u8>> {
        let mut len_buf = [0u8; 4];
        stream
            .read_exact(&mut len_buf)
            .await
            .map_err(|e| Self::map_io_error(e, "reading length prefix"))?;

        let len = u32::from_be_bytes(len_buf) as usize;
        if len > self.max_message_size {
            return Err(PeerlinkError::InvalidResponse(format!(
                "Message too large: {} bytes (max {} bytes)",
                len, self.max_message_size
            )));
        }

        let mut buf = vec![0u8; len];
        stream
            .read_exact(&mut buf)
            .await
            .map_err(|e| Self::map_io_error(e, "reading data"))?;

        Ok(buf)
    }

    fn map_io_error(err: std::io::Error, context: &str) -> PeerlinkError {
        match err.kind() {
            std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::NotConnected
            | std::io::ErrorKind::UnexpectedEof => {
                PeerlinkError::Connection(format!("{}: Connection lost", context))
            }
            _ => PeerlinkError::Io(err),
        }
    }
}

impl Default for TcpTransportAsync {
    fn default() -> Self {
        Self::new()
    }
}
