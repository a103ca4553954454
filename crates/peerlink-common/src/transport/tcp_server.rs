use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use crate::protocol::error::{PeerlinkError, Result};
use crate::protocol::{Request, Response};
use crate::transport::codec::JsonCodec;
use crate::transport::tcp::TcpTransportAsync;

/// Async TCP server answering length-prefixed JSON requests.
///
/// Each accepted connection gets its own task and stays open for any number
/// of requests until the peer closes it.
pub struct TcpServer {
    listener: TcpListener,
    transport: TcpTransportAsync,
    accepted: Arc<AtomicU64>,
}

impl TcpServer {
    /// Binds to `bind_addr` (e.g. `"0.0.0.0:8076"`, or port 0 for any).
    pub async fn new(bind_addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| PeerlinkError::Connection(format!("Failed to bind to {}: {}", bind_addr, e)))?;

        Ok(Self {
            listener,
            transport: TcpTransportAsync::new(),
            accepted: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Counter of connections accepted so far. Stays readable after the
    /// server has been moved into [`run_with_handler`](Self::run_with_handler).
    pub fn accepted_connections(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.accepted)
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| PeerlinkError::Connection(format!("Failed to get local addr: {}", e)))
    }

    /// Accepts connections forever, answering each request with `handler`.
    ///
    /// A handler error is sent back to the caller as an error response; it
    /// does not close the connection.
    pub async fn run_with_handler<F, Fut>(self, handler: F) -> Result<()>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        let handler = Arc::new(handler);

        loop {
            let (stream, peer_addr) = self
                .listener
                .accept()
                .await
                .map_err(|e| PeerlinkError::Connection(format!("Failed to accept connection: {}", e)))?;

            self.accepted.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(peer = %peer_addr, "Connection established");

            let handler = handler.clone();
            let transport = self.transport.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, transport, handler).await {
                    tracing::debug!(peer = %peer_addr, error = %e, "Connection error");
                }
            });
        }
    }
}

async fn handle_connection<F, Fut>(
    mut stream: TcpStream,
    transport: TcpTransportAsync,
    handler: Arc<F>,
) -> Result<()>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    loop {
        let buf = match transport.receive_message(&mut stream).await {
            Ok(buf) => buf,
            // Peer closed the stream between requests
            Err(PeerlinkError::Connection(_)) => return Ok(()),
            Err(e) => return Err(e),
        };

        let request = match JsonCodec::decode_request(&buf) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to decode request");
                send_response(&mut stream, &Response::error(0, e.to_string())).await?;
                continue;
            }
        };

        let request_id = request.id;
        let response = match handler(request).await {
            Ok(resp) => resp,
            Err(e) => Response::error(request_id, e.to_string()),
        };

        send_response(&mut stream, &response).await?;
    }
}

async fn send_response(stream: &mut TcpStream, response: &Response) -> Result<()> {
    let encoded = JsonCodec::encode_response(response)?;
    TcpTransportAsync::send_message(stream, &encoded).await
}
