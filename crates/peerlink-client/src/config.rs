use std::time::Duration;

use peerlink_common::transport::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_MESSAGE_SIZE};

/// Settings applied to every client built from one [`CallManager`].
///
/// # Default Configuration
///
/// - `connect_timeout_ms`: 5000 (5 seconds)
/// - `request_timeout_ms`: 30000 (30 seconds)
/// - `max_message_size`: 100 MB
///
/// # Example
///
/// ```rust
/// use peerlink_client::ClientConfig;
///
/// let config = ClientConfig::default()
///     .with_connect_timeout_ms(1000)
///     .with_request_timeout_ms(10_000);
/// assert_eq!(config.connect_timeout_ms, 1000);
/// ```
///
/// [`CallManager`]: crate::CallManager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Maximum time to establish the TCP connection, in milliseconds
    pub connect_timeout_ms: u64,
    /// Maximum time for one call including any (re)connect, in milliseconds
    pub request_timeout_ms: u64,
    /// Largest response frame accepted, in bytes
    pub max_message_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT.as_millis() as u64,
            request_timeout_ms: 30000, // 30 seconds
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
