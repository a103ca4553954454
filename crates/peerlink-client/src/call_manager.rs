use peerlink_common::transport::TcpTransportAsync;

use crate::config::ClientConfig;

/// Call-dispatch context shared by every client a pool creates.
///
/// Owns the transport and the [`ClientConfig`] its clients apply. Clients
/// hold it through an `Arc`, so it lives as long as the longest-lived
/// client handle.
#[derive(Debug, Clone)]
pub struct CallManager {
    transport: TcpTransportAsync,
    config: ClientConfig,
}

impl CallManager {
    pub fn new(config: ClientConfig) -> Self {
        let transport = TcpTransportAsync::new()
            .with_connect_timeout(config.connect_timeout())
            .with_max_message_size(config.max_message_size);

        Self { transport, config }
    }

    pub fn transport(&self) -> &TcpTransportAsync {
        &self.transport
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Default for CallManager {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}
