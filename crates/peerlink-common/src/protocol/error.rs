use thiserror::Error;

#[derive(Error, Debug)]
pub enum PeerlinkError {
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl From<std::net::AddrParseError> for PeerlinkError {
    fn from(err: std::net::AddrParseError) -> Self {
        PeerlinkError::InvalidAddress(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PeerlinkError>;
