use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    /// Every configured source failed.
    #[error("Video source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("Failed to decode catalog: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, LibraryError>;
