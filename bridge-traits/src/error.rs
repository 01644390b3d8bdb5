use thiserror::Error;

/// Errors reported by host bridge implementations.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The platform refused to hand out a video surface (decoder limit,
    /// memory pressure, missing codec support).
    #[error("Video surface unavailable: {0}")]
    SurfaceUnavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns `true` for failures caused by the network or a slow peer.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, BridgeError::Timeout(_) | BridgeError::OperationFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
