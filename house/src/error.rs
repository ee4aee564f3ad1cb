/// Domain-specific error types for an auction house.
#[derive(Debug, thiserror::Error)]
pub enum HouseError {
    #[error("Protocol framing error: {0}")]
    Protocol(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Duplicate identity: {0}")]
    DuplicateIdentity(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Connection with the peer house was lost")]
    PeerConnectionLost,

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience type alias.
pub type HouseResult<T> = Result<T, HouseError>;
