use thiserror::Error;

/// A convenience `Result` alias using [`ColloquyError`].
pub type ColloquyResult<T> = Result<T, ColloquyError>;

/// Top-level error type for Colloquy.
#[derive(Error, Debug)]
pub enum ColloquyError {
    /// A turn was appended before its response was resolved.
    #[error("Invalid turn: {0}")]
    InvalidTurn(String),

    /// Any failure reported by the remote model (network, quota, bad request).
    #[error("Remote call error: {0}")]
    RemoteCall(String),

    /// An error related to session persistence or lookup.
    #[error("Session error: {0}")]
    Session(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ColloquyError {
    /// Whether this error came from the remote model rather than local state.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteCall(_))
    }
}
