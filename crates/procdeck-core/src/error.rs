use thiserror::Error;

/// Core error types for worker supervision
#[derive(Error, Debug)]
pub enum DeckError {
    #[error("No item queued on channel")]
    ChannelEmpty,

    #[error("Peer endpoint closed")]
    PeerClosed,

    #[error("Worker already registered: {0}")]
    DuplicateName(String),

    #[error("No worker registered as: {0}")]
    UnknownName(String),

    #[error("Worker is already running: {0}")]
    AlreadyRunning(String),

    #[error("Unknown worker entry point: {0}")]
    UnknownEntryPoint(String),

    #[error("Failed to launch worker: {0}")]
    Spawn(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frame codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl DeckError {
    /// Channel-level failures local to a single send or receive
    pub fn is_transient(&self) -> bool {
        matches!(self, DeckError::ChannelEmpty | DeckError::PeerClosed)
    }

    /// Errors that point at a wiring mistake between the UI and the registry
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            DeckError::DuplicateName(_)
                | DeckError::UnknownName(_)
                | DeckError::AlreadyRunning(_)
                | DeckError::UnknownEntryPoint(_)
        )
    }
}
