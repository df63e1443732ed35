//! Error types.

/// Why the hand source stopped producing frames.  Every variant is terminal
/// for the tick loop; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    /// The landmark feed reached end of file.
    #[error("hand feed ended")]
    EndOfStream,

    /// The producer on the other side of a channel went away (window closed).
    #[error("hand source disconnected")]
    Disconnected,

    #[error("failed to read hand feed: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed hand frame on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl AcquireError {
    /// End of input and a closed window are ordinary ways for a session to end.
    pub fn is_orderly(&self) -> bool {
        matches!(self, AcquireError::EndOfStream | AcquireError::Disconnected)
    }
}

/// Errors surfaced by application setup and shutdown.
#[derive(Debug, thiserror::Error)]
pub enum PianoError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("window error: {0}")]
    Window(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tick loop panicked")]
    TickLoopPanicked,
}

pub type Result<T> = std::result::Result<T, PianoError>;
