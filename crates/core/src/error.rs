use thiserror::Error;

/// Result type alias for cirrus-core
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the Cirrus chat client
///
/// The two failure classes a chat turn can hit are kept distinct so callers
/// can apply different policies: `Init` halts the current action and leaves
/// the transcript untouched, while `Stream` substitutes the fixed fallback
/// reply for the turn being generated.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error for file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Client/session initialization failure (missing or rejected credential)
    #[error("initialization error: {0}")]
    Init(String),

    /// Submission or mid-stream failure (network, auth, malformed chunk)
    #[error("stream error: {0}")]
    Stream(String),

    /// A submission arrived while a generation was still in flight
    #[error("a generation is already in progress")]
    Busy,

    /// An empty or whitespace-only prompt was submitted
    #[error("prompt is empty")]
    EmptyPrompt,

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error leaves the transcript untouched (as opposed to
    /// recording the fallback reply for the turn).
    pub fn preserves_transcript(&self) -> bool {
        !matches!(self, Error::Stream(_))
    }
}
