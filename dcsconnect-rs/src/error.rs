use thiserror::Error;

/// Everything that can go wrong during one exchange with the host.
///
/// These never leave the crate through [`crate::Transport`]; they are logged and
/// folded into [`crate::Reply::Disconnected`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Connection closed before a complete frame was received")]
    UnexpectedEof,

    #[error("Frame exceeds {0} bytes")]
    FrameTooLarge(usize),

    #[error("No reply within {0:?}")]
    TimedOut(std::time::Duration),
}
