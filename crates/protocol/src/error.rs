use std::io;

/// Failures surfaced by the frame decoder.
///
/// Malformed field lines and truncated trailing messages are recovered from
/// locally and never produce a `FrameError`; only transport-level problems
/// abort the message sequence.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Reading from the underlying stream failed.
    #[error("failed to read from the message stream: {0}")]
    Io(#[from] io::Error),
}
