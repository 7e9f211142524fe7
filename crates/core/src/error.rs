use std::io;
use std::net::SocketAddr;

use protocol::FrameError;

/// Failures surfaced by the session engine.
///
/// Protocol-level problems (malformed frames, unknown messages, error
/// replies from the node) are modelled as ordinary events and never appear
/// here; only transport failures and fatal local filesystem errors during
/// the directory-access handshake abort a session.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Establishing the TCP connection to the node failed.
    #[error("failed to connect to the node at {addr}: {source}")]
    Connect {
        /// Address of the node's FCP listener.
        addr: SocketAddr,
        /// Underlying socket error.
        source: io::Error,
    },

    /// Writing an outbound message to the node failed.
    #[error("failed to send a message to the node: {source}")]
    Send {
        /// Underlying socket error.
        source: io::Error,
    },

    /// Reading from the node failed.
    #[error("failed to receive from the node: {source}")]
    Receive {
        /// Frame decoder error.
        #[from]
        source: FrameError,
    },

    /// A directory-access probe could not read or write the probe file.
    ///
    /// Fatal for that directory registration: a broken filesystem makes
    /// file-based jobs impossible, so the handshake aborts without retry.
    #[error("directory access probe failed for {path}: {source}")]
    DirectoryProbe {
        /// Probe file the node asked the client to read or write.
        path: String,
        /// Underlying filesystem error.
        source: io::Error,
    },
}
