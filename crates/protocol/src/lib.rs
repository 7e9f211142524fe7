#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `protocol` implements the wire layer of the Freenet Client Protocol (FCP)
//! 2.0: a line-oriented, message-framed text protocol spoken to a node daemon
//! over a stream socket. A message is a contiguous run of UTF-8 lines: the
//! message name, zero or more `Key=Value` field lines, and the
//! [`END_MESSAGE`] sentinel line. There is no length prefix; framing relies
//! solely on the sentinel.
//!
//! # Design
//!
//! - [`Message`] is the ordered record type shared by the send and receive
//!   paths. Field insertion order is preserved so serialisation is
//!   deterministic, while reads treat the fields as a set.
//! - [`MessageReader`] is the lazy frame decoder. It pulls exactly one
//!   complete message per call, tolerates malformed field lines without
//!   aborting the stream, and doubles as an unbounded [`Iterator`] that ends
//!   only when the underlying stream closes.
//!
//! # Errors
//!
//! Framing problems are deliberately non-fatal: malformed lines are reported
//! through `tracing` and discarded, and a stream that closes mid-message
//! drops the partial frame. Only transport failures surface as
//! [`FrameError`] values.

/// Frame decoder error type.
pub mod error;
/// The ordered, line-based message record.
pub mod message;
/// Lazy frame decoder over a buffered stream.
pub mod reader;

pub use error::FrameError;
pub use message::Message;
pub use reader::MessageReader;

/// Sentinel line terminating every message on the wire.
pub const END_MESSAGE: &str = "EndMessage";

/// Protocol version advertised in the `ClientHello` handshake.
pub const PROTOCOL_VERSION: &str = "2.0";

/// Default TCP port of the node's FCP listener (`freenet-fcp`).
pub const DEFAULT_FCP_PORT: u16 = 9481;
