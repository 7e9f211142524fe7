#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `fcpmon-core` implements the FCP client session engine consumed by the
//! `fcpmon` binary: one stream socket to the node, multiplexed across any number of
//! concurrently tracked fetch ("get") and insert ("put") jobs whose
//! lifecycles are driven by asynchronous node events.
//!
//! # Design
//!
//! - [`Connection`](connection::Connection) owns the socket and exposes
//!   send-one, send-many (an atomic write batch), and the decoded message
//!   sequence.
//! - [`Session`](session::Session) is the single owner of all mutable
//!   session state (the request registry, the waiting set, the deferred
//!   message queue, and the directory-access handshake) and drives the
//!   dispatch loop that routes incoming messages to state transitions.
//! - The presentation boundary is the [`SessionObserver`](events::SessionObserver)
//!   trait plus read-only [`RequestSnapshot`](registry::RequestSnapshot)
//!   projections; renderers never touch registry internals.
//!
//! # Concurrency
//!
//! The engine is deliberately single-threaded: the dispatch loop is the sole
//! consumer of the message sequence and the sole mutator of session state,
//! so no internal locking exists. The only suspension point is the blocking
//! read for the next complete message, which ends when the node closes the
//! connection.

/// Socket ownership, outbound writes, and the inbound message sequence.
pub mod connection;
/// Directory-access (TestDDA) handshake state and probe handling.
pub mod dda;
/// Session error type.
pub mod error;
/// Presentation boundary: observer trait, status events, severities.
pub mod events;
/// Process exit codes shared with the CLI frontend.
pub mod exit_code;
/// Job submission: fetch/cancel builders, verbosity flags, option overlays.
pub mod jobs;
/// Deferred outbound messages gated on named events.
pub mod queue;
/// Per-identifier request metadata and read-only snapshots.
pub mod registry;
/// Dispatch loop and session state.
pub mod session;
/// Test support utilities shared with integration tests.
pub mod test_utils;
/// Waiting set with wildcard watch semantics.
pub mod waiting;

pub use connection::{Connection, TcpConnection};
pub use error::ClientError;
pub use events::{ProgressState, SessionObserver, Severity, StatusEvent};
pub use jobs::{FetchOptions, Verbosity};
pub use registry::{JobType, RequestSnapshot};
pub use session::{Session, SessionConfig};
