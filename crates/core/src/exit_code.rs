//! Process exit codes shared between the session engine and the CLI.

/// Session completed normally (waiting set drained or stream closed).
pub const SUCCESS: u8 = 0;

/// Connection, transport, or directory-access failure.
pub const FAILURE: u8 = 1;

/// Command-line usage error.
pub const USAGE: u8 = 2;
