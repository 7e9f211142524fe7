//! In-memory doubles shared by unit and integration tests.

use std::io::Cursor;

use protocol::{Message, MessageReader};

use crate::connection::Connection;
use crate::events::{ProgressState, SessionObserver, StatusEvent};
use crate::registry::RequestSnapshot;

/// Connection over in-memory buffers: scripted inbound bytes, captured
/// outbound bytes.
pub type MemoryConnection = Connection<Cursor<Vec<u8>>, Vec<u8>>;

/// Builds a connection whose inbound side replays `input` and whose
/// outbound side is inspectable through [`sent_messages`].
#[must_use]
pub fn memory_connection(input: &str) -> MemoryConnection {
    Connection::from_parts(Cursor::new(input.as_bytes().to_vec()), Vec::new())
}

/// Decodes every message the connection has written so far.
#[must_use]
pub fn sent_messages(connection: &MemoryConnection) -> Vec<Message> {
    MessageReader::new(Cursor::new(connection.writer().clone()))
        .map(|result| result.expect("outbound bytes are well-framed"))
        .collect()
}

/// Observer that records everything it is shown, in emission order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    /// Status events, in emission order.
    pub events: Vec<StatusEvent>,
    /// Detail lines as (identifier, text) pairs.
    pub details: Vec<(Option<String>, String)>,
    /// Progress reports as (snapshot, state) pairs.
    pub progress: Vec<(RequestSnapshot, ProgressState)>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels of all recorded status events, in order.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.events.iter().map(StatusEvent::label).collect()
    }
}

impl SessionObserver for RecordingObserver {
    fn status(&mut self, event: &StatusEvent) {
        self.events.push(event.clone());
    }

    fn detail(&mut self, identifier: Option<&str>, text: &str) {
        self.details
            .push((identifier.map(str::to_owned), text.to_owned()));
    }

    fn progress(&mut self, snapshot: &RequestSnapshot, state: ProgressState) {
        self.progress.push((snapshot.clone(), state));
    }
}
