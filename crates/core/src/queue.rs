use std::collections::BTreeSet;

use protocol::Message;

/// An outbound message blocked on named preconditions.
#[derive(Clone, Debug)]
struct QueuedMessage {
    message: Message,
    pending: BTreeSet<String>,
}

/// Holds outbound messages until every named precondition event has fired.
///
/// Entries are inert: there is no timeout or expiry. A precondition that
/// never fires leaves its message permanently unsent, which is acceptable:
/// the directory-access handshake owning the event is expected to complete
/// or the process exits.
#[derive(Debug, Default)]
pub struct DeferredQueue {
    entries: Vec<QueuedMessage>,
}

impl DeferredQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues each message behind its own copy of the precondition set.
    pub fn enqueue<I>(&mut self, messages: I, events: &BTreeSet<String>)
    where
        I: IntoIterator<Item = Message>,
    {
        for message in messages {
            self.entries.push(QueuedMessage {
                message,
                pending: events.clone(),
            });
        }
    }

    /// Marks an event as fired and drains every entry whose precondition set
    /// became empty, in original enqueue order.
    ///
    /// Partial event arrival only shrinks pending sets; a message is
    /// released exactly once, the instant its last precondition fires. The
    /// caller is responsible for sending the drained messages.
    #[must_use]
    pub fn release(&mut self, event: &str) -> Vec<Message> {
        let mut ready = Vec::new();
        let mut remaining = Vec::with_capacity(self.entries.len());
        for mut entry in self.entries.drain(..) {
            entry.pending.remove(event);
            if entry.pending.is_empty() {
                ready.push(entry.message);
            } else {
                remaining.push(entry);
            }
        }
        self.entries = remaining;
        ready
    }

    /// Number of messages still blocked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no messages are blocked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
