use std::borrow::Cow;

use crate::registry::RequestSnapshot;

/// Severity of a status event, used by renderers for colour selection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Severity {
    /// Neutral informational event.
    Info,
    /// A job became active (now downloading/inserting).
    Active,
    /// A job reached a successful terminal state.
    Success,
    /// A non-fatal anomaly: cooldown, removal, collision, redirect.
    Warning,
    /// A failure: job failed or the node reported a protocol error.
    Error,
}

/// One entry of the session's event feed.
///
/// Events carry everything the progress renderer consumes: the identifier
/// (absent for connection-level notices), a short status label, an optional
/// free-form comment, a severity, and (for size reports) the raw byte
/// count so the presentation layer can choose its own human formatting.
#[derive(Clone, Debug)]
pub struct StatusEvent {
    identifier: Option<String>,
    label: Cow<'static, str>,
    comment: Option<String>,
    severity: Severity,
    size: Option<u64>,
}

impl StatusEvent {
    /// Creates an event not tied to any identifier.
    #[must_use]
    pub fn new<L: Into<Cow<'static, str>>>(label: L, severity: Severity) -> Self {
        Self {
            identifier: None,
            label: label.into(),
            comment: None,
            severity,
            size: None,
        }
    }

    /// Creates an event for a tracked identifier.
    #[must_use]
    pub fn for_request<I, L>(identifier: I, label: L, severity: Severity) -> Self
    where
        I: Into<String>,
        L: Into<Cow<'static, str>>,
    {
        Self {
            identifier: Some(identifier.into()),
            label: label.into(),
            comment: None,
            severity,
            size: None,
        }
    }

    /// Attaches a free-form comment.
    #[must_use]
    pub fn with_comment<C: Into<String>>(mut self, comment: C) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Attaches a byte count for size reports.
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Identifier the event refers to, if any.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    /// Short status label (e.g. `downloaded`, `in cooldown`).
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Optional comment (e.g. the node's error code description).
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Event severity.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.severity
    }

    /// Raw byte count for size reports.
    #[must_use]
    pub const fn size(&self) -> Option<u64> {
        self.size
    }
}

/// Rendering context for a progress report.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressState {
    /// The job is transferring normally.
    Running,
    /// The node placed the job in a finite cooldown; not terminal.
    Cooldown,
    /// Final progress snapshot of a failed job.
    Failed,
}

/// Presentation boundary between the session engine and a renderer.
///
/// The dispatch loop pushes status events and progress snapshots through
/// this trait in emission order; observers never read registry internals.
pub trait SessionObserver {
    /// A lifecycle event occurred.
    fn status(&mut self, event: &StatusEvent);

    /// A follow-up detail line for the preceding event (redirect targets,
    /// per-error-kind counts, per-algorithm hashes).
    fn detail(&mut self, identifier: Option<&str>, text: &str);

    /// A progress snapshot for a tracked job.
    fn progress(&mut self, snapshot: &RequestSnapshot, state: ProgressState);
}

/// Observer that discards everything, for sessions run without a renderer.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl SessionObserver for NullObserver {
    fn status(&mut self, _event: &StatusEvent) {}
    fn detail(&mut self, _identifier: Option<&str>, _text: &str) {}
    fn progress(&mut self, _snapshot: &RequestSnapshot, _state: ProgressState) {}
}
