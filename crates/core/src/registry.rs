use rustc_hash::FxHashMap;

use protocol::Message;

/// Kind of job tracked by a request.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobType {
    /// A fetch job (`ClientGet` / `PersistentGet`).
    Get,
    /// An insert job (`ClientPut` / `PersistentPut`).
    Put,
}

impl JobType {
    /// Returns the lowercase wire/display name of the job type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
        }
    }
}

/// Accumulated metadata for one tracked job identifier.
///
/// A request is exclusively owned by the [`RequestRegistry`]; consumers read
/// [`RequestSnapshot`] copies instead of holding references into the
/// registry.
#[derive(Clone, Debug)]
pub struct Request {
    fields: Message,
    job_type: Option<JobType>,
}

impl Request {
    fn new(identifier: &str) -> Self {
        Self {
            fields: Message::new(identifier),
            job_type: None,
        }
    }

    /// Returns an accumulated field value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key)
    }

    /// Returns the locally attached job type, if one was tagged.
    #[must_use]
    pub const fn job_type(&self) -> Option<JobType> {
        self.job_type
    }

    fn counter(&self, key: &str) -> u64 {
        self.get(key).and_then(|value| value.parse().ok()).unwrap_or(0)
    }
}

/// Read-only projection of a request handed across the presentation
/// boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestSnapshot {
    identifier: String,
    job_type: JobType,
    real_time: bool,
    finalized_total: bool,
    total: u64,
    required: u64,
    succeeded: u64,
    failed: u64,
}

impl RequestSnapshot {
    /// Identifier of the job this snapshot describes.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Job type; fetches are assumed when the node never said otherwise.
    #[must_use]
    pub const fn job_type(&self) -> JobType {
        self.job_type
    }

    /// Whether the job runs with the realtime flag.
    #[must_use]
    pub const fn real_time(&self) -> bool {
        self.real_time
    }

    /// Whether the node has finalized the total block count.
    #[must_use]
    pub const fn finalized_total(&self) -> bool {
        self.finalized_total
    }

    /// Total number of blocks known to the node.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Number of blocks required for completion.
    #[must_use]
    pub const fn required(&self) -> u64 {
        self.required
    }

    /// Number of blocks fetched or inserted so far.
    #[must_use]
    pub const fn succeeded(&self) -> u64 {
        self.succeeded
    }

    /// Number of failed block transfers.
    #[must_use]
    pub const fn failed(&self) -> u64 {
        self.failed
    }

    /// Fraction of required blocks already succeeded, `0.0` when the
    /// required count is still unknown.
    #[must_use]
    pub fn progress_ratio(&self) -> f64 {
        if self.required == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.required as f64
        }
    }

    /// Fraction of the outstanding blocks that have failed, `0.0` once
    /// nothing is outstanding.
    #[must_use]
    pub fn failure_ratio(&self) -> f64 {
        if self.total > self.succeeded {
            self.failed as f64 / (self.total - self.succeeded) as f64
        } else {
            0.0
        }
    }
}

/// Per-identifier metadata store for all jobs seen during a session.
#[derive(Debug, Default)]
pub struct RequestRegistry {
    requests: FxHashMap<String, Request>,
}

impl RequestRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges an incoming message into the request named by its
    /// `Identifier` field, creating the request when unseen.
    ///
    /// Fields merge last-writer-wins; counters are taken verbatim from the
    /// message, never summed. Returns `Some(was_known)` so the dispatch loop
    /// can report "now active" exactly once per identifier, or `None` when
    /// the message carries no identifier.
    pub fn merge(&mut self, message: &Message) -> Option<bool> {
        self.merge_tagged(message, None)
    }

    /// Like [`merge`](Self::merge), additionally tagging the request with a
    /// locally known job type in the same atomic update.
    pub fn merge_with_job_type(&mut self, message: &Message, job_type: JobType) -> Option<bool> {
        self.merge_tagged(message, Some(job_type))
    }

    fn merge_tagged(&mut self, message: &Message, job_type: Option<JobType>) -> Option<bool> {
        let identifier = message.identifier()?;
        let was_known = self.requests.contains_key(identifier);
        let request = self
            .requests
            .entry(identifier.to_owned())
            .or_insert_with(|| Request::new(identifier));
        request.fields.merge_from(message);
        if let Some(job_type) = job_type {
            request.job_type = Some(job_type);
        }
        Some(was_known)
    }

    /// Removes a request entirely.
    ///
    /// The registry keeps no tombstone: a later message for the same
    /// identifier recreates the request from scratch, as if never seen.
    pub fn forget(&mut self, identifier: &str) {
        self.requests.remove(identifier);
    }

    /// Returns whether the identifier is currently known.
    #[must_use]
    pub fn contains(&self, identifier: &str) -> bool {
        self.requests.contains_key(identifier)
    }

    /// Returns the accumulated request, if known.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<&Request> {
        self.requests.get(identifier)
    }

    /// Produces the read-only snapshot consumed by progress renderers.
    #[must_use]
    pub fn snapshot(&self, identifier: &str) -> Option<RequestSnapshot> {
        let request = self.requests.get(identifier)?;
        Some(RequestSnapshot {
            identifier: identifier.to_owned(),
            job_type: request.job_type.unwrap_or(JobType::Get),
            real_time: request.get("RealTime") == Some("true"),
            finalized_total: request.get("FinalizedTotal") == Some("true"),
            total: request.counter("Total"),
            required: request.counter("Required"),
            succeeded: request.counter("Succeeded"),
            failed: request.counter("Failed"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(identifier: &str, total: &str, required: &str, succeeded: &str) -> Message {
        Message::new("SimpleProgress")
            .field("Identifier", identifier)
            .field("Total", total)
            .field("Required", required)
            .field("Succeeded", succeeded)
            .field("Failed", "0")
    }

    #[test]
    fn merge_seeds_then_overwrites_counters_verbatim() {
        let mut registry = RequestRegistry::new();

        let was_known = registry.merge(&progress("job", "100", "80", "10")).unwrap();
        assert!(!was_known);

        let was_known = registry.merge(&progress("job", "100", "80", "25")).unwrap();
        assert!(was_known);

        let snapshot = registry.snapshot("job").unwrap();
        assert_eq!(snapshot.succeeded(), 25);
        assert_eq!(snapshot.total(), 100);
    }

    #[test]
    fn merge_without_identifier_is_a_no_op() {
        let mut registry = RequestRegistry::new();
        assert!(registry.merge(&Message::new("SimpleProgress")).is_none());
    }

    #[test]
    fn job_type_tag_survives_later_merges() {
        let mut registry = RequestRegistry::new();
        let tagged = Message::new("PersistentPut").field("Identifier", "ins");
        registry.merge_with_job_type(&tagged, JobType::Put);
        registry.merge(&progress("ins", "10", "10", "2"));

        let snapshot = registry.snapshot("ins").unwrap();
        assert_eq!(snapshot.job_type(), JobType::Put);
    }

    #[test]
    fn registry_recreates_after_forget() {
        // Removal leaves no memory behind: a reappearing identifier is a
        // brand-new request.
        let mut registry = RequestRegistry::new();
        registry.merge_with_job_type(
            &Message::new("PersistentGet").field("Identifier", "r"),
            JobType::Get,
        );
        registry.forget("r");
        assert!(!registry.contains("r"));

        let was_known = registry.merge(&progress("r", "5", "5", "1")).unwrap();
        assert!(!was_known);
        let snapshot = registry.snapshot("r").unwrap();
        assert_eq!(snapshot.succeeded(), 1);
        // The job-type tag died with the old request.
        assert_eq!(snapshot.job_type(), JobType::Get);
    }

    #[test]
    fn ratios_handle_zero_denominators() {
        let mut registry = RequestRegistry::new();
        registry.merge(
            &Message::new("SimpleProgress")
                .field("Identifier", "fresh")
                .field("Total", "0")
                .field("Required", "0")
                .field("Succeeded", "0")
                .field("Failed", "0"),
        );

        let snapshot = registry.snapshot("fresh").unwrap();
        assert_eq!(snapshot.progress_ratio(), 0.0);
        assert_eq!(snapshot.failure_ratio(), 0.0);
    }

    #[test]
    fn failure_ratio_uses_outstanding_blocks() {
        let mut registry = RequestRegistry::new();
        registry.merge(
            &Message::new("SimpleProgress")
                .field("Identifier", "j")
                .field("Total", "100")
                .field("Required", "80")
                .field("Succeeded", "60")
                .field("Failed", "10"),
        );

        let snapshot = registry.snapshot("j").unwrap();
        assert_eq!(snapshot.progress_ratio(), 0.75);
        assert_eq!(snapshot.failure_ratio(), 0.25);
    }
}
