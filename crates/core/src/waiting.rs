use rustc_hash::FxHashSet;

/// A member of the waiting set.
///
/// The session waits on request identifiers and on directory-access
/// handshakes; both keep the dispatch loop alive until resolved.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum WaitTarget {
    /// A tracked job identifier.
    Request(String),
    /// A directory-access handshake for the given directory.
    Directory(String),
}

/// The set of identifiers the caller is interested in.
///
/// Membership is either explicit or granted by the wildcard, which expresses
/// interest in every identifier currently known or yet to be created. The
/// session terminates once the set is empty: nothing of interest remains.
#[derive(Debug, Default)]
pub struct WaitingSet {
    members: FxHashSet<WaitTarget>,
    wildcard: bool,
}

impl WaitingSet {
    /// Creates an empty waiting set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a request identifier.
    pub fn watch_request<I: Into<String>>(&mut self, identifier: I) {
        self.members.insert(WaitTarget::Request(identifier.into()));
    }

    /// Adds a directory-access handshake.
    pub fn watch_directory<D: Into<String>>(&mut self, directory: D) {
        self.members.insert(WaitTarget::Directory(directory.into()));
    }

    /// Enables the wildcard: every identifier becomes of interest, including
    /// ones never seen before.
    pub fn watch_everything(&mut self) {
        self.wildcard = true;
    }

    /// Removes an explicit request identifier. The wildcard is unaffected.
    pub fn forget_request(&mut self, identifier: &str) {
        self.members
            .remove(&WaitTarget::Request(identifier.to_owned()));
    }

    /// Removes a directory-access handshake member.
    pub fn forget_directory(&mut self, directory: &str) {
        self.members
            .remove(&WaitTarget::Directory(directory.to_owned()));
    }

    /// Returns whether an identifier is of interest, either explicitly or
    /// via the wildcard.
    #[must_use]
    pub fn is_waited_for(&self, identifier: &str) -> bool {
        self.wildcard
            || self
                .members
                .contains(&WaitTarget::Request(identifier.to_owned()))
    }

    /// Returns whether nothing remains of interest. The wildcard keeps the
    /// set non-empty forever.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.wildcard && self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_membership_is_per_identifier() {
        let mut waiting = WaitingSet::new();
        waiting.watch_request("a");

        assert!(waiting.is_waited_for("a"));
        assert!(!waiting.is_waited_for("b"));

        waiting.forget_request("a");
        assert!(!waiting.is_waited_for("a"));
        assert!(waiting.is_empty());
    }

    #[test]
    fn wildcard_covers_unseen_identifiers() {
        let mut waiting = WaitingSet::new();
        waiting.watch_everything();

        assert!(waiting.is_waited_for("never-seen-before"));
        assert!(waiting.is_waited_for(""));
        assert!(!waiting.is_empty());

        // Forgetting an identifier never disables the wildcard.
        waiting.forget_request("never-seen-before");
        assert!(waiting.is_waited_for("never-seen-before"));
    }

    #[test]
    fn directory_members_keep_the_set_alive() {
        let mut waiting = WaitingSet::new();
        waiting.watch_directory("/downloads");

        assert!(!waiting.is_empty());
        // Directory members do not grant interest in request identifiers.
        assert!(!waiting.is_waited_for("/downloads"));

        waiting.forget_directory("/downloads");
        assert!(waiting.is_empty());
    }
}
