use std::fmt;
use std::io::{self, Write};

use crate::END_MESSAGE;

/// A single FCP message: a name plus an ordered mapping of string fields.
///
/// Keys are unique; assigning an existing key overwrites its value in place
/// so the original insertion order is preserved for serialisation. Reads do
/// not depend on field order, and equality compares the field *set* rather
/// than the field sequence.
///
/// # Examples
///
/// ```
/// use protocol::Message;
///
/// let hello = Message::new("ClientHello")
///     .field("Name", "fcpmon")
///     .field("ExpectedVersion", "2.0");
///
/// assert_eq!(hello.get("Name"), Some("fcpmon"));
/// assert!(hello.to_wire_string().ends_with("EndMessage\n"));
/// ```
#[derive(Clone, Debug)]
pub struct Message {
    name: String,
    fields: Vec<(String, String)>,
}

impl Message {
    /// Creates an empty message with the given name.
    #[must_use]
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Returns the message name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds or overwrites a field, builder style.
    #[must_use]
    pub fn field<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.set(key, value);
        self
    }

    /// Adds or overwrites a boolean field using the wire literals
    /// `true`/`false`.
    #[must_use]
    pub fn flag<K: Into<String>>(self, key: K, value: bool) -> Self {
        self.field(key, if value { "true" } else { "false" })
    }

    /// Assigns a field, overwriting in place when the key already exists so
    /// insertion order stays stable.
    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(existing, _)| *existing == key) {
            slot.1 = value;
        } else {
            self.fields.push((key, value));
        }
    }

    /// Returns the value of a field, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    /// Returns whether a field with the given key is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Interprets a field as a wire boolean. Absent fields and anything other
    /// than the literal `true` read as `false`.
    #[must_use]
    pub fn bool_field(&self, key: &str) -> bool {
        self.get(key) == Some("true")
    }

    /// Shorthand for the `Identifier` field carried by job-related messages.
    #[must_use]
    pub fn identifier(&self) -> Option<&str> {
        self.get("Identifier")
    }

    /// Iterates over the fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns whether the message carries no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copies every field of `other` into this message, last writer wins.
    ///
    /// This is the controlled in-place update used by the request registry
    /// when merging progress messages into accumulated job state.
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in other.fields() {
            self.set(key, value);
        }
    }

    /// Extracts the distinct group keys of dotted field names.
    ///
    /// Messages carry dynamically keyed field groups such as
    /// `Errors.<code>.Count` / `Errors.<code>.Description` or
    /// `Hashes.<algorithm>`. Given the group prefix this returns the distinct
    /// middle segments, sorted, so callers can look up the grouped sub-fields
    /// without bespoke per-group types.
    ///
    /// # Examples
    ///
    /// ```
    /// use protocol::Message;
    ///
    /// let failed = Message::new("GetFailed")
    ///     .field("Errors.28.Count", "4")
    ///     .field("Errors.28.Description", "not in store")
    ///     .field("Errors.12.Count", "1");
    ///
    /// assert_eq!(failed.group_keys("Errors"), vec!["12", "28"]);
    /// ```
    #[must_use]
    pub fn group_keys(&self, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .fields
            .iter()
            .filter_map(|(key, _)| key.strip_prefix(prefix))
            .filter_map(|rest| rest.strip_prefix('.'))
            .map(|rest| rest.split('.').next().unwrap_or(rest).to_owned())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Serialises the message into its wire framing.
    pub fn encode_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(self.name.as_bytes())?;
        writer.write_all(b"\n")?;
        for (key, value) in &self.fields {
            writer.write_all(key.as_bytes())?;
            writer.write_all(b"=")?;
            writer.write_all(value.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        writer.write_all(END_MESSAGE.as_bytes())?;
        writer.write_all(b"\n")
    }

    /// Returns the wire form as an owned string.
    #[must_use]
    pub fn to_wire_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        for (key, value) in &self.fields {
            writeln!(f, "{key}={value}")?;
        }
        writeln!(f, "{END_MESSAGE}")
    }
}

impl PartialEq for Message {
    /// Messages compare by name and field set; field order is irrelevant.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.fields.len() == other.fields.len()
            && self
                .fields()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl Eq for Message {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites_in_place_preserving_order() {
        let mut message = Message::new("ClientGet")
            .field("URI", "CHK@abc/file")
            .field("Identifier", "job-1");
        message.set("URI", "CHK@def/file");

        let keys: Vec<&str> = message.fields().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["URI", "Identifier"]);
        assert_eq!(message.get("URI"), Some("CHK@def/file"));
    }

    #[test]
    fn flags_serialise_as_literals() {
        let message = Message::new("TestDDARequest")
            .flag("WantReadDirectory", true)
            .flag("WantWriteDirectory", false);

        assert_eq!(message.get("WantReadDirectory"), Some("true"));
        assert_eq!(message.get("WantWriteDirectory"), Some("false"));
        assert!(message.bool_field("WantReadDirectory"));
        assert!(!message.bool_field("WantWriteDirectory"));
        assert!(!message.bool_field("Missing"));
    }

    #[test]
    fn wire_form_matches_framing() {
        let message = Message::new("ClientHello")
            .field("Name", "fcpmon")
            .field("ExpectedVersion", "2.0");

        assert_eq!(
            message.to_wire_string(),
            "ClientHello\nName=fcpmon\nExpectedVersion=2.0\nEndMessage\n"
        );
    }

    #[test]
    fn values_may_contain_equals_signs() {
        let message = Message::new("ProtocolError").field("ExtraDescription", "a=b=c");
        assert_eq!(message.get("ExtraDescription"), Some("a=b=c"));
        assert!(message.to_wire_string().contains("ExtraDescription=a=b=c\n"));
    }

    #[test]
    fn equality_ignores_field_order() {
        let left = Message::new("SimpleProgress")
            .field("Total", "10")
            .field("Succeeded", "3");
        let right = Message::new("SimpleProgress")
            .field("Succeeded", "3")
            .field("Total", "10");

        assert_eq!(left, right);
        assert_ne!(left, left.clone().field("Failed", "1"));
    }

    #[test]
    fn group_keys_are_distinct_and_sorted() {
        let message = Message::new("GetFailed")
            .field("Errors.28.Count", "4")
            .field("Errors.28.Description", "not in store")
            .field("Errors.12.Count", "1")
            .field("Errors.12.Description", "rejected")
            .field("CodeDescription", "unrelated");

        assert_eq!(message.group_keys("Errors"), vec!["12", "28"]);
    }

    #[test]
    fn group_keys_handle_suffix_free_groups() {
        let message = Message::new("ExpectedHashes")
            .field("Hashes.SHA256", "aa")
            .field("Hashes.MD5", "bb");

        assert_eq!(message.group_keys("Hashes"), vec!["MD5", "SHA256"]);
    }

    #[test]
    fn merge_from_is_last_writer_wins() {
        let mut accumulated = Message::new("job")
            .field("Total", "10")
            .field("Succeeded", "1");
        let update = Message::new("SimpleProgress")
            .field("Succeeded", "5")
            .field("Failed", "2");

        accumulated.merge_from(&update);

        assert_eq!(accumulated.get("Total"), Some("10"));
        assert_eq!(accumulated.get("Succeeded"), Some("5"));
        assert_eq!(accumulated.get("Failed"), Some("2"));
    }
}
