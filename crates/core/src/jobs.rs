use std::fmt;
use std::ops::BitOr;

use percent_encoding::percent_decode_str;
use protocol::Message;

/// Bitmask selecting which progress events the node reports for a job.
///
/// Serialised as a decimal integer in the `Verbosity` field of `ClientGet`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Verbosity(u32);

impl Verbosity {
    /// Report `SimpleProgress` messages.
    pub const SIMPLE_PROGRESS: Self = Self(1 << 0);
    /// Report when the request starts touching the network.
    pub const SENDING_TO_NETWORK: Self = Self(1 << 1);
    /// Report compatibility-mode detection.
    pub const COMPATIBILITY_MODE: Self = Self(1 << 2);
    /// Report expected content hashes.
    pub const EXPECTED_HASHES: Self = Self(1 << 3);
    /// Report the expected MIME type.
    pub const EXPECTED_MIME: Self = Self(1 << 5);
    /// Report the expected data length.
    pub const EXPECTED_DATA_LENGTH: Self = Self(1 << 6);

    /// Default selection for interactive fetches: progress plus hashes.
    pub const DEFAULT_FETCH: Self = Self(Self::SIMPLE_PROGRESS.0 | Self::EXPECTED_HASHES.0);

    /// Returns the raw bitmask.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for Verbosity {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job-submission options merged into outbound `ClientGet` messages.
///
/// The typed fields cover the options the monitor itself sets; `extra` is an
/// opaque key→value overlay assembled by the frontend and applied last,
/// unvalidated, so callers can override anything.
#[derive(Clone, Debug)]
pub struct FetchOptions {
    /// Node-side scheduling priority (0 is highest).
    pub priority_class: u8,
    /// Schedule the job in the realtime queue.
    pub real_time: bool,
    /// Keep the job in the node's global persistent queue, surviving this
    /// connection, with the payload written to disk.
    pub persistent: bool,
    /// Progress verbosity bitmask.
    pub verbosity: Verbosity,
    /// Opaque option overlay, applied after every typed field.
    pub extra: Vec<(String, String)>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            priority_class: 4,
            real_time: true,
            persistent: false,
            verbosity: Verbosity::DEFAULT_FETCH,
            extra: Vec::new(),
        }
    }
}

impl FetchOptions {
    /// Writes the option fields into an outbound message.
    pub fn apply_to(&self, message: &mut Message) {
        message.set("Verbosity", self.verbosity.to_string());
        message.set("PriorityClass", self.priority_class.to_string());
        message.set("RealTimeFlag", if self.real_time { "true" } else { "false" });
        if self.persistent {
            message.set("Global", "true");
            message.set("Persistence", "reboot");
            message.set("ReturnType", "disk");
        } else {
            message.set("Persistence", "connection");
            message.set("ReturnType", "none");
        }
        for (key, value) in &self.extra {
            message.set(key.clone(), value.clone());
        }
    }
}

/// Derives a local filename from a freenet URI.
///
/// Everything after the key part is joined with `-` and percent-decoded,
/// mirroring how fproxy names downloaded files.
#[must_use]
pub fn uri_filename(uri: &str) -> String {
    let tail = uri.split('/').skip(1).collect::<Vec<_>>().join("-");
    percent_decode_str(&tail).decode_utf8_lossy().into_owned()
}

/// Builds a `ClientGet` for one URI.
///
/// `filename` is only attached when a download directory is known; without
/// one the return type decides what the node does with the payload.
#[must_use]
pub fn build_fetch(
    uri: &str,
    identifier: &str,
    filename: Option<&str>,
    options: &FetchOptions,
) -> Message {
    let mut message = Message::new("ClientGet")
        .field("URI", uri)
        .field("Identifier", identifier);
    if let Some(filename) = filename {
        message.set("Filename", filename);
    }
    options.apply_to(&mut message);
    message
}

/// Builds a `RemoveRequest` cancelling a job in the node's global queue.
#[must_use]
pub fn build_remove(identifier: &str) -> Message {
    Message::new("RemoveRequest")
        .field("Identifier", identifier)
        .flag("Global", true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_combines_and_serialises_as_decimal() {
        let verbosity = Verbosity::SIMPLE_PROGRESS | Verbosity::EXPECTED_HASHES;
        assert_eq!(verbosity.bits(), 9);
        assert_eq!(verbosity.to_string(), "9");
        assert_eq!(Verbosity::DEFAULT_FETCH, verbosity);
    }

    #[test]
    fn uri_filename_joins_and_decodes_path_segments() {
        assert_eq!(
            uri_filename("CHK@hash,crypto,extra/some%20file.tar.gz"),
            "some file.tar.gz"
        );
        assert_eq!(uri_filename("USK@key/site/5/index.html"), "site-5-index.html");
        assert_eq!(uri_filename("KSK@bare-key"), "");
    }

    #[test]
    fn default_fetch_is_transient() {
        let mut message = Message::new("ClientGet");
        FetchOptions::default().apply_to(&mut message);

        assert_eq!(message.get("Persistence"), Some("connection"));
        assert_eq!(message.get("ReturnType"), Some("none"));
        assert_eq!(message.get("PriorityClass"), Some("4"));
        assert_eq!(message.get("RealTimeFlag"), Some("true"));
        assert!(!message.contains("Global"));
    }

    #[test]
    fn persistent_fetch_targets_the_global_disk_queue() {
        let options = FetchOptions {
            persistent: true,
            ..FetchOptions::default()
        };
        let message = build_fetch("KSK@readme", "fcpmon-readme", Some("/dl/readme"), &options);

        assert_eq!(message.get("Global"), Some("true"));
        assert_eq!(message.get("Persistence"), Some("reboot"));
        assert_eq!(message.get("ReturnType"), Some("disk"));
        assert_eq!(message.get("Filename"), Some("/dl/readme"));
    }

    #[test]
    fn extra_overlay_overrides_typed_fields() {
        let options = FetchOptions {
            extra: vec![
                ("PriorityClass".to_owned(), "1".to_owned()),
                ("MaxRetries".to_owned(), "-1".to_owned()),
            ],
            ..FetchOptions::default()
        };
        let message = build_fetch("KSK@x", "id", None, &options);

        // The overlay is opaque and wins over everything the monitor set.
        assert_eq!(message.get("PriorityClass"), Some("1"));
        assert_eq!(message.get("MaxRetries"), Some("-1"));
        assert!(!message.contains("Filename"));
    }

    #[test]
    fn remove_requests_are_global() {
        let message = build_remove("fcpmon-old");
        assert_eq!(message.name(), "RemoveRequest");
        assert_eq!(message.get("Global"), Some("true"));
    }
}
