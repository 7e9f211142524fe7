use std::fs;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use rustc_hash::FxHashSet;

use protocol::Message;

use crate::connection::Connection;
use crate::error::ClientError;

/// Result of routing a message to the directory-access handler.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DdaOutcome {
    /// A probe reply was answered; the handshake continues.
    Replied,
    /// The handshake for a directory completed.
    Completed {
        /// Directory as originally registered; keys the wait target and the
        /// deferred-queue event.
        requested: String,
        /// Directory as (possibly normalized by) the node.
        normalized: String,
    },
    /// The message does not belong to the handshake sub-protocol.
    Unhandled,
}

/// One in-flight handshake for a working directory.
#[derive(Debug)]
struct DdaSession {
    directory: String,
    cleanup: Vec<PathBuf>,
}

/// Directory-access handshake state, keyed by working directory.
///
/// The three-message sub-protocol proves the client may read and write a
/// directory before file-backed jobs are allowed to use it: the client
/// registers the directory, answers each read/write probe the node sends,
/// and on completion deletes its write-probe files and releases any jobs
/// deferred behind the directory.
#[derive(Debug, Default)]
pub struct DirectoryAccess {
    pending: Vec<DdaSession>,
    enabled: FxHashSet<String>,
}

impl DirectoryAccess {
    /// Creates an empty handshake table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the deferred-queue event released when a directory becomes
    /// enabled.
    #[must_use]
    pub fn enabled_event(directory: &str) -> String {
        format!("dda-enabled:{directory}")
    }

    /// Returns whether a directory has completed its handshake.
    #[must_use]
    pub fn is_enabled(&self, directory: &str) -> bool {
        self.enabled.contains(directory)
    }

    /// Returns whether a handshake for the directory is still in flight.
    #[must_use]
    pub fn is_pending(&self, directory: &str) -> bool {
        self.pending
            .iter()
            .any(|session| session.directory == directory)
    }

    /// Registers a directory for read and write probing.
    ///
    /// Sends the `TestDDARequest` and records the in-flight session.
    /// Returns the trimmed directory path used to key the handshake.
    pub fn register<R: BufRead, W: Write>(
        &mut self,
        connection: &mut Connection<R, W>,
        directory: &str,
    ) -> Result<String, ClientError> {
        let directory = directory.trim_end_matches('/').to_owned();
        connection.send(
            &Message::new("TestDDARequest")
                .field("Directory", directory.clone())
                .flag("WantReadDirectory", true)
                .flag("WantWriteDirectory", true),
        )?;
        self.pending.push(DdaSession {
            directory: directory.clone(),
            cleanup: Vec::new(),
        });
        Ok(directory)
    }

    /// Routes a message to the handshake sub-protocol.
    ///
    /// Messages the dispatch loop does not recognise land here; anything
    /// that is not a `TestDDAReply` or `TestDDAComplete` comes back as
    /// [`DdaOutcome::Unhandled`].
    pub fn handle_message<R: BufRead, W: Write>(
        &mut self,
        message: &Message,
        connection: &mut Connection<R, W>,
    ) -> Result<DdaOutcome, ClientError> {
        match message.name() {
            "TestDDAReply" => self.answer_probe(message, connection),
            "TestDDAComplete" => Ok(self.complete(message)),
            _ => Ok(DdaOutcome::Unhandled),
        }
    }

    fn answer_probe<R: BufRead, W: Write>(
        &mut self,
        message: &Message,
        connection: &mut Connection<R, W>,
    ) -> Result<DdaOutcome, ClientError> {
        let directory = message.get("Directory").unwrap_or_default().to_owned();
        let mut response = Message::new("TestDDAResponse").field("Directory", directory.clone());

        if let Some(read_file) = message.get("ReadFilename") {
            let content =
                fs::read_to_string(read_file).map_err(|source| ClientError::DirectoryProbe {
                    path: read_file.to_owned(),
                    source,
                })?;
            response.set("ReadContent", content);
        }

        if let Some(write_file) = message.get("WriteFilename") {
            let content = message.get("ContentToWrite").unwrap_or_default();
            fs::write(write_file, content).map_err(|source| ClientError::DirectoryProbe {
                path: write_file.to_owned(),
                source,
            })?;
            if let Some(session) = self.session_for_mut(&directory) {
                session.cleanup.push(PathBuf::from(write_file));
            } else {
                tracing::warn!(
                    file = write_file,
                    directory,
                    "write probe matches no pending registration and will not be cleaned up"
                );
            }
        }

        connection.send(&response)?;
        Ok(DdaOutcome::Replied)
    }

    fn complete(&mut self, message: &Message) -> DdaOutcome {
        let normalized = message.get("Directory").unwrap_or_default().to_owned();
        let Some(index) = self.session_index(&normalized) else {
            tracing::warn!(
                directory = normalized,
                "completion for a directory that was never registered"
            );
            return DdaOutcome::Unhandled;
        };

        let session = self.pending.swap_remove(index);
        // Best effort: every write-probe file is attempted exactly once,
        // even when an earlier deletion fails.
        for file in &session.cleanup {
            if let Err(error) = fs::remove_file(file) {
                tracing::warn!(file = %file.display(), %error, "failed to delete write-probe file");
            }
        }

        self.enabled.insert(session.directory.clone());
        if normalized != session.directory {
            self.enabled.insert(normalized.clone());
        }
        DdaOutcome::Completed {
            requested: session.directory,
            normalized,
        }
    }

    /// Finds the session for a directory; a message naming a normalized
    /// variant of the requested path resolves against the sole pending
    /// registration.
    fn session_index(&self, directory: &str) -> Option<usize> {
        if let Some(index) = self
            .pending
            .iter()
            .position(|session| session.directory == directory)
        {
            return Some(index);
        }
        (self.pending.len() == 1).then_some(0)
    }

    fn session_for_mut(&mut self, directory: &str) -> Option<&mut DdaSession> {
        let index = self.session_index(directory)?;
        self.pending.get_mut(index)
    }
}
