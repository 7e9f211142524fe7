use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use std::path::Path;

use rustc_hash::FxHashSet;

use protocol::Message;

use crate::connection::Connection;
use crate::dda::{DdaOutcome, DirectoryAccess};
use crate::error::ClientError;
use crate::events::{ProgressState, SessionObserver, Severity, StatusEvent};
use crate::jobs::{self, FetchOptions};
use crate::queue::DeferredQueue;
use crate::registry::{JobType, RequestRegistry};
use crate::waiting::WaitingSet;

/// Message names that are informational acknowledgements with no state
/// effect.
const BENIGN_MESSAGES: [&str; 5] = [
    "CompatibilityMode",
    "ExpectedMIME",
    "NodeHello",
    "PersistentRequestModified",
    "SendingToNetwork",
];

/// Session parameters assembled by the frontend.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Client name advertised in the handshake; also prefixes the
    /// identifiers of self-initiated fetches.
    pub client_name: String,
    /// Options merged into every outbound fetch.
    pub fetch_options: FetchOptions,
}

/// The client session: sole owner of all mutable protocol state.
///
/// A session multiplexes one connection across any number of tracked jobs.
/// All mutation happens on the thread driving [`run`](Session::run); outbound
/// writes issued from within message handling go through the same exclusive
/// connection borrow, so they can never interleave with each other.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    registry: RequestRegistry,
    waiting: WaitingSet,
    queue: DeferredQueue,
    dda: DirectoryAccess,
    download_dir: Option<String>,
    self_initiated: FxHashSet<String>,
}

impl Session {
    /// Creates a session with empty state.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            registry: RequestRegistry::new(),
            waiting: WaitingSet::new(),
            queue: DeferredQueue::new(),
            dda: DirectoryAccess::new(),
            download_dir: None,
            self_initiated: FxHashSet::default(),
        }
    }

    /// Read access to the accumulated request metadata.
    #[must_use]
    pub fn registry(&self) -> &RequestRegistry {
        &self.registry
    }

    /// Returns whether an identifier is currently of interest.
    #[must_use]
    pub fn is_waited_for(&self, identifier: &str) -> bool {
        self.waiting.is_waited_for(identifier)
    }

    /// Adds one identifier to the waiting set.
    pub fn watch<I: Into<String>>(&mut self, identifier: I) {
        self.waiting.watch_request(identifier);
    }

    /// Makes every identifier of interest, including ones not yet created.
    pub fn watch_everything(&mut self) {
        self.waiting.watch_everything();
    }

    /// Starts the directory-access handshake for the download directory.
    ///
    /// The handshake keeps the session alive until it completes; fetches
    /// submitted meanwhile are deferred behind it.
    pub fn enable_directory<R: BufRead, W: Write>(
        &mut self,
        connection: &mut Connection<R, W>,
        directory: &str,
    ) -> Result<(), ClientError> {
        let directory = self.dda.register(connection, directory)?;
        self.waiting.watch_directory(&directory);
        self.download_dir = Some(directory);
        Ok(())
    }

    /// Submits one fetch per URI and returns the assigned identifiers.
    ///
    /// Identifiers derive from the client name and the URI's filename. When
    /// the download directory's handshake is still in flight, the fetches
    /// are deferred until it completes; the identifiers join the waiting set
    /// either way.
    pub fn fetch<R: BufRead, W: Write>(
        &mut self,
        connection: &mut Connection<R, W>,
        uris: &[String],
    ) -> Result<Vec<String>, ClientError> {
        let mut messages = Vec::with_capacity(uris.len());
        let mut identifiers = Vec::with_capacity(uris.len());
        for uri in uris {
            let filename = jobs::uri_filename(uri);
            let identifier = format!("{}-{filename}", self.config.client_name);
            let target = self.download_dir.as_deref().map(|directory| {
                Path::new(directory)
                    .join(&filename)
                    .to_string_lossy()
                    .into_owned()
            });
            messages.push(jobs::build_fetch(
                uri,
                &identifier,
                target.as_deref(),
                &self.config.fetch_options,
            ));
            identifiers.push(identifier);
        }

        match self.download_dir.as_deref() {
            Some(directory) if self.dda.is_pending(directory) => {
                let events: BTreeSet<String> =
                    BTreeSet::from([DirectoryAccess::enabled_event(directory)]);
                self.queue.enqueue(messages, &events);
            }
            _ => connection.send_all(&messages)?,
        }

        for identifier in &identifiers {
            self.waiting.watch_request(identifier);
            self.self_initiated.insert(identifier.clone());
        }
        Ok(identifiers)
    }

    /// Cancels jobs in the node's global queue and waits for the removal
    /// acknowledgements.
    pub fn cancel<R: BufRead, W: Write>(
        &mut self,
        connection: &mut Connection<R, W>,
        identifiers: &[String],
    ) -> Result<(), ClientError> {
        let messages: Vec<Message> = identifiers
            .iter()
            .map(|identifier| jobs::build_remove(identifier))
            .collect();
        connection.send_all(&messages)?;
        for identifier in identifiers {
            self.waiting.watch_request(identifier);
        }
        Ok(())
    }

    /// Drives the dispatch loop until nothing of interest remains or the
    /// node closes the connection.
    pub fn run<R: BufRead, W: Write, O: SessionObserver>(
        &mut self,
        connection: &mut Connection<R, W>,
        observer: &mut O,
    ) -> Result<(), ClientError> {
        while !self.waiting.is_empty() {
            let Some(message) = connection.next_message()? else {
                break;
            };
            self.dispatch(&message, connection, observer)?;
        }
        Ok(())
    }

    /// Routes one incoming message to its state transition.
    fn dispatch<R: BufRead, W: Write, O: SessionObserver>(
        &mut self,
        message: &Message,
        connection: &mut Connection<R, W>,
        observer: &mut O,
    ) -> Result<(), ClientError> {
        let name = message.name();
        if BENIGN_MESSAGES.contains(&name) {
            tracing::trace!(name, "ignoring informational message");
            return Ok(());
        }

        match name {
            "CloseConnectionDuplicateClientName" => {
                observer.status(&StatusEvent::new(
                    "closing connection (duplicate client name)",
                    Severity::Warning,
                ));
            }
            "DataFound" => {
                if let Some(identifier) = self.waited_identifier(message) {
                    self.waiting.forget_request(&identifier);
                    observer.status(&StatusEvent::for_request(
                        identifier,
                        "downloaded",
                        Severity::Success,
                    ));
                }
            }
            "GetFailed" => self.on_get_failed(message, connection, observer)?,
            "EnterFiniteCooldown" => {
                if let Some(identifier) = self.waited_identifier(message) {
                    if let Some(snapshot) = self.registry.snapshot(&identifier) {
                        observer.progress(&snapshot, ProgressState::Cooldown);
                    }
                    observer.status(&StatusEvent::for_request(
                        identifier,
                        "in cooldown",
                        Severity::Warning,
                    ));
                }
            }
            "ExpectedDataLength" => {
                self.registry.merge(message);
                if let Some(identifier) = self.waited_identifier(message) {
                    if let Some(size) = message.get("DataLength").and_then(|v| v.parse().ok()) {
                        observer.status(
                            &StatusEvent::for_request(identifier, "size", Severity::Info)
                                .with_size(size),
                        );
                    }
                }
            }
            "ExpectedHashes" => {
                self.registry.merge(message);
                if let Some(identifier) = self.waited_identifier(message) {
                    observer.status(&StatusEvent::for_request(
                        identifier.clone(),
                        "hashes found",
                        Severity::Info,
                    ));
                    for algorithm in message.group_keys("Hashes") {
                        if let Some(hash) = message.get(&format!("Hashes.{algorithm}")) {
                            observer
                                .detail(Some(&identifier), &format!("  {algorithm}: {hash}"));
                        }
                    }
                }
            }
            "IdentifierCollision" => {
                let event = match message.identifier() {
                    Some(identifier) => {
                        StatusEvent::for_request(identifier, "already queued", Severity::Warning)
                    }
                    None => StatusEvent::new("already queued", Severity::Warning),
                };
                observer.status(&event);
            }
            "PersistentGet" => self.on_persistent(message, JobType::Get, observer),
            "PersistentPut" => self.on_persistent(message, JobType::Put, observer),
            "PersistentRequestRemoved" => {
                if let Some(identifier) = message.identifier().map(str::to_owned) {
                    self.registry.forget(&identifier);
                    if self.waiting.is_waited_for(&identifier) {
                        observer.status(&StatusEvent::for_request(
                            identifier.clone(),
                            "removed",
                            Severity::Warning,
                        ));
                        self.waiting.forget_request(&identifier);
                    }
                }
            }
            "ProtocolError" => {
                let code = message.get("CodeDescription").unwrap_or_default();
                let label = format!("protocol error: {code}");
                let event = match message.identifier() {
                    Some(identifier) => {
                        StatusEvent::for_request(identifier, label, Severity::Error)
                    }
                    None => StatusEvent::new(label, Severity::Error),
                };
                observer.status(&event);
                if let Some(extra) = message.get("ExtraDescription") {
                    observer.detail(message.identifier(), &format!("  {extra}"));
                }
                if let Some(identifier) = self.waited_identifier(message) {
                    self.waiting.forget_request(&identifier);
                }
            }
            "PutSuccessful" => {
                self.registry.merge(message);
                if let Some(identifier) = self.waited_identifier(message) {
                    observer.status(&StatusEvent::for_request(
                        identifier.clone(),
                        "inserted",
                        Severity::Success,
                    ));
                    if let Some(uri) = message.get("URI") {
                        observer.detail(Some(&identifier), &format!("  URI: {uri}"));
                    }
                    self.waiting.forget_request(&identifier);
                }
            }
            "SimpleProgress" => {
                self.registry.merge(message);
                if let Some(identifier) = self.waited_identifier(message) {
                    if let Some(snapshot) = self.registry.snapshot(&identifier) {
                        observer.progress(&snapshot, ProgressState::Running);
                    }
                }
            }
            _ => match self.dda.handle_message(message, connection)? {
                DdaOutcome::Replied => {}
                DdaOutcome::Completed {
                    requested,
                    normalized,
                } => {
                    self.waiting.forget_directory(&requested);
                    if self.download_dir.as_deref() == Some(requested.as_str()) {
                        self.download_dir = Some(normalized);
                    }
                    let released = self
                        .queue
                        .release(&DirectoryAccess::enabled_event(&requested));
                    if !released.is_empty() {
                        connection.send_all(&released)?;
                    }
                }
                DdaOutcome::Unhandled => {
                    tracing::warn!(name, "unrecognized message");
                }
            },
        }
        Ok(())
    }

    /// `GetFailed` either follows a redirect or reports a structured
    /// failure; both resolve the identifier.
    fn on_get_failed<R: BufRead, W: Write, O: SessionObserver>(
        &mut self,
        message: &Message,
        connection: &mut Connection<R, W>,
        observer: &mut O,
    ) -> Result<(), ClientError> {
        let Some(identifier) = self.waited_identifier(message) else {
            return Ok(());
        };
        self.waiting.forget_request(&identifier);
        if let Some(snapshot) = self.registry.snapshot(&identifier) {
            observer.progress(&snapshot, ProgressState::Failed);
        }

        let code = message.get("CodeDescription").unwrap_or_default().to_owned();
        if let Some(redirect) = message.get("RedirectURI").map(str::to_owned) {
            observer.status(
                &StatusEvent::for_request(identifier.clone(), "redirected", Severity::Warning)
                    .with_comment(code),
            );
            observer.detail(Some(&identifier), &format!("  Redirect: {redirect}"));
            // Only jobs this session created itself are re-fetched; watched
            // foreign jobs stay resolved.
            if self.self_initiated.contains(&identifier) {
                self.fetch(connection, &[redirect])?;
            }
        } else {
            observer.status(
                &StatusEvent::for_request(identifier.clone(), "failed", Severity::Error)
                    .with_comment(code),
            );
            for kind in message.group_keys("Errors") {
                let count = message.get(&format!("Errors.{kind}.Count")).unwrap_or("0");
                let description = message
                    .get(&format!("Errors.{kind}.Description"))
                    .unwrap_or_default();
                observer.detail(Some(&identifier), &format!("  {count:>4}: {description}"));
            }
        }
        Ok(())
    }

    /// Persistent-job descriptors tag the job type and announce activity
    /// exactly once per identifier.
    fn on_persistent<O: SessionObserver>(
        &mut self,
        message: &Message,
        job_type: JobType,
        observer: &mut O,
    ) {
        let newly_seen = self.registry.merge_with_job_type(message, job_type) == Some(false);
        if let Some(identifier) = self.waited_identifier(message) {
            if newly_seen {
                let label = match job_type {
                    JobType::Get => "downloading",
                    JobType::Put => "inserting",
                };
                observer.status(&StatusEvent::for_request(identifier, label, Severity::Active));
            }
        }
    }

    /// The message's identifier, when present and currently of interest.
    fn waited_identifier(&self, message: &Message) -> Option<String> {
        let identifier = message.identifier()?;
        self.waiting
            .is_waited_for(identifier)
            .then(|| identifier.to_owned())
    }
}
