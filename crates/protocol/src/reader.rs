use std::io::BufRead;

use memchr::memchr;

use crate::{END_MESSAGE, FrameError, Message};

/// Lazy frame decoder producing [`Message`] values from a buffered stream.
///
/// The decoder pulls one complete message per [`read_message`] call,
/// blocking until the terminating [`END_MESSAGE`] sentinel arrives or the
/// stream closes. It is restartable (successive calls continue where the
/// previous frame ended) and the [`Iterator`] implementation exposes the
/// unbounded message sequence consumed by a dispatch loop.
///
/// Recovery rules:
///
/// - A body line containing no `=` that is not the sentinel is malformed. It
///   is reported through `tracing` and discarded; decoding of the current
///   message continues.
/// - End of stream in the middle of a message drops the partial frame
///   silently. No partial message is ever yielded.
/// - Blank lines between messages are skipped.
///
/// [`read_message`]: MessageReader::read_message
#[derive(Debug)]
pub struct MessageReader<R> {
    inner: R,
    line: String,
    malformed_lines: u64,
}

impl<R: BufRead> MessageReader<R> {
    /// Wraps a buffered reader.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: String::new(),
            malformed_lines: 0,
        }
    }

    /// Number of malformed field lines discarded so far.
    #[must_use]
    pub fn malformed_lines(&self) -> u64 {
        self.malformed_lines
    }

    /// Returns a mutable reference to the underlying reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consumes the decoder, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Decodes the next complete message, blocking until one is available.
    ///
    /// Returns `Ok(None)` once the stream has closed. A stream that ends
    /// mid-message also yields `Ok(None)`: the incomplete frame is dropped.
    pub fn read_message(&mut self) -> Result<Option<Message>, FrameError> {
        let name = loop {
            match self.next_line()? {
                None => return Ok(None),
                Some(line) if line.is_empty() => {}
                Some(line) => break line.to_owned(),
            }
        };

        let mut message = Message::new(name);
        loop {
            let Some(line) = self.next_line()? else {
                tracing::debug!(
                    name = message.name(),
                    "stream closed mid-message, dropping partial frame"
                );
                return Ok(None);
            };

            if line == END_MESSAGE {
                return Ok(Some(message));
            }

            match memchr(b'=', line.as_bytes()) {
                Some(split) => {
                    let (key, rest) = line.split_at(split);
                    message.set(key, &rest[1..]);
                }
                None => {
                    tracing::warn!(line, "discarding malformed field line");
                    self.malformed_lines += 1;
                }
            }
        }
    }

    /// Reads one line, with the trailing newline (and optional carriage
    /// return) stripped. `None` signals end of stream.
    fn next_line(&mut self) -> Result<Option<&str>, FrameError> {
        self.line.clear();
        if self.inner.read_line(&mut self.line)? == 0 {
            return Ok(None);
        }
        let trimmed = self
            .line
            .strip_suffix('\n')
            .map_or(self.line.as_str(), |rest| {
                rest.strip_suffix('\r').unwrap_or(rest)
            });
        Ok(Some(trimmed))
    }
}

impl<R: BufRead> Iterator for MessageReader<R> {
    type Item = Result<Message, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_message().transpose()
    }
}
