use std::io::{BufRead, BufReader, BufWriter, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use protocol::{Message, MessageReader, PROTOCOL_VERSION};

use crate::error::ClientError;

/// Timeout applied while establishing the TCP connection to the node.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// One duplex stream socket to the node's FCP listener.
///
/// The connection owns both halves of the socket: a frame decoder on the
/// read side and a buffered writer on the write side. Writes flush fully
/// before the next read waits, and a batch submitted through
/// [`send_all`](Connection::send_all) reaches the wire as a contiguous
/// unit. Exclusive `&mut self` access is the serialisation mechanism, so no
/// other message can interleave, including re-entrant sends from message
/// handlers.
///
/// The type is generic over its stream halves so tests can drive the
/// session against in-memory buffers; [`TcpConnection`] is the production
/// shape.
#[derive(Debug)]
pub struct Connection<R, W> {
    reader: MessageReader<R>,
    writer: W,
}

/// Connection over a TCP socket, as used against a live node.
pub type TcpConnection = Connection<BufReader<TcpStream>, BufWriter<TcpStream>>;

impl TcpConnection {
    /// Connects to the node and performs the initial protocol handshake.
    ///
    /// A single `ClientHello` advertising `client_name` and the expected
    /// protocol version is sent immediately; no reply is awaited here. The
    /// `NodeHello` answer arrives later through the normal message sequence
    /// and is safely ignored by the dispatch loop.
    pub fn connect(addr: SocketAddr, client_name: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
            .map_err(|source| ClientError::Connect { addr, source })?;
        let read_half = stream
            .try_clone()
            .map_err(|source| ClientError::Connect { addr, source })?;

        let mut connection =
            Connection::from_parts(BufReader::new(read_half), BufWriter::new(stream));
        connection.send(
            &Message::new("ClientHello")
                .field("Name", client_name)
                .field("ExpectedVersion", PROTOCOL_VERSION),
        )?;
        Ok(connection)
    }
}

impl<R: BufRead, W: Write> Connection<R, W> {
    /// Builds a connection from already-established stream halves.
    pub fn from_parts(reader: R, writer: W) -> Self {
        Self {
            reader: MessageReader::new(reader),
            writer,
        }
    }

    /// Serialises one message and flushes it immediately.
    pub fn send(&mut self, message: &Message) -> Result<(), ClientError> {
        tracing::debug!(name = message.name(), "sending message");
        message
            .encode_to(&mut self.writer)
            .and_then(|()| self.writer.flush())
            .map_err(|source| ClientError::Send { source })
    }

    /// Serialises a batch of messages, flushing once after the last.
    ///
    /// The batch reaches the wire as a contiguous unit: all messages are
    /// written back to back before the single flush.
    pub fn send_all(&mut self, messages: &[Message]) -> Result<(), ClientError> {
        for message in messages {
            tracing::debug!(name = message.name(), "sending batched message");
            message
                .encode_to(&mut self.writer)
                .map_err(|source| ClientError::Send { source })?;
        }
        self.writer
            .flush()
            .map_err(|source| ClientError::Send { source })
    }

    /// Blocks until the next complete message arrives.
    ///
    /// Returns `Ok(None)` once the node closes the stream, which terminates
    /// the dispatch loop cleanly.
    pub fn next_message(&mut self) -> Result<Option<Message>, ClientError> {
        Ok(self.reader.read_message()?)
    }

    /// Number of malformed field lines discarded by the frame decoder.
    #[must_use]
    pub fn malformed_lines(&self) -> u64 {
        self.reader.malformed_lines()
    }

    /// Returns a reference to the write half, used by tests to inspect the
    /// bytes that reached the wire.
    pub fn writer(&self) -> &W {
        &self.writer
    }
}
