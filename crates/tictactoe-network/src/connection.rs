//! TCP connection to the game server.
//!
//! The connection owns the socket and splits it into a [`LineReader`] for the
//! listener and a cloneable [`LineSender`] for everything that writes. The
//! sender applies the client's send discipline:
//!
//! 1. Drop the command if the communication gate is closed (`ACK;|` excepted)
//! 2. Write a `PING;|` probe ahead of the command (not for `ACK` or `PING`)
//! 3. Write the command
//!
//! A failed or timed-out write closes the gate and reports
//! "Reconnecting..."; it is never surfaced to the caller as an error. The
//! heartbeat decides when the link counts as dead.
//!
//! # Timeout Handling
//!
//! - Connect: [`ClientConfig::connect_timeout`] (default 2000ms)
//! - Each write: [`ClientConfig::write_timeout`] (default 3000ms)
//! - Reads: none, the heartbeat watches liveness instead
//! - Close: 500ms each for flush and shutdown

use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tictactoe_core::constants::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_WRITE_TIMEOUT_MS, STATUS_RECONNECTING,
};
use tictactoe_protocol::{Command, InboundFrame, LineCodec};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, trace, warn};

use crate::controller::EventSink;
use crate::link::LinkState;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Connection settings.
///
/// # Example
///
/// ```
/// use tictactoe_network::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig {
///     connect_timeout: Duration::from_millis(500),
///     ..ClientConfig::new("game.example.org", 10000)
/// };
/// assert!(config.validate().is_ok());
/// assert_eq!(config.address(), "game.example.org:10000");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server host name or IP address
    pub host: String,

    /// Server TCP port
    pub port: u16,

    /// Timeout for establishing the connection
    pub connect_timeout: Duration,

    /// Timeout for each individual write
    pub write_timeout: Duration,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// `host:port` form used for connecting and logging.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check the settings before connecting.
    ///
    /// # Errors
    /// Returns `Error::Config` for an empty host, port 0 or a zero timeout.
    pub fn validate(&self) -> tictactoe_core::Result<()> {
        if self.host.trim().is_empty() {
            return Err(tictactoe_core::Error::Config(
                "server address must not be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(tictactoe_core::Error::Config(
                "server port must be between 1 and 65535".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() || self.write_timeout.is_zero() {
            return Err(tictactoe_core::Error::Config(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 10000,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            write_timeout: Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS),
        }
    }
}

/// Failure to establish the connection. Always fatal.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Settings rejected before any I/O
    #[error(transparent)]
    Config(#[from] tictactoe_core::Error),

    /// Connection attempt timed out
    #[error("Connection timeout after {0}ms")]
    Timeout(u64),

    /// Connection refused, host unreachable, name not resolved...
    #[error("Cannot connect to {address}: {source}")]
    Io {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of the read side. Always fatal.
#[derive(Debug, Error)]
pub enum ReadFailure {
    /// The server closed the stream
    #[error("Server closed the connection")]
    Closed,

    /// The socket read itself failed
    #[error("Read error: {0}")]
    Transport(#[from] tictactoe_core::Error),
}

/// Failure of a single write. Handled inside the sender.
#[derive(Debug, Error)]
pub enum WriteFailure {
    #[error("Write timeout after {0}ms")]
    Timeout(u64),

    #[error("Write error: {0}")]
    Transport(#[from] tictactoe_core::Error),
}

/// What happened to a command handed to [`LineSender::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Probe (if any) and command were written.
    Sent,
    /// The communication gate was closed; nothing was written.
    Suppressed,
    /// A write failed; the gate is now closed.
    Degraded,
}

/// Read half: yields framed server lines.
pub struct LineReader {
    frames: FramedRead<BoxedReader, LineCodec>,
}

impl LineReader {
    /// Wait for the next line.
    ///
    /// Returns `Ok(None)` for a blank line, which carries no message.
    /// Oversized lines come back as [`InboundFrame::Oversized`].
    ///
    /// # Errors
    /// Returns a [`ReadFailure`] when the stream ends or the read fails.
    /// Reading is cancel safe, so this can sit in a `select!`.
    pub async fn receive_line(&mut self) -> Result<Option<InboundFrame>, ReadFailure> {
        match self.frames.next().await {
            Some(Ok(InboundFrame::Line(line))) if line.trim().is_empty() => {
                trace!("Skipping blank line");
                Ok(None)
            }
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(e)) => Err(ReadFailure::Transport(e)),
            None => Err(ReadFailure::Closed),
        }
    }
}

/// Write half, shared by the UI and the listener.
///
/// Writes are serialized by an async mutex so a probe and its command are
/// never interleaved with another sender's bytes.
#[derive(Clone)]
pub struct LineSender {
    writer: Arc<Mutex<FramedWrite<BoxedWriter, LineCodec>>>,
    link: Arc<LinkState>,
    sink: EventSink,
    write_timeout: Duration,
}

impl LineSender {
    /// Send a command following the gate and probe rules.
    ///
    /// Never fails: problems are reported through the outcome, the
    /// communication gate and a status event.
    pub async fn send(&self, command: Command) -> SendOutcome {
        if !command.is_ack() && !self.link.communication_allowed() {
            debug!(command = command.keyword(), "Communication gate closed, dropping command");
            return SendOutcome::Suppressed;
        }

        let mut writer = self.writer.lock().await;

        if !command.skips_probe() {
            if let Err(failure) = self.write(&mut writer, Command::Ping).await {
                drop(writer);
                self.degrade(&failure);
                return SendOutcome::Degraded;
            }
        }

        let keyword = command.keyword();
        match self.write(&mut writer, command).await {
            Ok(()) => {
                trace!(command = keyword, "Command sent");
                SendOutcome::Sent
            }
            Err(failure) => {
                drop(writer);
                self.degrade(&failure);
                SendOutcome::Degraded
            }
        }
    }

    async fn write(
        &self,
        writer: &mut FramedWrite<BoxedWriter, LineCodec>,
        command: Command,
    ) -> Result<(), WriteFailure> {
        match tokio::time::timeout(self.write_timeout, writer.send(command)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(WriteFailure::Transport(e)),
            Err(_) => Err(WriteFailure::Timeout(self.write_timeout.as_millis() as u64)),
        }
    }

    fn degrade(&self, failure: &WriteFailure) {
        warn!(%failure, "Write failed, closing communication gate");
        self.link.set_communication_allowed(false);
        self.sink.status(STATUS_RECONNECTING);
    }

    /// Flush and shut down the write half.
    ///
    /// Flush and shutdown have a 500ms timeout each so a dead network cannot
    /// hang the exit path.
    pub async fn close(&self) {
        let mut writer = self.writer.lock().await;

        let flush_timeout = Duration::from_millis(500);
        match tokio::time::timeout(flush_timeout, writer.flush()).await {
            Ok(Ok(())) => debug!("Flush completed"),
            Ok(Err(e)) => warn!("Error flushing during close: {}", e),
            Err(_) => warn!("Flush timeout during close ({}ms)", flush_timeout.as_millis()),
        }

        let shutdown_timeout = Duration::from_millis(500);
        match tokio::time::timeout(shutdown_timeout, writer.get_mut().shutdown()).await {
            Ok(Ok(())) => debug!("Shutdown completed"),
            Ok(Err(e)) => warn!("Error during shutdown: {}", e),
            Err(_) => warn!(
                "Shutdown timeout during close ({}ms)",
                shutdown_timeout.as_millis()
            ),
        }
    }
}

/// An established connection, before it is split between the tasks.
pub struct Connection {
    reader: LineReader,
    sender: LineSender,
    peer: String,
}

impl Connection {
    /// Open the TCP stream with the configured timeout.
    ///
    /// # Errors
    /// Returns [`ConnectError`] on invalid settings, timeout or refusal.
    async fn open(config: &ClientConfig) -> Result<TcpStream, ConnectError> {
        config.validate()?;
        let address = config.address();
        info!("Connecting to server at {}", address);

        let stream =
            match tokio::time::timeout(config.connect_timeout, TcpStream::connect(&address)).await
            {
                Ok(Ok(stream)) => {
                    info!("Successfully connected to {}", address);
                    stream
                }
                Ok(Err(source)) => {
                    error!("Connection failed: {}", source);
                    return Err(ConnectError::Io { address, source });
                }
                Err(_) => {
                    warn!(
                        "Connection timeout after {}ms",
                        config.connect_timeout.as_millis()
                    );
                    return Err(ConnectError::Timeout(
                        config.connect_timeout.as_millis() as u64
                    ));
                }
            };

        // Commands are tiny and latency matters more than throughput
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        Ok(stream)
    }

    /// Connect to the server described by `config`.
    pub async fn connect(
        config: &ClientConfig,
        link: Arc<LinkState>,
        sink: EventSink,
    ) -> Result<Self, ConnectError> {
        let stream = Self::open(config).await?;
        Ok(Self::from_stream(
            stream,
            config.address(),
            config.write_timeout,
            link,
            sink,
        ))
    }

    /// Wrap an already connected stream.
    pub fn from_stream<S>(
        stream: S,
        peer: impl Into<String>,
        write_timeout: Duration,
        link: Arc<LinkState>,
        sink: EventSink,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let reader: BoxedReader = Box::new(read_half);
        let writer: BoxedWriter = Box::new(write_half);

        Self {
            reader: LineReader {
                frames: FramedRead::new(reader, LineCodec::new()),
            },
            sender: LineSender {
                writer: Arc::new(Mutex::new(FramedWrite::new(writer, LineCodec::new()))),
                link,
                sink,
                write_timeout,
            },
            peer: peer.into(),
        }
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// See [`LineSender::send`].
    pub async fn send(&self, command: Command) -> SendOutcome {
        self.sender.send(command).await
    }

    /// See [`LineReader::receive_line`].
    pub async fn receive_line(&mut self) -> Result<Option<InboundFrame>, ReadFailure> {
        self.reader.receive_line().await
    }

    /// Split into the listener's reader and the shared sender.
    pub fn into_parts(self) -> (LineReader, LineSender) {
        (self.reader, self.sender)
    }
}
