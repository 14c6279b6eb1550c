//! Client session: one connection plus its two background tasks.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tictactoe_protocol::Command;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::{ClientConfig, ConnectError, Connection, LineSender, SendOutcome};
use crate::controller::{ClientEvent, EventSink};
use crate::heartbeat::{HeartbeatConfig, HeartbeatMonitor, HeartbeatState, run_heartbeat};
use crate::link::LinkState;
use crate::listener::{Listener, ListenerExit};

/// Everything needed to start a session.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub client: ClientConfig,
    pub heartbeat: HeartbeatConfig,
}

/// Shared state created before the connection exists.
struct Wiring {
    shutdown: CancellationToken,
    link: Arc<LinkState>,
    sink: EventSink,
    events: UnboundedReceiver<ClientEvent>,
}

impl Wiring {
    fn new() -> Self {
        let shutdown = CancellationToken::new();
        let (sink, events) = EventSink::channel(shutdown.clone());
        Self {
            shutdown,
            link: Arc::new(LinkState::new()),
            sink,
            events,
        }
    }
}

/// A running client session.
///
/// Starting a session spawns the listener and the heartbeat on the current
/// Tokio runtime. Both stop when a fatal condition is reported or when the
/// session is shut down or dropped.
pub struct Session {
    sender: LineSender,
    link: Arc<LinkState>,
    shutdown: CancellationToken,
    listener: JoinHandle<ListenerExit>,
    heartbeat: JoinHandle<HeartbeatState>,
    nickname: Option<String>,
    peer: String,
    connected_at: DateTime<Utc>,
}

impl Session {
    /// Connect to the server and start the background tasks.
    ///
    /// # Errors
    /// Returns [`ConnectError`] when the server cannot be reached.
    pub async fn connect(
        config: &SessionConfig,
    ) -> Result<(Self, UnboundedReceiver<ClientEvent>), ConnectError> {
        let wiring = Wiring::new();
        let connection =
            Connection::connect(&config.client, wiring.link.clone(), wiring.sink.clone()).await?;
        Ok(Self::start(connection, wiring, config))
    }

    /// Start a session over an already connected stream.
    pub fn from_stream<S>(
        stream: S,
        peer: impl Into<String>,
        config: &SessionConfig,
    ) -> (Self, UnboundedReceiver<ClientEvent>)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let wiring = Wiring::new();
        let connection = Connection::from_stream(
            stream,
            peer,
            config.client.write_timeout,
            wiring.link.clone(),
            wiring.sink.clone(),
        );
        Self::start(connection, wiring, config)
    }

    fn start(
        connection: Connection,
        wiring: Wiring,
        config: &SessionConfig,
    ) -> (Self, UnboundedReceiver<ClientEvent>) {
        let Wiring {
            shutdown,
            link,
            sink,
            events,
        } = wiring;

        let peer = connection.peer().to_string();
        let (reader, sender) = connection.into_parts();

        let listener = Listener::new(reader, sender.clone(), link.clone(), sink.clone());
        let listener = tokio::spawn(listener.run(shutdown.clone()));

        let monitor = HeartbeatMonitor::new(config.heartbeat.clone());
        let heartbeat = tokio::spawn(run_heartbeat(
            monitor,
            link.clone(),
            sink,
            shutdown.clone(),
        ));

        info!(peer = %peer, "Session started");

        let session = Self {
            sender,
            link,
            shutdown,
            listener,
            heartbeat,
            nickname: None,
            peer,
            connected_at: Utc::now(),
        };
        (session, events)
    }

    /// Send a command. See [`LineSender::send`] for the gate and probe rules.
    pub async fn send(&self, command: Command) -> SendOutcome {
        self.sender.send(command).await
    }

    /// Validate the nickname, remember it and send the login command.
    ///
    /// # Errors
    /// Returns `Error::InvalidField` if the nickname contains protocol
    /// delimiters. Nothing is sent in that case.
    pub async fn login(&mut self, nickname: &str) -> tictactoe_core::Result<SendOutcome> {
        let command = Command::login(nickname)?;
        self.set_nickname(nickname);
        Ok(self.send(command).await)
    }

    pub fn set_nickname(&mut self, nickname: impl Into<String>) {
        self.nickname = Some(nickname.into());
    }

    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn link(&self) -> &LinkState {
        &self.link
    }

    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.connected_at
    }

    /// Whether a fatal condition or a shutdown stopped the background tasks.
    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Stop both background tasks and close the socket.
    pub async fn shutdown(mut self) {
        info!(peer = %self.peer, uptime_secs = self.uptime().num_seconds(), "Shutting down session");
        self.shutdown.cancel();

        match (&mut self.listener).await {
            Ok(exit) => debug!(?exit, "Listener joined"),
            Err(e) => warn!("Listener task failed: {}", e),
        }
        match (&mut self.heartbeat).await {
            Ok(state) => debug!(state = %state, "Heartbeat joined"),
            Err(e) => warn!("Heartbeat task failed: {}", e),
        }

        self.sender.close().await;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.shutdown.is_cancelled() {
            debug!("Session dropped while running - stopping background tasks");
            self.shutdown.cancel();
        }
    }
}
