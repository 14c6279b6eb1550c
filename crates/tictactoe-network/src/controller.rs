//! Event queue between the network tasks and the UI controller.
//!
//! The listener and the heartbeat both produce [`ClientEvent`]s. They never
//! call into the UI directly: every event goes through one unbounded queue
//! and is dispatched in arrival order by a single consumer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tictactoe_protocol::ProtocolEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Conditions that end the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalReason {
    /// The socket read failed or the server closed the stream.
    #[error("The connection to the server was lost: {0}")]
    ConnectionLost(String),

    /// Too many consecutive malformed lines.
    #[error("The server sent {0} invalid messages in a row")]
    CircuitBreakerTripped(u32),

    /// No liveness signal during the whole reconnect window.
    #[error("No response from the server after {0} reconnect attempts")]
    HeartbeatTimeout(u32),

    /// The server sent `EXIT;`.
    #[error("The server ended the session")]
    ServerExit,
}

impl FatalReason {
    /// Whether the session ended because something went wrong.
    pub fn is_error(&self) -> bool {
        !matches!(self, FatalReason::ServerExit)
    }
}

/// One entry of the event queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A decoded server message.
    Protocol(ProtocolEvent),
    /// Connection status text (e.g. "Reconnecting...").
    Status(String),
    /// The session is over.
    Fatal(FatalReason),
}

/// Presentation side of the client.
///
/// Implementations are driven from a single task and never touch the
/// socket; they send commands through the session instead.
pub trait UiController {
    /// Handle a decoded server message.
    fn on_event(&mut self, event: ProtocolEvent);

    /// Show connection status text.
    fn on_status(&mut self, text: &str);

    /// Notify the user that the session ended.
    fn on_fatal(&mut self, reason: &FatalReason);
}

/// Dispatch one queued event to the controller.
///
/// Returns the fatal reason when the event ends the session.
pub fn dispatch<C>(controller: &mut C, event: ClientEvent) -> Option<FatalReason>
where
    C: UiController + ?Sized,
{
    match event {
        ClientEvent::Protocol(event) => {
            controller.on_event(event);
            None
        }
        ClientEvent::Status(text) => {
            controller.on_status(&text);
            None
        }
        ClientEvent::Fatal(reason) => {
            controller.on_fatal(&reason);
            Some(reason)
        }
    }
}

/// Drain the queue into the controller until a fatal event or until every
/// producer is gone.
pub async fn run_controller<C>(
    events: &mut mpsc::UnboundedReceiver<ClientEvent>,
    controller: &mut C,
) -> Option<FatalReason>
where
    C: UiController + ?Sized,
{
    while let Some(event) = events.recv().await {
        if let Some(reason) = dispatch(controller, event) {
            return Some(reason);
        }
    }

    debug!("Event queue closed");
    None
}

/// Producer handle for the event queue.
///
/// Cloned into every background task. The first fatal report wins: it is
/// queued once and cancels the session's shutdown token, later reports are
/// dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<ClientEvent>,
    fatal_reported: Arc<AtomicBool>,
    shutdown: CancellationToken,
}

impl EventSink {
    /// Create a sink and the matching receiver.
    pub fn channel(shutdown: CancellationToken) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            tx,
            fatal_reported: Arc::new(AtomicBool::new(false)),
            shutdown,
        };
        (sink, rx)
    }

    pub fn event(&self, event: ProtocolEvent) {
        self.push(ClientEvent::Protocol(event));
    }

    pub fn status(&self, text: impl Into<String>) {
        self.push(ClientEvent::Status(text.into()));
    }

    /// Report a fatal condition. Returns `false` if one was already reported.
    pub fn fatal(&self, reason: FatalReason) -> bool {
        if self.fatal_reported.swap(true, Ordering::AcqRel) {
            debug!(%reason, "Fatal condition already reported, ignoring");
            return false;
        }

        if reason.is_error() {
            error!(%reason, "Session failed");
        } else {
            info!(%reason, "Session ended");
        }

        self.shutdown.cancel();
        self.push(ClientEvent::Fatal(reason));
        true
    }

    pub fn fatal_reported(&self) -> bool {
        self.fatal_reported.load(Ordering::Acquire)
    }

    fn push(&self, event: ClientEvent) {
        if self.tx.send(event).is_err() {
            debug!("UI controller gone, dropping event");
        }
    }
}
