//! Background read loop.
//!
//! The listener reads one line at a time, decodes it and forwards the
//! resulting events to the UI queue. It also answers server pings and feeds
//! the heartbeat's liveness flag.
//!
//! # Malformed Input
//!
//! Every oversized line and every sub-message that fails to decode counts
//! towards a circuit breaker; every decoded sub-message resets it. Five
//! failures in a row end the session:
//!
//! ```text
//! JUNK;            -> 1
//! PING;%JUNK;      -> 0, then 1
//! <301 bytes>      -> 2
//! ...              -> 5  => CircuitBreakerTripped
//! ```

use std::sync::Arc;
use tictactoe_core::constants::MAX_INVALID_MESSAGES;
use tictactoe_protocol::{Command, InboundFrame, ProtocolEvent, decode_composite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::connection::{LineReader, LineSender};
use crate::controller::{EventSink, FatalReason};
use crate::link::LinkState;

/// Counts consecutive malformed messages.
#[derive(Debug)]
pub struct CircuitBreaker {
    consecutive: u32,
    threshold: u32,
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive: 0,
            threshold,
        }
    }

    /// Count one failure. Returns `true` once the threshold is reached.
    pub fn record_failure(&mut self) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        self.consecutive >= self.threshold
    }

    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(MAX_INVALID_MESSAGES)
    }
}

/// Why the listener stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerExit {
    /// The session was shut down from outside.
    Shutdown,
    /// The read side failed.
    ConnectionLost,
    /// Too many malformed messages.
    CircuitBreakerTripped,
    /// The server sent `EXIT;`.
    ServerExit,
}

enum Flow {
    Continue,
    Stop(ListenerExit),
}

/// Read loop for one connection.
pub struct Listener {
    reader: LineReader,
    sender: LineSender,
    link: Arc<LinkState>,
    sink: EventSink,
    breaker: CircuitBreaker,
}

impl Listener {
    pub fn new(
        reader: LineReader,
        sender: LineSender,
        link: Arc<LinkState>,
        sink: EventSink,
    ) -> Self {
        Self {
            reader,
            sender,
            link,
            sink,
            breaker: CircuitBreaker::default(),
        }
    }

    /// Read until a fatal condition or until `shutdown` is cancelled.
    pub async fn run(mut self, shutdown: CancellationToken) -> ListenerExit {
        info!("Listener started");

        loop {
            let received = tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    debug!("Listener stopped by shutdown");
                    return ListenerExit::Shutdown;
                }
                received = self.reader.receive_line() => received,
            };

            let flow = match received {
                Ok(None) => Flow::Continue,
                Ok(Some(InboundFrame::Oversized { length })) => {
                    warn!(length, "Discarded oversized line");
                    self.record_failure()
                }
                Ok(Some(InboundFrame::Line(line))) => self.handle_line(&line).await,
                Err(failure) => {
                    warn!(%failure, "Read failed");
                    self.sink.fatal(FatalReason::ConnectionLost(failure.to_string()));
                    Flow::Stop(ListenerExit::ConnectionLost)
                }
            };

            if let Flow::Stop(exit) = flow {
                info!(?exit, "Listener stopped");
                return exit;
            }
        }
    }

    async fn handle_line(&mut self, line: &str) -> Flow {
        trace!(line, "Received line");

        for result in decode_composite(line) {
            let flow = match result {
                Ok(event) => {
                    self.breaker.record_success();
                    self.handle_event(event).await
                }
                Err(e) => {
                    warn!(error = %e, line, "Invalid message");
                    self.record_failure()
                }
            };

            if let Flow::Stop(_) = flow {
                return flow;
            }
        }

        Flow::Continue
    }

    async fn handle_event(&mut self, event: ProtocolEvent) -> Flow {
        match event {
            ProtocolEvent::Ping => {
                self.link.record_ping();
                self.sender.send(Command::Ack).await;
            }
            ProtocolEvent::Connected => self.link.activate_monitoring(),
            ProtocolEvent::Exit => {
                self.sink.event(ProtocolEvent::Exit);
                self.sink.fatal(FatalReason::ServerExit);
                return Flow::Stop(ListenerExit::ServerExit);
            }
            _ => {}
        }

        debug!(kind = event.kind_token(), "Dispatching event");
        self.sink.event(event);
        Flow::Continue
    }

    fn record_failure(&mut self) -> Flow {
        if !self.breaker.record_failure() {
            return Flow::Continue;
        }

        let count = self.breaker.consecutive();
        warn!(count, "Too many invalid messages");
        self.sink.fatal(FatalReason::CircuitBreakerTripped(count));
        Flow::Stop(ListenerExit::CircuitBreakerTripped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Connection;
    use crate::controller::ClientEvent;
    use std::time::Duration;
    use tictactoe_core::Coordinates;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Harness {
        server: DuplexStream,
        link: Arc<LinkState>,
        events: UnboundedReceiver<ClientEvent>,
        shutdown: CancellationToken,
        handle: tokio::task::JoinHandle<ListenerExit>,
    }

    fn spawn_listener() -> Harness {
        let (client, server) = tokio::io::duplex(4096);
        let link = Arc::new(LinkState::new());
        let shutdown = CancellationToken::new();
        let (sink, events) = EventSink::channel(shutdown.clone());
        let connection = Connection::from_stream(
            client,
            "test",
            Duration::from_millis(500),
            link.clone(),
            sink.clone(),
        );
        let (reader, sender) = connection.into_parts();
        let listener = Listener::new(reader, sender, link.clone(), sink);
        let handle = tokio::spawn(listener.run(shutdown.clone()));

        Harness {
            server,
            link,
            events,
            shutdown,
            handle,
        }
    }

    #[test]
    fn test_breaker_trips_at_threshold() {
        let mut breaker = CircuitBreaker::default();
        for _ in 0..4 {
            assert!(!breaker.record_failure());
        }
        assert!(breaker.record_failure());
        assert_eq!(breaker.consecutive(), 5);
    }

    #[test]
    fn test_breaker_reset_on_success() {
        let mut breaker = CircuitBreaker::new(2);
        breaker.record_failure();
        breaker.record_success();
        assert!(!breaker.record_failure());
    }

    #[tokio::test]
    async fn test_ping_acknowledged_and_forwarded() {
        let mut h = spawn_listener();
        h.server.write_all(b"PING;\n").await.unwrap();

        let mut ack = [0u8; 5];
        h.server.read_exact(&mut ack).await.unwrap();
        assert_eq!(&ack, b"ACK;|");

        assert_eq!(
            h.events.recv().await,
            Some(ClientEvent::Protocol(ProtocolEvent::Ping))
        );
        assert!(h.link.monitoring_active());
        assert!(h.link.take_liveness());
    }

    #[tokio::test]
    async fn test_connect_activates_monitoring() {
        let mut h = spawn_listener();
        h.server.write_all(b"CONNECT;\n").await.unwrap();

        assert_eq!(
            h.events.recv().await,
            Some(ClientEvent::Protocol(ProtocolEvent::Connected))
        );
        assert!(h.link.monitoring_active());
        assert!(!h.link.take_liveness());
    }

    #[tokio::test]
    async fn test_composite_line_in_order() {
        let mut h = spawn_listener();
        h.server
            .write_all(b"STATUS;x;%YOUR_TURN;1;2;%STATUS;x;\n")
            .await
            .unwrap();

        assert_eq!(
            h.events.recv().await,
            Some(ClientEvent::Protocol(ProtocolEvent::Status {
                text: "x".to_string()
            }))
        );
        assert_eq!(
            h.events.recv().await,
            Some(ClientEvent::Protocol(ProtocolEvent::YourTurn(
                Coordinates::new(1, 2)
            )))
        );
    }

    #[tokio::test]
    async fn test_five_invalid_lines_trip_breaker() {
        let mut h = spawn_listener();
        h.server
            .write_all(b"JUNK;\nWIN;x;\nJUNK;\nJUNK;\nJUNK;\nPING;\n")
            .await
            .unwrap();

        assert_eq!(
            h.events.recv().await,
            Some(ClientEvent::Fatal(FatalReason::CircuitBreakerTripped(5)))
        );
        assert_eq!(h.handle.await.unwrap(), ListenerExit::CircuitBreakerTripped);
        assert!(h.shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_valid_line_resets_breaker() {
        let mut h = spawn_listener();
        h.server
            .write_all(b"JUNK;\nJUNK;\nJUNK;\nJUNK;\nLOBBY;\nJUNK;\nJUNK;\nGAME_OVER;\n")
            .await
            .unwrap();

        assert_eq!(
            h.events.recv().await,
            Some(ClientEvent::Protocol(ProtocolEvent::LobbyEntered))
        );
        assert_eq!(
            h.events.recv().await,
            Some(ClientEvent::Protocol(ProtocolEvent::GameOver))
        );
        assert!(!h.shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_oversized_lines_count_as_invalid() {
        let mut h = spawn_listener();
        let long = format!("{}\n", "S".repeat(400));
        for _ in 0..5 {
            h.server.write_all(long.as_bytes()).await.unwrap();
        }

        assert_eq!(
            h.events.recv().await,
            Some(ClientEvent::Fatal(FatalReason::CircuitBreakerTripped(5)))
        );
    }

    #[tokio::test]
    async fn test_server_exit_forwarded_then_fatal() {
        let mut h = spawn_listener();
        h.server.write_all(b"EXIT;\nLOBBY;\n").await.unwrap();

        assert_eq!(
            h.events.recv().await,
            Some(ClientEvent::Protocol(ProtocolEvent::Exit))
        );
        assert_eq!(
            h.events.recv().await,
            Some(ClientEvent::Fatal(FatalReason::ServerExit))
        );
        assert_eq!(h.handle.await.unwrap(), ListenerExit::ServerExit);
    }

    #[tokio::test]
    async fn test_stream_closed_is_connection_lost() {
        let mut h = spawn_listener();
        drop(h.server);

        match h.events.recv().await {
            Some(ClientEvent::Fatal(FatalReason::ConnectionLost(_))) => {}
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(h.handle.await.unwrap(), ListenerExit::ConnectionLost);
    }

    #[tokio::test]
    async fn test_shutdown_stops_listener() {
        let h = spawn_listener();
        h.shutdown.cancel();
        assert_eq!(h.handle.await.unwrap(), ListenerExit::Shutdown);
    }
}
