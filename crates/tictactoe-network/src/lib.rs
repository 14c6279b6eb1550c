//! Network core of the tic-tac-toe client.
//!
//! This crate owns the single TCP session to the game server. It frames and
//! decodes server lines, keeps the link alive with a heartbeat monitor and
//! hands typed events to the UI controller through a single-consumer queue.
//!
//! # Components
//!
//! - **Connection**: socket ownership, gated line sends, line receives
//! - **Listener**: background read loop with a malformed-input circuit breaker
//! - **Heartbeat**: liveness state machine driving the reconnect sequence
//! - **Controller**: the event queue and the [`UiController`] interface
//! - **Session**: wires the above together for the application
//!
//! # Architecture
//!
//! ```text
//!             ┌──────────────── LinkState (atomic flags) ───────────────┐
//!             │                                                         │
//! TCP ──> Listener ──> decode_composite ──> EventSink ──> UI controller │
//!  ^          │ PING: ACK + liveness                                    │
//!  │          v                                                         │
//!  └──── LineSender <── Session::send <── UI controller                 │
//!                                                                       │
//!         Heartbeat ─────────── status / fatal ──> EventSink            │
//!             └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use tictactoe_network::{ClientConfig, Session, SessionConfig};
//! use tictactoe_protocol::Command;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig {
//!     client: ClientConfig::new("127.0.0.1", 10000),
//!     ..Default::default()
//! };
//!
//! let (mut session, mut events) = Session::connect(&config).await?;
//! session.login("alice").await?;
//! session.send(Command::FindGame).await;
//!
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

mod connection;
mod controller;
mod heartbeat;
mod link;
mod listener;
mod session;

pub use connection::{
    ClientConfig, ConnectError, Connection, LineReader, LineSender, ReadFailure, SendOutcome,
    WriteFailure,
};
pub use controller::{ClientEvent, EventSink, FatalReason, UiController, dispatch, run_controller};
pub use heartbeat::{
    HeartbeatAction, HeartbeatConfig, HeartbeatMonitor, HeartbeatState, run_heartbeat,
};
pub use link::{LinkState, Observation};
pub use listener::{CircuitBreaker, Listener, ListenerExit};
pub use session::{Session, SessionConfig};
