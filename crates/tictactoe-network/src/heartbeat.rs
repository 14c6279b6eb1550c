//! Heartbeat monitor.
//!
//! Watches the liveness flag the listener raises on every server `PING;` and
//! drives the reconnect sequence when pings stop.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ monitoring  ┌───────────┐  no ping / gate closed  ┌──────────────┐
//! │ Idle │────────────>│ Connected │────────────────────────>│ Reconnecting │
//! └──────┘   active    └───────────┘                         └──────────────┘
//!                            ^           ping seen                │    │
//!                            └────────────────────────────────────┘    │
//!                                                   attempts exhausted │
//!                                                                      v
//!                                                                ┌────────┐
//!                                                                │ Failed │
//!                                                                └────────┘
//! ```
//!
//! The monitor is pure: [`HeartbeatMonitor::tick`] takes an [`Observation`]
//! and returns the actions for the driver to apply. [`run_heartbeat`] is
//! the async driver that sleeps, observes and applies.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tictactoe_core::constants::{
    HEARTBEAT_INTERVAL, MAX_RECONNECT_ATTEMPTS, RECONNECT_INTERVAL, STATUS_CONNECTED,
    STATUS_RECONNECTING,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::controller::{EventSink, FatalReason};
use crate::link::{LinkState, Observation};

/// Transitions kept for diagnostics.
const MAX_HISTORY_SIZE: usize = 32;

/// Heartbeat timing.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Tick period while connected (and while idle)
    pub interval: Duration,

    /// Tick period while reconnecting
    pub reconnect_interval: Duration,

    /// Reconnect ticks without liveness before giving up
    pub max_attempts: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: HEARTBEAT_INTERVAL,
            reconnect_interval: RECONNECT_INTERVAL,
            max_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum HeartbeatState {
    /// Not logged in yet; nothing is monitored.
    Idle,
    /// Pings arrive on time.
    Connected,
    /// Gate closed, waiting for a ping. `attempt` ticks have passed.
    Reconnecting { attempt: u32 },
    /// Terminal. The fatal condition has been raised.
    Failed,
}

impl fmt::Display for HeartbeatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeartbeatState::Idle => write!(f, "Idle"),
            HeartbeatState::Connected => write!(f, "Connected"),
            HeartbeatState::Reconnecting { attempt } => write!(f, "Reconnecting({})", attempt),
            HeartbeatState::Failed => write!(f, "Failed"),
        }
    }
}

/// Side effect requested by a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Stop non-ACK sends.
    CloseGate,
    /// Allow sends again.
    OpenGate,
    /// Show connection status text.
    Status(&'static str),
    /// End the session.
    Fatal(FatalReason),
}

/// Pure heartbeat state machine.
///
/// # Example
///
/// ```
/// use tictactoe_network::{HeartbeatAction, HeartbeatConfig, HeartbeatMonitor, HeartbeatState, Observation};
///
/// let mut monitor = HeartbeatMonitor::new(HeartbeatConfig::default());
/// let healthy = Observation { monitoring_active: true, liveness_seen: true, communication_allowed: true };
/// let silent = Observation { liveness_seen: false, ..healthy };
///
/// monitor.tick(healthy);
/// assert_eq!(monitor.state(), HeartbeatState::Connected);
///
/// let actions = monitor.tick(silent);
/// assert_eq!(monitor.state(), HeartbeatState::Reconnecting { attempt: 0 });
/// assert!(actions.contains(&HeartbeatAction::CloseGate));
/// ```
#[derive(Debug)]
pub struct HeartbeatMonitor {
    state: HeartbeatState,
    config: HeartbeatConfig,
    history: VecDeque<(HeartbeatState, HeartbeatState)>,
}

impl HeartbeatMonitor {
    pub fn new(config: HeartbeatConfig) -> Self {
        Self {
            state: HeartbeatState::Idle,
            config,
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn state(&self) -> HeartbeatState {
        self.state
    }

    pub fn is_failed(&self) -> bool {
        self.state == HeartbeatState::Failed
    }

    /// Past state changes, oldest first, as `(from, to)` pairs.
    pub fn history(&self) -> &VecDeque<(HeartbeatState, HeartbeatState)> {
        &self.history
    }

    /// Delay before the next tick, or `None` once failed.
    pub fn next_interval(&self) -> Option<Duration> {
        match self.state {
            HeartbeatState::Idle | HeartbeatState::Connected => Some(self.config.interval),
            HeartbeatState::Reconnecting { .. } => Some(self.config.reconnect_interval),
            HeartbeatState::Failed => None,
        }
    }

    /// Advance the machine by one tick.
    pub fn tick(&mut self, observation: Observation) -> Vec<HeartbeatAction> {
        match self.state {
            HeartbeatState::Idle => {
                if observation.monitoring_active {
                    self.transition(HeartbeatState::Connected);
                }
                Vec::new()
            }
            HeartbeatState::Connected => {
                if observation.liveness_seen && observation.communication_allowed {
                    return Vec::new();
                }
                warn!(
                    liveness = observation.liveness_seen,
                    gate_open = observation.communication_allowed,
                    "Link degraded, entering reconnect"
                );
                self.transition(HeartbeatState::Reconnecting { attempt: 0 });
                vec![
                    HeartbeatAction::CloseGate,
                    HeartbeatAction::Status(STATUS_RECONNECTING),
                ]
            }
            HeartbeatState::Reconnecting { attempt } => {
                if observation.liveness_seen {
                    info!(attempt, "Link restored");
                    self.transition(HeartbeatState::Connected);
                    return vec![
                        HeartbeatAction::OpenGate,
                        HeartbeatAction::Status(STATUS_CONNECTED),
                    ];
                }

                let attempt = attempt + 1;
                if attempt >= self.config.max_attempts {
                    self.transition(HeartbeatState::Failed);
                    return vec![HeartbeatAction::Fatal(FatalReason::HeartbeatTimeout(
                        attempt,
                    ))];
                }

                debug!(attempt, "Still waiting for the server");
                self.state = HeartbeatState::Reconnecting { attempt };
                Vec::new()
            }
            HeartbeatState::Failed => Vec::new(),
        }
    }

    fn transition(&mut self, to: HeartbeatState) {
        let from = self.state;
        info!(from = %from, to = %to, "Heartbeat state change");

        if self.history.len() >= MAX_HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back((from, to));
        self.state = to;
    }
}

/// Drive a monitor until it fails or the session shuts down.
///
/// Returns the final state.
pub async fn run_heartbeat(
    mut monitor: HeartbeatMonitor,
    link: Arc<LinkState>,
    sink: EventSink,
    shutdown: CancellationToken,
) -> HeartbeatState {
    debug!("Heartbeat started");

    while let Some(interval) = monitor.next_interval() {
        tokio::select! {
            () = shutdown.cancelled() => {
                debug!(state = %monitor.state(), "Heartbeat stopped by shutdown");
                return monitor.state();
            }
            () = tokio::time::sleep(interval) => {}
        }

        for action in monitor.tick(link.observe()) {
            match action {
                HeartbeatAction::CloseGate => link.set_communication_allowed(false),
                HeartbeatAction::OpenGate => link.set_communication_allowed(true),
                HeartbeatAction::Status(text) => sink.status(text),
                HeartbeatAction::Fatal(reason) => {
                    sink.fatal(reason);
                }
            }
        }
    }

    if monitor.is_failed() {
        debug!(transitions = ?monitor.history(), "Heartbeat gave up");
    }
    monitor.state()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ClientEvent;
    use rstest::rstest;

    const HEALTHY: Observation = Observation {
        monitoring_active: true,
        liveness_seen: true,
        communication_allowed: true,
    };

    const SILENT: Observation = Observation {
        monitoring_active: true,
        liveness_seen: false,
        communication_allowed: true,
    };

    fn connected() -> HeartbeatMonitor {
        let mut monitor = HeartbeatMonitor::new(HeartbeatConfig::default());
        monitor.tick(HEALTHY);
        monitor
    }

    #[test]
    fn test_idle_until_monitoring_active() {
        let mut monitor = HeartbeatMonitor::new(HeartbeatConfig::default());

        let actions = monitor.tick(Observation::default());
        assert!(actions.is_empty());
        assert_eq!(monitor.state(), HeartbeatState::Idle);

        monitor.tick(SILENT);
        assert_eq!(monitor.state(), HeartbeatState::Connected);
    }

    #[rstest]
    #[case::no_ping(SILENT)]
    #[case::gate_closed(Observation { communication_allowed: false, ..HEALTHY })]
    fn test_connected_degrades(#[case] observation: Observation) {
        let mut monitor = connected();

        let actions = monitor.tick(observation);

        assert_eq!(monitor.state(), HeartbeatState::Reconnecting { attempt: 0 });
        assert_eq!(
            actions,
            vec![
                HeartbeatAction::CloseGate,
                HeartbeatAction::Status(STATUS_RECONNECTING)
            ]
        );
    }

    #[test]
    fn test_connected_stays_with_pings() {
        let mut monitor = connected();
        for _ in 0..10 {
            assert!(monitor.tick(HEALTHY).is_empty());
        }
        assert_eq!(monitor.state(), HeartbeatState::Connected);
    }

    #[test]
    fn test_reconnect_recovers_on_ping() {
        let mut monitor = connected();
        monitor.tick(SILENT);
        monitor.tick(SILENT);
        assert_eq!(monitor.state(), HeartbeatState::Reconnecting { attempt: 1 });

        // Gate still closed, but a ping alone is enough
        let actions = monitor.tick(Observation {
            communication_allowed: false,
            ..HEALTHY
        });

        assert_eq!(monitor.state(), HeartbeatState::Connected);
        assert_eq!(
            actions,
            vec![
                HeartbeatAction::OpenGate,
                HeartbeatAction::Status(STATUS_CONNECTED)
            ]
        );
    }

    #[test]
    fn test_fails_after_max_attempts() {
        let mut monitor = connected();
        monitor.tick(SILENT);

        for attempt in 1..MAX_RECONNECT_ATTEMPTS {
            assert!(monitor.tick(SILENT).is_empty());
            assert_eq!(monitor.state(), HeartbeatState::Reconnecting { attempt });
        }

        let actions = monitor.tick(SILENT);
        assert!(monitor.is_failed());
        assert_eq!(
            actions,
            vec![HeartbeatAction::Fatal(FatalReason::HeartbeatTimeout(
                MAX_RECONNECT_ATTEMPTS
            ))]
        );

        // Terminal: nothing else is ever emitted
        assert!(monitor.tick(HEALTHY).is_empty());
        assert_eq!(monitor.next_interval(), None);
    }

    #[test]
    fn test_intervals_follow_state() {
        let mut monitor = connected();
        assert_eq!(monitor.next_interval(), Some(HEARTBEAT_INTERVAL));

        monitor.tick(SILENT);
        assert_eq!(monitor.next_interval(), Some(RECONNECT_INTERVAL));
    }

    #[test]
    fn test_history_records_transitions() {
        let mut monitor = connected();
        monitor.tick(SILENT);
        monitor.tick(HEALTHY);

        let history: Vec<_> = monitor.history().iter().copied().collect();
        assert_eq!(
            history,
            vec![
                (HeartbeatState::Idle, HeartbeatState::Connected),
                (
                    HeartbeatState::Connected,
                    HeartbeatState::Reconnecting { attempt: 0 }
                ),
                (
                    HeartbeatState::Reconnecting { attempt: 0 },
                    HeartbeatState::Connected
                ),
            ]
        );
    }

    #[test]
    fn test_state_display_and_serde() {
        let state = HeartbeatState::Reconnecting { attempt: 7 };
        assert_eq!(state.to_string(), "Reconnecting(7)");
        assert_eq!(
            serde_json::to_string(&state).unwrap(),
            r#"{"state":"reconnecting","attempt":7}"#
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_times_out_without_pings() {
        let link = Arc::new(LinkState::new());
        link.activate_monitoring();
        let shutdown = CancellationToken::new();
        let (sink, mut rx) = EventSink::channel(shutdown.clone());

        let started = tokio::time::Instant::now();
        let state = run_heartbeat(
            HeartbeatMonitor::new(HeartbeatConfig::default()),
            link.clone(),
            sink,
            shutdown.clone(),
        )
        .await;

        assert_eq!(state, HeartbeatState::Failed);
        assert!(!link.communication_allowed());
        assert!(shutdown.is_cancelled());

        // Idle -> Connected (3s), degrade (3s), then 60 reconnect ticks (1s)
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(66) && elapsed < Duration::from_secs(67));

        assert_eq!(
            rx.recv().await,
            Some(ClientEvent::Status(STATUS_RECONNECTING.to_string()))
        );
        assert_eq!(
            rx.recv().await,
            Some(ClientEvent::Fatal(FatalReason::HeartbeatTimeout(60)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_stops_on_shutdown() {
        let link = Arc::new(LinkState::new());
        let shutdown = CancellationToken::new();
        let (sink, _rx) = EventSink::channel(shutdown.clone());

        let handle = tokio::spawn(run_heartbeat(
            HeartbeatMonitor::new(HeartbeatConfig::default()),
            link,
            sink,
            shutdown.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(10)).await;
        shutdown.cancel();

        assert_eq!(handle.await.unwrap(), HeartbeatState::Idle);
    }
}
