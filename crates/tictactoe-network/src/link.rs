//! Shared link flags.
//!
//! The listener, the heartbeat task and the senders all look at the same
//! three booleans. Each is an independent atomic; no lock is held across an
//! await point.
//!
//! | Flag | Set by | Cleared by |
//! |------|--------|------------|
//! | `communication_allowed` | ping received, heartbeat recovery | write failure, heartbeat degrade |
//! | `liveness_seen` | ping received | heartbeat tick (consumed) |
//! | `monitoring_active` | `CONNECT;` or ping received | never |

use std::sync::atomic::{AtomicBool, Ordering};

/// Snapshot of the link flags taken by one heartbeat tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Observation {
    pub monitoring_active: bool,
    pub liveness_seen: bool,
    pub communication_allowed: bool,
}

/// Atomic link flags shared between the background tasks.
#[derive(Debug)]
pub struct LinkState {
    communication_allowed: AtomicBool,
    liveness_seen: AtomicBool,
    monitoring_active: AtomicBool,
}

impl LinkState {
    /// Fresh link: sends allowed, no liveness yet, monitor idle.
    pub fn new() -> Self {
        Self {
            communication_allowed: AtomicBool::new(true),
            liveness_seen: AtomicBool::new(false),
            monitoring_active: AtomicBool::new(false),
        }
    }

    pub fn communication_allowed(&self) -> bool {
        self.communication_allowed.load(Ordering::Acquire)
    }

    pub fn set_communication_allowed(&self, allowed: bool) {
        self.communication_allowed.store(allowed, Ordering::Release);
    }

    pub fn monitoring_active(&self) -> bool {
        self.monitoring_active.load(Ordering::Acquire)
    }

    /// Start liveness monitoring. Called once the server accepted the login.
    pub fn activate_monitoring(&self) {
        self.monitoring_active.store(true, Ordering::Release);
    }

    /// Record a server ping.
    ///
    /// A ping proves the link works in both directions, so it also reopens
    /// the communication gate and starts monitoring if it had not started.
    pub fn record_ping(&self) {
        self.liveness_seen.store(true, Ordering::Release);
        self.monitoring_active.store(true, Ordering::Release);
        self.communication_allowed.store(true, Ordering::Release);
    }

    /// Read and clear the liveness flag in one step.
    ///
    /// A ping that lands between two ticks is seen by exactly one of them.
    pub fn take_liveness(&self) -> bool {
        self.liveness_seen.swap(false, Ordering::AcqRel)
    }

    /// Snapshot for a heartbeat tick. Consumes the liveness flag.
    pub fn observe(&self) -> Observation {
        Observation {
            monitoring_active: self.monitoring_active(),
            liveness_seen: self.take_liveness(),
            communication_allowed: self.communication_allowed(),
        }
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_flags() {
        let link = LinkState::new();
        assert!(link.communication_allowed());
        assert!(!link.monitoring_active());
        assert!(!link.take_liveness());
    }

    #[test]
    fn test_ping_sets_every_flag() {
        let link = LinkState::new();
        link.set_communication_allowed(false);

        link.record_ping();

        assert_eq!(
            link.observe(),
            Observation {
                monitoring_active: true,
                liveness_seen: true,
                communication_allowed: true,
            }
        );
    }

    #[test]
    fn test_liveness_is_consumed_once() {
        let link = LinkState::new();
        link.record_ping();

        assert!(link.observe().liveness_seen);
        assert!(!link.observe().liveness_seen);
    }

    #[test]
    fn test_activate_monitoring_keeps_gate() {
        let link = LinkState::new();
        link.set_communication_allowed(false);
        link.activate_monitoring();

        assert!(link.monitoring_active());
        assert!(!link.communication_allowed());
    }
}
