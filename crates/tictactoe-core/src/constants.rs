//! Core constants for the tic-tac-toe line protocol.
//!
//! This module defines the protocol-level constants shared by the codec,
//! the connection and the background loops. Keeping them in one place keeps
//! the client in lockstep with the server's wire format.
//!
//! # Protocol Structure
//!
//! Outgoing commands are terminated by a `|` sentinel, incoming lines by a
//! newline:
//!
//! ```text
//! client -> server   TURN;3;7;|
//! server -> client   YOUR_TURN;3;7;\n
//! server -> client   STATUS;a;%PING;\n      (composite line)
//! ```
//!
//! # Delimiter Semantics
//!
//! | Delimiter | Name | Purpose | Example |
//! |-----------|------|---------|---------|
//! | `;` | DELIMITER_FIELD | Separates message fields | `WIN;2;1;` |
//! | `\|` | TERMINATOR | Ends an outgoing command | `EXIT;\|` |
//! | `%` | DELIMITER_COMPOSITE | Joins sub-messages in one line | `PING;%STATUS;x;` |
//! | `,` | DELIMITER_BOARD | Separates board snapshot cells | `0,1,2,...` |
//!
//! # Usage
//!
//! ```
//! use tictactoe_core::constants::*;
//!
//! assert_eq!(BOARD_CELLS, BOARD_SIZE * BOARD_SIZE);
//! assert_eq!(MAX_LINE_LENGTH, 300);
//! ```

use std::time::Duration;

// ============================================================================
// Protocol Delimiters
// ============================================================================

/// Field separator in protocol messages.
///
/// # Examples
///
/// ```
/// use tictactoe_core::constants::DELIMITER_FIELD;
///
/// let line = "YOUR_TURN;3;7;";
/// let fields: Vec<&str> = line.split(DELIMITER_FIELD).collect();
/// assert_eq!(fields, vec!["YOUR_TURN", "3", "7", ""]);
/// ```
pub const DELIMITER_FIELD: char = ';';

/// Sentinel closing every outgoing command.
///
/// The server splits its inbound byte stream on this character, so it is the
/// only framing the client applies when writing.
pub const TERMINATOR: char = '|';

/// Joins several sub-messages into one composite line.
pub const DELIMITER_COMPOSITE: char = '%';

/// Separates the integer cells of a serialized board snapshot.
pub const DELIMITER_BOARD: char = ',';

/// Ends every incoming line.
pub const LINE_END: u8 = b'\n';

// ============================================================================
// Message Limits
// ============================================================================

/// Longest incoming line the client accepts, newline excluded.
///
/// Longer lines are counted as malformed input and discarded.
pub const MAX_LINE_LENGTH: usize = 300;

/// Consecutive malformed lines that trip the listener's circuit breaker.
pub const MAX_INVALID_MESSAGES: u32 = 5;

// ============================================================================
// Board
// ============================================================================

/// Side length of the square game board.
pub const BOARD_SIZE: usize = 11;

/// Number of integer tokens in a serialized board snapshot.
pub const BOARD_CELLS: usize = BOARD_SIZE * BOARD_SIZE;

/// Cell value of an unoccupied square.
pub const EMPTY_CELL: i32 = 0;

// ============================================================================
// Timing
// ============================================================================

/// Default connection timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;

/// Default write timeout in milliseconds.
///
/// A write that does not complete within this window counts as a write
/// failure and closes the communication gate.
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 3000;

/// Heartbeat tick period while the link is healthy.
///
/// The server pings more often than this, so a full period without a ping
/// means the link is degraded.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(3);

/// Heartbeat tick period while waiting for the link to come back.
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(1);

/// Reconnect ticks allowed before giving up (one minute at one per second).
pub const MAX_RECONNECT_ATTEMPTS: u32 = 60;

// ============================================================================
// Status Text
// ============================================================================

/// Status shown while the communication gate is closed.
pub const STATUS_RECONNECTING: &str = "Reconnecting...";

/// Status shown once liveness is restored.
pub const STATUS_CONNECTED: &str = "Connected";
