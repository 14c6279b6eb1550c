//! Composite line decoding.
//!
//! The server may batch several sub-messages into one line, joined by `%`:
//!
//! ```text
//! STATUS;Opponent left;%GAME_OVER;%STATUS;Opponent left;
//! ```
//!
//! Sub-messages are decoded left to right. A sub-message whose normalized
//! text (trimmed, compared case-insensitively) was already seen earlier in
//! the same line is skipped, so the example above yields two events. Nothing
//! is remembered between calls.

use crate::{event::ProtocolEvent, parser::decode_line};
use tictactoe_core::{DecodeError, constants::DELIMITER_COMPOSITE};

/// Decode a possibly composite line into per-part results, in wire order.
///
/// Empty parts (a leading or trailing `%`) produce nothing. A line without
/// `%` yields exactly one result.
///
/// # Example
/// ```
/// use tictactoe_protocol::{decode_composite, ProtocolEvent};
///
/// let results = decode_composite("STATUS;a;%STATUS;a;%STATUS;b;");
/// let texts: Vec<_> = results
///     .into_iter()
///     .map(|r| match r.unwrap() {
///         ProtocolEvent::Status { text } => text,
///         other => panic!("{other:?}"),
///     })
///     .collect();
/// assert_eq!(texts, vec!["a", "b"]);
/// ```
pub fn decode_composite(line: &str) -> Vec<Result<ProtocolEvent, DecodeError>> {
    let mut seen: Vec<&str> = Vec::new();
    let mut results = Vec::new();

    for part in line.split(DELIMITER_COMPOSITE) {
        let part = part.trim();
        if part.is_empty() || seen.iter().any(|s| s.eq_ignore_ascii_case(part)) {
            continue;
        }

        seen.push(part);
        results.push(decode_line(part));
    }

    results
}
