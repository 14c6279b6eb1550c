//! Field validation for outgoing commands.
//!
//! A user-supplied field (the login nickname) is embedded verbatim in the
//! wire text, so it must not contain any character the server treats as
//! framing:
//! - `;` - field delimiter
//! - `|` - command terminator
//! - `%` - composite delimiter
//! - `\n`, `\r` - line breaks
//!
//! # Examples
//!
//! ```
//! use tictactoe_protocol::validate_field;
//!
//! assert!(validate_field("alice").is_ok());
//! assert!(validate_field("bob;EXIT").is_err());
//! assert!(validate_field("eve|").is_err());
//! ```
//!
//! Length and emptiness are left to the server, which answers with
//! `INVALID_NAME`.

use tictactoe_core::{
    Error, Result,
    constants::{DELIMITER_COMPOSITE, DELIMITER_FIELD, TERMINATOR},
};

/// Validate a field value for protocol safety.
///
/// # Errors
/// Returns `Error::InvalidField` carrying the full field content when a
/// reserved character is present.
pub fn validate_field(field: &str) -> Result<()> {
    let reserved = |c: char| {
        c == DELIMITER_FIELD || c == TERMINATOR || c == DELIMITER_COMPOSITE || c == '\n' || c == '\r'
    };

    if field.contains(reserved) {
        return Err(Error::InvalidField(field.to_string()));
    }

    Ok(())
}
