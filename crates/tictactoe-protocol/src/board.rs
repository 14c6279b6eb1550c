//! Board snapshot decoding.
//!
//! A `RECONNECT` line carries the whole board as 121 comma-separated
//! integers in row-major order:
//!
//! ```text
//! RECONNECT;bob;0,0,1,0,...,2;1;
//!               ^^^^^^^^^^^^^ 121 cells
//! ```

use tictactoe_core::{BoardSnapshot, DecodeError, constants::DELIMITER_BOARD};

/// Decode a board CSV into a snapshot.
///
/// Tokens are trimmed before parsing. Exactly 121 tokens are required.
///
/// # Errors
/// Returns `DecodeError::Malformed` for a non-integer token or a wrong
/// token count.
///
/// # Example
/// ```
/// use tictactoe_protocol::parse_board;
///
/// let csv = vec!["0"; 121].join(",");
/// let board = parse_board(&csv, 1).unwrap();
/// assert_eq!(board.cell(5, 5), Some(0));
///
/// assert!(parse_board("0,0,0", 1).is_err());
/// ```
pub fn parse_board(csv: &str, my_marker: i32) -> Result<BoardSnapshot, DecodeError> {
    let values = csv
        .split(DELIMITER_BOARD)
        .map(|token| {
            let token = token.trim();
            token
                .parse::<i32>()
                .map_err(|_| DecodeError::Malformed(format!("Invalid board cell '{token}'")))
        })
        .collect::<Result<Vec<i32>, DecodeError>>()?;

    BoardSnapshot::from_row_major(&values, my_marker)
        .map_err(|e| DecodeError::Malformed(e.to_string()))
}
