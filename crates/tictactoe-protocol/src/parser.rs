//! Server line parser.
//!
//! This module converts one incoming wire line into a typed
//! [`ProtocolEvent`].
//!
//! # Line Format
//!
//! ```text
//! KIND;FIELD1;FIELD2;...;
//! ```
//!
//! - `KIND`: message kind, matched case-insensitively against a fixed table
//! - `FIELDn`: positional payload, meaning depends on the kind
//! - the trailing `;` is optional
//!
//! # Dispatch
//!
//! The kind token selects a decoder function from [`DISPATCH`]. A token not
//! in the table is [`DecodeError::UnknownKind`]; a known kind whose required
//! field is missing, empty or not an integer is [`DecodeError::Malformed`].
//! Fields past the ones a kind needs are ignored.
//!
//! # Examples
//!
//! ```
//! use tictactoe_protocol::{decode_line, ProtocolEvent};
//! use tictactoe_core::{Coordinates, DecodeError, Score};
//!
//! assert_eq!(
//!     decode_line("YOUR_TURN;3;7;").unwrap(),
//!     ProtocolEvent::YourTurn(Coordinates::new(3, 7))
//! );
//! assert_eq!(
//!     decode_line("win;2;1;").unwrap(),
//!     ProtocolEvent::Win(Score::new(2, 1))
//! );
//! assert!(matches!(decode_line("BOGUS;"), Err(DecodeError::UnknownKind(_))));
//! assert!(matches!(decode_line("TIE;2;"), Err(DecodeError::Malformed(_))));
//! ```

use crate::{board::parse_board, event::ProtocolEvent};
use tictactoe_core::{Coordinates, DecodeError, Score, constants::DELIMITER_FIELD};

type DecodeFn = fn(&Fields<'_>) -> Result<ProtocolEvent, DecodeError>;

/// Kind token to decoder, one entry per kind in the server catalog.
const DISPATCH: &[(&str, DecodeFn)] = &[
    ("CONNECT", decode_connected),
    ("LOBBY", decode_lobby),
    ("WAITING", decode_waiting),
    ("ROOM_UPDATE", decode_ignored),
    ("STARTING_GAME", decode_starting_game),
    ("RECONNECT", decode_reconnect),
    ("YOUR_TURN", decode_your_turn),
    ("OPPONENT_TURN", decode_opponent_turn),
    ("WIN", decode_win),
    ("LOSE", decode_lose),
    ("TIE", decode_tie),
    ("GAME_OVER", decode_game_over),
    ("NAME_TAKEN", decode_name_taken),
    ("INVALID_NAME", decode_invalid_name),
    ("EXIT", decode_exit),
    ("STATUS", decode_status),
    ("MAXIMUM_GAMES_REACHED", decode_maximum_games),
    ("PING", decode_ping),
];

/// Decode one wire line (no `%` handling, see [`crate::decode_composite`]).
///
/// Leading and trailing whitespace is trimmed first.
///
/// # Errors
/// - `DecodeError::UnknownKind` if the first field names no known kind
/// - `DecodeError::Malformed` if a required field is missing or invalid
pub fn decode_line(line: &str) -> Result<ProtocolEvent, DecodeError> {
    let fields = Fields::split(line.trim());
    let kind = fields.kind.to_ascii_uppercase();

    let decode = DISPATCH
        .iter()
        .find(|(token, _)| *token == kind)
        .map(|(_, decode)| *decode)
        .ok_or_else(|| DecodeError::UnknownKind(fields.kind.to_string()))?;

    decode(&fields)
}

/// Positional view over the fields that follow the kind token.
struct Fields<'a> {
    kind: &'a str,
    payload: Vec<&'a str>,
}

impl<'a> Fields<'a> {
    fn split(line: &'a str) -> Self {
        let mut parts = line.split(DELIMITER_FIELD);
        let kind = parts.next().unwrap_or_default();
        Fields {
            kind,
            payload: parts.collect(),
        }
    }

    /// Required non-empty text field.
    fn text(&self, index: usize, name: &str) -> Result<&'a str, DecodeError> {
        match self.payload.get(index).copied() {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(DecodeError::Malformed(format!(
                "{} is missing field '{name}'",
                self.kind
            ))),
        }
    }

    /// Required integer field.
    fn int(&self, index: usize, name: &str) -> Result<i32, DecodeError> {
        let value = self.text(index, name)?;
        value.parse().map_err(|_| {
            DecodeError::Malformed(format!(
                "{} field '{name}' is not an integer: '{value}'",
                self.kind
            ))
        })
    }

    fn coordinates(&self) -> Result<Coordinates, DecodeError> {
        Ok(Coordinates::new(self.int(0, "row")?, self.int(1, "col")?))
    }

    fn score(&self) -> Result<Score, DecodeError> {
        Ok(Score::new(
            self.int(0, "your score")?,
            self.int(1, "opponent score")?,
        ))
    }
}

fn decode_connected(_: &Fields<'_>) -> Result<ProtocolEvent, DecodeError> {
    Ok(ProtocolEvent::Connected)
}

fn decode_lobby(_: &Fields<'_>) -> Result<ProtocolEvent, DecodeError> {
    Ok(ProtocolEvent::LobbyEntered)
}

fn decode_waiting(_: &Fields<'_>) -> Result<ProtocolEvent, DecodeError> {
    Ok(ProtocolEvent::WaitingForGame)
}

fn decode_ignored(fields: &Fields<'_>) -> Result<ProtocolEvent, DecodeError> {
    Ok(ProtocolEvent::Unknown {
        kind: fields.kind.to_ascii_uppercase(),
    })
}

fn decode_starting_game(fields: &Fields<'_>) -> Result<ProtocolEvent, DecodeError> {
    Ok(ProtocolEvent::StartingGame {
        opponent_name: fields.text(0, "opponent")?.to_string(),
    })
}

fn decode_reconnect(fields: &Fields<'_>) -> Result<ProtocolEvent, DecodeError> {
    let opponent_name = fields.text(0, "opponent")?.to_string();
    let csv = fields.text(1, "board")?;
    let my_marker = fields.int(2, "marker")?;

    Ok(ProtocolEvent::Reconnect {
        opponent_name,
        board: parse_board(csv, my_marker)?,
    })
}

fn decode_your_turn(fields: &Fields<'_>) -> Result<ProtocolEvent, DecodeError> {
    Ok(ProtocolEvent::YourTurn(fields.coordinates()?))
}

fn decode_opponent_turn(fields: &Fields<'_>) -> Result<ProtocolEvent, DecodeError> {
    Ok(ProtocolEvent::OpponentTurn(fields.coordinates()?))
}

fn decode_win(fields: &Fields<'_>) -> Result<ProtocolEvent, DecodeError> {
    Ok(ProtocolEvent::Win(fields.score()?))
}

fn decode_lose(fields: &Fields<'_>) -> Result<ProtocolEvent, DecodeError> {
    Ok(ProtocolEvent::Lose(fields.score()?))
}

fn decode_tie(fields: &Fields<'_>) -> Result<ProtocolEvent, DecodeError> {
    Ok(ProtocolEvent::Tie(fields.score()?))
}

fn decode_game_over(_: &Fields<'_>) -> Result<ProtocolEvent, DecodeError> {
    Ok(ProtocolEvent::GameOver)
}

fn decode_name_taken(_: &Fields<'_>) -> Result<ProtocolEvent, DecodeError> {
    Ok(ProtocolEvent::NameTaken)
}

fn decode_invalid_name(_: &Fields<'_>) -> Result<ProtocolEvent, DecodeError> {
    Ok(ProtocolEvent::InvalidName)
}

fn decode_exit(_: &Fields<'_>) -> Result<ProtocolEvent, DecodeError> {
    Ok(ProtocolEvent::Exit)
}

fn decode_status(fields: &Fields<'_>) -> Result<ProtocolEvent, DecodeError> {
    Ok(ProtocolEvent::Status {
        text: fields.text(0, "text")?.to_string(),
    })
}

fn decode_maximum_games(_: &Fields<'_>) -> Result<ProtocolEvent, DecodeError> {
    Ok(ProtocolEvent::MaximumGamesReached)
}

fn decode_ping(_: &Fields<'_>) -> Result<ProtocolEvent, DecodeError> {
    Ok(ProtocolEvent::Ping)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("CONNECT;", ProtocolEvent::Connected)]
    #[case("LOBBY;", ProtocolEvent::LobbyEntered)]
    #[case("WAITING;", ProtocolEvent::WaitingForGame)]
    #[case("GAME_OVER;", ProtocolEvent::GameOver)]
    #[case("NAME_TAKEN;", ProtocolEvent::NameTaken)]
    #[case("INVALID_NAME;", ProtocolEvent::InvalidName)]
    #[case("MAXIMUM_GAMES_REACHED;", ProtocolEvent::MaximumGamesReached)]
    #[case("PING;", ProtocolEvent::Ping)]
    #[case("EXIT;", ProtocolEvent::Exit)]
    #[case("PING", ProtocolEvent::Ping)]
    fn test_payloadless_kinds(#[case] line: &str, #[case] expected: ProtocolEvent) {
        assert_eq!(decode_line(line).unwrap(), expected);
    }

    #[test]
    fn test_kind_is_case_insensitive() {
        assert_eq!(decode_line("ping;").unwrap(), ProtocolEvent::Ping);
        assert_eq!(
            decode_line("Your_Turn;1;2;").unwrap(),
            ProtocolEvent::YourTurn(Coordinates::new(1, 2))
        );
    }

    #[test]
    fn test_turns() {
        assert_eq!(
            decode_line("OPPONENT_TURN;10;0;").unwrap(),
            ProtocolEvent::OpponentTurn(Coordinates::new(10, 0))
        );
    }

    #[rstest]
    #[case("WIN;3;1;", ProtocolEvent::Win(Score::new(3, 1)))]
    #[case("LOSE;0;4;", ProtocolEvent::Lose(Score::new(0, 4)))]
    #[case("TIE;2;2;", ProtocolEvent::Tie(Score::new(2, 2)))]
    fn test_results(#[case] line: &str, #[case] expected: ProtocolEvent) {
        assert_eq!(decode_line(line).unwrap(), expected);
    }

    #[test]
    fn test_text_payloads() {
        assert_eq!(
            decode_line("STARTING_GAME;bob;").unwrap(),
            ProtocolEvent::StartingGame {
                opponent_name: "bob".to_string()
            }
        );
        assert_eq!(
            decode_line("STATUS;Opponent disconnected;").unwrap(),
            ProtocolEvent::Status {
                text: "Opponent disconnected".to_string()
            }
        );
    }

    #[test]
    fn test_reconnect_snapshot() {
        let mut cells = vec!["0"; 121];
        cells[12] = "2";
        let line = format!("RECONNECT;bob;{};1;", cells.join(","));

        match decode_line(&line).unwrap() {
            ProtocolEvent::Reconnect {
                opponent_name,
                board,
            } => {
                assert_eq!(opponent_name, "bob");
                assert_eq!(board.cell(1, 1), Some(2));
                assert_eq!(board.my_marker(), 1);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_room_update_is_known_but_ignored() {
        assert_eq!(
            decode_line("room_update;3;").unwrap(),
            ProtocolEvent::Unknown {
                kind: "ROOM_UPDATE".to_string()
            }
        );
    }

    #[rstest]
    #[case("HELLO;")]
    #[case("")]
    #[case(";;;")]
    #[case("NAME;alice;|")]
    fn test_unknown_kind(#[case] line: &str) {
        assert!(matches!(decode_line(line), Err(DecodeError::UnknownKind(_))));
    }

    #[rstest]
    #[case("YOUR_TURN;")]
    #[case("YOUR_TURN;1;")]
    #[case("YOUR_TURN;a;2;")]
    #[case("OPPONENT_TURN;1;;")]
    #[case("WIN;1;")]
    #[case("LOSE;x;y;")]
    #[case("STARTING_GAME;")]
    #[case("STATUS;")]
    #[case("RECONNECT;bob;")]
    #[case("RECONNECT;bob;0,0,0;1;")]
    fn test_malformed(#[case] line: &str) {
        assert!(matches!(decode_line(line), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_reconnect_marker_must_be_integer() {
        let line = format!("RECONNECT;bob;{};X;", vec!["0"; 121].join(","));
        assert!(matches!(decode_line(&line), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_whitespace_trimmed() {
        assert_eq!(decode_line("  PING;\r\n").unwrap(), ProtocolEvent::Ping);
    }

    #[test]
    fn test_unknown_kind_keeps_original_token() {
        assert_eq!(
            decode_line("bogus;1;"),
            Err(DecodeError::UnknownKind("bogus".to_string()))
        );
    }
}
