use crate::validation::validate_field;
use std::fmt;
use tictactoe_core::{
    Result,
    constants::{DELIMITER_FIELD, TERMINATOR},
};

/// Outgoing command, encoded as one `|`-terminated wire string.
///
/// # Example
/// ```
/// use tictactoe_protocol::Command;
///
/// let login = Command::login("alice").unwrap();
/// assert_eq!(login.encode(), "NAME;alice;|");
/// assert_eq!(Command::Move { row: 3, col: 7 }.encode(), "TURN;3;7;|");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Login request with the chosen nickname.
    Login { nickname: String },
    /// Request matchmaking.
    FindGame,
    /// Submit a move.
    Move { row: i32, col: i32 },
    /// Notify the server the client left the game screen.
    CloseGame,
    /// Leave and disconnect.
    Exit,
    /// Ask for a rematch.
    Rematch,
    /// Heartbeat acknowledgement.
    Ack,
    /// Liveness probe written ahead of a command to test the socket.
    Ping,
}

impl Command {
    /// Build a login command.
    ///
    /// # Errors
    /// Returns `Error::InvalidField` if the nickname contains reserved
    /// protocol characters.
    pub fn login(nickname: impl Into<String>) -> Result<Self> {
        let nickname = nickname.into();
        validate_field(&nickname)?;
        Ok(Command::Login { nickname })
    }

    /// Leading keyword on the wire.
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::Login { .. } => "NAME",
            Command::FindGame => "WAITING_FOR_GAME",
            Command::Move { .. } => "TURN",
            Command::CloseGame => "GAME_OVER",
            Command::Exit => "EXIT",
            Command::Rematch => "REMATCH",
            Command::Ack => "ACK",
            Command::Ping => "PING",
        }
    }

    /// Wire form, including the `|` terminator.
    pub fn encode(&self) -> String {
        let mut out = String::from(self.keyword());
        out.push(DELIMITER_FIELD);

        match self {
            Command::Login { nickname } => {
                out.push_str(nickname);
                out.push(DELIMITER_FIELD);
            }
            Command::Move { row, col } => {
                out.push_str(&row.to_string());
                out.push(DELIMITER_FIELD);
                out.push_str(&col.to_string());
                out.push(DELIMITER_FIELD);
            }
            _ => {}
        }

        out.push(TERMINATOR);
        out
    }

    /// The acknowledgement bypasses the communication gate.
    pub fn is_ack(&self) -> bool {
        matches!(self, Command::Ack)
    }

    /// Commands that are written without a probe in front of them.
    pub fn skips_probe(&self) -> bool {
        matches!(self, Command::Ack | Command::Ping)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
