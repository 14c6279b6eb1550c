use serde::{Deserialize, Serialize};
use tictactoe_core::{BoardSnapshot, Coordinates, Score};

/// Typed event decoded from one server line (or one part of a composite line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    /// Login accepted (`CONNECT;`).
    Connected,
    /// Server is searching for an opponent (`WAITING;`).
    WaitingForGame,
    /// Player is back in the lobby (`LOBBY;`).
    LobbyEntered,
    /// The local player's move was accepted.
    YourTurn(Coordinates),
    /// The opponent moved.
    OpponentTurn(Coordinates),
    Win(Score),
    Lose(Score),
    Tie(Score),
    /// The current match ended without a result screen.
    GameOver,
    NameTaken,
    InvalidName,
    /// Match found against `opponent_name`.
    StartingGame { opponent_name: String },
    /// Resume an interrupted match from a full board snapshot.
    Reconnect {
        opponent_name: String,
        board: BoardSnapshot,
    },
    Status { text: String },
    MaximumGamesReached,
    /// Server liveness probe.
    Ping,
    /// Server-initiated termination.
    Exit,
    /// A kind the server knows but this client does not act on.
    Unknown { kind: String },
}

impl ProtocolEvent {
    /// Wire token naming this event's kind, for logging.
    pub fn kind_token(&self) -> &str {
        match self {
            ProtocolEvent::Connected => "CONNECT",
            ProtocolEvent::WaitingForGame => "WAITING",
            ProtocolEvent::LobbyEntered => "LOBBY",
            ProtocolEvent::YourTurn(_) => "YOUR_TURN",
            ProtocolEvent::OpponentTurn(_) => "OPPONENT_TURN",
            ProtocolEvent::Win(_) => "WIN",
            ProtocolEvent::Lose(_) => "LOSE",
            ProtocolEvent::Tie(_) => "TIE",
            ProtocolEvent::GameOver => "GAME_OVER",
            ProtocolEvent::NameTaken => "NAME_TAKEN",
            ProtocolEvent::InvalidName => "INVALID_NAME",
            ProtocolEvent::StartingGame { .. } => "STARTING_GAME",
            ProtocolEvent::Reconnect { .. } => "RECONNECT",
            ProtocolEvent::Status { .. } => "STATUS",
            ProtocolEvent::MaximumGamesReached => "MAXIMUM_GAMES_REACHED",
            ProtocolEvent::Ping => "PING",
            ProtocolEvent::Exit => "EXIT",
            ProtocolEvent::Unknown { kind } => kind,
        }
    }

    /// Match result score, for `Win`/`Lose`/`Tie`.
    pub fn score(&self) -> Option<Score> {
        match self {
            ProtocolEvent::Win(score) | ProtocolEvent::Lose(score) | ProtocolEvent::Tie(score) => {
                Some(*score)
            }
            _ => None,
        }
    }
}
