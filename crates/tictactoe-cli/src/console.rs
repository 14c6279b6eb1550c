//! Line-oriented console front end.

use std::fmt;
use std::io::Write;
use tictactoe_core::{BoardSnapshot, Coordinates, constants::BOARD_SIZE};
use tictactoe_network::{FatalReason, UiController};
use tictactoe_protocol::ProtocolEvent;
use tracing::warn;

use crate::input::HELP;

const MINE: char = 'X';
const THEIRS: char = 'O';
const EMPTY: char = '.';

/// Board as the local player sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    cells: [[char; BOARD_SIZE]; BOARD_SIZE],
}

impl BoardView {
    pub fn new() -> Self {
        Self {
            cells: [[EMPTY; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    pub fn from_snapshot(snapshot: &BoardSnapshot) -> Self {
        let mut view = Self::new();
        for (at, mine) in snapshot.occupied_cells() {
            view.mark(at, mine);
        }
        view
    }

    /// Place a mark. Off-board coordinates are ignored.
    pub fn mark(&mut self, at: Coordinates, mine: bool) {
        if !at.is_on_board() {
            warn!(%at, "Move outside the board");
            return;
        }
        self.cells[at.row as usize][at.col as usize] = if mine { MINE } else { THEIRS };
    }
}

impl Default for BoardView {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BoardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "   ")?;
        for col in 0..BOARD_SIZE {
            write!(f, "{:>3}", col)?;
        }
        writeln!(f)?;

        for (row, cells) in self.cells.iter().enumerate() {
            write!(f, "{:>3}", row)?;
            for cell in cells {
                write!(f, "{:>3}", cell)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// [`UiController`] that prints to a writer (stdout in the binary).
pub struct ConsoleUi<W: Write> {
    out: W,
    board: BoardView,
    opponent: Option<String>,
    status: String,
}

impl<W: Write> ConsoleUi<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            board: BoardView::new(),
            opponent: None,
            status: String::new(),
        }
    }

    /// Print a line for the user.
    pub fn say(&mut self, text: impl fmt::Display) {
        if let Err(e) = writeln!(self.out, "{text}") {
            warn!("Console write failed: {}", e);
        }
    }

    /// Print the command list and the last connection status.
    pub fn show_help(&mut self) {
        self.say(HELP);
        if !self.status.is_empty() {
            let status = format!("Connection: {}", self.status);
            self.say(status);
        }
    }

    fn show_board(&mut self) {
        let board = self.board.to_string();
        self.say(board);
    }

    fn opponent_name(&self) -> &str {
        self.opponent.as_deref().unwrap_or("opponent")
    }
}

impl<W: Write> UiController for ConsoleUi<W> {
    fn on_event(&mut self, event: ProtocolEvent) {
        match event {
            ProtocolEvent::Connected => self.say("Logged in. Type 'play' to find a game."),
            ProtocolEvent::LobbyEntered => self.say("Back in the lobby."),
            ProtocolEvent::WaitingForGame => self.say("Waiting for an opponent..."),
            ProtocolEvent::StartingGame { opponent_name } => {
                self.board = BoardView::new();
                self.say(format!("Game started against {opponent_name}."));
                self.opponent = Some(opponent_name);
                self.show_board();
            }
            ProtocolEvent::Reconnect {
                opponent_name,
                board,
            } => {
                self.board = BoardView::from_snapshot(&board);
                self.say(format!("Resumed game against {opponent_name}."));
                self.opponent = Some(opponent_name);
                self.show_board();
            }
            ProtocolEvent::YourTurn(at) => {
                self.board.mark(at, true);
                self.show_board();
                let waiting = format!("Waiting for {}...", self.opponent_name());
                self.say(waiting);
            }
            ProtocolEvent::OpponentTurn(at) => {
                self.board.mark(at, false);
                self.show_board();
                self.say("Your move.");
            }
            ProtocolEvent::Win(score) => self.say(format!("You won! Score {score}")),
            ProtocolEvent::Lose(score) => self.say(format!("You lost. Score {score}")),
            ProtocolEvent::Tie(score) => self.say(format!("Tie. Score {score}")),
            ProtocolEvent::GameOver => {
                let line = format!("{} left the game.", self.opponent_name());
                self.opponent = None;
                self.say(line);
            }
            ProtocolEvent::NameTaken => self.say("That nickname is taken, try another."),
            ProtocolEvent::InvalidName => self.say("That nickname is not allowed."),
            ProtocolEvent::MaximumGamesReached => {
                self.say("The server is full, try again later.")
            }
            ProtocolEvent::Status { text } => self.say(format!("[server] {text}")),
            ProtocolEvent::Exit => self.say("The server closed the session."),
            ProtocolEvent::Ping | ProtocolEvent::Unknown { .. } => {}
        }
    }

    fn on_status(&mut self, text: &str) {
        self.status = text.to_string();
        self.say(format!("[connection] {text}"));
    }

    fn on_fatal(&mut self, reason: &FatalReason) {
        self.say(format!("Disconnected: {reason}"));
    }
}

#[cfg(test)]
impl BoardView {
    pub fn get(&self, row: usize, col: usize) -> Option<char> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }
}

#[cfg(test)]
impl<W: Write> ConsoleUi<W> {
    pub fn board(&self) -> &BoardView {
        &self.board
    }

    pub fn opponent(&self) -> Option<&str> {
        self.opponent.as_deref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tictactoe_core::Score;
    use tictactoe_network::dispatch;

    fn output(ui: ConsoleUi<Vec<u8>>) -> String {
        String::from_utf8(ui.into_inner()).unwrap()
    }

    #[test]
    fn test_moves_marked_on_board() {
        let mut ui = ConsoleUi::new(Vec::new());
        ui.on_event(ProtocolEvent::StartingGame {
            opponent_name: "bob".to_string(),
        });
        ui.on_event(ProtocolEvent::YourTurn(Coordinates::new(0, 0)));
        ui.on_event(ProtocolEvent::OpponentTurn(Coordinates::new(10, 10)));

        assert_eq!(ui.opponent(), Some("bob"));
        assert_eq!(ui.board().get(0, 0), Some(MINE));
        assert_eq!(ui.board().get(10, 10), Some(THEIRS));
        assert_eq!(ui.board().get(5, 5), Some(EMPTY));
        assert!(output(ui).contains("Waiting for bob"));
    }

    #[test]
    fn test_reconnect_restores_board() {
        let mut values = vec![0; BOARD_SIZE * BOARD_SIZE];
        values[0] = 2;
        values[12] = 1;
        let snapshot = BoardSnapshot::from_row_major(&values, 2).unwrap();

        let mut ui = ConsoleUi::new(Vec::new());
        ui.on_event(ProtocolEvent::Reconnect {
            opponent_name: "carol".to_string(),
            board: snapshot,
        });

        assert_eq!(ui.board().get(0, 0), Some(MINE));
        assert_eq!(ui.board().get(1, 1), Some(THEIRS));
    }

    #[test]
    fn test_help_shows_connection_status() {
        let mut ui = ConsoleUi::new(Vec::new());
        ui.on_status("Connected");
        ui.show_help();

        let text = output(ui);
        assert!(text.contains("move <row> <col>"));
        assert!(text.contains("Connection: Connected"));
    }

    #[test]
    fn test_off_board_move_ignored() {
        let mut view = BoardView::new();
        view.mark(Coordinates::new(11, 0), true);
        view.mark(Coordinates::new(-1, 3), false);
        assert_eq!(view, BoardView::new());
    }

    #[test]
    fn test_status_and_fatal_printed() {
        let mut ui = ConsoleUi::new(Vec::new());
        dispatch(
            &mut ui,
            tictactoe_network::ClientEvent::Status("Reconnecting...".to_string()),
        );
        ui.on_event(ProtocolEvent::Win(Score::new(2, 1)));
        let fatal = dispatch(
            &mut ui,
            tictactoe_network::ClientEvent::Fatal(FatalReason::HeartbeatTimeout(60)),
        );

        assert_eq!(fatal, Some(FatalReason::HeartbeatTimeout(60)));
        assert_eq!(ui.status(), "Reconnecting...");
        let text = output(ui);
        assert!(text.contains("[connection] Reconnecting..."));
        assert!(text.contains("You won! Score 2:1"));
        assert!(text.contains("Disconnected: No response from the server after 60 reconnect attempts"));
    }

    #[test]
    fn test_board_display_has_header_and_rows() {
        let text = BoardView::new().to_string();
        assert_eq!(text.lines().count(), BOARD_SIZE + 1);
        assert!(text.lines().next().unwrap().trim_end().ends_with("10"));
    }
}
