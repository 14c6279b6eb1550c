//! Console command parsing.

use tictactoe_protocol::Command;

/// One line typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// Log in with a nickname.
    Login(String),
    /// A command sent to the server as is.
    Send(Command),
    /// Send `EXIT` and quit.
    Quit,
    Help,
    /// Blank line.
    Nothing,
}

pub const HELP: &str = "\
Commands:
  login <name>      log in with a nickname
  play              look for an opponent
  move <row> <col>  place a mark (0-10)
  rematch           ask for a rematch
  close             leave the current game
  exit              leave the server and quit
  help              show this help";

/// Parse one console line.
///
/// Keywords are case-insensitive. Nickname validation happens at login.
pub fn parse_input(line: &str) -> Result<UserInput, String> {
    let mut words = line.split_whitespace();
    let Some(keyword) = words.next() else {
        return Ok(UserInput::Nothing);
    };
    let args: Vec<&str> = words.collect();

    let input = match (keyword.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("login", [name]) => UserInput::Login((*name).to_string()),
        ("login", _) => return Err("usage: login <name>".to_string()),
        ("play", []) => UserInput::Send(Command::FindGame),
        ("move", [row, col]) => {
            let row = parse_index(row)?;
            let col = parse_index(col)?;
            UserInput::Send(Command::Move { row, col })
        }
        ("move", _) => return Err("usage: move <row> <col>".to_string()),
        ("rematch", []) => UserInput::Send(Command::Rematch),
        ("close", []) => UserInput::Send(Command::CloseGame),
        ("exit" | "quit", []) => UserInput::Quit,
        ("help" | "?", _) => UserInput::Help,
        (other, _) => return Err(format!("unknown command '{other}', type 'help'")),
    };

    Ok(input)
}

fn parse_index(text: &str) -> Result<i32, String> {
    text.parse::<i32>()
        .map_err(|_| format!("'{text}' is not a number"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("play", UserInput::Send(Command::FindGame))]
    #[case("  MOVE 3 7 ", UserInput::Send(Command::Move { row: 3, col: 7 }))]
    #[case("rematch", UserInput::Send(Command::Rematch))]
    #[case("close", UserInput::Send(Command::CloseGame))]
    #[case("login alice", UserInput::Login("alice".to_string()))]
    #[case("exit", UserInput::Quit)]
    #[case("help", UserInput::Help)]
    #[case("   ", UserInput::Nothing)]
    fn test_parse_valid(#[case] line: &str, #[case] expected: UserInput) {
        assert_eq!(parse_input(line), Ok(expected));
    }

    #[rstest]
    #[case("move 3")]
    #[case("move a b")]
    #[case("login")]
    #[case("login two words")]
    #[case("dance")]
    #[case("play now")]
    fn test_parse_invalid(#[case] line: &str) {
        assert!(parse_input(line).is_err());
    }
}
