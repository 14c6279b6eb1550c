//! Tic-tac-toe console client.
//!
//! # Usage
//!
//! ```bash
//! # Connect to a local server
//! tictactoe 127.0.0.1 10000
//!
//! # Verbose logging on stderr
//! RUST_LOG=tictactoe_network=debug tictactoe game.example.org 10000
//! ```
//!
//! Missing or invalid arguments print the usage and exit with status 0.

mod console;
mod input;

use clap::{CommandFactory, Parser};
use std::io::Write;
use std::ops::ControlFlow;
use std::process::ExitCode;
use std::time::Duration;
use tictactoe_core::constants::DEFAULT_CONNECT_TIMEOUT_MS;
use tictactoe_network::{ClientConfig, FatalReason, SendOutcome, Session, SessionConfig, dispatch};
use tictactoe_protocol::Command;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::console::ConsoleUi;
use crate::input::{UserInput, parse_input};

/// Tic-tac-toe console client
#[derive(Parser, Debug)]
#[command(name = "tictactoe")]
#[command(about = "Console client for the tic-tac-toe game server")]
#[command(version)]
struct Args {
    /// Server host name or IP address
    address: String,

    /// Server TCP port
    port: u16,

    /// Connection timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_MS)]
    connect_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            client: ClientConfig {
                connect_timeout: Duration::from_millis(self.connect_timeout_ms),
                ..ClientConfig::new(self.address.clone(), self.port)
            },
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
    };

    let config = args.session_config();
    if let Err(e) = config.client.validate() {
        eprintln!("{e}");
        eprintln!("{}", Args::command().render_usage());
        return ExitCode::SUCCESS;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    tracing::info!("Tic-tac-toe client {} starting", tictactoe_core::VERSION);

    match run(config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Client failed: {:#}", e);
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: SessionConfig) -> anyhow::Result<ExitCode> {
    let mut ui = ConsoleUi::new(std::io::stdout());

    let (mut session, mut events) = match Session::connect(&config).await {
        Ok(started) => started,
        Err(e) => {
            ui.say(format!("Cannot connect to the server: {e}"));
            return Ok(ExitCode::FAILURE);
        }
    };
    ui.say(format!(
        "Connected to {}. Type 'login <name>' to start, 'help' for commands.",
        session.peer()
    ));

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    let code = loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    if let Some(reason) = dispatch(&mut ui, event) {
                        break exit_code(&reason);
                    }
                }
                None => break ExitCode::FAILURE,
            },
            line = stdin.next_line() => match line? {
                Some(line) => {
                    if handle_input(&mut session, &mut ui, &line).await.is_break() {
                        break ExitCode::SUCCESS;
                    }
                }
                None => {
                    session.send(Command::Exit).await;
                    break ExitCode::SUCCESS;
                }
            },
        }
    };

    tracing::info!(uptime_secs = session.uptime().num_seconds(), "Leaving");
    session.shutdown().await;
    Ok(code)
}

async fn handle_input<W: Write>(
    session: &mut Session,
    ui: &mut ConsoleUi<W>,
    line: &str,
) -> ControlFlow<()> {
    match parse_input(line) {
        Ok(UserInput::Nothing) => {}
        Ok(UserInput::Help) => ui.show_help(),
        Ok(UserInput::Login(name)) => match session.login(&name).await {
            Ok(outcome) => report(ui, outcome),
            Err(e) => ui.say(e),
        },
        Ok(UserInput::Send(command)) => {
            let outcome = session.send(command).await;
            report(ui, outcome);
        }
        Ok(UserInput::Quit) => {
            session.send(Command::Exit).await;
            return ControlFlow::Break(());
        }
        Err(message) => ui.say(message),
    }
    ControlFlow::Continue(())
}

fn report<W: Write>(ui: &mut ConsoleUi<W>, outcome: SendOutcome) {
    match outcome {
        SendOutcome::Sent => {}
        SendOutcome::Suppressed => ui.say("Not sent: waiting for the connection to recover."),
        SendOutcome::Degraded => ui.say("Not sent: the connection is having problems."),
    }
}

fn exit_code(reason: &FatalReason) -> ExitCode {
    if reason.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
