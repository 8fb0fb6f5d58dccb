//! Console event loop: session delivery, screen requests and stdin.

use std::sync::Arc;

use anyhow::Context;
use noughts_client::{GameSession, LobbySession, MatchPhase, Position, SessionHandle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::console::{ConsolePresenter, UiRequest};

const LOBBY_HELP: &str = "Commands: list | create | join <id> | help | quit";
const GAME_HELP: &str = "Commands: <row> <col> | leave | help | quit";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    List,
    Create,
    Join(u32),
    Move(Position),
    Leave,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("unknown command {0:?}, type `help`")]
    Unknown(String),
    #[error("`join` needs a numeric game id")]
    MissingId,
    #[error("invalid move: {0}")]
    BadMove(String),
}

/// Parse a line typed at the prompt. Blank lines yield `None`.
pub fn parse_input(line: &str) -> Result<Option<Input>, InputError> {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Ok(None);
    };

    let input = match first.to_ascii_lowercase().as_str() {
        "list" | "ls" => Input::List,
        "create" | "new" => Input::Create,
        "join" => {
            let id = words
                .next()
                .and_then(|id| id.parse().ok())
                .ok_or(InputError::MissingId)?;
            Input::Join(id)
        }
        "leave" => Input::Leave,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        row if row.chars().all(|c| c.is_ascii_digit()) => {
            let col = words
                .next()
                .ok_or_else(|| InputError::BadMove("expected `<row> <col>`".into()))?;
            let row: u8 = row
                .parse()
                .map_err(|_| InputError::BadMove(format!("bad row {:?}", row)))?;
            let col: u8 = col
                .parse()
                .map_err(|_| InputError::BadMove(format!("bad column {:?}", col)))?;
            let position =
                Position::new(row, col).map_err(|e| InputError::BadMove(e.to_string()))?;
            Input::Move(position)
        }
        _ => return Err(InputError::Unknown(first.to_string())),
    };
    Ok(Some(input))
}

enum Flow {
    Continue,
    Quit,
}

struct Screens {
    session: SessionHandle,
    lobby: Arc<LobbySession>,
    game: Option<Arc<GameSession>>,
}

impl Screens {
    fn open_game(&mut self, game: Arc<GameSession>) {
        // The listener is already attached; finishing setup replays anything
        // that arrived in between.
        println!("{}", GAME_HELP);
        game.mark_ready();
        self.game = Some(game);
    }

    fn return_to_lobby(&mut self) {
        self.game = None;
        self.session.set_listener(&self.lobby);
        self.lobby.reenter();
    }

    fn handle_input(&mut self, input: Input) -> Flow {
        match (input, &self.game) {
            (Input::Quit, game) => {
                if let Some(game) = game {
                    if game.phase() != MatchPhase::Terminated {
                        game.leave();
                    }
                }
                return Flow::Quit;
            }
            (Input::Help, Some(_)) => println!("{}", GAME_HELP),
            (Input::Help, None) => println!("{}", LOBBY_HELP),
            (Input::Move(position), Some(game)) => {
                if let Err(e) = game.play(position) {
                    println!("{}", e);
                }
            }
            (Input::Leave, Some(game)) => game.leave(),
            (Input::List, None) => self.lobby.refresh(),
            (Input::Create, None) => self.lobby.create_game(),
            (Input::Join(id), None) => self.lobby.join_game(id),
            (Input::Move(_) | Input::Leave, None) => println!("Not in a game. {}", LOBBY_HELP),
            (Input::List | Input::Create | Input::Join(_), Some(_)) => {
                println!("Finish or leave the current game first.")
            }
        }
        Flow::Continue
    }
}

/// Connect, sign in, and drive the console until the user quits or the
/// connection is lost.
pub async fn run(config: Config) -> anyhow::Result<()> {
    println!("Connecting to {} as {}...", config.server_addr, config.player_name);
    let (session, mut dispatcher) = SessionHandle::connect(&config.server_addr)
        .await
        .with_context(|| format!("could not reach {}", config.server_addr))?;

    let (requests_tx, mut requests) = mpsc::unbounded_channel();
    let presenter = ConsolePresenter::new(requests_tx);
    let lobby = Arc::new(LobbySession::new(
        &config.player_name,
        session.clone(),
        Arc::new(presenter.clone()),
    )?);
    session.set_listener(&lobby);
    println!("{}", LOBBY_HELP);

    let mut screens = Screens {
        session: session.clone(),
        lobby,
        game: None,
    };
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            biased;

            delivered = dispatcher.dispatch_next() => {
                if !delivered {
                    tracing::info!("Session ended");
                    break;
                }
            }
            Some(request) = requests.recv() => match request {
                UiRequest::GameOpened(game) => screens.open_game(game),
                UiRequest::ReturnToLobby(outcome) => {
                    tracing::info!(?outcome, "Match finished");
                    screens.return_to_lobby();
                }
            },
            line = stdin.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match parse_input(&line) {
                    Ok(Some(input)) => {
                        if let Flow::Quit = screens.handle_input(input) {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{}", e),
                }
            }
        }
    }

    // Flush delivery for anything already queued so the screens settle.
    dispatcher.try_dispatch();
    session.close();
    println!("Bye.");
    Ok(())
}
