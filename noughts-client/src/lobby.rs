use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use noughts_protocol::{validate_name, Command, Event, Marker};

use crate::error::ClientResult;
use crate::session::SessionHandle;
use crate::traits::{EventListener, GameLaunch, Presenter};

/// Event consumer for the lobby screen.
///
/// Answers the name handshake, keeps the games list fresh, and hands off to
/// the game screen when the server confirms a match.
pub struct LobbySession {
    name: String,
    session: SessionHandle,
    presenter: Arc<dyn Presenter>,
    launched: Mutex<Option<u32>>,
    closed: AtomicBool,
}

impl LobbySession {
    /// Fails if `name` cannot be sent as a `NAME` line.
    pub fn new(
        name: &str,
        session: SessionHandle,
        presenter: Arc<dyn Presenter>,
    ) -> ClientResult<Self> {
        let name = validate_name(name)?;
        Ok(Self {
            name,
            session,
            presenter,
            launched: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once the session behind this lobby has been lost.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn refresh(&self) {
        self.session.send(Command::RequestList);
    }

    pub fn create_game(&self) {
        self.session.send(Command::CreateGame);
    }

    pub fn join_game(&self, id: u32) {
        self.session.send(Command::JoinGame { id });
    }

    /// Called again when the player comes back from a finished match.
    pub fn reenter(&self) {
        *self.launched.lock().unwrap_or_else(PoisonError::into_inner) = None;
        self.presenter.show_prompt("Back in the lobby");
        if self.session.is_active() {
            self.refresh();
        }
    }

    fn launch(&self, id: u32, symbol: Marker, opponent: String) {
        {
            let mut launched = self.launched.lock().unwrap_or_else(PoisonError::into_inner);
            if *launched == Some(id) {
                tracing::debug!(match_id = id, "Match already launched");
                return;
            }
            *launched = Some(id);
        }

        tracing::info!(match_id = id, "Match confirmed against {}", opponent);
        self.presenter.navigate_to_game(
            self.session.clone(),
            GameLaunch {
                match_id: id,
                symbol,
                opponent,
            },
        );
    }
}

impl EventListener for LobbySession {
    fn on_event(&self, event: Event) {
        match event {
            Event::ConnectionEstablished => {
                self.presenter
                    .show_prompt("Connected. Waiting for the server...");
            }
            Event::NameRequested => {
                self.session.send(Command::SetName {
                    name: self.name.clone(),
                });
            }
            Event::NameAccepted => {
                self.presenter
                    .show_prompt(&format!("Signed in as {}", self.name));
                self.refresh();
            }
            Event::GamesList { entries } => {
                self.presenter.show_games(&entries);
            }
            Event::GameCreated { id } => {
                self.presenter
                    .show_prompt(&format!("Created game {}. Waiting for an opponent...", id));
            }
            Event::JoinConfirmed {
                id,
                symbol,
                opponent,
            }
            | Event::GameStarted {
                id,
                symbol,
                opponent,
            } => self.launch(id, symbol, opponent),
            Event::ServerError { message } => {
                self.presenter.show_message("Server error", &message);
            }
            Event::Disconnected { reason } => {
                self.closed.store(true, Ordering::Release);
                self.presenter.show_message("Disconnected", &reason.to_string());
            }
            Event::Unrecognized { raw } => {
                tracing::warn!("Unrecognized server message: {:?}", raw);
            }
            other => tracing::debug!("Lobby ignoring {}", other.kind()),
        }
    }
}
