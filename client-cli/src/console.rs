//! Line-oriented presenter that prints to stdout.

use std::fmt::Write as _;
use std::sync::{Arc, Mutex, PoisonError};

use noughts_client::{
    Board, GameEntry, GameLaunch, GameSession, MatchOutcome, Position, Presenter, SessionHandle,
};
use tokio::sync::mpsc::UnboundedSender;

/// Requests from the presenter back to the input loop.
pub enum UiRequest {
    /// A game screen was created and attached; finish setup and mark it ready.
    GameOpened(Arc<GameSession>),
    /// The match ended; go back to the lobby.
    ReturnToLobby(MatchOutcome),
}

const MOVE_HINT: &str = "Enter a move as `<row> <col>` (0-2).";

#[derive(Clone)]
pub struct ConsolePresenter {
    inner: Arc<Inner>,
}

struct Inner {
    requests: UnboundedSender<UiRequest>,
    board_enabled: Mutex<bool>,
}

impl ConsolePresenter {
    pub fn new(requests: UnboundedSender<UiRequest>) -> Self {
        Self {
            inner: Arc::new(Inner {
                requests,
                board_enabled: Mutex::new(false),
            }),
        }
    }

    /// Record the board state; true only when it goes from locked to unlocked.
    fn board_unlocked(&self, enabled: bool) -> bool {
        let mut current = self
            .inner
            .board_enabled
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let unlocked = enabled && !*current;
        *current = enabled;
        unlocked
    }
}

/// Render the games list as printable lines.
pub fn format_games(games: &[GameEntry]) -> String {
    if games.is_empty() {
        return "No open games. Type `create` to start one.".to_string();
    }
    let mut out = String::from("Open games:");
    for game in games {
        let _ = write!(out, "\n  #{:<4} {}", game.id, game.creator);
    }
    out
}

impl Presenter for ConsolePresenter {
    fn show_prompt(&self, text: &str) {
        println!("> {}", text);
    }

    fn set_cell_enabled(&self, position: Position, enabled: bool) {
        tracing::trace!(%position, enabled, "Cell state");
    }

    fn set_board_enabled(&self, enabled: bool) {
        if self.board_unlocked(enabled) {
            println!("{}", MOVE_HINT);
        }
    }

    fn render_board(&self, board: &Board) {
        println!("{}", board);
    }

    fn show_message(&self, title: &str, body: &str) {
        println!("[{}] {}", title, body);
    }

    fn show_games(&self, games: &[GameEntry]) {
        println!("{}", format_games(games));
    }

    fn navigate_to_game(&self, session: SessionHandle, launch: GameLaunch) {
        println!(
            "Match #{} against {}. You play {}.",
            launch.match_id, launch.opponent, launch.symbol
        );

        let requests = self.inner.requests.clone();
        let game = Arc::new(GameSession::new(
            launch,
            Arc::new(self.clone()),
            Arc::new(session.clone()),
            move |outcome| {
                let _ = requests.send(UiRequest::ReturnToLobby(outcome));
            },
        ));
        // Attach now so nothing sent before setup completes is lost.
        session.set_listener(&game);

        if self.inner.requests.send(UiRequest::GameOpened(game)).is_err() {
            tracing::warn!("Input loop gone; game screen not opened");
        }
    }
}
