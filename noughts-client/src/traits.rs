//! Seams between the session layer and the rest of the application

use noughts_protocol::{Board, Command, Event, GameEntry, Marker, Position};

use crate::session::SessionHandle;

/// Receiver of decoded server events.
///
/// Called on the delivery context only, one event at a time. Implementors
/// handle the variants they care about and ignore the rest.
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: Event);
}

/// Outbound command path. Sending never fails from the caller's point of view.
pub trait CommandSink: Send + Sync {
    fn send(&self, command: Command);
}

/// Parameters for opening the game screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameLaunch {
    pub match_id: u32,
    pub symbol: Marker,
    pub opponent: String,
}

/// Presentation layer the core drives. It never renders anything itself.
pub trait Presenter: Send + Sync {
    fn show_prompt(&self, text: &str);

    fn set_cell_enabled(&self, position: Position, enabled: bool);

    fn set_board_enabled(&self, enabled: bool);

    fn render_board(&self, board: &Board);

    /// Modal notice.
    fn show_message(&self, title: &str, body: &str);

    fn show_games(&self, games: &[GameEntry]);

    /// Switch to the game screen. The callee builds the [`GameSession`](crate::GameSession)
    /// and attaches it to `session`.
    fn navigate_to_game(&self, session: SessionHandle, launch: GameLaunch);
}
