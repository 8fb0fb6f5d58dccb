//! Recording collaborators for testing - only compiled in test mode or with mock feature

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use noughts_protocol::{Board, Command, GameEntry, Position};

use crate::session::SessionHandle;
use crate::traits::{CommandSink, GameLaunch, Presenter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenterCall {
    Prompt(String),
    CellEnabled(Position, bool),
    BoardEnabled(bool),
    RenderBoard(Board),
    Message { title: String, body: String },
    Games(Vec<GameEntry>),
    NavigateToGame(GameLaunch),
}

/// Presenter that records every call it receives.
#[derive(Default)]
pub struct RecordingPresenter {
    calls: Arc<Mutex<Vec<PresenterCall>>>,
    enabled: Arc<Mutex<BTreeSet<usize>>>,
    sessions: Arc<Mutex<Vec<SessionHandle>>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<PresenterCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Cells currently enabled, in row-major order.
    pub fn enabled_cells(&self) -> Vec<Position> {
        self.enabled
            .lock()
            .unwrap()
            .iter()
            .filter_map(|index| Position::from_index(*index))
            .collect()
    }

    pub fn last_board(&self) -> Option<Board> {
        self.calls().into_iter().rev().find_map(|call| match call {
            PresenterCall::RenderBoard(board) => Some(board),
            _ => None,
        })
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.calls().into_iter().rev().find_map(|call| match call {
            PresenterCall::Prompt(text) => Some(text),
            _ => None,
        })
    }

    pub fn navigations(&self) -> Vec<GameLaunch> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PresenterCall::NavigateToGame(launch) => Some(launch),
                _ => None,
            })
            .collect()
    }

    /// Session handles passed to `navigate_to_game`.
    pub fn navigated_sessions(&self) -> Vec<SessionHandle> {
        self.sessions.lock().unwrap().clone()
    }

    fn record(&self, call: PresenterCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Presenter for RecordingPresenter {
    fn show_prompt(&self, text: &str) {
        self.record(PresenterCall::Prompt(text.to_string()));
    }

    fn set_cell_enabled(&self, position: Position, enabled: bool) {
        let mut cells = self.enabled.lock().unwrap();
        if enabled {
            cells.insert(position.index());
        } else {
            cells.remove(&position.index());
        }
        drop(cells);
        self.record(PresenterCall::CellEnabled(position, enabled));
    }

    fn set_board_enabled(&self, enabled: bool) {
        self.record(PresenterCall::BoardEnabled(enabled));
    }

    fn render_board(&self, board: &Board) {
        self.record(PresenterCall::RenderBoard(*board));
    }

    fn show_message(&self, title: &str, body: &str) {
        self.record(PresenterCall::Message {
            title: title.to_string(),
            body: body.to_string(),
        });
    }

    fn show_games(&self, games: &[GameEntry]) {
        self.record(PresenterCall::Games(games.to_vec()));
    }

    fn navigate_to_game(&self, session: SessionHandle, launch: GameLaunch) {
        self.sessions.lock().unwrap().push(session);
        self.record(PresenterCall::NavigateToGame(launch));
    }
}

/// Command sink that records instead of sending.
#[derive(Default)]
pub struct RecordingSink {
    commands: Arc<Mutex<Vec<Command>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }
}

impl CommandSink for RecordingSink {
    fn send(&self, command: Command) {
        tracing::debug!("Recorded {:?}", command);
        self.commands.lock().unwrap().push(command);
    }
}
