use noughts_protocol::{Board, Command, DisconnectReason, Event, Position};

use super::pending::PendingEventCache;
use crate::traits::GameLaunch;

/// Lifecycle of one match as seen by its screen.
///
/// `Initializing` until the screen signals readiness, `Ready` while the match
/// is live, `Terminated` for good once any terminal cause lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Initializing,
    Ready,
    Terminated,
}

/// Why a match ended. Handed to the screen's return callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    GameOver(String),
    OpponentLeft,
    Disconnected(DisconnectReason),
    /// The local player quit.
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MoveRejected {
    #[error("the match is not active")]
    NotActive,
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("cell {0} is already taken")]
    Occupied(Position),
}

/// Side effect requested by the state machine, executed by the owner once the
/// state lock is released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Prompt(String),
    RenderBoard(Board),
    CellEnabled(Position, bool),
    BoardEnabled(bool),
    Message { title: String, body: String },
    Send(Command),
    Return(MatchOutcome),
}

/// Per-match state machine. Pure: every input returns the effects to run.
#[derive(Debug)]
pub struct MatchState {
    launch: GameLaunch,
    phase: MatchPhase,
    my_turn: bool,
    board: Board,
    unlocked: [bool; Board::CELLS],
    pending: PendingEventCache,
}

impl MatchState {
    pub fn new(launch: GameLaunch) -> Self {
        Self {
            launch,
            phase: MatchPhase::Initializing,
            my_turn: false,
            board: Board::default(),
            unlocked: [false; Board::CELLS],
            pending: PendingEventCache::default(),
        }
    }

    pub fn launch(&self) -> &GameLaunch {
        &self.launch
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn is_setup_complete(&self) -> bool {
        self.phase != MatchPhase::Initializing
    }

    pub fn is_active(&self) -> bool {
        self.phase == MatchPhase::Ready
    }

    pub fn my_turn(&self) -> bool {
        self.my_turn
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn unlocked_positions(&self) -> Vec<Position> {
        Position::all()
            .filter(|pos| self.unlocked[pos.index()])
            .collect()
    }

    /// `Initializing -> Ready`, then replay whatever was cached: board first,
    /// then the turn grant, then any deferred terminal cause.
    pub fn mark_ready(&mut self) -> Vec<Effect> {
        if self.phase != MatchPhase::Initializing {
            tracing::debug!("mark_ready ignored in phase {:?}", self.phase);
            return Vec::new();
        }
        self.phase = MatchPhase::Ready;
        tracing::info!(match_id = self.launch.match_id, "Game screen ready");

        let mut effects = vec![
            Effect::RenderBoard(self.board),
            Effect::Prompt(format!(
                "Playing {} against {}. Waiting for opponent...",
                self.launch.symbol, self.launch.opponent
            )),
        ];
        self.sync_cells(&mut effects);

        let drained = self.pending.drain();
        if let Some(board) = drained.board {
            self.apply_board(board, &mut effects);
        }
        if drained.turn_granted {
            self.apply_turn(&mut effects);
        }
        if let Some(cause) = drained.terminal {
            self.terminate(cause, &mut effects);
        }
        effects
    }

    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        let mut effects = Vec::new();
        match self.phase {
            MatchPhase::Initializing => self.handle_initializing(event, &mut effects),
            MatchPhase::Ready => self.handle_ready(event, &mut effects),
            MatchPhase::Terminated => self.handle_terminated(event),
        }
        effects
    }

    /// Local move attempt. Releases the turn immediately so a second attempt
    /// before the server answers is rejected.
    pub fn try_move(&mut self, position: Position) -> Result<Vec<Effect>, MoveRejected> {
        if self.phase != MatchPhase::Ready {
            return Err(MoveRejected::NotActive);
        }
        if !self.my_turn {
            return Err(MoveRejected::NotYourTurn);
        }
        if !self.board.is_empty_at(position) {
            return Err(MoveRejected::Occupied(position));
        }

        self.my_turn = false;
        let mut effects = Vec::new();
        self.sync_cells(&mut effects);
        effects.push(Effect::Prompt("Waiting for opponent...".to_string()));
        effects.push(Effect::Send(Command::MakeMove { position }));
        Ok(effects)
    }

    /// The local player leaves the match.
    pub fn leave(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        self.terminate(MatchOutcome::Left, &mut effects);
        effects
    }

    fn handle_initializing(&mut self, event: Event, effects: &mut Vec<Effect>) {
        match event {
            Event::BoardUpdated { board } => self.pending.stash_board(board),
            Event::TurnGranted => self.pending.stash_turn(),
            Event::GameOver { result } => self.defer_terminal(MatchOutcome::GameOver(result)),
            Event::OpponentLeft => self.defer_terminal(MatchOutcome::OpponentLeft),
            Event::Disconnected { reason } => {
                self.defer_terminal(MatchOutcome::Disconnected(reason))
            }
            Event::ServerError { message } => effects.push(Effect::Message {
                title: "Server error".to_string(),
                body: message,
            }),
            Event::GameStarted { id, .. } | Event::JoinConfirmed { id, .. } => {
                self.note_duplicate_start(id)
            }
            other => tracing::debug!("Unexpected {} while game screen loads", other.kind()),
        }
    }

    fn handle_ready(&mut self, event: Event, effects: &mut Vec<Effect>) {
        match event {
            Event::BoardUpdated { board } => self.apply_board(board, effects),
            Event::TurnGranted => self.apply_turn(effects),
            Event::GameOver { result } => self.terminate(MatchOutcome::GameOver(result), effects),
            Event::OpponentLeft => self.terminate(MatchOutcome::OpponentLeft, effects),
            Event::Disconnected { reason } => {
                self.terminate(MatchOutcome::Disconnected(reason), effects)
            }
            Event::ServerError { message } => self.recover(message, effects),
            Event::GameStarted { id, .. } | Event::JoinConfirmed { id, .. } => {
                self.note_duplicate_start(id)
            }
            other => tracing::debug!("Ignoring {} during match", other.kind()),
        }
    }

    fn handle_terminated(&self, event: Event) {
        match event {
            Event::GameStarted { id, .. } if id == self.launch.match_id => {
                tracing::info!(match_id = id, "Ignoring start notice for finished match")
            }
            Event::GameOver { .. } | Event::OpponentLeft | Event::Disconnected { .. } => {
                tracing::debug!("Match already over, dropping {}", event.kind())
            }
            other => tracing::debug!("Match over, ignoring {}", other.kind()),
        }
    }

    fn defer_terminal(&mut self, cause: MatchOutcome) {
        tracing::debug!("Deferring {:?} until the game screen is ready", cause);
        if !self.pending.stash_terminal(cause) {
            tracing::debug!("Terminal cause already pending, dropping");
        }
    }

    fn note_duplicate_start(&self, id: u32) {
        if id == self.launch.match_id {
            tracing::debug!(match_id = id, "Duplicate start notice");
        } else {
            tracing::warn!(
                match_id = self.launch.match_id,
                other = id,
                "Start notice for a different match"
            );
        }
    }

    fn apply_board(&mut self, board: Board, effects: &mut Vec<Effect>) {
        self.board = board;
        effects.push(Effect::RenderBoard(board));
        self.sync_cells(effects);
    }

    fn apply_turn(&mut self, effects: &mut Vec<Effect>) {
        self.my_turn = true;
        self.sync_cells(effects);
        effects.push(Effect::Prompt(format!(
            "Your turn ({})",
            self.launch.symbol
        )));
    }

    /// Pattern-based recovery for the two errors the server sends about moves.
    fn recover(&mut self, message: String, effects: &mut Vec<Effect>) {
        let lower = message.to_lowercase();
        if lower.contains("turn") {
            self.my_turn = false;
            self.sync_cells(effects);
            effects.push(Effect::Prompt(message));
        } else if lower.contains("invalid move") {
            self.my_turn = true;
            self.sync_cells(effects);
            effects.push(Effect::Prompt(format!("{}. Try again.", message)));
        } else {
            effects.push(Effect::Message {
                title: "Server error".to_string(),
                body: message,
            });
        }
    }

    /// First terminal cause wins; later ones are logged and dropped.
    fn terminate(&mut self, cause: MatchOutcome, effects: &mut Vec<Effect>) {
        if self.phase == MatchPhase::Terminated {
            tracing::debug!("Match already over, ignoring {:?}", cause);
            return;
        }
        self.phase = MatchPhase::Terminated;
        self.my_turn = false;
        tracing::info!(match_id = self.launch.match_id, "Match ended: {:?}", cause);

        self.sync_cells(effects);
        match &cause {
            MatchOutcome::GameOver(result) => effects.push(Effect::Message {
                title: "Game over".to_string(),
                body: result.clone(),
            }),
            MatchOutcome::OpponentLeft => effects.push(Effect::Message {
                title: "Opponent left".to_string(),
                body: format!("{} left the game", self.launch.opponent),
            }),
            MatchOutcome::Disconnected(reason) => effects.push(Effect::Message {
                title: "Disconnected".to_string(),
                body: reason.to_string(),
            }),
            MatchOutcome::Left => effects.push(Effect::Send(Command::Quit)),
        }
        effects.push(Effect::Return(cause));
    }

    /// Unlock exactly the empty cells when it is our turn, nothing otherwise.
    fn sync_cells(&mut self, effects: &mut Vec<Effect>) {
        let usable = self.my_turn && self.phase == MatchPhase::Ready;
        effects.push(Effect::BoardEnabled(usable));
        for pos in Position::all() {
            let unlocked = usable && self.board.is_empty_at(pos);
            self.unlocked[pos.index()] = unlocked;
            effects.push(Effect::CellEnabled(pos, unlocked));
        }
    }
}
