use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use noughts_protocol::{Board, Event, Position};

use super::state::{Effect, MatchOutcome, MatchPhase, MatchState, MoveRejected};
use crate::traits::{CommandSink, EventListener, GameLaunch, Presenter};

/// Called once with the outcome when the match ends.
pub type OnReturn = Box<dyn FnOnce(MatchOutcome) + Send>;

/// Event consumer for one match.
///
/// Attach it to the session as soon as it is built, finish screen setup, then
/// call [`mark_ready`](Self::mark_ready). Board and turn events that arrive in
/// between are held back and replayed at that point.
///
/// All calls are expected on the delivery context. The internal lock only
/// satisfies `Sync`; effects are run after it is released so a presenter may
/// swap listeners or call back into this session.
pub struct GameSession {
    state: Mutex<MatchState>,
    presenter: Arc<dyn Presenter>,
    commands: Arc<dyn CommandSink>,
    on_return: Mutex<Option<OnReturn>>,
}

impl GameSession {
    pub fn new<F>(
        launch: GameLaunch,
        presenter: Arc<dyn Presenter>,
        commands: Arc<dyn CommandSink>,
        on_return: F,
    ) -> Self
    where
        F: FnOnce(MatchOutcome) + Send + 'static,
    {
        tracing::info!(
            match_id = launch.match_id,
            symbol = %launch.symbol,
            opponent = %launch.opponent,
            "Opening game screen"
        );
        Self {
            state: Mutex::new(MatchState::new(launch)),
            presenter,
            commands,
            on_return: Mutex::new(Some(Box::new(on_return))),
        }
    }

    /// Screen setup finished. Takes effect once; later calls are ignored.
    pub fn mark_ready(&self) {
        let effects = self.state().mark_ready();
        self.run(effects);
    }

    /// Try to play at `position`.
    pub fn play(&self, position: Position) -> Result<(), MoveRejected> {
        let result = self.state().try_move(position);
        match result {
            Ok(effects) => {
                self.run(effects);
                Ok(())
            }
            Err(e) => {
                tracing::debug!("Move at {} rejected: {}", position, e);
                Err(e)
            }
        }
    }

    /// Leave the match. No-op if it already ended.
    pub fn leave(&self) {
        let effects = self.state().leave();
        self.run(effects);
    }

    pub fn phase(&self) -> MatchPhase {
        self.state().phase()
    }

    pub fn my_turn(&self) -> bool {
        self.state().my_turn()
    }

    pub fn board(&self) -> Board {
        *self.state().board()
    }

    pub fn unlocked_positions(&self) -> Vec<Position> {
        self.state().unlocked_positions()
    }

    pub fn launch(&self) -> GameLaunch {
        self.state().launch().clone()
    }

    fn state(&self) -> MutexGuard<'_, MatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Prompt(text) => self.presenter.show_prompt(&text),
                Effect::RenderBoard(board) => self.presenter.render_board(&board),
                Effect::CellEnabled(position, enabled) => {
                    self.presenter.set_cell_enabled(position, enabled)
                }
                Effect::BoardEnabled(enabled) => self.presenter.set_board_enabled(enabled),
                Effect::Message { title, body } => self.presenter.show_message(&title, &body),
                Effect::Send(command) => self.commands.send(command),
                Effect::Return(outcome) => {
                    let callback = self
                        .on_return
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .take();
                    match callback {
                        Some(callback) => callback(outcome),
                        None => tracing::warn!("Return callback already used"),
                    }
                }
            }
        }
    }
}

impl EventListener for GameSession {
    fn on_event(&self, event: Event) {
        let effects = self.state().handle(event);
        self.run(effects);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{PresenterCall, RecordingPresenter, RecordingSink};
    use noughts_protocol::{Command, DisconnectReason, Marker};

    struct Fixture {
        session: GameSession,
        presenter: Arc<RecordingPresenter>,
        sink: Arc<RecordingSink>,
        outcomes: Arc<Mutex<Vec<MatchOutcome>>>,
    }

    fn fixture() -> Fixture {
        let presenter = Arc::new(RecordingPresenter::new());
        let sink = Arc::new(RecordingSink::new());
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let recorded = outcomes.clone();
        let session = GameSession::new(
            GameLaunch {
                match_id: 1,
                symbol: Marker::O,
                opponent: "alice".into(),
            },
            presenter.clone(),
            sink.clone(),
            move |outcome| recorded.lock().unwrap().push(outcome),
        );
        Fixture {
            session,
            presenter,
            sink,
            outcomes,
        }
    }

    fn center() -> Position {
        Position::new(1, 1).unwrap()
    }

    #[test]
    fn nothing_reaches_presenter_before_ready() {
        let f = fixture();
        f.session.on_event(Event::BoardUpdated {
            board: Board::default(),
        });
        f.session.on_event(Event::TurnGranted);
        assert!(f.presenter.calls().is_empty());

        f.session.mark_ready();
        assert!(f.session.my_turn());
        assert_eq!(f.presenter.enabled_cells().len(), 9);
    }

    #[test]
    fn accepted_move_is_sent_once() {
        let f = fixture();
        f.session.mark_ready();
        f.session.on_event(Event::TurnGranted);

        assert!(f.session.play(center()).is_ok());
        assert_eq!(f.session.play(center()), Err(MoveRejected::NotYourTurn));

        assert_eq!(
            f.sink.commands(),
            vec![Command::MakeMove { position: center() }]
        );
        assert!(f.presenter.enabled_cells().is_empty());
    }

    #[test]
    fn visible_board_matches_update() {
        let f = fixture();
        f.session.mark_ready();
        let board = Board::from_tokens(&["X", "EMPTY", "O", "EMPTY", "X", "EMPTY", "EMPTY", "O", "EMPTY"])
            .unwrap();
        f.session.on_event(Event::BoardUpdated { board });

        assert_eq!(
            f.presenter.last_board().map(|b| b.labels()),
            Some(["X", "", "O", "", "X", "", "", "O", ""])
        );
    }

    #[test]
    fn return_callback_runs_once() {
        let f = fixture();
        f.session.mark_ready();
        f.session.on_event(Event::GameOver {
            result: "draw".into(),
        });
        f.session.on_event(Event::Disconnected {
            reason: DisconnectReason::EndOfStream,
        });
        f.session.leave();

        assert_eq!(
            *f.outcomes.lock().unwrap(),
            vec![MatchOutcome::GameOver("draw".into())]
        );
        assert!(f.sink.commands().is_empty());
        let messages = f
            .presenter
            .calls()
            .into_iter()
            .filter(|c| matches!(c, PresenterCall::Message { .. }))
            .count();
        assert_eq!(messages, 1);
    }

    #[test]
    fn leave_sends_quit_and_returns() {
        let f = fixture();
        f.session.mark_ready();
        f.session.leave();

        assert_eq!(f.sink.commands(), vec![Command::Quit]);
        assert_eq!(*f.outcomes.lock().unwrap(), vec![MatchOutcome::Left]);
        assert_eq!(f.session.phase(), MatchPhase::Terminated);
    }
}
