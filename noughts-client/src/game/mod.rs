//! The game screen's consumer: per-match state machine plus the cache that
//! covers the window between the screen existing and the screen being ready.

mod pending;
mod session;
mod state;

pub use pending::{Drained, PendingEventCache};
pub use session::{GameSession, OnReturn};
pub use state::{Effect, MatchOutcome, MatchPhase, MatchState, MoveRejected};
