//! Events held back until a game screen finishes its setup.

use noughts_protocol::Board;

use super::state::MatchOutcome;

/// Buffer for events that arrive before the consumer is ready.
///
/// Lossy by construction: board snapshots replace one another, so only the
/// latest is kept; turn grants are idempotent, so any number collapse into
/// one. The first terminal cause is kept and later ones are dropped.
#[derive(Debug, Default)]
pub struct PendingEventCache {
    board: Option<Board>,
    turn_granted: bool,
    terminal: Option<MatchOutcome>,
}

/// What a drain hands back, applied in field order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Drained {
    pub board: Option<Board>,
    pub turn_granted: bool,
    pub terminal: Option<MatchOutcome>,
}

impl PendingEventCache {
    pub fn stash_board(&mut self, board: Board) {
        if self.board.replace(board).is_some() {
            tracing::trace!("Replaced uncollected board snapshot");
        }
    }

    pub fn stash_turn(&mut self) {
        self.turn_granted = true;
    }

    /// Returns false if a terminal cause was already held.
    pub fn stash_terminal(&mut self, cause: MatchOutcome) -> bool {
        if self.terminal.is_some() {
            return false;
        }
        self.terminal = Some(cause);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.board.is_none() && !self.turn_granted && self.terminal.is_none()
    }

    /// Empty the cache.
    pub fn drain(&mut self) -> Drained {
        Drained {
            board: self.board.take(),
            turn_granted: std::mem::take(&mut self.turn_granted),
            terminal: self.terminal.take(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noughts_protocol::{Cell, Marker};

    fn board_with_center(marker: Marker) -> Board {
        let mut cells = [Cell::Empty; Board::CELLS];
        cells[4] = Cell::Marked(marker);
        Board::new(cells)
    }

    #[test]
    fn latest_board_wins() {
        let mut cache = PendingEventCache::default();
        cache.stash_board(board_with_center(Marker::X));
        cache.stash_board(board_with_center(Marker::O));

        assert_eq!(cache.drain().board, Some(board_with_center(Marker::O)));
    }

    #[test]
    fn turn_grants_coalesce() {
        let mut cache = PendingEventCache::default();
        cache.stash_turn();
        cache.stash_turn();
        let drained = cache.drain();
        assert!(drained.turn_granted);
        assert!(cache.is_empty());
    }

    #[test]
    fn first_terminal_cause_kept() {
        let mut cache = PendingEventCache::default();
        assert!(cache.stash_terminal(MatchOutcome::OpponentLeft));
        assert!(!cache.stash_terminal(MatchOutcome::GameOver("draw".into())));
        assert_eq!(cache.drain().terminal, Some(MatchOutcome::OpponentLeft));
    }

    #[test]
    fn drain_empties_cache() {
        let mut cache = PendingEventCache::default();
        cache.stash_board(Board::default());
        cache.stash_turn();
        assert!(!cache.is_empty());

        let first = cache.drain();
        assert!(first.board.is_some());
        assert_eq!(cache.drain(), Drained::default());
    }
}
