//! Board, cell and position types shared by the codec and the client.

use std::fmt;

use crate::ProtocolError;

/// Number of rows and columns on the board.
pub const SIDE: u8 = 3;

/// A player's mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    X,
    O,
}

impl Marker {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::O => "O",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "X" | "x" => Some(Self::X),
            "O" | "o" => Some(Self::O),
            _ => None,
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Marked(Marker),
}

impl Cell {
    /// Wire token for an unmarked cell.
    pub const EMPTY_TOKEN: &'static str = "EMPTY";

    pub fn from_token(token: &str) -> Result<Self, ProtocolError> {
        if token == Self::EMPTY_TOKEN {
            return Ok(Self::Empty);
        }
        Marker::from_token(token)
            .map(Self::Marked)
            .ok_or_else(|| ProtocolError::UnknownCell(token.to_string()))
    }

    pub fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Text shown for this cell on screen: blank when empty, the marker otherwise.
    pub fn label(self) -> &'static str {
        match self {
            Self::Empty => "",
            Self::Marked(marker) => marker.as_str(),
        }
    }
}

/// A cell coordinate, always on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    row: u8,
    col: u8,
}

impl Position {
    pub fn new(row: u8, col: u8) -> Result<Self, ProtocolError> {
        if row >= SIDE || col >= SIDE {
            return Err(ProtocolError::OutOfRange { row, col });
        }
        Ok(Self { row, col })
    }

    pub fn from_index(index: usize) -> Option<Self> {
        if index >= Board::CELLS {
            return None;
        }
        let side = SIDE as usize;
        Some(Self {
            row: (index / side) as u8,
            col: (index % side) as u8,
        })
    }

    pub fn row(self) -> u8 {
        self.row
    }

    pub fn col(self) -> u8 {
        self.col
    }

    pub fn index(self) -> usize {
        self.row as usize * SIDE as usize + self.col as usize
    }

    /// All nine positions in row-major order.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..Board::CELLS).filter_map(Position::from_index)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// A full 3x3 snapshot, stored row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Board {
    cells: [Cell; Board::CELLS],
}

impl Board {
    pub const CELLS: usize = 9;

    pub fn new(cells: [Cell; Board::CELLS]) -> Self {
        Self { cells }
    }

    /// Parse the nine cell tokens of a `NOTIFY:BOARD` line.
    pub fn from_tokens(tokens: &[&str]) -> Result<Self, ProtocolError> {
        if tokens.len() != Self::CELLS {
            return Err(ProtocolError::CellCount(tokens.len()));
        }
        let mut cells = [Cell::Empty; Self::CELLS];
        for (cell, token) in cells.iter_mut().zip(tokens) {
            *cell = Cell::from_token(token)?;
        }
        Ok(Self { cells })
    }

    pub fn cells(&self) -> &[Cell; Board::CELLS] {
        &self.cells
    }

    pub fn get(&self, pos: Position) -> Cell {
        self.cells[pos.index()]
    }

    pub fn is_empty_at(&self, pos: Position) -> bool {
        self.get(pos).is_empty()
    }

    pub fn empty_positions(&self) -> impl Iterator<Item = Position> + '_ {
        Position::all().filter(move |pos| self.is_empty_at(*pos))
    }

    /// On-screen labels for each cell in row-major order.
    pub fn labels(&self) -> [&'static str; Board::CELLS] {
        self.cells.map(Cell::label)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..SIDE as usize {
            if row > 0 {
                writeln!(f, "---+---+---")?;
            }
            let start = row * SIDE as usize;
            let line: Vec<String> = self.cells[start..start + SIDE as usize]
                .iter()
                .map(|cell| match cell {
                    Cell::Empty => "   ".to_string(),
                    Cell::Marked(m) => format!(" {} ", m),
                })
                .collect();
            writeln!(f, "{}", line.join("|"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_rejects_off_board() {
        assert!(Position::new(2, 2).is_ok());
        assert_eq!(
            Position::new(3, 0),
            Err(ProtocolError::OutOfRange { row: 3, col: 0 })
        );
        assert!(Position::new(0, 3).is_err());
    }

    #[test]
    fn position_index_is_row_major() {
        let pos = Position::new(1, 2).unwrap();
        assert_eq!(pos.index(), 5);
        assert_eq!(Position::from_index(5), Some(pos));
        assert_eq!(Position::from_index(9), None);
        assert_eq!(Position::all().count(), 9);
    }

    #[test]
    fn board_from_tokens_requires_nine() {
        let err = Board::from_tokens(&["EMPTY"; 8]).unwrap_err();
        assert_eq!(err, ProtocolError::CellCount(8));
    }

    #[test]
    fn board_rejects_unknown_cell() {
        let mut tokens = ["EMPTY"; 9];
        tokens[4] = "Z";
        assert_eq!(
            Board::from_tokens(&tokens),
            Err(ProtocolError::UnknownCell("Z".into()))
        );
    }

    #[test]
    fn empty_positions_skip_marked_cells() {
        let board =
            Board::from_tokens(&["X", "EMPTY", "O", "EMPTY", "X", "EMPTY", "EMPTY", "O", "X"])
                .unwrap();
        let empty: Vec<usize> = board.empty_positions().map(Position::index).collect();
        assert_eq!(empty, vec![1, 3, 5, 6]);
    }

    #[test]
    fn display_draws_grid() {
        let board = Board::default();
        let rendered = board.to_string();
        assert_eq!(rendered.lines().count(), 5);
    }
}
