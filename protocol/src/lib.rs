//! Wire protocol for the noughts game server.
//!
//! The server speaks newline-delimited text. Every inbound line maps to exactly
//! one [`Event`] through [`decode`], and every [`Command`] maps to exactly one
//! outbound line through [`encode`]. This crate does no I/O.

pub mod codec;
pub mod types;

pub use codec::{decode, encode, validate_name, Command, DisconnectReason, Event, GameEntry};
pub use types::{Board, Cell, Marker, Position};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid integer in {field}: {value:?}")]
    InvalidInteger { field: &'static str, value: String },
    #[error("board update needs 9 cells, got {0}")]
    CellCount(usize),
    #[error("unknown cell token: {0:?}")]
    UnknownCell(String),
    #[error("unknown symbol: {0:?}")]
    UnknownSymbol(String),
    #[error("{message} needs at least {expected} fields, got {actual}")]
    MissingFields {
        message: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("position ({row}, {col}) is off the board")]
    OutOfRange { row: u8, col: u8 },
    #[error("invalid player name: {0:?}")]
    InvalidName(String),
}
