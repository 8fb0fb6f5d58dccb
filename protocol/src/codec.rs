use std::fmt;

use crate::types::{Board, Marker, Position};
use crate::ProtocolError;

/// Why a session ended without the client asking for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The server closed the stream.
    EndOfStream,
    /// The server announced `NOTIFY:SERVER_SHUTDOWN`.
    ServerShutdown,
    /// Reading or writing the stream failed.
    Io(String),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndOfStream => f.write_str("server closed the connection"),
            Self::ServerShutdown => f.write_str("server is shutting down"),
            Self::Io(e) => write!(f, "connection error: {}", e),
        }
    }
}

/// One open game advertised by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEntry {
    pub id: u32,
    pub creator: String,
}

/// Decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ConnectionEstablished,
    Disconnected {
        reason: DisconnectReason,
    },
    NameRequested,
    NameAccepted,
    GamesList {
        entries: Vec<GameEntry>,
    },
    GameCreated {
        id: u32,
    },
    JoinConfirmed {
        id: u32,
        symbol: Marker,
        opponent: String,
    },
    GameStarted {
        id: u32,
        symbol: Marker,
        opponent: String,
    },
    BoardUpdated {
        board: Board,
    },
    TurnGranted,
    GameOver {
        result: String,
    },
    OpponentLeft,
    ServerError {
        message: String,
    },
    Unrecognized {
        raw: String,
    },
}

impl Event {
    /// Short variant name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionEstablished => "ConnectionEstablished",
            Self::Disconnected { .. } => "Disconnected",
            Self::NameRequested => "NameRequested",
            Self::NameAccepted => "NameAccepted",
            Self::GamesList { .. } => "GamesList",
            Self::GameCreated { .. } => "GameCreated",
            Self::JoinConfirmed { .. } => "JoinConfirmed",
            Self::GameStarted { .. } => "GameStarted",
            Self::BoardUpdated { .. } => "BoardUpdated",
            Self::TurnGranted => "TurnGranted",
            Self::GameOver { .. } => "GameOver",
            Self::OpponentLeft => "OpponentLeft",
            Self::ServerError { .. } => "ServerError",
            Self::Unrecognized { .. } => "Unrecognized",
        }
    }
}

/// Outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetName { name: String },
    RequestList,
    CreateGame,
    JoinGame { id: u32 },
    MakeMove { position: Position },
    Quit,
}

impl Command {
    /// Build a `NAME` command, rejecting names that would break line framing.
    pub fn set_name(name: &str) -> Result<Self, ProtocolError> {
        Ok(Self::SetName {
            name: validate_name(name)?,
        })
    }

    pub fn make_move(row: u8, col: u8) -> Result<Self, ProtocolError> {
        Ok(Self::MakeMove {
            position: Position::new(row, col)?,
        })
    }
}

/// Trimmed player name, or an error if it is blank or spans lines.
pub fn validate_name(name: &str) -> Result<String, ProtocolError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.contains(['\n', '\r']) {
        return Err(ProtocolError::InvalidName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

const GAMES_LIST: &str = "RESP:GAMES_LIST";
const ERROR_PREFIX: &str = "ERROR:";

/// Decode one inbound line.
///
/// Returns `None` for blank lines. Every other line yields exactly one event:
/// unknown prefixes become [`Event::Unrecognized`] and malformed payloads under
/// a known prefix become [`Event::ServerError`] carrying the diagnostic.
pub fn decode(line: &str) -> Option<Event> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    let event = parse_line(line).unwrap_or_else(|e| {
        tracing::warn!("Malformed server message {:?}: {}", line, e);
        Event::ServerError {
            message: e.to_string(),
        }
    });
    Some(event)
}

/// Split off the next whitespace-delimited field. The remainder keeps its spacing.
fn next_field(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    Some(input.split_once(char::is_whitespace).unwrap_or((input, "")))
}

fn parse_line(line: &str) -> Result<Event, ProtocolError> {
    // Server error text is passed through untouched.
    if let Some(message) = line.trim_start().strip_prefix(ERROR_PREFIX) {
        return Ok(Event::ServerError {
            message: message.to_string(),
        });
    }

    let line = line.trim();
    if let Some(rest) = line.strip_prefix(GAMES_LIST) {
        if rest.is_empty() || rest.starts_with(';') {
            return parse_games_list(rest.trim_start_matches(';'));
        }
    }

    let (keyword, rest) = next_field(line).unwrap_or((line, ""));

    match keyword {
        "CMD:GET_NAME" => Ok(Event::NameRequested),
        "RESP:NAME_OK" => Ok(Event::NameAccepted),

        "RESP:CREATED" => {
            let (id, _) = next_field(rest).ok_or(ProtocolError::MissingFields {
                message: "RESP:CREATED",
                expected: 1,
                actual: 0,
            })?;
            Ok(Event::GameCreated {
                id: parse_id(id)?,
            })
        }

        "RESP:JOIN_OK" => {
            let (id, symbol, opponent) = parse_match_start("RESP:JOIN_OK", rest)?;
            Ok(Event::JoinConfirmed {
                id,
                symbol,
                opponent,
            })
        }

        "NOTIFY:GAME_START" => {
            let (id, symbol, opponent) = parse_match_start("NOTIFY:GAME_START", rest)?;
            Ok(Event::GameStarted {
                id,
                symbol,
                opponent,
            })
        }

        "NOTIFY:BOARD" => {
            let tokens: Vec<&str> = rest.split_whitespace().collect();
            Ok(Event::BoardUpdated {
                board: Board::from_tokens(&tokens)?,
            })
        }

        "NOTIFY:YOUR_TURN" => Ok(Event::TurnGranted),

        "NOTIFY:GAMEOVER" => Ok(Event::GameOver {
            result: rest.to_string(),
        }),

        "NOTIFY:OPPONENT_LEFT" => Ok(Event::OpponentLeft),

        "NOTIFY:SERVER_SHUTDOWN" => Ok(Event::Disconnected {
            reason: DisconnectReason::ServerShutdown,
        }),

        _ => Ok(Event::Unrecognized {
            raw: line.to_string(),
        }),
    }
}

/// `id,name|id,name|...`. Entries with fewer than two fields are skipped; a bad
/// id rejects the whole list.
fn parse_games_list(payload: &str) -> Result<Event, ProtocolError> {
    let mut entries = Vec::new();
    if payload.trim().is_empty() {
        return Ok(Event::GamesList { entries });
    }

    for raw in payload.split('|') {
        let fields: Vec<&str> = raw.split(',').collect();
        if fields.len() < 2 {
            tracing::warn!("Skipping games list entry without a creator: {:?}", raw);
            continue;
        }
        entries.push(GameEntry {
            id: parse_id(fields[0])?,
            creator: fields[1].trim().to_string(),
        });
    }

    Ok(Event::GamesList { entries })
}

/// `<id> <symbol> <name...>` shared by JOIN_OK and GAME_START. The name is
/// everything after the symbol, spacing included.
fn parse_match_start(
    message: &'static str,
    fields: &str,
) -> Result<(u32, Marker, String), ProtocolError> {
    let missing = |actual| ProtocolError::MissingFields {
        message,
        expected: 3,
        actual,
    };
    let (id, rest) = next_field(fields).ok_or_else(|| missing(0))?;
    let (symbol, name) = next_field(rest).ok_or_else(|| missing(1))?;
    if name.trim().is_empty() {
        return Err(missing(2));
    }

    let id = parse_id(id)?;
    let symbol =
        Marker::from_token(symbol).ok_or_else(|| ProtocolError::UnknownSymbol(symbol.into()))?;
    Ok((id, symbol, name.to_string()))
}

fn parse_id(value: &str) -> Result<u32, ProtocolError> {
    value
        .trim()
        .parse()
        .map_err(|_| ProtocolError::InvalidInteger {
            field: "game id",
            value: value.to_string(),
        })
}

/// Encode a command as one outbound line, without the trailing newline.
pub fn encode(command: &Command) -> String {
    match command {
        Command::SetName { name } => format!("NAME {}", name),
        Command::RequestList => "LIST".to_string(),
        Command::CreateGame => "CREATE".to_string(),
        Command::JoinGame { id } => format!("JOIN {}", id),
        Command::MakeMove { position } => format!("MOVE {} {}", position.row(), position.col()),
        Command::Quit => "QUIT".to_string(),
    }
}
