use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const DEFAULT_PORT: u16 = 8000;

/// Player identifier assigned by the server. Strictly monotonic, never reused.
pub type PlayerId = u32;

/// A cell on the board. Only meaningful within `[0, width) x [0, height)`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Parses a trimmed, case-insensitive direction word.
    pub fn parse(s: &str) -> Option<Direction> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UP" => Some(Direction::Up),
            "DOWN" => Some(Direction::Down),
            "LEFT" => Some(Direction::Left),
            "RIGHT" => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Unit offset applied to a head position each tick.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
        };
        write!(f, "{}", word)
    }
}

/// One snake as seen by clients: head first, body in positional order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SnakeState {
    pub id: PlayerId,
    pub body: Vec<Point>,
}

/// Structured world snapshot carried by the `STATE` message. Sufficient for
/// a thin client to reconstruct the board without the ASCII render.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub width: i32,
    pub height: i32,
    pub snakes: Vec<SnakeState>,
    pub fruits: Vec<Point>,
    pub scores: HashMap<PlayerId, u32>,
    pub walls: Vec<Point>,
}

/// Commands a client may send, one per line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Join { name: String },
    Input { direction: Direction },
    LevelNext,
    LevelSet { number: u32 },
    Quit,
}

/// Messages the server sends, one per line. `Board` and `Scores` payloads
/// are multi-line blocks carried with literal `\n` separators on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Welcome { id: PlayerId },
    Board { text: String },
    State { snapshot: Snapshot },
    Scores { text: String },
    Err { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Command word not recognized; the connection stays open.
    UnknownCommand(String),
    /// `INPUT` with a word that is not a direction. Ignored by the engine.
    BadDirection(String),
    /// `LEVEL SET` with a non-numeric argument or unknown subcommand.
    BadLevel(String),
    /// Server line that could not be decoded (client side).
    BadMessage(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::UnknownCommand(line) => write!(f, "unknown command: {}", line),
            ProtocolError::BadDirection(word) => write!(f, "not a direction: {}", word),
            ProtocolError::BadLevel(arg) => write!(f, "invalid level request: {}", arg),
            ProtocolError::BadMessage(line) => write!(f, "undecodable message: {}", line),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl ClientCommand {
    /// Decodes one inbound line. The caller is expected to have stripped the
    /// trailing newline; surrounding whitespace is tolerated.
    pub fn decode(line: &str) -> Result<ClientCommand, ProtocolError> {
        let line = line.trim();
        if let Some(name) = line.strip_prefix("JOIN ") {
            return Ok(ClientCommand::Join {
                name: name.trim().to_string(),
            });
        }
        if let Some(word) = line.strip_prefix("INPUT ") {
            return match Direction::parse(word) {
                Some(direction) => Ok(ClientCommand::Input { direction }),
                None => Err(ProtocolError::BadDirection(word.trim().to_string())),
            };
        }
        if let Some(rest) = line.strip_prefix("LEVEL ") {
            let rest = rest.trim();
            if rest == "NEXT" {
                return Ok(ClientCommand::LevelNext);
            }
            if let Some(arg) = rest.strip_prefix("SET ") {
                return match arg.trim().parse::<u32>() {
                    Ok(number) => Ok(ClientCommand::LevelSet { number }),
                    Err(_) => Err(ProtocolError::BadLevel(arg.trim().to_string())),
                };
            }
            return Err(ProtocolError::BadLevel(rest.to_string()));
        }
        if line == "QUIT" {
            return Ok(ClientCommand::Quit);
        }
        Err(ProtocolError::UnknownCommand(line.to_string()))
    }

    /// Encodes the command as a wire line, without the trailing newline.
    pub fn encode(&self) -> String {
        match self {
            ClientCommand::Join { name } => format!("JOIN {}", name),
            ClientCommand::Input { direction } => format!("INPUT {}", direction),
            ClientCommand::LevelNext => "LEVEL NEXT".to_string(),
            ClientCommand::LevelSet { number } => format!("LEVEL SET {}", number),
            ClientCommand::Quit => "QUIT".to_string(),
        }
    }
}

impl ServerMessage {
    /// Encodes the message as a wire line, without the trailing newline.
    /// Multi-line payloads are flattened with literal `\n`; the `STATE`
    /// payload is the JSON form of [`Snapshot`].
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        Ok(match self {
            ServerMessage::Welcome { id } => format!("WELCOME {}", id),
            ServerMessage::Board { text } => format!("BOARD {}", escape_block(text)),
            ServerMessage::State { snapshot } => {
                format!("STATE {}", serde_json::to_string(snapshot)?)
            }
            ServerMessage::Scores { text } => format!("SCORES {}", escape_block(text)),
            ServerMessage::Err { message } => format!("ERR {}", message),
        })
    }

    /// Decodes one server line (client side).
    pub fn decode(line: &str) -> Result<ServerMessage, ProtocolError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(id) = line.strip_prefix("WELCOME ") {
            let id = id
                .trim()
                .parse::<PlayerId>()
                .map_err(|_| ProtocolError::BadMessage(line.to_string()))?;
            return Ok(ServerMessage::Welcome { id });
        }
        if let Some(payload) = line.strip_prefix("BOARD ") {
            return Ok(ServerMessage::Board {
                text: unescape_block(payload),
            });
        }
        if let Some(payload) = line.strip_prefix("STATE ") {
            let snapshot = serde_json::from_str(payload)
                .map_err(|_| ProtocolError::BadMessage(line.to_string()))?;
            return Ok(ServerMessage::State { snapshot });
        }
        if let Some(payload) = line.strip_prefix("SCORES ") {
            return Ok(ServerMessage::Scores {
                text: unescape_block(payload),
            });
        }
        if let Some(message) = line.strip_prefix("ERR ") {
            return Ok(ServerMessage::Err {
                message: message.to_string(),
            });
        }
        Err(ProtocolError::BadMessage(line.to_string()))
    }
}

fn escape_block(text: &str) -> String {
    text.replace('\n', "\\n")
}

fn unescape_block(payload: &str) -> String {
    payload.replace("\\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parse_case_insensitive() {
        assert_eq!(Direction::parse("up"), Some(Direction::Up));
        assert_eq!(Direction::parse("  DOWN "), Some(Direction::Down));
        assert_eq!(Direction::parse("Left"), Some(Direction::Left));
        assert_eq!(Direction::parse("RIGHT"), Some(Direction::Right));
        assert_eq!(Direction::parse("NORTH"), None);
        assert_eq!(Direction::parse(""), None);
    }

    #[test]
    fn test_direction_opposites() {
        for dir in [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ] {
            assert_eq!(dir.opposite().opposite(), dir);
            assert_ne!(dir.opposite(), dir);
        }
    }

    #[test]
    fn test_direction_delta_is_unit_step() {
        for dir in [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ] {
            let (dx, dy) = dir.delta();
            assert_eq!(dx.abs() + dy.abs(), 1);
        }
    }

    #[test]
    fn test_decode_join() {
        let cmd = ClientCommand::decode("JOIN alice\n").unwrap();
        assert_eq!(
            cmd,
            ClientCommand::Join {
                name: "alice".to_string()
            }
        );
    }

    #[test]
    fn test_decode_input() {
        let cmd = ClientCommand::decode("INPUT left").unwrap();
        assert_eq!(
            cmd,
            ClientCommand::Input {
                direction: Direction::Left
            }
        );
    }

    #[test]
    fn test_decode_input_bad_direction() {
        match ClientCommand::decode("INPUT sideways") {
            Err(ProtocolError::BadDirection(word)) => assert_eq!(word, "sideways"),
            other => panic!("expected BadDirection, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_level_commands() {
        assert_eq!(
            ClientCommand::decode("LEVEL NEXT").unwrap(),
            ClientCommand::LevelNext
        );
        assert_eq!(
            ClientCommand::decode("LEVEL SET 3").unwrap(),
            ClientCommand::LevelSet { number: 3 }
        );
        assert!(matches!(
            ClientCommand::decode("LEVEL SET three"),
            Err(ProtocolError::BadLevel(_))
        ));
        assert!(matches!(
            ClientCommand::decode("LEVEL JUMP"),
            Err(ProtocolError::BadLevel(_))
        ));
    }

    #[test]
    fn test_decode_quit_and_unknown() {
        assert_eq!(ClientCommand::decode(" QUIT "), Ok(ClientCommand::Quit));
        assert!(matches!(
            ClientCommand::decode("FLY UP"),
            Err(ProtocolError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_command_encode_decode_symmetry() {
        let commands = vec![
            ClientCommand::Join {
                name: "bob".to_string(),
            },
            ClientCommand::Input {
                direction: Direction::Up,
            },
            ClientCommand::LevelNext,
            ClientCommand::LevelSet { number: 2 },
            ClientCommand::Quit,
        ];
        for cmd in commands {
            assert_eq!(ClientCommand::decode(&cmd.encode()).unwrap(), cmd);
        }
    }

    #[test]
    fn test_board_newlines_escaped_on_wire() {
        let msg = ServerMessage::Board {
            text: "###\n# #\n###\n".to_string(),
        };
        let line = msg.encode().unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains("\\n"));
        match ServerMessage::decode(&line).unwrap() {
            ServerMessage::Board { text } => assert_eq!(text, "###\n# #\n###\n"),
            other => panic!("expected Board, got {:?}", other),
        }
    }

    #[test]
    fn test_state_carries_full_snapshot() {
        let mut scores = HashMap::new();
        scores.insert(1, 5);
        let snapshot = Snapshot {
            width: 30,
            height: 12,
            snakes: vec![SnakeState {
                id: 1,
                body: vec![Point::new(4, 5), Point::new(3, 5)],
            }],
            fruits: vec![Point::new(7, 7)],
            scores,
            walls: vec![Point::new(0, 0), Point::new(1, 0)],
        };
        let line = ServerMessage::State {
            snapshot: snapshot.clone(),
        }
        .encode()
        .unwrap();
        assert!(line.starts_with("STATE {"));
        match ServerMessage::decode(&line).unwrap() {
            ServerMessage::State { snapshot: decoded } => {
                assert_eq!(decoded, snapshot);
                assert_eq!(decoded.snakes[0].body[0], Point::new(4, 5));
            }
            other => panic!("expected State, got {:?}", other),
        }
    }

    #[test]
    fn test_welcome_and_err_lines() {
        assert_eq!(
            ServerMessage::Welcome { id: 7 }.encode().unwrap(),
            "WELCOME 7"
        );
        assert_eq!(
            ServerMessage::decode("ERR Unknown command").unwrap(),
            ServerMessage::Err {
                message: "Unknown command".to_string()
            }
        );
        assert!(ServerMessage::decode("GOODBYE").is_err());
        assert!(ServerMessage::decode("WELCOME seven").is_err());
    }
}
