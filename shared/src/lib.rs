use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 5555;
pub const DEFAULT_WIDTH: i32 = 100;
pub const DEFAULT_HEIGHT: i32 = 40;
pub const DEFAULT_MAX_FOODS: usize = 5;
pub const DEFAULT_TICK_MS: u64 = 100;

/// Distance kept between a fresh spawn cell and the arena edge.
pub const SPAWN_MARGIN: i32 = 5;
pub const MAX_NAME_LEN: usize = 32;
pub const MAX_HANDSHAKE_BYTES: u64 = 1024;
/// Longest steering line accepted, newline included.
pub const MAX_TOKEN_BYTES: u64 = 64;

pub const FOOD_VALUE_MIN: u32 = 1;
pub const FOOD_VALUE_MAX: u32 = 3;

/// Grid cell as `(x, y)`. Serializes as a two element JSON array.
pub type Position = (i32, i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Decodes a steering token. Tokens are case-sensitive.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "w" => Some(Direction::Up),
            "a" => Some(Direction::Left),
            "s" => Some(Direction::Down),
            "d" => Some(Direction::Right),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            Direction::Up => "w",
            Direction::Left => "a",
            Direction::Down => "s",
            Direction::Right => "d",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Unit step on the grid. `y` grows downwards.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn step(self, from: Position) -> Position {
        let (dx, dy) = self.offset();
        (from.0 + dx, from.1 + dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Food {
    pub pos: Position,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub name: String,
    pub body: Vec<Position>,
    pub score: u32,
    pub alive: bool,
}

/// Full world state as sent to clients, one JSON document per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub width: i32,
    pub height: i32,
    pub players: Vec<PlayerSnapshot>,
    pub foods: Vec<Food>,
}

impl Snapshot {
    /// Encodes the snapshot as a newline-terminated frame.
    pub fn encode(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    pub fn decode(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line.trim_end())
    }

    pub fn player(&self, name: &str) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|p| p.name == name)
    }
}
