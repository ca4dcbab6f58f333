//! Data model and wire protocol shared by the arena client and its tests.

pub mod protocol;

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub use protocol::{classify, encode, ClientMessage, IgnoreReason, Inbound, ServerMessage};

pub const FIELD_WIDTH: f32 = 800.0;
pub const FIELD_HEIGHT: f32 = 600.0;
pub const DEFAULT_PLAYER_NAME: &str = "Anon";
pub const DEFAULT_SERVER_ADDRESS: &str = "ws://localhost:5000/ws";

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid color {0:?}, expected #rgb or #rrggbb")]
    InvalidColor(String),
}

/// Client-generated identity, created once per client lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(Uuid);

impl PlayerId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// RGB color normalized to lowercase `#rrggbb`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PlayerColor(String);

impl PlayerColor {
    pub fn random() -> Self {
        let value: u32 = rand::thread_rng().gen_range(0..=0xFF_FFFF);
        Self(format!("#{:06x}", value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn rgb(&self) -> (u8, u8, u8) {
        let value = u32::from_str_radix(&self.0[1..], 16).unwrap_or(0);
        ((value >> 16) as u8, (value >> 8) as u8, value as u8)
    }
}

impl FromStr for PlayerColor {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidColor(s.to_string());
        let digits = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let normalized = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect::<String>(),
            6 => digits.to_string(),
            _ => return Err(invalid()),
        };

        Ok(Self(format!("#{}", normalized.to_ascii_lowercase())))
    }
}

impl TryFrom<String> for PlayerColor {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PlayerColor> for String {
    fn from(color: PlayerColor) -> Self {
        color.0
    }
}

impl fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Directional intent. Axes are independent; the server decides how they combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntentState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
    pub color: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub score: u32,
}

impl PlayerSnapshot {
    pub fn position(&self) -> Position {
        Position {
            x: self.x,
            y: self.y,
        }
    }

    /// First two characters of the display name, used as the on-field badge.
    pub fn badge(&self) -> String {
        self.display_name.chars().take(2).collect()
    }
}

/// Complete authoritative world state as broadcast by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub players: Vec<PlayerSnapshot>,
    #[serde(rename = "star")]
    pub target: Position,
}

impl WorldSnapshot {
    /// False when any coordinate overflowed `f32` while decoding.
    pub fn is_finite(&self) -> bool {
        let finite = |p: Position| p.x.is_finite() && p.y.is_finite();
        finite(self.target) && self.players.iter().all(|p| finite(p.position()))
    }
}
