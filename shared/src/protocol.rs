//! JSON text protocol spoken with the arena server.
//!
//! Every frame is an object with a `type` discriminator. The client sends
//! `join` once per connection and `keyState` on every intent edge; the server
//! broadcasts `state` snapshots. Anything else coming from the server is
//! accepted and classified as ignored.

use crate::{IntentState, PlayerColor, PlayerId, ProtocolError, WorldSnapshot};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    Join {
        #[serde(rename = "playerId")]
        player_id: PlayerId,
        name: String,
        color: PlayerColor,
    },
    KeyState {
        up: bool,
        down: bool,
        left: bool,
        right: bool,
    },
}

impl ClientMessage {
    pub fn join(player_id: PlayerId, name: &str, color: PlayerColor) -> Self {
        let name = if name.is_empty() {
            crate::DEFAULT_PLAYER_NAME
        } else {
            name
        };

        Self::Join {
            player_id,
            name: name.to_string(),
            color,
        }
    }

    pub fn key_state(intent: &IntentState) -> Self {
        Self::KeyState {
            up: intent.up,
            down: intent.down,
            left: intent.left,
            right: intent.right,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    State {
        payload: WorldSnapshot,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Well-formed frame whose `type` is not one the client acts on.
    UnknownKind,
    /// Not JSON, no `type`, or a `state` frame with a missing or invalid payload.
    Malformed,
}

/// Result of classifying one inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    State(WorldSnapshot),
    Ignored(IgnoreReason),
}

pub fn encode(message: &ClientMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

pub fn decode(text: &str) -> Result<ServerMessage, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}

pub fn classify(text: &str) -> Inbound {
    match decode(text) {
        Ok(ServerMessage::State { payload }) if payload.is_finite() => Inbound::State(payload),
        Ok(ServerMessage::State { .. }) => Inbound::Ignored(IgnoreReason::Malformed),
        Ok(ServerMessage::Unknown) => Inbound::Ignored(IgnoreReason::UnknownKind),
        Err(_) => Inbound::Ignored(IgnoreReason::Malformed),
    }
}
