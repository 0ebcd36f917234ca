//! Wire message definitions for the game server protocol
//!
//! Field names are PascalCase on the wire. The first inbound frame after the
//! handshake is a bare JSON string carrying the assigned player id; every
//! later inbound frame is a [`GameSnapshot`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::util::time::iso_millis;

/// 2D point or heading on the play field. Headings are expected to be
/// unit-length sine/cosine pairs; nothing here renormalizes them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(self, other: Vector2) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// This point advanced `scale` units along `direction`.
    pub fn advanced(self, direction: Vector2, scale: f64) -> Vector2 {
        Vector2 {
            x: self.x + scale * direction.x,
            y: self.y + scale * direction.y,
        }
    }
}

/// Game lifecycle status, an integer on the wire. 2 and 3 are two
/// end-of-game variants distinguished by outcome; the harness treats them
/// identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum GameStatus {
    NotStarted = 0,
    Started = 1,
    Ended = 2,
    Aborted = 3,
}

impl GameStatus {
    pub fn is_ended(self) -> bool {
        matches!(self, GameStatus::Ended | GameStatus::Aborted)
    }
}

/// The server's last-known state of one player.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlayerSnapshot {
    pub position: Vector2,
    pub direction: Vector2,
    pub is_alive: bool,
    /// Clock drift the player last reported, echoed back by the server.
    pub drift: f64,
    /// When the server last heard from this player.
    #[serde(with = "iso_millis")]
    pub last_heard: DateTime<Utc>,
}

/// Full game state broadcast, keyed by player id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GameSnapshot {
    pub status: GameStatus,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    pub players: HashMap<String, PlayerSnapshot>,
}

/// Outbound frame from a simulated client. A frame without
/// `Position`/`Direction` is a heartbeat.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClientUpdate {
    pub player_id: String,
    #[serde(with = "iso_millis")]
    pub time_stamp: DateTime<Utc>,
    /// Current clock drift estimate in milliseconds.
    pub drift: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Vector2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<Vector2>,
}

impl ClientUpdate {
    pub fn is_heartbeat(&self) -> bool {
        self.position.is_none() && self.direction.is_none()
    }
}
