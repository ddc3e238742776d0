//! Game simulation modules

pub mod physics;
pub mod scoring;
pub mod session;
pub mod snapshot;

pub use session::{GameSession, SessionControl, SessionRegistry, SessionState};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Opaque identity of one live connection
pub type ConnectionId = Uuid;

/// Identity of a session, derived from its two members
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Build the room id for a pairing; the waiting connection comes first
    pub fn from_members(left: ConnectionId, right: ConnectionId) -> Self {
        Self(format!("game-{}-{}", left, right))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which end of the table a member defends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// A connection's latest declared paddle direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaddleIntent {
    Up,
    Down,
    #[default]
    None,
}

impl PaddleIntent {
    fn to_bits(self) -> u8 {
        match self {
            PaddleIntent::None => 0,
            PaddleIntent::Up => 1,
            PaddleIntent::Down => 2,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits {
            1 => PaddleIntent::Up,
            2 => PaddleIntent::Down,
            _ => PaddleIntent::None,
        }
    }
}

/// Shared, last-write-wins intent slot.
///
/// The connection reader overwrites it, the session tick samples it.
#[derive(Debug, Clone, Default)]
pub struct IntentCell(Arc<AtomicU8>);

impl IntentCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, intent: PaddleIntent) {
        self.0.store(intent.to_bits(), Ordering::Relaxed);
    }

    pub fn load(&self) -> PaddleIntent {
        PaddleIntent::from_bits(self.0.load(Ordering::Relaxed))
    }
}
