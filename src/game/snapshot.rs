//! Snapshot building for network transmission

use std::collections::BTreeMap;

use crate::ws::protocol::{FinishReason, ServerMsg};

use super::{ConnectionId, SessionState, Side};

/// Builds the per-tick and terminal messages for one session.
///
/// Every member receives the same snapshot; clients mirror their own side.
pub struct SnapshotBuilder {
    left: ConnectionId,
    right: ConnectionId,
}

impl SnapshotBuilder {
    pub fn new(left: ConnectionId, right: ConnectionId) -> Self {
        Self { left, right }
    }

    /// Build a `game_state` message
    pub fn game_state(&self, state: &SessionState) -> ServerMsg {
        ServerMsg::GameState {
            ball: state.ball,
            paddles: self.per_member(|side| state.paddles.get(side)),
            scores: self.per_member(|side| state.scores.get(side)),
        }
    }

    /// Build the terminal `game_over` message
    pub fn game_over(&self, state: &SessionState, winner: ConnectionId, reason: FinishReason) -> ServerMsg {
        ServerMsg::GameOver {
            winner,
            scores: self.per_member(|side| state.scores.get(side)),
            reason,
        }
    }

    fn per_member<T>(&self, value: impl Fn(Side) -> T) -> BTreeMap<ConnectionId, T> {
        BTreeMap::from([
            (self.left, value(Side::Left)),
            (self.right, value(Side::Right)),
        ])
    }
}
