//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::game::physics::Ball;
use crate::game::{ConnectionId, PaddleIntent, SessionId};

/// Paddle direction as sent by clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Enter the matchmaking queue
    JoinMatchmaking,

    /// Replace the current paddle intent; `null` stops the paddle
    PaddleMove {
        #[serde(deserialize_with = "required_nullable")]
        direction: Option<Direction>,
    },
}

impl ClientMsg {
    /// Parse a text frame. Unknown shapes are rejected here, at the boundary.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl From<Option<Direction>> for PaddleIntent {
    fn from(direction: Option<Direction>) -> Self {
        match direction {
            Some(Direction::Up) => PaddleIntent::Up,
            Some(Direction::Down) => PaddleIntent::Down,
            None => PaddleIntent::None,
        }
    }
}

/// `direction` must be present, though it may be null
fn required_nullable<'de, D>(deserializer: D) -> Result<Option<Direction>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Direction>::deserialize(deserializer)
}

/// Why a match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// A member reached the winning score
    Score,
    /// The other member disconnected
    Forfeit,
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        connection_id: ConnectionId,
        server_time: u64,
    },

    /// Pairing complete
    MatchFound {
        #[serde(rename = "roomId")]
        room_id: SessionId,
        /// Left member first
        players: [ConnectionId; 2],
    },

    /// Serve countdown for the given round has begun
    RoundStart {
        round: u32,
    },

    /// Per-tick snapshot
    GameState {
        ball: Ball,
        paddles: BTreeMap<ConnectionId, f32>,
        scores: BTreeMap<ConnectionId, u32>,
    },

    /// Terminal result
    GameOver {
        winner: ConnectionId,
        scores: BTreeMap<ConnectionId, u32>,
        reason: FinishReason,
    },
}

impl ServerMsg {
    /// Short event name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMsg::Welcome { .. } => "welcome",
            ServerMsg::MatchFound { .. } => "match_found",
            ServerMsg::RoundStart { .. } => "round_start",
            ServerMsg::GameState { .. } => "game_state",
            ServerMsg::GameOver { .. } => "game_over",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn parses_join_matchmaking() {
        let msg = ClientMsg::parse(r#"{"type":"join_matchmaking"}"#).unwrap();
        assert_eq!(msg, ClientMsg::JoinMatchmaking);
    }

    #[test]
    fn parses_paddle_directions() {
        let up = ClientMsg::parse(r#"{"type":"paddle_move","direction":"up"}"#).unwrap();
        assert_eq!(up, ClientMsg::PaddleMove { direction: Some(Direction::Up) });

        let stop = ClientMsg::parse(r#"{"type":"paddle_move","direction":null}"#).unwrap();
        assert_eq!(stop, ClientMsg::PaddleMove { direction: None });
    }

    #[test]
    fn rejects_malformed_paddle_moves() {
        assert!(ClientMsg::parse(r#"{"type":"paddle_move"}"#).is_err());
        assert!(ClientMsg::parse(r#"{"type":"paddle_move","direction":"left"}"#).is_err());
        assert!(ClientMsg::parse(r#"{"type":"paddle_move","y":42}"#).is_err());
        assert!(ClientMsg::parse(r#"{"type":"teleport"}"#).is_err());
        assert!(ClientMsg::parse("not json").is_err());
    }

    #[test]
    fn direction_maps_to_intent() {
        assert_eq!(PaddleIntent::from(Some(Direction::Up)), PaddleIntent::Up);
        assert_eq!(PaddleIntent::from(Some(Direction::Down)), PaddleIntent::Down);
        assert_eq!(PaddleIntent::from(None), PaddleIntent::None);
    }

    #[test]
    fn match_found_uses_room_id_key() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let room_id = SessionId::from_members(a, b);
        let value = serde_json::to_value(ServerMsg::MatchFound {
            room_id: room_id.clone(),
            players: [a, b],
        })
        .unwrap();

        assert_eq!(
            value,
            json!({
                "type": "match_found",
                "roomId": room_id.to_string(),
                "players": [a.to_string(), b.to_string()],
            })
        );
    }

    #[test]
    fn game_state_keys_paddles_by_connection() {
        let a = Uuid::new_v4();
        let value = serde_json::to_value(ServerMsg::GameState {
            ball: Ball { x: 50.0, y: 50.0, dx: 2.0, dy: 2.0 },
            paddles: BTreeMap::from([(a, 40.0)]),
            scores: BTreeMap::from([(a, 3)]),
        })
        .unwrap();

        assert_eq!(value["type"], "game_state");
        assert_eq!(value["ball"]["dx"], 2.0);
        assert_eq!(value["paddles"][a.to_string()], 40.0);
        assert_eq!(value["scores"][a.to_string()], 3);
    }

    #[test]
    fn game_over_carries_reason() {
        let a = Uuid::new_v4();
        let value = serde_json::to_value(ServerMsg::GameOver {
            winner: a,
            scores: BTreeMap::new(),
            reason: FinishReason::Forfeit,
        })
        .unwrap();
        assert_eq!(value["type"], "game_over");
        assert_eq!(value["reason"], "forfeit");
        assert_eq!(value["winner"], a.to_string());
    }
}
