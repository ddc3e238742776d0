//! Live connection table

use dashmap::DashMap;
use std::time::Instant;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::game::{ConnectionId, IntentCell, PaddleIntent, SessionId};
use crate::ws::protocol::ServerMsg;

/// Outbound queue depth per connection
pub const OUTBOUND_CAPACITY: usize = 128;

/// One live connection
#[derive(Debug, Clone)]
pub struct ConnectionEntry {
    pub intent: IntentCell,
    pub outbound: mpsc::Sender<ServerMsg>,
    /// Session this connection plays in, set at pairing and cleared at teardown
    pub session: Option<SessionId>,
    pub connected_at: Instant,
}

/// Registry of live connections
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection, returning its id and outbound receiver
    pub fn register(&self) -> (ConnectionId, mpsc::Receiver<ServerMsg>) {
        let id = Uuid::new_v4();
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        self.connections.insert(
            id,
            ConnectionEntry {
                intent: IntentCell::new(),
                outbound,
                session: None,
                connected_at: Instant::now(),
            },
        );
        (id, outbound_rx)
    }

    pub fn remove(&self, id: &ConnectionId) -> Option<ConnectionEntry> {
        self.connections.remove(id).map(|(_, entry)| entry)
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Overwrite the current intent; unknown ids are ignored
    pub fn set_intent(&self, id: &ConnectionId, intent: PaddleIntent) {
        if let Some(entry) = self.connections.get(id) {
            entry.intent.store(intent);
        }
    }

    pub fn intent(&self, id: &ConnectionId) -> Option<IntentCell> {
        self.connections.get(id).map(|e| e.intent.clone())
    }

    pub fn outbound(&self, id: &ConnectionId) -> Option<mpsc::Sender<ServerMsg>> {
        self.connections.get(id).map(|e| e.outbound.clone())
    }

    pub fn session_of(&self, id: &ConnectionId) -> Option<SessionId> {
        self.connections.get(id).and_then(|e| e.session.clone())
    }

    pub fn assign_session(&self, id: &ConnectionId, session: SessionId) {
        if let Some(mut entry) = self.connections.get_mut(id) {
            entry.session = Some(session);
        }
    }

    /// Clear the mapping, but only if it still names `session`
    pub fn clear_session(&self, id: &ConnectionId, session: &SessionId) {
        if let Some(mut entry) = self.connections.get_mut(id) {
            if entry.session.as_ref() == Some(session) {
                entry.session = None;
            }
        }
    }
}
