//! Matchmaking service - owns the queue, the connection table and session creation

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::game::session::DisconnectPolicy;
use crate::game::{
    ConnectionId, GameSession, PaddleIntent, SessionControl, SessionId, SessionRegistry,
    SessionState,
};
use crate::store::ResultRecorder;
use crate::ws::protocol::ServerMsg;

use super::connections::ConnectionRegistry;
use super::queue::{MatchmakingQueue, QueueOutcome};

/// What a join request did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Parked as the waiting connection
    Queued,
    /// Was already waiting; nothing changed
    AlreadyQueued,
    /// Paired; the new session is running
    Matched(SessionId),
    /// Connection already plays in a session
    AlreadyInSession(SessionId),
    /// Connection is not registered
    UnknownConnection,
}

/// Matchmaking service
pub struct MatchmakingService {
    queue: Mutex<MatchmakingQueue>,
    registry: Arc<SessionRegistry>,
    connections: Arc<ConnectionRegistry>,
    recorder: Arc<dyn ResultRecorder>,
    policy: DisconnectPolicy,
}

impl MatchmakingService {
    pub fn new(
        registry: Arc<SessionRegistry>,
        recorder: Arc<dyn ResultRecorder>,
        policy: DisconnectPolicy,
    ) -> Self {
        Self {
            queue: Mutex::new(MatchmakingQueue::new()),
            registry,
            connections: Arc::new(ConnectionRegistry::new()),
            recorder,
            policy,
        }
    }

    /// Register a connection (called when a WebSocket connects)
    /// Returns its id and the receiver for everything sent to it
    pub fn register_connection(&self) -> (ConnectionId, mpsc::Receiver<ServerMsg>) {
        let (connection_id, outbound_rx) = self.connections.register();
        info!(connection_id = %connection_id, "Connection registered");
        (connection_id, outbound_rx)
    }

    /// Unregister a connection (called when a WebSocket disconnects)
    pub fn unregister_connection(&self, connection_id: ConnectionId) {
        if let Some(waiting) = self.queue.lock().leave(connection_id) {
            info!(
                connection_id = %connection_id,
                waited_ms = waiting.wait_time().as_millis() as u64,
                "Waiting connection left matchmaking queue"
            );
        }

        let Some(entry) = self.connections.remove(&connection_id) else {
            return;
        };

        if let Some(session_id) = entry.session {
            if let Some(handle) = self.registry.get(&session_id) {
                handle.notify(SessionControl::MemberLeft(connection_id));
            }
        }

        info!(
            connection_id = %connection_id,
            connected_secs = entry.connected_at.elapsed().as_secs(),
            "Connection unregistered"
        );
    }

    /// Join matchmaking: park, or pair with the waiting connection
    pub fn join_matchmaking(&self, connection_id: ConnectionId) -> JoinOutcome {
        if !self.connections.contains(&connection_id) {
            return JoinOutcome::UnknownConnection;
        }

        if let Some(session_id) = self.connections.session_of(&connection_id) {
            debug!(connection_id = %connection_id, session_id = %session_id, "Join ignored, already in a session");
            return JoinOutcome::AlreadyInSession(session_id);
        }

        let outcome = self.queue.lock().join(connection_id);
        match outcome {
            QueueOutcome::Queued => {
                info!(connection_id = %connection_id, "Waiting for opponent");
                JoinOutcome::Queued
            }
            QueueOutcome::AlreadyWaiting => JoinOutcome::AlreadyQueued,
            QueueOutcome::Paired { waiting } => match self.create_session(waiting, connection_id) {
                Some(session_id) => JoinOutcome::Matched(session_id),
                None => {
                    // Opponent vanished between pairing and session start
                    warn!(connection_id = %connection_id, opponent = %waiting, "Pairing abandoned");
                    if self.connections.contains(&connection_id) {
                        self.queue.lock().join(connection_id);
                        JoinOutcome::Queued
                    } else {
                        JoinOutcome::UnknownConnection
                    }
                }
            },
        }
    }

    /// Set the paddle intent for a connection; unknown ids are ignored
    pub fn set_intent(&self, connection_id: ConnectionId, intent: PaddleIntent) {
        self.connections.set_intent(&connection_id, intent);
    }

    /// Create a session for a pairing and start its tick task
    fn create_session(&self, left: ConnectionId, right: ConnectionId) -> Option<SessionId> {
        let (Some(left_intent), Some(right_intent)) =
            (self.connections.intent(&left), self.connections.intent(&right))
        else {
            return None;
        };

        let seed = rand::random::<u64>();
        let state = SessionState::new(left, right, seed);
        let (session, handle) = GameSession::new(
            state,
            [left_intent, right_intent],
            self.policy,
            self.recorder.clone(),
        );
        let session_id = handle.id.clone();

        // Members subscribe before anything is broadcast
        for member in handle.members {
            self.connections.assign_session(&member, session_id.clone());
            if let Some(outbound) = self.connections.outbound(&member) {
                tokio::spawn(forward_session_events(
                    member,
                    session_id.clone(),
                    handle.subscribe(),
                    outbound,
                    self.connections.clone(),
                ));
            }
        }

        self.registry.insert(handle.clone());

        let _ = handle.events_tx.send(ServerMsg::MatchFound {
            room_id: session_id.clone(),
            players: handle.members,
        });

        info!(
            session_id = %session_id,
            left = %left,
            right = %right,
            "Match started"
        );

        let task = tokio::spawn(session.run());
        handle.attach(task.abort_handle());

        // A member that disconnected mid-pairing never got to notify the session
        for member in handle.members {
            if !self.connections.contains(&member) {
                handle.notify(SessionControl::MemberLeft(member));
            }
        }

        // Cleanup after the session ends, however it ends
        let registry = self.registry.clone();
        let connections = self.connections.clone();
        let cleanup_handle = handle.clone();
        tokio::spawn(async move {
            let cleanup_id = &cleanup_handle.id;
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!(session_id = %cleanup_id, "Session task panicked");
                }
            }

            // A rematch of the same pair may already own this id
            if !registry.remove_handle(&cleanup_handle) {
                return;
            }
            for member in cleanup_handle.members {
                connections.clear_session(&member, cleanup_id);
            }

            info!(session_id = %cleanup_id, "Session removed from registry");
        });

        Some(session_id)
    }

    /// Stop every running session (process shutdown)
    pub fn shutdown(&self) {
        self.registry.stop_all();
    }

    /// Get current queue size
    pub fn queue_size(&self) -> usize {
        self.queue.lock().len()
    }

    /// Get connection's current session ID
    pub fn session_of(&self, connection_id: &ConnectionId) -> Option<SessionId> {
        self.connections.session_of(connection_id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn active_sessions(&self) -> usize {
        self.registry.active_sessions()
    }
}

/// Relay one session's broadcast into a member's outbound queue.
///
/// The member is released from the session before `game_over` is queued,
/// so a join sent in reply to it is never refused.
async fn forward_session_events(
    connection_id: ConnectionId,
    session_id: SessionId,
    mut events: broadcast::Receiver<ServerMsg>,
    outbound: mpsc::Sender<ServerMsg>,
    connections: Arc<ConnectionRegistry>,
) {
    loop {
        match events.recv().await {
            Ok(msg) => {
                let last = matches!(msg, ServerMsg::GameOver { .. });
                if last {
                    connections.clear_session(&connection_id, &session_id);
                }
                match outbound.try_send(msg) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(msg)) => {
                        debug!(connection_id = %connection_id, kind = msg.kind(), "Outbound queue full, dropping");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
                if last {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(connection_id = %connection_id, lagged = n, "Session receiver lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
