//! Matchmaking queue implementation

use std::time::{Duration, Instant};

use crate::game::ConnectionId;

/// Connection parked in the queue
#[derive(Debug, Clone, Copy)]
pub struct WaitingConnection {
    pub connection_id: ConnectionId,
    pub queued_at: Instant,
}

impl WaitingConnection {
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            queued_at: Instant::now(),
        }
    }

    /// How long this connection has been waiting
    pub fn wait_time(&self) -> Duration {
        self.queued_at.elapsed()
    }
}

/// Result of a join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOutcome {
    /// Queue was empty, joiner is now waiting
    Queued,
    /// Joiner was already the waiting entry
    AlreadyWaiting,
    /// Joiner paired with the waiting connection, which left the queue
    Paired { waiting: ConnectionId },
}

/// The matchmaking queue: strict FIFO of size one
#[derive(Debug, Default)]
pub struct MatchmakingQueue {
    waiting: Option<WaitingConnection>,
}

impl MatchmakingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park the joiner, or pair it with whoever is waiting
    pub fn join(&mut self, connection_id: ConnectionId) -> QueueOutcome {
        match self.waiting {
            None => {
                self.waiting = Some(WaitingConnection::new(connection_id));
                QueueOutcome::Queued
            }
            Some(waiting) if waiting.connection_id == connection_id => QueueOutcome::AlreadyWaiting,
            Some(waiting) => {
                self.waiting = None;
                QueueOutcome::Paired {
                    waiting: waiting.connection_id,
                }
            }
        }
    }

    /// Remove the connection if it is the one waiting
    pub fn leave(&mut self, connection_id: ConnectionId) -> Option<WaitingConnection> {
        match self.waiting {
            Some(waiting) if waiting.connection_id == connection_id => self.waiting.take(),
            _ => None,
        }
    }

    /// Get queue length (0 or 1)
    pub fn len(&self) -> usize {
        usize::from(self.waiting.is_some())
    }
}
