//! Match result recording

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::game::ConnectionId;

use super::supabase::{SupabaseClient, SupabaseError};

/// Immutable outcome of a finished session
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub left: ConnectionId,
    pub right: ConnectionId,
    pub winner: ConnectionId,
    pub left_score: u32,
    pub right_score: u32,
    pub finished_at: DateTime<Utc>,
}

impl MatchResult {
    pub fn new(
        left: ConnectionId,
        right: ConnectionId,
        winner: ConnectionId,
        left_score: u32,
        right_score: u32,
    ) -> Self {
        Self {
            left,
            right,
            winner,
            left_score,
            right_score,
            finished_at: Utc::now(),
        }
    }
}

/// Row written to the `matches` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub player1: ConnectionId,
    pub player2: ConnectionId,
    pub winner: ConnectionId,
    pub score1: u32,
    pub score2: u32,
    pub created_at: DateTime<Utc>,
}

impl From<&MatchResult> for MatchRecord {
    fn from(result: &MatchResult) -> Self {
        Self {
            player1: result.left,
            player2: result.right,
            winner: result.winner,
            score1: result.left_score,
            score2: result.right_score,
            created_at: result.finished_at,
        }
    }
}

/// Recorder errors
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("store rejected match result: {0}")]
    Store(#[from] SupabaseError),

    #[error("recorder unavailable: {0}")]
    Unavailable(String),
}

/// Persists finished matches. Called once per finished session, best-effort.
pub trait ResultRecorder: Send + Sync {
    fn record(&self, result: MatchResult) -> BoxFuture<'_, Result<(), RecorderError>>;
}

/// Writes results to Supabase over PostgREST
#[derive(Clone)]
pub struct SupabaseResultRecorder {
    client: SupabaseClient,
}

impl SupabaseResultRecorder {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

impl ResultRecorder for SupabaseResultRecorder {
    fn record(&self, result: MatchResult) -> BoxFuture<'_, Result<(), RecorderError>> {
        Box::pin(async move {
            let record = MatchRecord::from(&result);
            let _stored: serde_json::Value = self.client.insert("matches", &record).await?;
            Ok(())
        })
    }
}

/// Used when no store is configured
#[derive(Debug, Clone, Default)]
pub struct LogResultRecorder;

impl ResultRecorder for LogResultRecorder {
    fn record(&self, result: MatchResult) -> BoxFuture<'_, Result<(), RecorderError>> {
        Box::pin(async move {
            info!(
                player1 = %result.left,
                player2 = %result.right,
                winner = %result.winner,
                score1 = result.left_score,
                score2 = result.right_score,
                "Match result (not persisted)"
            );
            Ok(())
        })
    }
}
