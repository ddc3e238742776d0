//! Matchmaking: connection table, size-one queue and session creation

pub mod connections;
pub mod queue;
pub mod service;

pub use service::{JoinOutcome, MatchmakingService};
