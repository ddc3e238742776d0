//! Application state shared across routes

use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::game::SessionRegistry;
use crate::matchmaking::MatchmakingService;
use crate::store::{LogResultRecorder, ResultRecorder, SupabaseClient, SupabaseResultRecorder};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub matchmaking: Arc<MatchmakingService>,
    pub session_registry: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Pick the match result store
        let recorder: Arc<dyn ResultRecorder> = match &config.supabase {
            Some(supabase) => {
                info!(url = %supabase.url, "Recording match results to Supabase");
                Arc::new(SupabaseResultRecorder::new(SupabaseClient::new(supabase)))
            }
            None => {
                info!("No result store configured, match results will only be logged");
                Arc::new(LogResultRecorder)
            }
        };

        // Initialize session registry
        let session_registry = Arc::new(SessionRegistry::new());

        // Initialize matchmaking service (Arc for sharing across cloned AppState)
        let matchmaking = Arc::new(MatchmakingService::new(
            session_registry.clone(),
            recorder,
            config.disconnect_policy,
        ));

        Self {
            config,
            matchmaking,
            session_registry,
        }
    }
}
