//! Persistence for finished matches

pub mod results;
pub mod supabase;

pub use results::{LogResultRecorder, ResultRecorder, SupabaseResultRecorder};
pub use supabase::SupabaseClient;
