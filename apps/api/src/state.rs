use std::sync::Arc;

use crate::config::Config;
use crate::matching::pipeline::{MatchOptions, MatchPipeline};

/// Shared application state injected into all route handlers via Axum
/// extractors. Everything here is immutable; concurrent requests share only
/// these handles.
#[derive(Clone)]
pub struct AppState {
    /// Full startup configuration, kept for handlers that need raw knobs.
    #[allow(dead_code)]
    pub config: Config,
    /// The match pipeline: embedding provider, optional cache, vocabulary.
    pub pipeline: Arc<MatchPipeline>,
    /// Server-default match options, validated at startup. Per-request
    /// overrides are resolved against these.
    pub options: MatchOptions,
}
