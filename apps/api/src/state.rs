use std::sync::Arc;

use crate::assessment::store::SessionStore;
use crate::config::Config;
use crate::questions::QuestionGenerator;
use crate::storage::StorageRouter;

/// Shared application state injected into all route handlers via Axum
/// extractors. Built once during wiring and passed down, so tests can
/// substitute an in-memory store, a local provider or a fake generator.
#[derive(Clone)]
pub struct AppState {
    /// Single storage provider behind the fixed-priority router.
    pub storage: Arc<StorageRouter>,
    pub sessions: Arc<SessionStore>,
    /// Pluggable generator. Default: keyword templates. Swap via ANTHROPIC_API_KEY.
    pub generator: Arc<dyn QuestionGenerator>,
    pub config: Config,
}
