use crate::jobs::store::JobStore;
use crate::outreach::orchestrator::Orchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub jobs: JobStore,
    /// Owns the lazily-initialized agent shared by every run.
    pub orchestrator: Orchestrator,
}
