use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Liveness plus a snapshot of the agent lifecycle and job registry.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "agent": state.orchestrator.status(),
        "jobs": state.jobs.stats(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    use crate::jobs::store::JobStore;
    use crate::outreach::orchestrator::tests::{orchestrator_with, ScriptedRunner};
    use crate::routes::build_router;
    use crate::state::AppState;

    #[tokio::test]
    async fn test_health_reports_agent_and_jobs() {
        let jobs = JobStore::new();
        jobs.create_job("r".to_string(), "j".to_string(), None);
        let app = build_router(AppState {
            jobs,
            orchestrator: orchestrator_with(ScriptedRunner::replying("")),
        });

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].is_string());
        assert_eq!(body["agent"]["ready"], false);
        assert_eq!(body["agent"]["initializing"], false);
        assert_eq!(body["jobs"]["size"], 1);
        assert!(body["jobs"]["oldestCreatedAt"].is_string());
    }
}
