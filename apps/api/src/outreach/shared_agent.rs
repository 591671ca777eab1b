//! Process-wide, lazily initialized task resource.
//!
//! State machine: uninitialized → initializing → ready | failed. A failed
//! state is retried on the next `acquire`. Concurrent callers coalesce onto a
//! single attempt; the attempt runs on its own task so an abandoned caller
//! cannot leave the state stuck in `initializing`.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info};

use crate::errors::AppError;
use crate::llm_client::{TaskConnector, TaskRunner};

#[derive(Clone)]
enum AgentState {
    Uninitialized,
    Initializing,
    Ready(Arc<dyn TaskRunner>),
    Failed(String),
}

/// Non-blocking snapshot of the agent lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentStatus {
    pub ready: bool,
    pub initializing: bool,
    pub error: Option<String>,
}

pub struct SharedAgent {
    connector: Arc<dyn TaskConnector>,
    state: watch::Sender<AgentState>,
}

impl SharedAgent {
    pub fn new(connector: Arc<dyn TaskConnector>) -> Arc<Self> {
        let (state, _) = watch::channel(AgentState::Uninitialized);
        Arc::new(Self { connector, state })
    }

    pub fn status(&self) -> AgentStatus {
        match &*self.state.borrow() {
            AgentState::Uninitialized => AgentStatus {
                ready: false,
                initializing: false,
                error: None,
            },
            AgentState::Initializing => AgentStatus {
                ready: false,
                initializing: true,
                error: None,
            },
            AgentState::Ready(_) => AgentStatus {
                ready: true,
                initializing: false,
                error: None,
            },
            AgentState::Failed(message) => AgentStatus {
                ready: false,
                initializing: false,
                error: Some(message.clone()),
            },
        }
    }

    /// Starts an initialization attempt unless one is running or the agent
    /// is already ready.
    fn begin(self: &Arc<Self>) {
        let started = self.state.send_if_modified(|state| match state {
            AgentState::Uninitialized | AgentState::Failed(_) => {
                *state = AgentState::Initializing;
                true
            }
            AgentState::Initializing | AgentState::Ready(_) => false,
        });

        if !started {
            return;
        }

        let this = Arc::clone(self);
        let connector = Arc::clone(&self.connector);
        tokio::spawn(async move {
            info!("Initializing ColdReach agent...");
            // connect runs on its own task so a panic still settles the state
            let attempt = tokio::spawn(async move { connector.connect().await });
            let next = match attempt.await {
                Ok(Ok(runner)) => {
                    info!("Agent initialized successfully");
                    AgentState::Ready(runner)
                }
                Ok(Err(e)) => {
                    error!("Agent initialization failed: {e}");
                    AgentState::Failed(e.to_string())
                }
                Err(e) => {
                    error!("Agent initialization aborted: {e}");
                    AgentState::Failed(format!("Agent initialization aborted: {e}"))
                }
            };
            this.state.send_replace(next);
        });
    }

    /// Idempotent. Returns once the current attempt settles.
    pub async fn ensure_initialized(self: &Arc<Self>) -> AgentStatus {
        // Result and error both end up in the status snapshot.
        let _ = self.acquire().await;
        self.status()
    }

    /// Returns the shared runner, waiting for initialization if needed and
    /// retrying once more if the previous attempt failed.
    pub async fn acquire(self: &Arc<Self>) -> Result<Arc<dyn TaskRunner>, AppError> {
        self.begin();

        let mut rx = self.state.subscribe();
        let settled = rx
            .wait_for(|state| matches!(state, AgentState::Ready(_) | AgentState::Failed(_)))
            .await
            .map_err(|_| AppError::AgentUnavailable("Agent not initialized".to_string()))?
            .clone();

        match settled {
            AgentState::Ready(runner) => Ok(runner),
            AgentState::Failed(message) => Err(AppError::AgentUnavailable(message)),
            AgentState::Uninitialized | AgentState::Initializing => Err(
                AppError::AgentUnavailable("Agent not initialized".to_string()),
            ),
        }
    }
}
