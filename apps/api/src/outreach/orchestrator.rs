//! Task orchestration: drives generate / regenerate runs against the shared
//! agent and streams their progress.
//!
//! Flow: status notice → acquire agent → run task → relay → parse → emit.
//! Dropping a returned stream drops the upstream task stream with it.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::{
    Research, TaskConnector, TaskEvent, TaskRequest, TaskRunner, EXTRACTION_MODEL,
    GENERATION_MODEL,
};
use crate::outreach::models::{Insights, ResearchDepth, StreamEvent};
use crate::outreach::prompts::{
    build_fetch_jd_prompt, build_generation_prompt, build_regenerate_prompt,
};
use crate::outreach::relay::{relay, RelayMode};
use crate::outreach::shared_agent::{AgentStatus, SharedAgent};

/// Upper bound on auxiliary one-shot tasks.
pub const AUXILIARY_TIMEOUT: Duration = Duration::from_secs(30);

const INITIALIZING_NOTICE: &str = "Initializing AI agent (first run may take a moment)...";

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub resume_text: String,
    pub jd_text: String,
    pub company_name: Option<String>,
    pub depth: ResearchDepth,
}

#[derive(Debug, Clone)]
pub struct RegenerationRequest {
    pub resume_text: String,
    pub jd_text: String,
    /// Must come from a previously completed generation.
    pub insights: Insights,
}

#[derive(Clone)]
pub struct Orchestrator {
    agent: Arc<SharedAgent>,
    auxiliary_timeout: Duration,
}

impl Orchestrator {
    pub fn new(connector: Arc<dyn TaskConnector>) -> Self {
        Self {
            agent: SharedAgent::new(connector),
            auxiliary_timeout: AUXILIARY_TIMEOUT,
        }
    }

    #[cfg(test)]
    pub fn with_auxiliary_timeout(mut self, timeout: Duration) -> Self {
        self.auxiliary_timeout = timeout;
        self
    }

    pub fn status(&self) -> AgentStatus {
        self.agent.status()
    }

    /// Kicks off agent initialization in the background.
    pub fn warm_up(&self) {
        let agent = Arc::clone(&self.agent);
        tokio::spawn(async move {
            let status = agent.ensure_initialized().await;
            if let Some(error) = status.error {
                warn!("Background agent initialization failed: {error}");
            }
        });
    }

    /// Research-and-write run. Relays tool activity, every insight, the
    /// email body and the completed result.
    pub fn generate(&self, request: GenerationRequest) -> impl Stream<Item = StreamEvent> + Send {
        let task = TaskRequest {
            prompt: build_generation_prompt(
                &request.resume_text,
                &request.jd_text,
                request.company_name.as_deref(),
                request.depth,
            ),
            model: GENERATION_MODEL,
            research: Research::WebSearch {
                max_uses: request.depth.search_budget(),
            },
        };
        info!(
            "Starting generation (depth {}, company hint: {})",
            request.depth.value(),
            request.company_name.is_some()
        );

        self.run(task, RelayMode::Full, "Starting email generation...")
    }

    /// Email rewrite from cached insights. No research, no per-insight events.
    pub fn regenerate(
        &self,
        request: RegenerationRequest,
    ) -> impl Stream<Item = StreamEvent> + Send {
        let task = TaskRequest {
            prompt: build_regenerate_prompt(
                &request.resume_text,
                &request.jd_text,
                &request.insights,
            ),
            model: GENERATION_MODEL,
            research: Research::None,
        };
        info!("Starting regeneration from cached insights");

        self.run(
            task,
            RelayMode::EmailOnly,
            "Regenerating email with cached research...",
        )
    }

    fn run(
        &self,
        task: TaskRequest,
        mode: RelayMode,
        opening: &'static str,
    ) -> impl Stream<Item = StreamEvent> + Send {
        let agent = Arc::clone(&self.agent);

        async_stream::stream! {
            if agent.status().initializing {
                yield StreamEvent::status(INITIALIZING_NOTICE);
            }
            yield StreamEvent::status(opening);

            let runner = match agent.acquire().await {
                Ok(runner) => runner,
                Err(e) => {
                    yield StreamEvent::error(e.to_string());
                    return;
                }
            };

            let events = match runner.run_task(task).await {
                Ok(events) => events,
                Err(e) => {
                    warn!("Failed to start task: {e}");
                    yield StreamEvent::error(format!("Agent error: {e}"));
                    return;
                }
            };

            let relayed = relay(events, mode);
            futures::pin_mut!(relayed);
            while let Some(event) = relayed.next().await {
                yield event;
            }
        }
    }

    /// Auxiliary one-shot task: pull the job description text off a URL.
    pub async fn fetch_job_description(&self, url: &str) -> Result<String, AppError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::Validation("URL is required".to_string()));
        }

        let task = TaskRequest {
            prompt: build_fetch_jd_prompt(url),
            model: EXTRACTION_MODEL,
            research: Research::WebFetch,
        };

        let work = async {
            let runner = self.agent.acquire().await?;
            collect_text(runner, task).await
        };

        let text = tokio::time::timeout(self.auxiliary_timeout, work)
            .await
            .map_err(|_| AppError::Timeout("Timeout fetching job description".to_string()))??;

        Ok(text.trim().to_string())
    }
}

/// Runs a task to completion and concatenates its text output.
async fn collect_text(runner: Arc<dyn TaskRunner>, task: TaskRequest) -> Result<String, AppError> {
    let mut events = runner
        .run_task(task)
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;

    let mut text = String::new();
    while let Some(event) = events.next().await {
        if let TaskEvent::Text(chunk) = event.map_err(|e| AppError::Llm(e.to_string()))? {
            text.push_str(&chunk);
        }
    }
    Ok(text)
}
