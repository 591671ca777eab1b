use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::store::{Job, JobStore};
use crate::outreach::models::{ResearchDepth, StreamEvent};
use crate::outreach::orchestrator::{GenerationRequest, RegenerationRequest};
use crate::outreach::shared_agent::AgentStatus;
use crate::state::AppState;

const JOB_NOT_FOUND: &str = "Job not found or expired";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    #[serde(default)]
    pub resume_text: String,
    #[serde(default)]
    pub jd_text: String,
    pub company_name: Option<String>,
    pub research_depth: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobResponse {
    pub success: bool,
    pub job_id: Uuid,
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct FetchJdRequest {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct FetchJdResponse {
    pub success: bool,
    pub text: String,
    pub url: String,
}

/// POST /api/generate
pub async fn handle_create_job(
    State(state): State<AppState>,
    payload: Result<Json<CreateJobRequest>, JsonRejection>,
) -> Result<Json<CreateJobResponse>, AppError> {
    let Json(req) = payload?;
    if req.resume_text.trim().is_empty() {
        return Err(AppError::Validation("Resume text is required".to_string()));
    }
    if req.jd_text.trim().is_empty() {
        return Err(AppError::Validation("Job description is required".to_string()));
    }
    if let Some(depth) = req.research_depth {
        ResearchDepth::new(depth).ok_or_else(|| {
            AppError::Validation(format!(
                "Research depth must be between 0 and {}",
                ResearchDepth::MAX
            ))
        })?;
    }

    let company_name = req
        .company_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    let job = state.jobs.create_job(req.resume_text, req.jd_text, company_name);

    Ok(Json(CreateJobResponse {
        success: true,
        job_id: job.id,
        message: "Job created. Connect to SSE stream to receive updates.",
    }))
}

/// GET /api/stream/:job_id?depth=N
pub async fn handle_stream(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let job = find_job(&state.jobs, &job_id)?;
    let depth = ResearchDepth::from_query(params.get("depth").map(String::as_str));

    let events = state.orchestrator.generate(GenerationRequest {
        resume_text: job.resume_text,
        jd_text: job.jd_text,
        company_name: job.company_name,
        depth,
    });

    Ok(sse_response(state.jobs, job.id, events))
}

/// POST /api/regenerate/:job_id
pub async fn handle_regenerate(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let job = find_job(&state.jobs, &job_id)?;
    let insights = job.cached_insights.ok_or_else(|| {
        AppError::CacheMiss("No cached insights found. Please generate a new email.".to_string())
    })?;

    let events = state.orchestrator.regenerate(RegenerationRequest {
        resume_text: job.resume_text,
        jd_text: job.jd_text,
        insights,
    });

    Ok(sse_response(state.jobs, job.id, events))
}

/// GET /api/agent-status
pub async fn handle_agent_status(State(state): State<AppState>) -> Json<AgentStatus> {
    Json(state.orchestrator.status())
}

/// POST /api/fetch-jd
pub async fn handle_fetch_jd(
    State(state): State<AppState>,
    payload: Result<Json<FetchJdRequest>, JsonRejection>,
) -> Result<Json<FetchJdResponse>, AppError> {
    let Json(req) = payload?;
    let text = state.orchestrator.fetch_job_description(&req.url).await?;
    Ok(Json(FetchJdResponse {
        success: true,
        text,
        url: req.url,
    }))
}

/// Malformed ids can never name a job, so they read as not-found too.
fn find_job(jobs: &JobStore, raw_id: &str) -> Result<Job, AppError> {
    Uuid::parse_str(raw_id)
        .ok()
        .and_then(|id| jobs.get_job(id))
        .ok_or_else(|| AppError::NotFound(JOB_NOT_FOUND.to_string()))
}

/// One frame of a job's event stream.
#[derive(Debug)]
enum Frame {
    Connected(Uuid),
    Relayed(StreamEvent),
    Done,
}

impl Frame {
    fn into_event(self) -> Result<Event, axum::Error> {
        let message = Event::default().event("message");
        match self {
            Frame::Connected(job_id) => {
                message.json_data(json!({"type": "connected", "jobId": job_id}))
            }
            Frame::Relayed(event) => message.json_data(event),
            Frame::Done => message.json_data(json!({"type": "done"})),
        }
    }
}

/// Connected, the relayed events up to the first terminal one, then done.
/// A completed result is cached on the job once its frame has been taken
/// by the transport.
fn frames(
    jobs: JobStore,
    job_id: Uuid,
    events: impl Stream<Item = StreamEvent> + Send + 'static,
) -> impl Stream<Item = Frame> + Send {
    async_stream::stream! {
        yield Frame::Connected(job_id);

        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            let terminal = event.is_terminal();
            let completed = match &event {
                StreamEvent::Complete { data } => Some(data.clone()),
                _ => None,
            };
            yield Frame::Relayed(event);
            if let Some(result) = completed {
                jobs.attach_result(job_id, result);
            }
            if terminal {
                break;
            }
        }

        yield Frame::Done;
    }
}

fn sse_response(
    jobs: JobStore,
    job_id: Uuid,
    events: impl Stream<Item = StreamEvent> + Send + 'static,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = frames(jobs, job_id, events).map(Frame::into_event);
    Sse::new(stream).keep_alive(KeepAlive::default())
}
