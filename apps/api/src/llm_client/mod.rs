/// LLM Client: the single point of entry for all Claude API calls in ColdReach.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// Everything else talks to the `TaskRunner` / `TaskConnector` traits.
///
/// Models are hardcoded; do not make configurable to prevent drift.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod prompts;
pub mod sse;

use sse::{SseDecoder, SseFrame};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_MODELS_URL: &str = "https://api.anthropic.com/v1/models?limit=1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const WEB_FETCH_BETA: &str = "web-fetch-2025-09-10";
/// Model used for email generation and regeneration.
pub const GENERATION_MODEL: &str = "claude-sonnet-4-20250514";
/// Cheaper model used for one-shot extraction tasks.
pub const EXTRACTION_MODEL: &str = "claude-3-5-haiku-20241022";
const MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Missing required environment variable: {0}")]
    MissingCredentials(&'static str),

    #[error("Stream error: {0}")]
    Stream(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Task contract
// ────────────────────────────────────────────────────────────────────────────

/// One low-level event produced by a running task.
///
/// Closed set: anything the wire protocol adds later lands in `Unknown`.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    /// A chunk of model output text.
    Text(String),
    /// The model started calling a tool. `name` is absent when the wire
    /// event did not carry one.
    ToolUse { name: Option<String> },
    /// Streamed tool input (partial JSON).
    ToolUseInput(String),
    /// Tool input is complete and the most recently named tool is executing.
    ToolUseApproved,
    /// Message boundary.
    Message,
    /// Anything else, tagged with the wire event kind.
    Unknown(String),
}

/// How much external research a task may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Research {
    None,
    WebSearch { max_uses: u32 },
    WebFetch,
}

#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub prompt: String,
    pub model: &'static str,
    pub research: Research,
}

/// Lazy, finite, non-restartable sequence of task events.
pub type TaskEventStream = BoxStream<'static, Result<TaskEvent, LlmError>>;

/// A ready-to-use task execution resource.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run_task(&self, request: TaskRequest) -> Result<TaskEventStream, LlmError>;
}

/// Performs the expensive one-time setup that yields a `TaskRunner`.
#[async_trait]
pub trait TaskConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn TaskRunner>, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Anthropic implementation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    stream: bool,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Streaming wire events of the Messages API.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEvent {
    ContentBlockStart {
        index: u32,
        content_block: WireBlock,
    },
    ContentBlockDelta {
        index: u32,
        delta: WireDelta,
    },
    ContentBlockStop {
        index: u32,
    },
    MessageStop {},
    Error {
        error: AnthropicErrorBody,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        name: Option<String>,
    },
    ServerToolUse {
        name: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Text,
    Tool,
    Other,
}

/// Connector that validates credentials against the Anthropic API.
pub struct AnthropicConnector {
    api_key: Option<String>,
}

impl AnthropicConnector {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }
}

#[async_trait]
impl TaskConnector for AnthropicConnector {
    async fn connect(&self) -> Result<Arc<dyn TaskRunner>, LlmError> {
        let api_key = self
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(LlmError::MissingCredentials("ANTHROPIC_API_KEY"))?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let response = client
            .get(ANTHROPIC_MODELS_URL)
            .header("x-api-key", &api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_message(body),
            });
        }

        info!("Anthropic credentials verified");
        Ok(Arc::new(AnthropicAgent { client, api_key }))
    }
}

/// Streams tasks through the Anthropic Messages API, using server-side
/// web tools for research.
#[derive(Clone)]
pub struct AnthropicAgent {
    client: Client,
    api_key: String,
}

#[async_trait]
impl TaskRunner for AnthropicAgent {
    async fn run_task(&self, request: TaskRequest) -> Result<TaskEventStream, LlmError> {
        let body = AnthropicRequest {
            model: request.model,
            max_tokens: MAX_TOKENS,
            stream: true,
            messages: vec![AnthropicMessage {
                role: "user",
                content: &request.prompt,
            }],
            tools: research_tools(request.research),
        };

        let response = self.open_stream(&body, request.research).await?;
        let mut bytes = response.bytes_stream();

        let events = async_stream::stream! {
            let mut decoder = SseDecoder::default();
            let mut blocks: HashMap<u32, BlockKind> = HashMap::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(LlmError::Http(e));
                        return;
                    }
                };

                for frame in decoder.push(&chunk) {
                    match translate_frame(&frame, &mut blocks) {
                        Ok(events) => {
                            for event in events {
                                yield Ok(event);
                            }
                        }
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
        };

        Ok(events.boxed())
    }
}

impl AnthropicAgent {
    /// Opens the streaming response.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    async fn open_stream(
        &self,
        body: &AnthropicRequest<'_>,
        research: Research,
    ) -> Result<reqwest::Response, LlmError> {
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM stream attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut builder = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json");
            if research == Research::WebFetch {
                builder = builder.header("anthropic-beta", WEB_FETCH_BETA);
            }

            let response = match builder.json(body).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: error_message(body),
                });
            }

            debug!("LLM stream opened (model: {})", body.model);
            return Ok(response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

fn research_tools(research: Research) -> Vec<Value> {
    match research {
        Research::None => vec![],
        Research::WebSearch { max_uses } => vec![json!({
            "type": "web_search_20250305",
            "name": "web_search",
            "max_uses": max_uses,
        })],
        Research::WebFetch => vec![json!({
            "type": "web_fetch_20250910",
            "name": "web_fetch",
            "max_uses": 1,
        })],
    }
}

/// Pulls the human-readable message out of an Anthropic error body.
fn error_message(body: String) -> String {
    serde_json::from_str::<AnthropicError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

/// Maps one wire frame onto zero or more task events.
fn translate_frame(
    frame: &SseFrame,
    blocks: &mut HashMap<u32, BlockKind>,
) -> Result<Vec<TaskEvent>, LlmError> {
    if frame.data.is_empty() {
        return Ok(vec![]);
    }

    let event: WireEvent = serde_json::from_str(&frame.data)?;

    let events = match event {
        WireEvent::ContentBlockStart {
            index,
            content_block,
        } => match content_block {
            WireBlock::Text { text } => {
                blocks.insert(index, BlockKind::Text);
                if text.is_empty() {
                    vec![]
                } else {
                    vec![TaskEvent::Text(text)]
                }
            }
            WireBlock::ToolUse { name } | WireBlock::ServerToolUse { name } => {
                blocks.insert(index, BlockKind::Tool);
                vec![TaskEvent::ToolUse { name }]
            }
            WireBlock::Other => {
                blocks.insert(index, BlockKind::Other);
                vec![TaskEvent::Unknown("content_block_start".to_string())]
            }
        },
        WireEvent::ContentBlockDelta { index, delta } => match delta {
            WireDelta::TextDelta { text } => vec![TaskEvent::Text(text)],
            WireDelta::InputJsonDelta { partial_json } => {
                vec![TaskEvent::ToolUseInput(partial_json)]
            }
            WireDelta::Other => {
                debug!("Ignoring delta on block {index}");
                vec![]
            }
        },
        WireEvent::ContentBlockStop { index } => match blocks.remove(&index) {
            Some(BlockKind::Tool) => vec![TaskEvent::ToolUseApproved],
            Some(BlockKind::Text) | Some(BlockKind::Other) | None => vec![],
        },
        WireEvent::MessageStop {} => vec![TaskEvent::Message],
        WireEvent::Error { error } => return Err(LlmError::Stream(error.message)),
        WireEvent::Other => {
            debug!("Ignoring wire event {:?}", frame.event);
            vec![]
        }
    };

    Ok(events)
}
