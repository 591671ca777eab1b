//! Event Relay: turns a task's low-level event stream into `StreamEvent`s.
//!
//! Text is buffered, tool activity is surfaced as it happens, and once the
//! task stream ends the buffered text goes through the result parser. The
//! relay always ends with exactly one terminal event (complete or error).

use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::llm_client::{TaskEvent, TaskEventStream};
use crate::outreach::models::{InsightCategory, StreamEvent, StructuredResult};
use crate::outreach::parser::parse_result;

/// Which events a run relays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// Tool activity, every insight, email, completion.
    Full,
    /// Email and completion only. Insights are already known to the client.
    EmailOnly,
}

/// Human-readable status for a tool name.
pub fn tool_message(name: &str) -> String {
    let known = match name {
        "web_search" | "firecrawl_search" | "firecrawl_firecrawl_search" => {
            "Searching for company information..."
        }
        "web_fetch" | "firecrawl_scrape" | "firecrawl_firecrawl_scrape" => {
            "Crawling company website..."
        }
        "firecrawl_crawl" => "Deep crawling company pages...",
        "firecrawl_map" => "Mapping company site structure...",
        _ => return format!("Researching: {name}"),
    };
    known.to_string()
}

/// Relays one task run. Consumes `events` lazily, one at a time.
pub fn relay(events: TaskEventStream, mode: RelayMode) -> impl Stream<Item = StreamEvent> + Send {
    async_stream::stream! {
        let mut events = events;
        let mut response = String::new();
        let mut last_tool: Option<String> = None;

        while let Some(event) = events.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    warn!("Task stream failed: {e}");
                    yield StreamEvent::error(format!("Agent error: {e}"));
                    return;
                }
            };

            match event {
                TaskEvent::Text(text) => response.push_str(&text),
                TaskEvent::ToolUse { name: Some(name) } if !name.is_empty() => {
                    if mode == RelayMode::Full {
                        yield StreamEvent::ToolUse { data: tool_message(&name) };
                    }
                    last_tool = Some(name);
                }
                TaskEvent::ToolUseApproved => {
                    if let (RelayMode::Full, Some(name)) = (mode, last_tool.as_deref()) {
                        yield StreamEvent::status(format!("Executing {name}..."));
                    }
                }
                TaskEvent::ToolUse { .. } | TaskEvent::ToolUseInput(_) | TaskEvent::Message => {}
                TaskEvent::Unknown(kind) => debug!("Unknown task event: {kind}"),
            }
        }

        match parse_result(&response) {
            Ok(result) => {
                for event in result_events(result, mode) {
                    yield event;
                }
            }
            Err(e) => {
                warn!("Failed to parse agent response ({} chars): {e}", response.len());
                yield StreamEvent::error(format!("Failed to parse response: {e}"));
            }
        }
    }
}

/// Fixed emission order: fit reasons, company insights, unique angle,
/// curiosity question, email, completion.
fn result_events(result: StructuredResult, mode: RelayMode) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    if mode == RelayMode::Full {
        let insights = &result.insights;
        events.extend(
            insights
                .fit_reasons
                .iter()
                .map(|r| StreamEvent::insight(InsightCategory::FitReason, r.as_str())),
        );
        events.extend(
            insights
                .company_insights
                .iter()
                .map(|i| StreamEvent::insight(InsightCategory::CompanyInsight, i.as_str())),
        );
        events.push(StreamEvent::insight(
            InsightCategory::UniqueAngle,
            insights.unique_angle.as_str(),
        ));
        events.push(StreamEvent::insight(
            InsightCategory::CuriosityQuestion,
            insights.curiosity_question.as_str(),
        ));
    }

    events.push(StreamEvent::Email {
        data: result.email.body.clone(),
    });
    events.push(StreamEvent::Complete { data: result });
    events
}
