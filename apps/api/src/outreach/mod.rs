// Outreach generation: research a company, match it against a resume and
// stream a cold email back as it is produced.
// All model calls go through llm_client; nothing here talks HTTP to Anthropic.

pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod relay;
pub mod shared_agent;
