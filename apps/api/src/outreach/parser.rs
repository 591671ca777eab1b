//! Result Parser: pulls the structured result out of free-form model output.
//!
//! Candidate selection: a ```json fenced block wins; otherwise the first
//! balanced top-level `{ ... }` span in the text. Only shape and types are
//! checked here, never content.

use thiserror::Error;

use crate::outreach::models::StructuredResult;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Could not parse agent response as JSON")]
    NoJsonFound,

    #[error("Response JSON did not match the expected shape: {0}")]
    InvalidShape(#[from] serde_json::Error),
}

/// Parses the accumulated text of one task run.
pub fn parse_result(text: &str) -> Result<StructuredResult, ParseError> {
    let candidate = find_candidate(text).ok_or(ParseError::NoJsonFound)?;
    Ok(serde_json::from_str(candidate)?)
}

fn find_candidate(text: &str) -> Option<&str> {
    fenced_block(text).or_else(|| first_object_span(text))
}

/// Content of the first ```json ... ``` block, trimmed.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find(JSON_FENCE)? + JSON_FENCE.len();
    let rest = &text[start..];
    let end = rest.find(FENCE)?;
    let inner = rest[..end].trim();
    (!inner.is_empty()).then_some(inner)
}

/// First brace-delimited span whose braces balance, ignoring braces inside
/// JSON string literals.
fn first_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}
