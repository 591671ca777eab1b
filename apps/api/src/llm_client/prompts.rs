// Shared prompt fragments.
// Each feature module that needs LLM calls defines its own prompts.rs alongside it.
// This file contains the cross-cutting output contract.

/// Output contract for every task whose text is handed to the result parser.
pub const STRUCTURED_OUTPUT_INSTRUCTION: &str = r#"## Output Format

You MUST respond with a JSON object in this exact format:
```json
{
  "insights": {
    "fit_reasons": ["reason1", "reason2", "reason3"],
    "company_insights": ["insight1", "insight2", "insight3"],
    "unique_angle": "The one thing that makes this candidate special for this role",
    "curiosity_question": "A thoughtful question showing deep understanding"
  },
  "email": {
    "subject": "Email subject line",
    "body": "The full email body"
  },
  "metadata": {
    "company_name": "Extracted company name",
    "role_title": "Extracted role title",
    "word_count": 125
  }
}
```"#;

/// Closing line for structured tasks.
pub const JSON_ONLY_REMINDER: &str =
    "Remember to output ONLY the JSON format specified in your instructions.";
