// All LLM prompt constants for the outreach module.
// Reuses the shared output contract from llm_client::prompts.

use crate::llm_client::prompts::{JSON_ONLY_REMINDER, STRUCTURED_OUTPUT_INSTRUCTION};
use crate::outreach::models::{Insights, ResearchDepth};

/// Fixed policy preamble placed ahead of every generation task.
pub const COLDREACH_POLICY: &str = "\
You are the ColdReach Agent, an expert at writing highly personalized cold emails \
for job seekers reaching out to founders and hiring managers. \
Emails must read as if they were written by hand after real research, never like a template.

## Process
1. Resume: identify the candidate's top 3-5 skills, key achievements and standout projects.
2. Job description: extract company name and role title, required skills, the problems \
the company is trying to solve, and any cultural signals.
3. Research: use the web_search tool to find concrete, specific facts about the company \
(founders, funding, product, recent news). Prefer primary sources.
4. Match: pick the top reasons this candidate fits, ONE unique angle, and a curiosity \
question that shows real understanding of the business.
5. Email: 120-150 words, reference at least one researched company fact, connect the \
candidate's strengths to the company's needs, end near the curiosity question. \
Tone: confident, warm, founder-friendly, non-corporate.

## Rules
- NEVER invent company details; only use what research surfaced.
- NEVER exceed 150 words in the email body.
- NEVER use corporate buzzwords such as \"synergy\", \"leverage\" or \"circle back\".";

/// Depth-specific research instructions, indexed by research depth.
pub const RESEARCH_DEPTH_INSTRUCTIONS: [&str; 5] = [
    "Do a QUICK research pass: search for the company once and use the top result. Focus on getting the basics right.",
    "Do a LIGHT research pass: search for the company and read their homepage. Get a sense of what they do.",
    "Do a NORMAL research pass: search for the company, read their homepage and one other relevant page (about, product or careers).",
    "Do a DEEP research pass: search for the company name plus \"news\" and \"funding\". Read their homepage, about page and careers page.",
    "Do a MAX research pass: search extensively for news, funding, product launches and blog posts. Read multiple pages: homepage, about, careers, blog and recent press releases.",
];

fn depth_instruction(depth: ResearchDepth) -> &'static str {
    RESEARCH_DEPTH_INSTRUCTIONS
        .get(usize::from(depth.value()))
        .copied()
        .unwrap_or(RESEARCH_DEPTH_INSTRUCTIONS[2])
}

/// Full instruction for a research-and-write run.
pub fn build_generation_prompt(
    resume_text: &str,
    jd_text: &str,
    company_name: Option<&str>,
    depth: ResearchDepth,
) -> String {
    let company_line = match company_name {
        Some(name) if !name.trim().is_empty() => {
            format!("### Company Name (provided): {name}")
        }
        _ => "### Company Name: Extract from job description".to_string(),
    };

    format!(
        "{COLDREACH_POLICY}

{STRUCTURED_OUTPUT_INSTRUCTION}

## Task: Generate a Personalized Cold Email

{depth}

### Candidate Resume:
```
{resume_text}
```

### Job Description:
```
{jd_text}
```

{company_line}

Now execute the full process:
1. Parse resume and JD
2. Research the company using the web_search tool
3. Analyze the match
4. Generate the personalized email

{JSON_ONLY_REMINDER}",
        depth = depth_instruction(depth),
    )
}

/// Instruction for rewriting the email from cached insights. No research.
pub fn build_regenerate_prompt(resume_text: &str, jd_text: &str, insights: &Insights) -> String {
    let bullet_list = |items: &[String]| {
        items
            .iter()
            .map(|item| format!("- {item}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "{COLDREACH_POLICY}

{STRUCTURED_OUTPUT_INSTRUCTION}

## Task: Write a NEW Version of the Cold Email

Research for this candidate and role is already done. Do NOT perform any new research \
and do NOT call any tools. Write a fresh email with a different opening and structure, \
grounded only in the insights below. Return the insights unchanged in your JSON output.

### Fit Reasons:
{fit_reasons}

### Company Insights:
{company_insights}

### Unique Angle:
{unique_angle}

### Curiosity Question:
{curiosity_question}

### Candidate Resume:
```
{resume_text}
```

### Job Description:
```
{jd_text}
```

{JSON_ONLY_REMINDER}",
        fit_reasons = bullet_list(&insights.fit_reasons),
        company_insights = bullet_list(&insights.company_insights),
        unique_angle = insights.unique_angle,
        curiosity_question = insights.curiosity_question,
    )
}

/// One-shot job description extraction from a URL.
pub fn build_fetch_jd_prompt(url: &str) -> String {
    format!(
        "Use the web_fetch tool to load this URL and extract the job description text: {url}

Return ONLY the job description text, nothing else. \
If you can't find a job description, say so in one sentence."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insights() -> Insights {
        Insights {
            fit_reasons: vec!["Built payment rails".to_string(), "Rust".to_string()],
            company_insights: vec!["Raised $20M Series A".to_string()],
            unique_angle: "Former customer".to_string(),
            curiosity_question: "How do you handle settlement retries?".to_string(),
        }
    }

    #[test]
    fn test_generation_prompt_embeds_inputs_and_depth() {
        let depth = ResearchDepth::new(4).unwrap();
        let prompt = build_generation_prompt("RESUME-BODY", "JD-BODY", Some("Acme"), depth);
        assert!(prompt.starts_with(COLDREACH_POLICY));
        assert!(prompt.contains("RESUME-BODY"));
        assert!(prompt.contains("JD-BODY"));
        assert!(prompt.contains("### Company Name (provided): Acme"));
        assert!(prompt.contains(RESEARCH_DEPTH_INSTRUCTIONS[4]));
        assert!(prompt.contains("\"fit_reasons\""));
    }

    #[test]
    fn test_generation_prompt_without_company_asks_for_extraction() {
        let prompt = build_generation_prompt("r", "j", None, ResearchDepth::default());
        assert!(prompt.contains("Extract from job description"));
        assert!(prompt.contains(RESEARCH_DEPTH_INSTRUCTIONS[2]));

        let blank = build_generation_prompt("r", "j", Some("  "), ResearchDepth::default());
        assert!(blank.contains("Extract from job description"));
    }

    #[test]
    fn test_regenerate_prompt_embeds_cached_insights_and_skips_research() {
        let prompt = build_regenerate_prompt("r", "j", &insights());
        assert!(prompt.contains("- Built payment rails\n- Rust"));
        assert!(prompt.contains("- Raised $20M Series A"));
        assert!(prompt.contains("Former customer"));
        assert!(prompt.contains("How do you handle settlement retries?"));
        assert!(prompt.contains("Do NOT perform any new research"));
    }

    #[test]
    fn test_fetch_prompt_carries_url() {
        let prompt = build_fetch_jd_prompt("https://jobs.example.com/42");
        assert!(prompt.contains("https://jobs.example.com/42"));
    }
}
