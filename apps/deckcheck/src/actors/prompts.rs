// Prompt constants for the critic actors.

/// System prompt for the "problem" critique.
pub const PROBLEM_CRITIC_SYSTEM: &str = "You are a seasoned venture capital partner who has \
    reviewed thousands of startup pitch decks. You critique how clearly and convincingly a \
    slide communicates the problem the startup is solving: who has the problem, how painful \
    it is, and evidence that it is real. Be direct and specific. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Problem critique prompt. Replace `{page_number}`, `{total_pages}`, `{file_name}`
/// and `{page_text}` before sending.
pub const PROBLEM_CRITIC_PROMPT_TEMPLATE: &str = r#"Critique page {page_number} of {total_pages} from the pitch deck "{file_name}".

Focus on the PROBLEM: does this page make the customer's problem clear, urgent and credible?
If the page is not about the problem, rate how well it supports the problem narrative.

Page text:
"""
{page_text}
"""

Return a JSON object with this EXACT schema (no extra fields):
{
  "rating": 7,
  "feedback": "One or two sentences of actionable feedback for the founder.",
  "reasoning": "Why you gave this rating."
}

"rating" MUST be an integer from 1 (very weak) to 10 (excellent)."#;

pub fn build_problem_prompt(
    page_number: i32,
    total_pages: i32,
    file_name: &str,
    page_text: &str,
) -> String {
    let page_number = page_number.to_string();
    let total_pages = total_pages.to_string();
    fill_template(
        PROBLEM_CRITIC_PROMPT_TEMPLATE,
        &[
            ("page_number", page_number.as_str()),
            ("total_pages", total_pages.as_str()),
            ("file_name", file_name),
            ("page_text", page_text),
        ],
    )
}

/// Replaces `{key}` placeholders in one pass. Substituted values are never
/// rescanned, so user text containing `{...}` is kept as-is.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let placeholder = values
            .iter()
            .find(|(key, _)| tail.starts_with(key) && tail[key.len()..].starts_with('}'));
        match placeholder {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}
