#![allow(dead_code)]

// Prompt constants for AI word-problem generation.

/// System prompt — enforces JSON-only output.
pub const WORD_PROBLEM_SYSTEM: &str =
    "You are an elementary school math teacher writing worksheet word problems. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON array. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Word-problem prompt template. Replace `{count}`, `{operation}`, and
/// `{max_value}` before sending.
pub const WORD_PROBLEM_PROMPT_TEMPLATE: &str = r#"Write {count} math word problems practicing {operation}.

Return a JSON array with this EXACT schema (no extra fields):
[
  {"question": "Mia has 7 apples and picks 5 more. How many apples does she have now?", "answer": "12"}
]

Rules:
- Every quantity must be a whole number between 1 and {max_value}.
- The answer must be the bare number, as a string, with no units.
- One sentence of setup, one question sentence. Age-appropriate for ages 6-10.
- Vary names, objects, and scenarios. No two problems may reuse the same scenario.
- Exactly {count} problems."#;
