//! # LLM Response Parser
//!
//! Turns raw generator output into a JSON array. The raw text is parsed
//! as-is first; if that fails, Markdown code fences and conversational
//! wrapper text are stripped and the result is parsed again.

use crate::error::{Result, SynthSeedError};

/// Parse generator output into the elements of a JSON array.
///
/// Fails if the text is not JSON after fence stripping, or if it parses to
/// something other than an array.
pub fn parse_json_array(table: &str, response: &str) -> Result<Vec<serde_json::Value>> {
    let parsed: serde_json::Value = match serde_json::from_str(response.trim()) {
        Ok(v) => v,
        Err(_) => serde_json::from_str(extract_json_array(response)).map_err(|e| {
            SynthSeedError::Validation {
                table: table.to_string(),
                message: format!(
                    "response is not valid JSON: {}. Response: {}",
                    e,
                    truncate(response, 200),
                ),
            }
        })?,
    };

    match parsed {
        serde_json::Value::Array(items) => Ok(items),
        other => Err(SynthSeedError::Validation {
            table: table.to_string(),
            message: format!("expected a JSON array, got {}", json_kind(&other)),
        }),
    }
}

/// Extract the JSON array from a response that may contain markdown fences
/// or conversational wrapper text.
///
/// Uses a three-tier extraction strategy:
/// 1. Markdown code fences (`\`\`\`json ... \`\`\``)
/// 2. Regex matching `[{...}]`, so brackets in surrounding prose such as
///    `[as requested]` are not picked up
/// 3. Raw trimmed response
fn extract_json_array(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let after_fence = &trimmed[start + 7..];
        if let Some(end) = after_fence.find("```") {
            return after_fence[..end].trim();
        }
    }
    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        if let Some(end) = after_fence.find("```") {
            return after_fence[..end].trim();
        }
    }

    static ARRAY_RE: std::sync::LazyLock<regex::Regex> =
        std::sync::LazyLock::new(|| regex::Regex::new(r"(?s)\[\s*\{.*\}\s*\]").unwrap());

    if let Some(mat) = ARRAY_RE.find(trimmed) {
        return mat.as_str();
    }

    trimmed
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
