//! Structured output recovery
//!
//! Models are told to answer with strict JSON but regularly wrap it in a
//! markdown fence or surround it with prose. These helpers recover the JSON
//! text so the agents can decode it into typed results.

use crate::types::{AppError, AppResult};
use serde::de::IgnoredAny;

const FENCE: &str = "```";

/// Strip a leading markdown code fence (with optional `json`/`JSON` tag) and a trailing fence
pub fn strip_json_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix(FENCE) else {
        return trimmed;
    };

    let mut body = rest.trim();
    if let Some(idx) = body.find('\n') {
        let first_line = body[..idx].trim();
        if first_line == "json" || first_line == "JSON" {
            body = body[idx + 1..].trim();
        }
    }

    if let Some(before) = body.strip_suffix(FENCE) {
        body = before;
    }

    body.trim()
}

/// True when `text` is one syntactically valid JSON document
pub fn is_valid_json(text: &str) -> bool {
    serde_json::from_str::<IgnoredAny>(text).is_ok()
}

/// Recover the first well-formed JSON object from raw model text.
///
/// Fences are stripped first; if what remains is valid JSON it is returned
/// as-is. Otherwise the text is scanned for a balanced `{...}` region, ignoring
/// braces inside string literals, and the first region that validates wins.
pub fn extract_json_object(raw: &str) -> AppResult<String> {
    let trimmed = strip_json_code_fences(raw);
    if is_valid_json(trimmed) {
        return Ok(trimmed.to_string());
    }

    let mut search_from = 0;
    while let Some(offset) = trimmed[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = balanced_object_end(trimmed.as_bytes(), start) {
            let candidate = trimmed[start..=end].trim();
            if is_valid_json(candidate) {
                return Ok(candidate.to_string());
            }
        }
        search_from = start + 1;
    }

    Err(AppError::NoJsonObjectFound)
}

/// Index of the `}` that closes the `{` at `start`, skipping quoted strings
fn balanced_object_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (i, &ch) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escape {
                escape = false;
            } else if ch == b'\\' {
                escape = true;
            } else if ch == b'"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}
