//! Best-effort JSON extraction from model replies (§7.2, §9 "Model reply
//! parsing"). Every node that expects structured output from a model goes
//! through this single utility rather than rolling its own scan, so the
//! leniency policy lives in exactly one place.

use serde_json::Value;

/// Strips common code-fence wrapping (```json ... ``` or ``` ... ```),
/// then finds the first `{` and the matching-depth last `}` and attempts
/// to parse the slice between them. Returns `None` if no balanced object
/// can be found or it doesn't parse — callers substitute documented
/// defaults rather than propagating an error.
pub fn extract_json_object(reply: &str) -> Option<Value> {
    let stripped = strip_code_fences(reply);
    let start = stripped.find('{')?;
    let end = find_matching_close(&stripped[start..])?;
    let candidate = &stripped[start..start + end + 1];
    serde_json::from_str(candidate).ok()
}

fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        rest.trim().strip_suffix("```").unwrap_or(rest).trim()
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest.trim().strip_suffix("```").unwrap_or(rest).trim()
    } else {
        trimmed
    }
}

/// Given a string starting at `{`, returns the index (relative to the
/// start) of the `}` that closes it, tracking brace depth through string
/// literals so braces inside quoted text don't throw off the count.
fn find_matching_close(s: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_a_bare_object() {
        let reply = r#"{"decision": "select", "reasoning": "looks good"}"#;
        assert_eq!(extract_json_object(reply).unwrap(), json!({"decision": "select", "reasoning": "looks good"}));
    }

    #[test]
    fn strips_surrounding_prose_and_fences() {
        let reply = "Here's my analysis:\n```json\n{\"score\": 92}\n```\nLet me know if you need more.";
        assert_eq!(extract_json_object(reply).unwrap(), json!({"score": 92}));
    }

    #[test]
    fn handles_braces_inside_string_values() {
        let reply = r#"{"reasoning": "the { and } chars are fine inside strings", "score": 80}"#;
        assert_eq!(extract_json_object(reply).unwrap()["score"], json!(80));
    }

    #[test]
    fn returns_none_for_unparseable_text() {
        assert!(extract_json_object("no json here at all").is_none());
    }

    #[test]
    fn returns_none_for_unbalanced_braces() {
        assert!(extract_json_object("{\"a\": 1").is_none());
    }
}
