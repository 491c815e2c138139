//! Lenient JSON extraction from model output.

use serde_json::Value;

/// Extract the first JSON value from free-form model output.
///
/// Handles the usual decorations: fenced code blocks (```json ... ```),
/// leading/trailing prose, and stray text after the closing bracket. Returns
/// `None` when no parseable JSON object or array is present.
pub fn extract_json(text: &str) -> Option<Value> {
    let text = strip_fences(text.trim());

    // Fast path: the whole remainder is JSON.
    if let Ok(v) = serde_json::from_str::<Value>(text) {
        if v.is_object() || v.is_array() {
            return Some(v);
        }
    }

    // Otherwise scan for the first balanced object or array.
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b != b'{' && b != b'[' {
            continue;
        }
        if let Some(end) = balanced_end(bytes, i) {
            if let Ok(v) = serde_json::from_str::<Value>(&text[i..=end]) {
                return Some(v);
            }
        }
    }

    None
}

/// Strip a surrounding markdown code fence, if present.
fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an optional language tag on the fence line.
    let rest = match rest.split_once('\n') {
        Some((_lang, body)) => body,
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Find the index of the bracket closing the one at `start`, string-aware.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let (open, close) = match bytes[start] {
        b'{' => (b'{', b'}'),
        b'[' => (b'[', b']'),
        _ => return None,
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            _ if b == open => depth += 1,
            _ if b == close => {
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
