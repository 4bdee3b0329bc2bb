//! Dotted-path lookup over JSON text stored in variables.
//!
//! This is a depth-counting scanner, not a parser: each segment searches for
//! the first `"key"` occurrence, skips to the following `:` and takes the
//! value span classified by its first character. Anything missing or
//! malformed yields the empty string.

/// Extracts `a.b.c` from `json`, returning `""` when any segment is absent.
pub fn extract_json_value(json: &str, path: &str) -> String {
    let mut current = json.trim().to_string();
    for key in path.split('.') {
        match extract_segment(&current, key) {
            Some(value) => current = value,
            None => {
                tracing::debug!(path, key, "json path segment not found");
                return String::new();
            }
        }
    }
    current
}

fn extract_segment(current: &str, key: &str) -> Option<String> {
    let search_key = format!("\"{}\"", key);
    let key_index = current.find(&search_key)?;
    let colon_index = key_index + current[key_index..].find(':')?;

    let after_colon = &current[colon_index + 1..];
    let value = after_colon.trim_start();
    let first = value.chars().next()?;

    let span = match first {
        '"' => {
            let end = value[1..].find('"')? + 1;
            &value[1..end]
        }
        '{' => &value[..balanced_end(value, '{', '}')],
        '[' => &value[..balanced_end(value, '[', ']')],
        _ => {
            let end = value.find([',', '}', ']']).unwrap_or(value.len());
            value[..end].trim()
        }
    };
    Some(span.to_string())
}

/// Byte offset just past the bracket closing the one at `value[0]`, or the
/// end of input when it never closes.
fn balanced_end(value: &str, open: char, close: char) -> usize {
    let mut depth = 0usize;
    for (i, c) in value.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth == 0 {
                return i + c.len_utf8();
            }
        }
    }
    value.len()
}
