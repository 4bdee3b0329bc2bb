//! Cursor-based token scanning shared by the resolver passes.
//!
//! Replacement text is never rescanned, so a value that happens to contain
//! token syntax is spliced in verbatim.

/// Replaces each `open ... close` span with `f(inner)`. Spans for which `f`
/// returns `None` are left as they are.
pub fn replace_delimited<F>(text: &str, open: &str, close: &str, mut f: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(open) {
        let inner_start = start + open.len();
        let Some(len) = rest[inner_start..].find(close) else {
            break;
        };
        let inner_end = inner_start + len;
        match f(&rest[inner_start..inner_end]) {
            Some(value) => {
                out.push_str(&rest[..start]);
                out.push_str(&value);
                rest = &rest[inner_end + close.len()..];
            }
            None => {
                // step past the first byte of `open` so overlapping tokens are still found
                let skip = start + open.chars().next().map(char::len_utf8).unwrap_or(1);
                out.push_str(&rest[..skip]);
                rest = &rest[skip..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Index of the `)` closing a group whose `(` sits just before `from`.
pub fn find_matching_paren(text: &str, from: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in text[from..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(from + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// End of a bare file token: whitespace, a quote, `,` or a closing bracket.
pub fn find_token_end(text: &str, from: usize) -> usize {
    text[from..]
        .char_indices()
        .find(|(_, c)| c.is_whitespace() || matches!(c, '"' | '\'' | ',' | ']' | '}' | ')'))
        .map(|(i, _)| from + i)
        .unwrap_or(text.len())
}
