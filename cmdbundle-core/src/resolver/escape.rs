//! Backslash escapes, hidden behind NUL-wrapped sentinels while the other
//! passes run.

const ESCAPES: &[(&str, &str, &str)] = &[
    ("\\ ", "\u{0}SHELL_CONTINUATION_SPACE\u{0}", "\\ "),
    ("\\\n", "\u{0}SHELL_CONTINUATION_NEWLINE\u{0}", "\\\n"),
    ("\\\\", "\u{0}ESCAPED_BACKSLASH\u{0}", "\\"),
    ("\\|", "\u{0}ESCAPED_PIPE\u{0}", "|"),
    ("\\%", "\u{0}ESCAPED_PERCENT\u{0}", "%"),
    ("\\:", "\u{0}ESCAPED_COLON\u{0}", ":"),
    ("\\[", "\u{0}ESCAPED_LBRACKET\u{0}", "["),
    ("\\]", "\u{0}ESCAPED_RBRACKET\u{0}", "]"),
];

pub fn protect(text: &str) -> String {
    ESCAPES
        .iter()
        .fold(text.to_string(), |acc, (escaped, sentinel, _)| {
            acc.replace(escaped, sentinel)
        })
}

/// Shell continuations come back with their backslash, everything else bare.
pub fn restore(text: &str) -> String {
    ESCAPES
        .iter()
        .rev()
        .fold(text.to_string(), |acc, (_, sentinel, literal)| {
            acc.replace(sentinel, literal)
        })
}
