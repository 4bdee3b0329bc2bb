//! Invocation argument tokens.
//!
//! | token | value |
//! |---|---|
//! | `%args%` | every argument, space-joined |
//! | `%argN%` | the N-th argument (1-based) |
//! | `%argN-%` | arguments N.. space-joined, empty when out of range |
//! | `%argN-::d%` | same, `d` when out of range |
//! | `%argN::d%`, `%argN\|d%` | the N-th argument or `d` |

use super::scan::replace_delimited;

pub fn replace_arguments(text: &str, args: &[String]) -> String {
    let mut text = text.replace("%args%", &args.join(" "));

    let bound = (args.len() + 5).max(10);
    for n in 1..=bound {
        let tail = (n <= args.len()).then(|| args[n - 1..].join(" "));
        text = replace_delimited(&text, &format!("%arg{}-::", n), "%", |default| {
            Some(tail.clone().unwrap_or_else(|| default.to_string()))
        });
        text = text.replace(&format!("%arg{}-%", n), tail.as_deref().unwrap_or_default());
    }

    replace_delimited(&text, "%arg", "%", |inner| {
        let positional = |index: &str| {
            index
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| args.get(i))
                .cloned()
        };
        let Some((index, default)) = inner
            .split_once("::")
            .or_else(|| inner.split_once('|'))
        else {
            return positional(inner);
        };
        Some(positional(index).unwrap_or_else(|| default.to_string()))
    })
}
