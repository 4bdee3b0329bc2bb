//! Actor-scoped tokens, `%var:...%` lookups and the bare-variable fallback.

use crate::actor::{Actor, ActorSnapshot};
use crate::eval::json_path::extract_json_value;
use crate::store::VariableStore;

use super::scan::replace_delimited;

/// Bare tokens with these prefixes are never treated as implicit variables.
pub const RESERVED_PREFIXES: &[&str] = &[
    "player",
    "uuid",
    "players",
    "players_uuid",
    "playercount",
    "teams",
    "teamplayers",
    "teamplayers_uuid",
    "arg",
    "var",
    "count",
];

/// Renders a float the way the server prints health (`20.0`, `19.5`).
pub fn format_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

pub fn replace_actor_tokens(text: &str, snapshot: &ActorSnapshot) -> String {
    let id = snapshot.id.to_string();
    [
        ("%player%", snapshot.name.clone()),
        ("%uuid%", id.clone()),
        ("%player_uuid%", id),
        ("%world%", snapshot.world.clone()),
        ("%x%", snapshot.block_x().to_string()),
        ("%y%", snapshot.block_y().to_string()),
        ("%z%", snapshot.block_z().to_string()),
        ("%health%", format_decimal(snapshot.health)),
        ("%level%", snapshot.level.to_string()),
        ("%gamemode%", snapshot.gamemode.clone()),
    ]
    .iter()
    .fold(text.to_string(), |acc, (token, value)| acc.replace(token, value))
}

/// Looks up `name` or `name.json.path`, actor scope first. Console lookups only see globals.
pub fn lookup_variable(actor: &Actor, spec: &str, store: &VariableStore) -> String {
    match spec.split_once('.') {
        Some((name, path)) => {
            let json = store.resolve(actor, name);
            if json.is_empty() {
                String::new()
            } else {
                extract_json_value(&json, path)
            }
        }
        None => store.resolve(actor, spec),
    }
}

/// `%var:name%` and `%var:name.path%`; unset variables become empty.
pub fn replace_variable_tokens(text: &str, actor: &Actor, store: &VariableStore) -> String {
    replace_delimited(text, "%var:", "%", |spec| {
        Some(lookup_variable(actor, spec, store))
    })
}

fn is_implicit_variable(token: &str) -> bool {
    if token.contains(':') || token.contains('(') || token.ends_with('-') {
        return false;
    }
    let lower = token.to_lowercase();
    !RESERVED_PREFIXES.iter().any(|prefix| lower.starts_with(prefix))
}

/// Replaces any remaining bare `%name%` that names a set variable.
pub fn apply_variable_fallback(text: &str, actor: &Actor, store: &VariableStore) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('%') {
        let Some(len) = rest[start + 1..].find('%') else {
            break;
        };
        let end = start + 1 + len;
        let token = &rest[start + 1..end];
        let value = if is_implicit_variable(token) {
            store.resolve(actor, token)
        } else {
            String::new()
        };
        if value.is_empty() {
            // the closing `%` may open the next token
            out.push_str(&rest[..end]);
            rest = &rest[end..];
        } else {
            out.push_str(&rest[..start]);
            out.push_str(&value);
            rest = &rest[end + 1..];
        }
    }
    out.push_str(rest);
    out
}
