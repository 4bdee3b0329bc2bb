use serde::{Deserialize, Serialize};
use tracing::trace;

use super::webhook::WebhookSpec;

pub const DEFAULT_RANDOM_WEIGHT: u32 = 100;

/// What a directive does once its gating passes. Exactly one is active.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum DirectiveKind {
    /// Dispatch the body as a command line.
    #[default]
    Command,
    Message {
        style: Option<String>,
        text: Option<String>,
        target: Option<String>,
    },
    HostCall {
        result_variable: Option<String>,
    },
    /// `None` when the webhook spec was invalid; the directive then has no effect.
    Webhook(Option<WebhookSpec>),
    Loop {
        source: Option<String>,
        variable: Option<String>,
    },
    Assignment {
        name: Option<String>,
        value: Option<String>,
        suppress_output: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub raw_text: String,
    /// In delay units.
    pub delay: u64,
    pub condition: Option<String>,
    pub else_if_condition: Option<String>,
    pub is_else: bool,
    pub console_actor: bool,
    pub suppress_output: bool,
    pub is_random: bool,
    pub random_weight: u32,
    pub kind: DirectiveKind,
    /// Text left after every marker is stripped, before placeholder resolution.
    pub body: String,
}

impl Directive {
    pub fn new(raw: &str) -> Self {
        Self {
            raw_text: raw.trim().to_string(),
            delay: 0,
            condition: None,
            else_if_condition: None,
            is_else: false,
            console_actor: false,
            suppress_output: false,
            is_random: false,
            random_weight: DEFAULT_RANDOM_WEIGHT,
            kind: DirectiveKind::Command,
            body: String::new(),
        }
    }

    pub fn has_delay(&self) -> bool {
        self.delay > 0
    }

    pub fn has_condition(&self) -> bool {
        self.condition.is_some()
    }

    pub fn is_plain_command(&self) -> bool {
        matches!(self.kind, DirectiveKind::Command)
    }
}

/// Parses one raw action string. Never fails: malformed markers stay in the text.
///
/// Markers are stripped in a fixed order (loop, delay, else-if/else/if,
/// random) and then single-character prefixes are consumed, each at most
/// once, from whatever text remains.
#[tracing::instrument(level = "trace")]
pub fn parse_directive(raw: &str) -> Directive {
    let mut directive = Directive::new(raw);
    let mut action = directive.raw_text.clone();

    let mut loop_spec = None;
    if let Some(section) = take_marker(&mut action, "[foreach:") {
        loop_spec = Some(match section.rfind(':') {
            Some(idx) if idx > 0 => (
                Some(section[..idx].trim().to_string()),
                Some(section[idx + 1..].trim().to_string()),
            ),
            _ => (None, None),
        });
    }

    if let Some(delay) = take_marker(&mut action, "[delay:") {
        directive.delay = delay.trim().parse::<u64>().unwrap_or(0);
    }

    if let Some(condition) = take_marker(&mut action, "[else if:") {
        directive.else_if_condition = Some(condition);
    } else if action.contains("[else]") {
        directive.is_else = true;
        action = action.replace("[else]", "");
    } else if let Some(condition) = take_marker(&mut action, "[if:") {
        directive.condition = Some(condition);
    }

    if let Some(section) = take_marker(&mut action, "[random") {
        directive.is_random = true;
        directive.random_weight = section
            .strip_prefix(':')
            .and_then(|w| w.trim().parse::<u32>().ok())
            .filter(|w| *w > 0)
            .unwrap_or(DEFAULT_RANDOM_WEIGHT);
    }

    let mut action = action.trim();
    action = action.strip_prefix('/').unwrap_or(action);

    let mut kind = None;
    if let Some(rest) = action.strip_prefix("#message") {
        kind = Some(parse_message(rest));
        action = "";
    }

    if let Some(rest) = action.strip_prefix('!') {
        directive.console_actor = true;
        action = rest;
    }
    if let Some(rest) = action.strip_prefix('-') {
        directive.suppress_output = true;
        action = rest;
    }
    if let Some(rest) = action.strip_prefix('+') {
        kind = Some(parse_assignment(rest));
        action = "";
    }
    if let Some(rest) = action.strip_prefix('-') {
        directive.suppress_output = true;
        action = rest;
    }

    let mut host_body = None;
    if let Some(rest) = action.strip_prefix('$') {
        let (body, result_variable) = split_result_capture(rest);
        kind = Some(DirectiveKind::HostCall { result_variable });
        host_body = Some(body);
    } else if let Some(rest) = action.strip_prefix('%') {
        kind = Some(DirectiveKind::Webhook(WebhookSpec::parse(rest)));
        action = rest;
    }

    directive.body = match host_body {
        Some(body) => body.trim().to_string(),
        None => action.trim().to_string(),
    };

    // Message wins over everything: it consumes the string before the prefixes run.
    directive.kind = match (kind, loop_spec) {
        (Some(message @ DirectiveKind::Message { .. }), _) => message,
        (_, Some((source, variable))) => DirectiveKind::Loop { source, variable },
        (Some(kind), None) => kind,
        (None, None) => DirectiveKind::Command,
    };

    trace!("parsed directive: {:?}", directive);
    directive
}

/// Removes the first `open...]` section and returns its inner text.
/// An unclosed marker is left untouched.
fn take_marker(action: &mut String, open: &str) -> Option<String> {
    let start = action.find(open)?;
    let end = start + action[start..].find(']')?;
    let inner_start = start + open.len();
    if end < inner_start {
        return None;
    }
    let inner = action[inner_start..end].to_string();
    action.replace_range(start..=end, "");
    Some(inner)
}

fn parse_message(rest: &str) -> DirectiveKind {
    let mut rest = rest;
    let mut target = None;
    if let Some(after_at) = rest.strip_prefix('@') {
        if let Some(idx) = after_at.find(':').filter(|idx| *idx > 0) {
            target = Some(after_at[..idx].trim().to_string());
            rest = &after_at[idx + 1..];
        }
    } else if let Some(after_colon) = rest.strip_prefix(':') {
        rest = after_colon;
    }

    let (style, text) = match rest.find(':') {
        Some(idx) if idx > 0 => (
            Some(rest[..idx].trim().to_string()),
            Some(rest[idx + 1..].trim().to_string()),
        ),
        _ => {
            let text = rest.trim();
            (None, (!text.is_empty()).then(|| text.to_string()))
        }
    };
    DirectiveKind::Message {
        style,
        text,
        target,
    }
}

fn parse_assignment(rest: &str) -> DirectiveKind {
    let (mut name, value) = match rest.find(':') {
        Some(idx) if idx > 0 => (
            Some(rest[..idx].trim().to_string()),
            Some(rest[idx + 1..].trim().to_string()),
        ),
        _ => (None, None),
    };
    let mut suppress_output = false;
    if let Some(stripped) = name.as_deref().and_then(|n| n.strip_suffix('~')) {
        suppress_output = true;
        name = Some(stripped.to_string());
    }
    DirectiveKind::Assignment {
        name,
        value,
        suppress_output,
    }
}

/// Cuts a `>>var` capture request out of a host command line.
fn split_result_capture(rest: &str) -> (String, Option<String>) {
    let Some(marker) = rest.find(">>") else {
        return (rest.to_string(), None);
    };
    let var_end = rest[marker..]
        .find(' ')
        .map(|i| marker + i)
        .unwrap_or(rest.len());
    let variable = rest[marker + 2..var_end].trim();
    let body = format!("{}{}", &rest[..marker], &rest[var_end..]);
    let variable = (!variable.is_empty()).then(|| variable.to_string());
    (body, variable)
}
