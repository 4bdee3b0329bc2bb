//! Side-effecting passes: `,,` file reads, `;;` file writes and `&(...)`
//! command substitution.

use tracing::warn;

use crate::host::{FileAccess, ProcessRunner};

use super::scan::{find_matching_paren, find_token_end};

const READ_MARKER: &str = ",,";
const WRITE_MARKER: &str = ";;";
const SUBSTITUTION_MARKER: &str = "&(";

/// `,,path` or `,,path::yaml.key`, spliced in place.
pub async fn replace_file_reads(text: &str, files: &dyn FileAccess) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(READ_MARKER) {
        let spec_start = start + READ_MARKER.len();
        let end = find_token_end(rest, spec_start);
        let spec = &rest[spec_start..end];
        if spec.is_empty() {
            out.push_str(&rest[..spec_start]);
            rest = &rest[spec_start..];
            continue;
        }
        let (path, key) = match spec.split_once("::") {
            Some((path, key)) => (path, Some(key.to_string())),
            None => (spec, None),
        };
        let value = files.read(path, key).await.unwrap_or_else(|e| {
            warn!(path, error = %e, "failed to read file");
            String::new()
        });
        out.push_str(&rest[..start]);
        out.push_str(&value);
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

/// `;;path::content` or `;;path::yaml.key::value`; the token is removed.
pub async fn apply_file_writes(text: &str, files: &dyn FileAccess) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(WRITE_MARKER) {
        let spec_start = start + WRITE_MARKER.len();
        let end = find_token_end(rest, spec_start);
        let spec = &rest[spec_start..end];
        let parts: Vec<&str> = spec.splitn(3, "::").collect();
        let result = match parts.as_slice() {
            [path, content] => files.write(path, None, content).await,
            [path, key, value] => files.write(path, Some(key.to_string()), value).await,
            _ => {
                warn!(spec, "invalid file write syntax");
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!(spec, error = %e, "failed to write file");
        }
        out.push_str(&rest[..start]);
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

/// `&(command)` replaced by the command's output lines joined with spaces.
/// An unclosed group stops the pass.
pub async fn replace_command_substitutions(text: &str, processes: &dyn ProcessRunner) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(SUBSTITUTION_MARKER) {
        let command_start = start + SUBSTITUTION_MARKER.len();
        let Some(end) = find_matching_paren(rest, command_start) else {
            break;
        };
        let command = &rest[command_start..end];
        let value = match processes.run(command).await {
            Ok(output) => output
                .output
                .lines()
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string(),
            Err(e) => {
                warn!(command, error = %e, "command substitution failed");
                String::new()
            }
        };
        out.push_str(&rest[..start]);
        out.push_str(&value);
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    out
}
