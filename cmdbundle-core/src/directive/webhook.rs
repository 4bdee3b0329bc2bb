use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Parsed form of a `%url[>>[!]var]::headers::body` directive body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WebhookSpec {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub store_variable: Option<String>,
    pub silent: bool,
    /// The store variable name itself carries a placeholder.
    pub dynamic_store_name: bool,
}

impl WebhookSpec {
    /// Returns `None` when the url component is empty.
    ///
    /// The `>>` capture segment is cut out before splitting on `::`, so the
    /// url never absorbs a header or body section.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut store_variable = None;
        let mut silent = false;
        let mut dynamic_store_name = false;

        let owned;
        let mut remaining = raw;
        if let Some(marker) = raw.find(">>") {
            let next_delimiter = raw[marker..]
                .find("::")
                .map(|i| marker + i)
                .unwrap_or(raw.len());
            let mut var_part = raw[marker + 2..next_delimiter].trim();
            if let Some(rest) = var_part.strip_prefix('!') {
                silent = true;
                var_part = rest.trim();
            }
            if !var_part.is_empty() {
                dynamic_store_name = var_part.contains('%');
                store_variable = Some(var_part.to_string());
            }
            owned = format!("{}{}", raw[..marker].trim(), &raw[next_delimiter..]);
            remaining = &owned;
        }

        let mut parts = remaining.splitn(3, "::");
        let url = parts.next().unwrap_or_default().trim();
        if url.is_empty() {
            return None;
        }

        let mut headers = BTreeMap::new();
        if let Some(header_part) = parts.next() {
            for entry in header_part.trim().split(',') {
                if let Some((key, value)) = entry.split_once(':') {
                    headers.insert(key.trim().to_string(), value.trim().to_string());
                }
            }
        }
        let body = parts.next().unwrap_or_default().to_string();

        Some(Self {
            url: url.to_string(),
            headers,
            body,
            store_variable,
            silent,
            dynamic_store_name,
        })
    }

    pub fn should_store_response(&self) -> bool {
        self.store_variable
            .as_deref()
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    }
}
