use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

use super::{FileAccess, HostError, HostResult};

/// Plain files and YAML documents on the local filesystem.
///
/// Reads try the path as given and then relative to `data_dir`; writes to a
/// relative path always land under `data_dir`.
#[derive(Debug, Clone)]
pub struct LocalFileAccess {
    data_dir: PathBuf,
}

impl LocalFileAccess {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    async fn locate(&self, path: &str) -> Option<PathBuf> {
        let literal = PathBuf::from(path);
        if tokio::fs::try_exists(&literal).await.unwrap_or(false) {
            return Some(literal);
        }
        let under_data = self.data_dir.join(path);
        if tokio::fs::try_exists(&under_data).await.unwrap_or(false) {
            return Some(under_data);
        }
        None
    }

    fn write_target(&self, path: &str) -> PathBuf {
        let literal = Path::new(path);
        if literal.is_absolute() {
            literal.to_path_buf()
        } else {
            self.data_dir.join(literal)
        }
    }
}

async fn read_string(path: &Path) -> HostResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| HostError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn parse_document(content: &str) -> HostResult<Value> {
    if content.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_yaml::from_str(content)?)
}

fn lookup<'a>(document: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(document, |current, part| current.get(part))
}

fn render(value: &Value) -> HostResult<String> {
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => serde_yaml::to_string(other)?.trim().to_string(),
    })
}

fn ensure_mapping(value: &mut Value) -> &mut Mapping {
    if !value.is_mapping() {
        *value = Value::Mapping(Mapping::new());
    }
    match value {
        Value::Mapping(mapping) => mapping,
        _ => unreachable!("value was just replaced by a mapping"),
    }
}

/// Sets `a.b.c`, creating (or replacing non-mapping) intermediate nodes.
fn set_path(document: &mut Value, key: &str, value: Value) {
    let mut current = document;
    let mut parts = key.split('.').peekable();
    while let Some(part) = parts.next() {
        let mapping = ensure_mapping(current);
        let slot = Value::String(part.to_string());
        if parts.peek().is_none() {
            mapping.insert(slot, value);
            return;
        }
        current = mapping
            .entry(slot)
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }
}

/// Integer, then float, then boolean, then string.
pub fn parse_typed_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i32>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::Number(f.into());
    }
    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    Value::String(raw.to_string())
}

#[async_trait]
impl FileAccess for LocalFileAccess {
    async fn read(&self, path: &str, key: Option<String>) -> HostResult<String> {
        let Some(located) = self.locate(path).await else {
            warn!(path, "file not found");
            return Ok(String::new());
        };
        let content = read_string(&located).await?;
        match key.as_deref() {
            None => Ok(content.trim().to_string()),
            Some(key) => {
                let document = parse_document(&content)?;
                lookup(&document, key).map(render).unwrap_or(Ok(String::new()))
            }
        }
    }

    async fn write(&self, path: &str, key: Option<String>, value: &str) -> HostResult<()> {
        let target = self.write_target(path);
        let io_error = |source| HostError::Io {
            path: target.clone(),
            source,
        };
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
        }

        let content = match key.as_deref() {
            None => value.to_string(),
            Some(key) => {
                let mut document = if tokio::fs::try_exists(&target).await.unwrap_or(false) {
                    parse_document(&read_string(&target).await?)?
                } else {
                    Value::Mapping(Mapping::new())
                };
                set_path(&mut document, key, parse_typed_value(value));
                serde_yaml::to_string(&document)?
            }
        };
        tokio::fs::write(&target, content).await.map_err(io_error)?;
        info!(path = %target.display(), key, "file written");
        Ok(())
    }
}
