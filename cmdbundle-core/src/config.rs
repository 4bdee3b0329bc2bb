use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to open config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Engine-wide settings, the `config.yml` of a bundle deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default, alias = "blacklisted-commands")]
    pub blacklisted_commands: Vec<String>,

    #[serde(default, alias = "host-commands-enabled")]
    pub host_commands_enabled: bool,

    #[serde(default, alias = "webhooks-enabled")]
    pub webhooks_enabled: bool,

    /// Length of one `[delay:N]` unit.
    #[serde(
        default = "default_delay_unit",
        alias = "delay-unit-ms",
        rename = "delay_unit_ms",
        with = "duration_ms"
    )]
    pub delay_unit: Duration,

    #[serde(
        default = "default_host_command_timeout",
        alias = "host-command-timeout-ms",
        rename = "host_command_timeout_ms",
        with = "duration_ms"
    )]
    pub host_command_timeout: Duration,

    #[serde(
        default = "default_webhook_timeout",
        alias = "webhook-timeout-ms",
        rename = "webhook_timeout_ms",
        with = "duration_ms"
    )]
    pub webhook_timeout: Duration,

    /// Base directory for relative paths in `,,` and `;;` tokens.
    #[serde(default = "default_data_dir", alias = "data-dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_shell")]
    pub shell: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            blacklisted_commands: Vec::new(),
            host_commands_enabled: false,
            webhooks_enabled: false,
            delay_unit: default_delay_unit(),
            host_command_timeout: default_host_command_timeout(),
            webhook_timeout: default_webhook_timeout(),
            data_dir: default_data_dir(),
            shell: default_shell(),
        }
    }
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        from_file(path)
    }

    /// Blacklist entries normalized for lookup against a lowercased base command.
    pub fn blacklist(&self) -> HashSet<String> {
        self.blacklisted_commands
            .iter()
            .map(|c| c.trim().trim_start_matches('/').to_lowercase())
            .filter(|c| !c.is_empty())
            .collect()
    }
}

fn default_delay_unit() -> Duration {
    Duration::from_secs(1)
}

fn default_host_command_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_webhook_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_shell() -> String {
    "sh".to_string()
}

/// Loads any config document; `.json` files go through serde_json, everything else is YAML.
pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> ConfigResult<T> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let reader = BufReader::new(file);
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        Ok(serde_json::from_reader(reader)?)
    } else {
        Ok(serde_yaml::from_reader(reader)?)
    }
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> ConfigResult<T> {
    Ok(serde_yaml::from_str(s)?)
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
