//! Capabilities the engine consumes from its hosting server.
//!
//! [`ServerHost`] covers the synchronous lookups and sinks (permissions,
//! command dispatch, chat, actor and team queries). The side-effecting
//! capabilities that may block or wait on I/O are async traits with default
//! implementations in the submodules.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actor::{Actor, ActorSnapshot, Team};
use crate::config::EngineConfig;
use crate::styled::StyledText;

pub mod files;
pub mod process;
pub mod webhook;

pub use files::LocalFileAccess;
pub use process::ShellProcessRunner;
pub use webhook::HttpWebhookClient;

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Failed to start process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Process timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Invalid header {name}: {message}")]
    InvalidHeader { name: String, message: String },
    #[error("File error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid file operation: {0}")]
    InvalidFileOperation(String),
}

pub type HostResult<T> = Result<T, HostError>;

#[automock]
pub trait ServerHost: Send + Sync {
    fn has_permission(&self, actor: &Actor, node: &str) -> bool;

    /// Runs `command_line` as `actor`. With `silent` the host should swallow
    /// whatever console output the command produces.
    fn dispatch_command(&self, actor: &Actor, command_line: &str, silent: bool);

    fn send_text(&self, actor: &Actor, text: StyledText);

    /// `None` for the console or an actor that went offline.
    fn query_actor(&self, actor: &Actor) -> Option<ActorSnapshot>;

    /// Exact (case-insensitive) name lookup among online players.
    fn find_online_actor(&self, name: &str) -> Option<Actor>;

    fn online_actors(&self) -> Vec<ActorSnapshot>;

    fn teams(&self) -> Vec<Team>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProcessOutput {
    pub exit_code: i32,
    /// Captured stdout followed by stderr.
    pub output: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[automock]
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, command_line: &str) -> HostResult<ProcessOutput>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WebhookRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: String,
}

impl WebhookResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[automock]
#[async_trait]
pub trait WebhookClient: Send + Sync {
    async fn call(&self, request: WebhookRequest) -> HostResult<WebhookResponse>;
}

#[automock]
#[async_trait]
pub trait FileAccess: Send + Sync {
    /// Whole (trimmed) file content, or the value at the dotted `key` of a
    /// YAML document. A missing file reads as the empty string.
    async fn read(&self, path: &str, key: Option<String>) -> HostResult<String>;

    /// Replaces the file content, or sets one dotted `key` in a YAML document.
    async fn write(&self, path: &str, key: Option<String>, value: &str) -> HostResult<()>;
}

/// Handles to every capability one engine uses.
#[derive(Clone)]
pub struct HostServices {
    pub server: Arc<dyn ServerHost>,
    pub processes: Arc<dyn ProcessRunner>,
    pub webhooks: Arc<dyn WebhookClient>,
    pub files: Arc<dyn FileAccess>,
}

impl HostServices {
    /// Shell, HTTP and local file capabilities configured from `config`.
    pub fn with_defaults(server: Arc<dyn ServerHost>, config: &EngineConfig) -> HostResult<Self> {
        Ok(Self {
            server,
            processes: Arc::new(ShellProcessRunner::from_config(config)),
            webhooks: Arc::new(HttpWebhookClient::new(config.webhook_timeout)?),
            files: Arc::new(LocalFileAccess::new(config.data_dir.clone())),
        })
    }

    pub fn with_processes(mut self, processes: Arc<dyn ProcessRunner>) -> Self {
        self.processes = processes;
        self
    }

    pub fn with_webhooks(mut self, webhooks: Arc<dyn WebhookClient>) -> Self {
        self.webhooks = webhooks;
        self
    }

    pub fn with_files(mut self, files: Arc<dyn FileAccess>) -> Self {
        self.files = files;
        self
    }
}
