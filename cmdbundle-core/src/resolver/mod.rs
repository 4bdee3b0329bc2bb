//! Placeholder resolution.
//!
//! [`PlaceholderResolver::resolve`] runs a fixed sequence of passes over a
//! template. Later passes see the output of earlier ones, so the order below
//! is part of the template language:
//!
//! 1. protect backslash escapes
//! 2. invocation arguments
//! 3. actor tokens, then `%var:...%`
//! 4. online players and teams
//! 5. `,,` file reads
//! 6. `;;` file writes
//! 7. `&(...)` command substitution (when host commands are enabled)
//! 8. bare `%name%` variables
//! 9. `{math:...}`
//! 10. restore escapes

use std::sync::Arc;

use tracing::debug;

use crate::actor::Actor;
use crate::config::EngineConfig;
use crate::eval::expression::evaluate_expression;
use crate::host::HostServices;
use crate::store::VariableStore;

pub mod arguments;
pub mod context;
pub mod escape;
pub mod io;
pub mod scan;
pub mod server;

pub use arguments::replace_arguments;
pub use context::RESERVED_PREFIXES;

pub struct PlaceholderResolver {
    services: HostServices,
    store: Arc<VariableStore>,
    host_commands_enabled: bool,
}

impl PlaceholderResolver {
    pub fn new(services: HostServices, store: Arc<VariableStore>, config: &EngineConfig) -> Self {
        Self {
            services,
            store,
            host_commands_enabled: config.host_commands_enabled,
        }
    }

    pub fn store(&self) -> &Arc<VariableStore> {
        &self.store
    }

    #[tracing::instrument(level = "debug", skip(self, args), fields(actor = ?actor))]
    pub async fn resolve(&self, actor: &Actor, text: &str, args: &[String]) -> String {
        let server = self.services.server.as_ref();
        let store = self.store.as_ref();

        let mut text = escape::protect(text);
        text = replace_arguments(&text, args);

        if let Some(snapshot) = server.query_actor(actor) {
            text = context::replace_actor_tokens(&text, &snapshot);
        }
        text = context::replace_variable_tokens(&text, actor, store);

        text = server::replace_server_constants(&text, server, |name| {
            let value = store.resolve(actor, name);
            if value.is_empty() { name.to_string() } else { value }
        });

        text = io::replace_file_reads(&text, self.services.files.as_ref()).await;
        text = io::apply_file_writes(&text, self.services.files.as_ref()).await;
        if self.host_commands_enabled {
            text = io::replace_command_substitutions(&text, self.services.processes.as_ref()).await;
        }

        text = context::apply_variable_fallback(&text, actor, store);
        text = replace_math(&text);
        let resolved = escape::restore(&text);
        debug!(resolved = %resolved, "placeholders resolved");
        resolved
    }
}

/// Replaces each `{math:expr}` with the evaluated result.
pub fn replace_math(text: &str) -> String {
    scan::replace_delimited(text, "{math:", "}", |expr| Some(evaluate_expression(expr)))
}
