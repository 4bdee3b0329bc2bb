use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::selection::collapse_random_group;
use crate::actor::Actor;
use crate::bundle::Bundle;
use crate::config::EngineConfig;
use crate::directive::{Directive, DirectiveKind, WebhookSpec, parse_directive};
use crate::eval::condition::evaluate_condition;
use crate::host::{HostServices, WebhookRequest};
use crate::resolver::PlaceholderResolver;
use crate::store::VariableStore;
use crate::styled::{StyledText, TextColor};

pub const PERMISSION_DENIED: &str = "You don't have permission to use this command.";
pub const EMPTY_COMMAND: &str = "Command execution failed - no output from command substitution";

type TaskList = Arc<Mutex<Vec<JoinHandle<()>>>>;

/// Background work started by one invocation: the delayed tail of the
/// directive list and any webhook calls.
#[derive(Debug, Default)]
pub struct InvocationHandle {
    deferred: Option<JoinHandle<()>>,
    webhooks: TaskList,
}

impl InvocationHandle {
    pub fn has_deferred(&self) -> bool {
        self.deferred.is_some()
    }

    /// Waits for the delayed directives, then for every webhook call, including
    /// those started by delayed directives.
    pub async fn wait(self) {
        if let Some(deferred) = self.deferred {
            if let Err(e) = deferred.await {
                error!(error = %e, "deferred directives panicked");
            }
        }
        loop {
            let pending: Vec<JoinHandle<()>> = self.webhooks.lock().await.drain(..).collect();
            if pending.is_empty() {
                break;
            }
            for handle in pending {
                if let Err(e) = handle.await {
                    error!(error = %e, "webhook task panicked");
                }
            }
        }
    }
}

struct ExecutorInner {
    services: HostServices,
    store: Arc<VariableStore>,
    resolver: PlaceholderResolver,
    config: EngineConfig,
    blacklist: HashSet<String>,
}

/// Runs directive lists for actors. Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct BundleExecutor {
    inner: Arc<ExecutorInner>,
}

struct Invocation {
    actor: Actor,
    args: Vec<String>,
    webhooks: TaskList,
}

impl BundleExecutor {
    pub fn new(services: HostServices, store: Arc<VariableStore>, config: EngineConfig) -> Self {
        let resolver = PlaceholderResolver::new(services.clone(), store.clone(), &config);
        let blacklist = config.blacklist();
        Self {
            inner: Arc::new(ExecutorInner {
                services,
                store,
                resolver,
                config,
                blacklist,
            }),
        }
    }

    pub fn store(&self) -> &Arc<VariableStore> {
        &self.inner.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn resolver(&self) -> &PlaceholderResolver {
        &self.inner.resolver
    }

    /// Checks the bundle permission, picks the sub-command (if any) and invokes it.
    pub async fn invoke_bundle(&self, bundle: &Bundle, actor: Actor, args: &[String]) -> InvocationHandle {
        if let Some(permission) = bundle.permission.as_deref() {
            if !self.inner.services.server.has_permission(&actor, permission) {
                info!(bundle = %bundle.name, permission, "permission denied");
                self.notify(&actor, PERMISSION_DENIED, TextColor::Red);
                return InvocationHandle::default();
            }
        }
        let actions = bundle.select_actions(args);
        if actions.is_empty() {
            return InvocationHandle::default();
        }
        self.invoke(actions, actor, args).await
    }

    /// Runs the leading zero-delay directives before returning; everything
    /// from the first delayed directive on runs in one background task, each
    /// directive at `start + cumulative delay`.
    #[tracing::instrument(level = "debug", skip(self, actions, args), fields(actions = actions.len()))]
    pub async fn invoke(&self, actions: &[String], actor: Actor, args: &[String]) -> InvocationHandle {
        let start = Instant::now();
        let parsed: Vec<Directive> = actions.iter().map(|raw| parse_directive(raw)).collect();
        let directives = collapse_random_group(parsed, &mut rand::thread_rng());

        let invocation = Arc::new(Invocation {
            actor,
            args: args.to_vec(),
            webhooks: TaskList::default(),
        });

        let mut current_delay = 0u64;
        let mut deferred: Vec<(Duration, Directive)> = Vec::new();
        for directive in directives {
            let delay = current_delay.saturating_add(directive.delay);
            if delay > 0 {
                current_delay = delay;
                deferred.push((self.delay_offset(delay), directive));
            } else {
                self.execute(&invocation, &directive).await;
            }
        }

        let deferred = (!deferred.is_empty()).then(|| {
            let executor = self.clone();
            let invocation = invocation.clone();
            tokio::spawn(async move {
                for (offset, directive) in deferred {
                    tokio::time::sleep_until(start + offset).await;
                    executor.execute(&invocation, &directive).await;
                }
            })
        });

        InvocationHandle {
            deferred,
            webhooks: invocation.webhooks.clone(),
        }
    }

    fn delay_offset(&self, units: u64) -> Duration {
        let units = u32::try_from(units).unwrap_or(u32::MAX);
        self.inner.config.delay_unit.saturating_mul(units)
    }

    fn notify(&self, actor: &Actor, text: impl Into<String>, color: TextColor) {
        self.inner
            .services
            .server
            .send_text(actor, StyledText::colored(text, color));
    }

    async fn resolve(&self, invocation: &Invocation, text: &str) -> String {
        self.inner
            .resolver
            .resolve(&invocation.actor, text, &invocation.args)
            .await
    }

    /// Gates one directive and hands it to its sink. Failures stay local to the directive.
    async fn execute(&self, invocation: &Invocation, directive: &Directive) {
        let server = self.inner.services.server.as_ref();
        let gate = directive
            .else_if_condition
            .as_deref()
            .or(directive.condition.as_deref());
        if let Some(condition) = gate {
            if !evaluate_condition(server, &invocation.actor, condition, &self.inner.store) {
                debug!(directive = %directive.raw_text, condition, "condition not met");
                return;
            }
        }

        match &directive.kind {
            DirectiveKind::Message {
                style,
                text,
                target,
            } => {
                if let Some(text) = text {
                    self.send_message(invocation, style.as_deref(), text, target.as_deref())
                        .await
                }
            }
            DirectiveKind::Loop { source, variable } => {
                self.run_loop(invocation, directive, source.as_deref(), variable.as_deref())
                    .await
            }
            DirectiveKind::Assignment {
                name,
                value,
                suppress_output,
            } => {
                if let (Some(name), Some(value)) = (name, value) {
                    self.assign(invocation, name, value, *suppress_output).await
                }
            }
            DirectiveKind::HostCall { result_variable } => {
                self.run_host_call(invocation, directive, result_variable.as_deref())
                    .await
            }
            DirectiveKind::Webhook(Some(spec)) => self.start_webhook(invocation, spec).await,
            DirectiveKind::Webhook(None) => {
                debug!(directive = %directive.raw_text, "invalid webhook spec, nothing to do")
            }
            DirectiveKind::Command => {
                let line = self.resolve(invocation, &directive.body).await;
                let as_actor = if directive.console_actor {
                    Actor::Console
                } else {
                    invocation.actor
                };
                self.dispatch(invocation, &as_actor, &line, directive.suppress_output);
            }
        }
    }

    async fn send_message(&self, invocation: &Invocation, style: Option<&str>, text: &str, target: Option<&str>) {
        let text = self.resolve(invocation, text).await;
        let recipient = match target.filter(|t| !t.is_empty()) {
            Some(target) => {
                let name = self.resolve(invocation, target).await;
                match self.inner.services.server.find_online_actor(&name) {
                    Some(actor) => actor,
                    None => {
                        warn!(target = %name, "message target not found");
                        self.notify(
                            &invocation.actor,
                            format!("Player not found: {}", name),
                            TextColor::Red,
                        );
                        return;
                    }
                }
            }
            None => invocation.actor,
        };
        self.inner
            .services
            .server
            .send_text(&recipient, StyledText::from_spec(style, text));
    }

    async fn run_loop(&self, invocation: &Invocation, directive: &Directive, source: Option<&str>, variable: Option<&str>) {
        let (Some(source), Some(variable)) = (source, variable) else {
            warn!(directive = %directive.raw_text, "invalid loop definition");
            return;
        };
        let list = self.resolve(invocation, source).await;
        let multi_line = source.starts_with("&(") || source.starts_with("@(");
        let items: Vec<&str> = if multi_line {
            list.split([',', '\n']).collect()
        } else {
            list.split(',').collect()
        };
        let token = format!("%{}%", variable);
        debug!(items = items.len(), "running loop");
        for item in items.into_iter().map(str::trim).filter(|i| !i.is_empty()) {
            let template = directive.body.replace(&token, item);
            let line = self.resolve(invocation, &template).await;
            self.dispatch(invocation, &invocation.actor, &line, false);
        }
    }

    async fn assign(&self, invocation: &Invocation, name: &str, value: &str, suppress_output: bool) {
        let name = self.resolve(invocation, name).await;
        let value = self.resolve(invocation, value).await;
        self.inner.store.set_for(&invocation.actor, &name, &value);
        debug!(name = %name, "variable set");
        if !suppress_output {
            self.notify(
                &invocation.actor,
                format!("Variable set: {} = {}", name, value),
                TextColor::Green,
            );
        }
    }

    async fn run_host_call(&self, invocation: &Invocation, directive: &Directive, result_variable: Option<&str>) {
        let command = self.resolve(invocation, &directive.body).await;
        if !self.inner.config.host_commands_enabled {
            warn!(command = %command, "host command execution is disabled");
            return;
        }
        let store_variable = match result_variable.filter(|v| !v.is_empty()) {
            Some(variable) => Some(self.resolve(invocation, variable).await),
            None => None,
        };
        let quiet = directive.suppress_output;
        let actor = &invocation.actor;

        let output = match self.inner.services.processes.run(&command).await {
            Ok(output) => output,
            Err(e) => {
                warn!(command = %command, error = %e, "host command failed to run");
                if !quiet {
                    self.notify(actor, format!("Failed to execute host command: {}", e), TextColor::Red);
                }
                return;
            }
        };
        let result = output.output.trim();
        debug!(exit_code = output.exit_code, "host command finished");

        if !output.success() {
            if !quiet {
                self.notify(
                    actor,
                    format!("Host command failed (exit code: {})", output.exit_code),
                    TextColor::Red,
                );
                if !result.is_empty() {
                    self.notify(actor, result, TextColor::DarkRed);
                }
            }
            return;
        }

        match store_variable {
            Some(variable) => {
                self.inner.store.set_for(actor, &variable, result);
                if !quiet {
                    self.notify(
                        actor,
                        format!("Host output stored in variable: {}", variable),
                        TextColor::Green,
                    );
                }
            }
            None if quiet => {}
            None if result.is_empty() => self.notify(
                actor,
                "Host command executed successfully (no output).",
                TextColor::Green,
            ),
            None => {
                for line in result.lines() {
                    self.notify(actor, line, TextColor::Gray);
                }
            }
        }
    }

    async fn start_webhook(&self, invocation: &Invocation, spec: &WebhookSpec) {
        let url = self.resolve(invocation, &spec.url).await;
        if !self.inner.config.webhooks_enabled {
            warn!(url = %url, "webhook execution is disabled");
            return;
        }
        let body = self.resolve(invocation, &spec.body).await;
        let mut headers = spec.headers.clone();
        for value in headers.values_mut() {
            let resolved = self.resolve(invocation, value).await;
            *value = resolved;
        }
        let store_variable = match spec.store_variable.as_deref() {
            Some(variable) if spec.should_store_response() => {
                Some(self.resolve(invocation, variable).await)
            }
            _ => None,
        };

        let request = WebhookRequest { url, headers, body };
        let executor = self.clone();
        let actor = invocation.actor;
        let silent = spec.silent;
        let announce_store = !spec.silent && !spec.dynamic_store_name;
        let handle = tokio::spawn(async move {
            executor
                .finish_webhook(actor, request, store_variable, silent, announce_store)
                .await
        });
        invocation.webhooks.lock().await.push(handle);
    }

    async fn finish_webhook(
        &self,
        actor: Actor,
        request: WebhookRequest,
        store_variable: Option<String>,
        silent: bool,
        announce_store: bool,
    ) {
        let url = request.url.clone();
        let response = match self.inner.services.webhooks.call(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(url = %url, error = %e, "webhook call failed");
                if !silent {
                    self.notify(&actor, format!("Webhook error: {}", e), TextColor::Red);
                }
                return;
            }
        };

        if !response.is_success() {
            warn!(url = %url, status = response.status, "webhook returned an error status");
            if !silent {
                self.notify(
                    &actor,
                    format!("Webhook failed ({}): {}", response.status, response.body),
                    TextColor::Red,
                );
            }
            return;
        }

        info!(url = %url, status = response.status, "webhook executed");
        match store_variable.filter(|v| !v.is_empty()) {
            Some(variable) => {
                self.inner.store.set_for(&actor, &variable, &response.body);
                if announce_store {
                    self.notify(
                        &actor,
                        format!("Webhook response stored in variable: {}", variable),
                        TextColor::Green,
                    );
                }
            }
            None if !silent && !response.body.is_empty() => self.notify(
                &actor,
                format!("Webhook response: {}", response.body),
                TextColor::Green,
            ),
            None => {}
        }
    }

    /// Empty-line and blacklist checks, then the host dispatch.
    fn dispatch(&self, invocation: &Invocation, as_actor: &Actor, line: &str, silent: bool) {
        let line = line.trim();
        if line.is_empty() {
            warn!("refusing to dispatch an empty command");
            self.notify(&invocation.actor, EMPTY_COMMAND, TextColor::Red);
            return;
        }
        let base = line.split_whitespace().next().unwrap_or_default().to_lowercase();
        if self.inner.blacklist.contains(&base) {
            warn!(command = %base, "blacklisted command");
            return;
        }
        debug!(line, silent, "dispatching command");
        self.inner
            .services
            .server
            .dispatch_command(as_actor, line, silent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MockFileAccess, MockProcessRunner, MockServerHost, MockWebhookClient};

    fn executor(server: MockServerHost, config: EngineConfig) -> BundleExecutor {
        executor_with_files(server, MockFileAccess::new(), config)
    }

    fn executor_with_files(server: MockServerHost, files: MockFileAccess, config: EngineConfig) -> BundleExecutor {
        let services = HostServices {
            server: Arc::new(server),
            processes: Arc::new(MockProcessRunner::new()),
            webhooks: Arc::new(MockWebhookClient::new()),
            files: Arc::new(files),
        };
        BundleExecutor::new(services, Arc::new(VariableStore::new()), config)
    }

    /// Accepts any `;;` write; the token itself resolves to nothing.
    fn accepting_files() -> MockFileAccess {
        let mut files = MockFileAccess::new();
        files.expect_write().returning(|_, _, _| Ok(()));
        files
    }

    #[test]
    fn test_delay_offset_scales_by_unit() {
        let config = EngineConfig {
            delay_unit: Duration::from_millis(50),
            ..Default::default()
        };
        let executor = executor(MockServerHost::new(), config);
        assert_eq!(executor.delay_offset(3), Duration::from_millis(150));
        assert_eq!(executor.delay_offset(0), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_blacklist_is_case_insensitive() {
        let mut server = MockServerHost::new();
        server.expect_query_actor().return_const(None);
        server.expect_dispatch_command()
            .withf(|_, line, _| line == "say ok")
            .times(1)
            .return_const(());
        let config = EngineConfig {
            blacklisted_commands: vec!["/Stop".to_string()],
            ..Default::default()
        };
        let executor = executor(server, config);
        let actions = vec!["STOP now".to_string(), "say ok".to_string()];
        let handle = executor.invoke(&actions, Actor::Console, &[]).await;
        assert!(!handle.has_deferred());
        handle.wait().await;
    }

    #[tokio::test]
    async fn test_blacklist_sees_past_leading_whitespace() {
        let mut server = MockServerHost::new();
        server.expect_query_actor().return_const(None);
        server.expect_dispatch_command()
            .withf(|_, line, _| line == "say hi")
            .times(1)
            .return_const(());
        let config = EngineConfig {
            blacklisted_commands: vec!["stop".to_string()],
            ..Default::default()
        };
        let executor = executor_with_files(server, accepting_files(), config);
        let actions = vec![
            ";;audit.log::x stop".to_string(),
            ";;audit.log::x  say hi".to_string(),
        ];
        executor.invoke(&actions, Actor::Console, &[]).await.wait().await;
    }

    #[tokio::test]
    async fn test_empty_command_gets_diagnostic() {
        let mut server = MockServerHost::new();
        server.expect_query_actor().return_const(None);
        server.expect_send_text()
            .withf(|_, text| text.text == EMPTY_COMMAND && text.color == Some(TextColor::Red))
            .times(1)
            .return_const(());
        server.expect_dispatch_command().never();
        let executor = executor_with_files(server, accepting_files(), EngineConfig::default());
        executor
            .invoke(&[";;audit.log::x".to_string()], Actor::Console, &[])
            .await
            .wait()
            .await;
    }

    #[tokio::test]
    async fn test_denied_bundle_runs_nothing() {
        let mut server = MockServerHost::new();
        server.expect_has_permission().return_const(false);
        server.expect_send_text()
            .withf(|_, text| text.text == PERMISSION_DENIED)
            .times(1)
            .return_const(());
        server.expect_dispatch_command().never();
        let executor = executor(server, EngineConfig::default());
        let bundle = Bundle::new("secret", vec!["say hi".to_string()]).with_permission("secret.use");
        let handle = executor
            .invoke_bundle(&bundle, Actor::Player(uuid::Uuid::new_v4()), &[])
            .await;
        assert!(!handle.has_deferred());
    }
}
