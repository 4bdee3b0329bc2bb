use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use cmdbundle_core::host::HostServices;
use cmdbundle_core::{
    Actor, BundleCatalog, BundleExecutor, EngineConfig, Error, InternalResult, VariableStore,
};
use tracing::{debug, info};

use crate::console_host::ConsoleHost;

/// Who runs the directives and what the simulated server looks like.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
    /// Run as this player instead of the console
    #[arg(short, long)]
    pub player: Option<String>,

    /// Additional online players
    #[arg(long = "online", value_delimiter = ',')]
    pub online: Vec<String>,

    /// Permission nodes granted to the player
    #[arg(short, long = "grant")]
    pub grants: Vec<String>,

    /// Make the player an operator
    #[arg(long)]
    pub op: bool,

    /// Team definition `name=member,member`
    #[arg(long = "team")]
    pub teams: Vec<String>,

    /// Override the length of one delay unit
    #[arg(long)]
    pub delay_unit_ms: Option<u64>,

    /// Allow `$` host calls and `&(...)` substitution
    #[arg(long)]
    pub enable_host_commands: bool,

    /// Allow `%` webhook calls
    #[arg(long)]
    pub enable_webhooks: bool,
}

pub struct Session {
    pub host: Arc<ConsoleHost>,
    pub executor: BundleExecutor,
    pub actor: Actor,
}

/// A missing config file means defaults.
pub fn load_config(path: &Path) -> InternalResult<EngineConfig> {
    if path.exists() {
        let config = EngineConfig::from_file(path)?;
        info!("Config loaded.");
        Ok(config)
    } else {
        debug!(path = %path.display(), "no config file, using defaults");
        Ok(EngineConfig::default())
    }
}

pub fn load_catalog(path: &Path) -> InternalResult<BundleCatalog> {
    Ok(BundleCatalog::from_file(path)?)
}

impl SessionArgs {
    pub fn apply(&self, config: &mut EngineConfig) {
        if let Some(ms) = self.delay_unit_ms {
            config.delay_unit = Duration::from_millis(ms);
        }
        config.host_commands_enabled |= self.enable_host_commands;
        config.webhooks_enabled |= self.enable_webhooks;
    }

    fn populate(&self, host: &ConsoleHost) -> InternalResult<Actor> {
        for name in self.online.iter().filter(|n| !n.trim().is_empty()) {
            host.add_player(name.trim());
        }
        for team in &self.teams {
            let (name, members) = team
                .split_once('=')
                .ok_or_else(|| Error::internal(format!("Invalid team definition: {}", team)))?;
            let members = members
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
            host.add_team(name.trim(), members);
        }

        let Some(player) = self.player.as_deref() else {
            return Ok(Actor::Console);
        };
        let actor = host.add_player(player);
        for node in &self.grants {
            host.grant(&actor, node);
        }
        if self.op {
            host.set_op(&actor, true);
        }
        Ok(actor)
    }
}

impl Session {
    pub fn new(mut config: EngineConfig, args: &SessionArgs) -> InternalResult<Self> {
        args.apply(&mut config);
        let host = Arc::new(ConsoleHost::new());
        let actor = args.populate(&host)?;
        let services = HostServices::with_defaults(host.clone(), &config)?;
        let executor = BundleExecutor::new(services, Arc::new(VariableStore::new()), config);
        Ok(Self {
            host,
            executor,
            actor,
        })
    }

    /// Invokes a catalogue bundle and waits for its delayed directives and webhooks.
    pub async fn run_bundle(&self, catalog: &BundleCatalog, name: &str, args: &[String]) -> InternalResult<()> {
        let bundle = catalog
            .get(name)
            .ok_or_else(|| Error::internal(format!("Unknown bundle: {}", name)))?;
        self.executor
            .invoke_bundle(bundle, self.actor, args)
            .await
            .wait()
            .await;
        Ok(())
    }

    pub async fn run_directives(&self, directives: &[String], args: &[String]) {
        self.executor
            .invoke(directives, self.actor, args)
            .await
            .wait()
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdbundle_core::host::ServerHost;

    #[test]
    fn test_overrides_apply_on_top_of_config() {
        let args = SessionArgs {
            delay_unit_ms: Some(20),
            enable_webhooks: true,
            ..Default::default()
        };
        let mut config = EngineConfig::default();
        args.apply(&mut config);
        assert_eq!(config.delay_unit, Duration::from_millis(20));
        assert!(config.webhooks_enabled);
        assert!(!config.host_commands_enabled);
    }

    #[test]
    fn test_populate_player_and_teams() {
        let args = SessionArgs {
            player: Some("Alice".to_string()),
            online: vec!["Bob".to_string()],
            grants: vec!["warp.use".to_string()],
            teams: vec!["red=Alice, Bob".to_string()],
            ..Default::default()
        };
        let host = ConsoleHost::with_writer(Box::new(std::io::sink()));
        let actor = args.populate(&host).unwrap();
        assert!(!actor.is_console());
        assert!(host.has_permission(&actor, "warp.use"));
        assert_eq!(host.online_actors().len(), 2);
        assert_eq!(host.teams()[0].members, vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_invalid_team_definition() {
        let args = SessionArgs {
            teams: vec!["red".to_string()],
            ..Default::default()
        };
        let host = ConsoleHost::with_writer(Box::new(std::io::sink()));
        assert!(args.populate(&host).is_err());
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let config = load_config(Path::new("/no/such/cmdbundle-config.yml")).unwrap();
        assert!(!config.host_commands_enabled);
    }
}
