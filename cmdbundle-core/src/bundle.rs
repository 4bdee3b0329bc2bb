//! Named bundles and the `commands.yml` catalogue they are loaded from.
//!
//! ```yaml
//! commands:
//!   heal:
//!     permission: bundle.heal
//!     actions:
//!       - heal %player%
//!       - "[delay:5] tell %player% Cooldown over!"
//!     subcommands:
//!       all:
//!         - "[foreach:%players%:p] heal %p%"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{self, ConfigError, ConfigResult};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Bundle {
    pub name: String,
    pub actions: Vec<String>,
    pub permission: Option<String>,
    pub subcommands: HashMap<String, Vec<String>>,
}

impl Bundle {
    pub fn new(name: &str, actions: Vec<String>) -> Self {
        Self {
            name: name.to_lowercase(),
            actions,
            ..Default::default()
        }
    }

    pub fn with_permission(mut self, permission: &str) -> Self {
        self.permission = (!permission.is_empty()).then(|| permission.to_string());
        self
    }

    pub fn with_subcommand(mut self, name: &str, actions: Vec<String>) -> Self {
        self.subcommands.insert(name.to_lowercase(), actions);
        self
    }

    /// The sub-command's actions when `args[0]` names one, otherwise the bundle's own.
    pub fn select_actions(&self, args: &[String]) -> &[String] {
        args.first()
            .and_then(|first| self.subcommands.get(&first.to_lowercase()))
            .unwrap_or(&self.actions)
    }
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    commands: BTreeMap<String, BundleEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct BundleEntry {
    #[serde(default)]
    actions: Vec<String>,
    #[serde(default)]
    permission: Option<String>,
    #[serde(default)]
    subcommands: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct BundleCatalog {
    bundles: BTreeMap<String, Bundle>,
}

impl BundleCatalog {
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// An empty document is an empty catalogue.
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: CatalogFile = config::from_str(content)?;
        let bundles = file
            .commands
            .into_iter()
            .map(|(name, entry)| {
                let mut bundle = Bundle::new(&name, entry.actions)
                    .with_permission(entry.permission.as_deref().unwrap_or_default());
                for (sub, actions) in entry.subcommands {
                    bundle = bundle.with_subcommand(&sub, actions);
                }
                (bundle.name.clone(), bundle)
            })
            .collect();
        Ok(Self { bundles })
    }

    pub fn from_bundles(bundles: impl IntoIterator<Item = Bundle>) -> Self {
        Self {
            bundles: bundles
                .into_iter()
                .map(|b| (b.name.clone(), b))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Bundle> {
        self.bundles.get(&name.to_lowercase())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bundles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CATALOG: &str = r##"
commands:
  Heal:
    permission: bundle.heal
    actions:
      - heal %player%
      - "[delay:5] tell %player% Cooldown over!"
    subcommands:
      ALL:
        - "[foreach:%players%:p] heal %p%"
  ping:
    actions:
      - "#message:green:pong"
    permission: ""
"##;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_load_catalog() {
        let catalog = BundleCatalog::from_yaml_str(CATALOG).unwrap();
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["heal", "ping"]);

        let heal = catalog.get("HEAL").unwrap();
        assert_eq!(heal.permission.as_deref(), Some("bundle.heal"));
        assert_eq!(heal.actions.len(), 2);
        assert!(heal.subcommands.contains_key("all"));

        assert_eq!(catalog.get("ping").unwrap().permission, None);
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn test_select_actions() {
        let catalog = BundleCatalog::from_yaml_str(CATALOG).unwrap();
        let heal = catalog.get("heal").unwrap();
        assert_eq!(
            heal.select_actions(&args(&["All"])),
            &["[foreach:%players%:p] heal %p%".to_string()]
        );
        assert_eq!(heal.select_actions(&args(&["Steve"])), heal.actions.as_slice());
        assert_eq!(heal.select_actions(&[]), heal.actions.as_slice());
    }

    #[test]
    fn test_empty_documents() {
        assert!(BundleCatalog::from_yaml_str("").unwrap().is_empty());
        assert!(BundleCatalog::from_yaml_str("other: 1").unwrap().is_empty());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commands.yml");
        std::fs::write(&path, CATALOG).unwrap();
        assert_eq!(BundleCatalog::from_file(&path).unwrap().len(), 2);
        assert!(matches!(
            BundleCatalog::from_file(dir.path().join("nope.yml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
