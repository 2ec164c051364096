use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use super::Config;

/// Origin of a resolved configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Cli,
    ConfigFile(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "cli"),
            Self::ConfigFile(path) => write!(f, "config ({})", path.display()),
            Self::Defaults => write!(f, "default"),
        }
    }
}

impl Config {
    /// Effective `[defaults]` values with their source, sorted by key.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        let mut add = |key: &str, value: Option<String>| {
            if let Some(val) = value {
                let source = self
                    .source_attribution
                    .get(key)
                    .map_or_else(|| ConfigSource::Defaults.to_string(), ToString::to_string);
                config.insert(key.to_string(), (val, source));
            }
        };

        add("model", self.defaults.model.clone());
        add("verbose", self.defaults.verbose.map(|v| v.to_string()));
        add("batch_size", self.defaults.batch_size.map(|v| v.to_string()));
        add(
            "max_iterations",
            self.defaults.max_iterations.map(|v| v.to_string()),
        );
        add(
            "llm_timeout_secs",
            self.defaults.llm_timeout_secs.map(|v| v.to_string()),
        );
        add("provider", Some(self.llm.provider.clone()));

        config
    }
}
