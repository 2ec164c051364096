//! Hierarchical configuration with discovery and precedence
//! CLI > file > defaults. The file is `.exemplar/config.toml` with
//! `[defaults]`, `[discovery]`, `[llm]`, `[example]` and `[quality]` sections.

mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

pub use cli_args::CliArgs;
pub use model::*;
pub use sources::ConfigSource;

use std::time::Duration;

impl Config {
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.defaults.model.as_deref()
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.defaults.verbose.unwrap_or(false)
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.defaults.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    #[must_use]
    pub fn max_iterations(&self) -> u32 {
        self.defaults.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS)
    }

    #[must_use]
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(
            self.defaults
                .llm_timeout_secs
                .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.quality.run_timeout_secs)
    }

    #[must_use]
    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.quality.install_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            defaults: Defaults::default(),
            discovery: DiscoveryConfig::default(),
            llm: LlmConfig::default(),
            example: ExampleProfile::default(),
            quality: QualityConfig::default(),
            source_attribution: std::collections::HashMap::new(),
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Config {
    /// Defaults with execution disabled, for tests that must not spawn processes.
    pub fn minimal_for_testing() -> Self {
        let mut config = Config::default();
        config.quality.execute = false;
        config
    }
}
