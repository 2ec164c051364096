use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use exemplar_utils::error::ConfigError;

use super::{
    CliArgs, Config, ConfigSource, Defaults, DiscoveryConfig, ExampleProfile, LlmConfig,
    QualityConfig,
};

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    defaults: Option<Defaults>,
    discovery: Option<DiscoveryConfig>,
    llm: Option<LlmConfig>,
    example: Option<ExampleProfile>,
    quality: Option<QualityConfig>,
}

const DEFAULT_KEYS: [&str; 5] = [
    "model",
    "verbose",
    "batch_size",
    "max_iterations",
    "llm_timeout_secs",
];

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// Searches upward from the current directory when no explicit path is given.
    pub fn discover(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let start_dir = std::env::current_dir().map_err(|e| ConfigError::InvalidFile(format!(
            "cannot determine current directory: {e}"
        )))?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Path-driven variant of [`discover`](Self::discover); avoids process-global cwd in tests.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let mut source_attribution: HashMap<String, ConfigSource> = DEFAULT_KEYS
            .iter()
            .map(|k| ((*k).to_string(), ConfigSource::Defaults))
            .collect();

        let mut defaults = Defaults::default();
        let mut discovery = DiscoveryConfig::default();
        let mut llm = LlmConfig::default();
        let mut example = ExampleProfile::default();
        let mut quality = QualityConfig::default();

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.is_file() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    });
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)?;
            let source = ConfigSource::ConfigFile(path.clone());

            if let Some(file_defaults) = file_config.defaults {
                if file_defaults.model.is_some() {
                    defaults.model = file_defaults.model;
                    source_attribution.insert("model".to_string(), source.clone());
                }
                if file_defaults.verbose.is_some() {
                    defaults.verbose = file_defaults.verbose;
                    source_attribution.insert("verbose".to_string(), source.clone());
                }
                if file_defaults.batch_size.is_some() {
                    defaults.batch_size = file_defaults.batch_size;
                    source_attribution.insert("batch_size".to_string(), source.clone());
                }
                if file_defaults.max_iterations.is_some() {
                    defaults.max_iterations = file_defaults.max_iterations;
                    source_attribution.insert("max_iterations".to_string(), source.clone());
                }
                if file_defaults.llm_timeout_secs.is_some() {
                    defaults.llm_timeout_secs = file_defaults.llm_timeout_secs;
                    source_attribution.insert("llm_timeout_secs".to_string(), source.clone());
                }
            }
            if let Some(d) = file_config.discovery {
                discovery = d;
            }
            if let Some(l) = file_config.llm {
                llm = l;
                source_attribution.insert("provider".to_string(), source.clone());
            }
            if let Some(e) = file_config.example {
                example = e;
            }
            if let Some(q) = file_config.quality {
                quality = q;
            }
        }

        if let Some(model) = &cli_args.model {
            defaults.model = Some(model.clone());
            source_attribution.insert("model".to_string(), ConfigSource::Cli);
        }
        if let Some(verbose) = cli_args.verbose {
            defaults.verbose = Some(verbose);
            source_attribution.insert("verbose".to_string(), ConfigSource::Cli);
        }
        if let Some(batch_size) = cli_args.batch_size {
            defaults.batch_size = Some(batch_size);
            source_attribution.insert("batch_size".to_string(), ConfigSource::Cli);
        }
        if let Some(max_iterations) = cli_args.max_iterations {
            defaults.max_iterations = Some(max_iterations);
            source_attribution.insert("max_iterations".to_string(), ConfigSource::Cli);
        }
        if let Some(provider) = &cli_args.provider {
            llm.provider = provider.clone();
            source_attribution.insert("provider".to_string(), ConfigSource::Cli);
        }

        let config = Config {
            defaults,
            discovery,
            llm,
            example,
            quality,
            source_attribution,
        };
        config.validate()?;
        Ok(config)
    }

    /// Walk upward looking for `.exemplar/config.toml`, stopping at a repository root.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current = Some(start_dir);

        while let Some(dir) = current {
            let candidate = dir.join(".exemplar").join("config.toml");
            if candidate.is_file() {
                return Some(candidate);
            }
            if dir.join(".git").exists() || dir.join(".hg").exists() {
                break;
            }
            current = dir.parent();
        }

        None
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}
