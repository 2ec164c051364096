use globset::Glob;
use regex::Regex;

use exemplar_utils::error::ConfigError;

use super::Config;

const KNOWN_PROVIDERS: [&str; 2] = ["claude-cli", "anthropic"];

fn invalid(key: &str, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    }
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if let Some(batch_size) = self.defaults.batch_size {
            if batch_size == 0 {
                return Err(invalid("batch_size", "must be greater than 0"));
            }
            if batch_size > 32 {
                return Err(invalid("batch_size", "exceeds maximum of 32"));
            }
        }

        if let Some(max_iterations) = self.defaults.max_iterations
            && max_iterations > 20
        {
            return Err(invalid("max_iterations", "exceeds maximum of 20"));
        }

        if let Some(timeout) = self.defaults.llm_timeout_secs
            && timeout == 0
        {
            return Err(invalid("llm_timeout_secs", "must be greater than 0"));
        }

        if !KNOWN_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(invalid(
                "llm.provider",
                format!(
                    "'{}' (expected one of: {})",
                    self.llm.provider,
                    KNOWN_PROVIDERS.join(", ")
                ),
            ));
        }

        let threshold = self.quality.failure_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(invalid(
                "quality.failure_threshold",
                format!("{threshold} is outside [0, 1]"),
            ));
        }
        if self.quality.run_timeout_secs == 0 {
            return Err(invalid("quality.run_timeout_secs", "must be greater than 0"));
        }
        if self.quality.install_timeout_secs == 0 {
            return Err(invalid(
                "quality.install_timeout_secs",
                "must be greater than 0",
            ));
        }

        if self.discovery.include.is_empty() {
            return Err(invalid("discovery.include", "at least one pattern is required"));
        }
        for pattern in self.discovery.include.iter().chain(&self.discovery.exclude) {
            Glob::new(pattern)
                .map_err(|e| invalid("discovery", format!("invalid glob '{pattern}': {e}")))?;
        }

        for pattern in &self.example.residue_patterns {
            Regex::new(pattern).map_err(|e| {
                invalid(
                    "example.residue_patterns",
                    format!("invalid regex '{pattern}': {e}"),
                )
            })?;
        }

        if self.example.main_file.trim().is_empty() || self.example.manifest_file.trim().is_empty()
        {
            return Err(invalid("example", "main_file and manifest_file must be set"));
        }

        Ok(())
    }
}
