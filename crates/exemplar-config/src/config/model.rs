use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::ConfigSource;

pub const DEFAULT_BATCH_SIZE: usize = 3;
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_INSTALL_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_FAILURE_THRESHOLD: f64 = 0.2;

/// Resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub defaults: Defaults,
    pub discovery: DiscoveryConfig,
    pub llm: LlmConfig,
    pub example: ExampleProfile,
    pub quality: QualityConfig,
    /// Where each `[defaults]` key came from.
    pub source_attribution: HashMap<String, ConfigSource>,
}

/// `[defaults]` section. Every key is optional so file and CLI layers can
/// be merged field by field.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    /// Model override. `None` lets the backend pick its own default.
    pub model: Option<String>,
    pub verbose: Option<bool>,
    /// Files analysed concurrently per extraction batch.
    pub batch_size: Option<usize>,
    /// Upper bound on quality/refinement iterations.
    pub max_iterations: Option<u32>,
    pub llm_timeout_secs: Option<u64>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            model: None,
            verbose: Some(false),
            batch_size: Some(DEFAULT_BATCH_SIZE),
            max_iterations: Some(DEFAULT_MAX_ITERATIONS),
            llm_timeout_secs: Some(DEFAULT_LLM_TIMEOUT_SECS),
        }
    }
}

/// `[discovery]` section: which files count as test files.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Subdirectories of the repository to scan. Empty scans the whole repository.
    pub directories: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            include: vec![
                "**/*.test.{ts,tsx,js,jsx,mjs,cjs}".to_string(),
                "**/*.spec.{ts,tsx,js,jsx,mjs,cjs}".to_string(),
                "**/test_*.py".to_string(),
                "**/*_test.py".to_string(),
                "**/*_test.go".to_string(),
                "tests/**/*.rs".to_string(),
            ],
            exclude: vec![
                "**/node_modules/**".to_string(),
                "**/target/**".to_string(),
                "**/dist/**".to_string(),
                "**/build/**".to_string(),
                "**/.git/**".to_string(),
                "**/.exemplar/**".to_string(),
            ],
            directories: Vec::new(),
        }
    }
}

/// `[llm]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `claude-cli` or `anthropic`.
    pub provider: String,
    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,
    pub anthropic: AnthropicConfig,
    pub claude: ClaudeCliConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "claude-cli".to_string(),
            max_retries: 2,
            anthropic: AnthropicConfig::default(),
            claude: ClaudeCliConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnthropicConfig {
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com/v1/messages".to_string(),
            model: "claude-sonnet-4-5".to_string(),
            max_tokens: 8192,
            temperature: 0.2,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClaudeCliConfig {
    pub binary: String,
}

impl Default for ClaudeCliConfig {
    fn default() -> Self {
        Self {
            binary: "claude".to_string(),
        }
    }
}

/// `[example]` section: the shape every generated example must have.
///
/// The default profile is a TypeScript ES module project.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExampleProfile {
    pub language: String,
    pub main_file: String,
    pub manifest_file: String,
    pub readme_file: String,
    pub config_file: Option<String>,
    pub env_template_file: Option<String>,
    /// Library every example must depend on. Falls back to the name declared
    /// in the repository's own manifest when unset.
    pub package_name: Option<String>,
    /// Accepted prefixes for the pinned local/workspace dependency reference.
    pub package_reference_prefixes: Vec<String>,
    /// Required `"type"` value in a JSON manifest.
    pub module_type: Option<String>,
    /// Internal modules examples must not import directly.
    pub forbidden_imports: Vec<String>,
    /// Regexes that betray leftover test-framework code.
    pub residue_patterns: Vec<String>,
}

impl Default for ExampleProfile {
    fn default() -> Self {
        Self {
            language: "typescript".to_string(),
            main_file: "index.ts".to_string(),
            manifest_file: "package.json".to_string(),
            readme_file: "README.md".to_string(),
            config_file: Some("tsconfig.json".to_string()),
            env_template_file: Some(".env.example".to_string()),
            package_name: None,
            package_reference_prefixes: vec![
                "workspace:".to_string(),
                "file:".to_string(),
                "link:".to_string(),
            ],
            module_type: Some("module".to_string()),
            forbidden_imports: Vec::new(),
            residue_patterns: vec![
                r"\bexpect\s*\(".to_string(),
                r"\bassert(?:\.\w+)?\s*\(".to_string(),
                r"\b(?:jest|vi|sinon)\.(?:fn|mock|spyOn|stub)\b".to_string(),
                r"\bspyOn\s*\(".to_string(),
                r"\b(?:describe|it|test|suite)(?:\.\w+)?\s*\(\s*['`]".to_string(),
                r"\b(?:beforeEach|afterEach|beforeAll|afterAll)\s*\(".to_string(),
            ],
        }
    }
}

impl ExampleProfile {
    /// Files the completeness check requires, in a stable order.
    #[must_use]
    pub fn required_files(&self) -> Vec<&str> {
        let mut files = vec![
            self.main_file.as_str(),
            self.manifest_file.as_str(),
            self.readme_file.as_str(),
        ];
        if let Some(config) = &self.config_file {
            files.push(config.as_str());
        }
        files
    }
}

/// `[quality]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Run the runability check. Disabling it marks the check as passed.
    pub execute: bool,
    pub run_timeout_secs: u64,
    pub install_timeout_secs: u64,
    /// Failure fraction above which refinement triggers.
    pub failure_threshold: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            execute: true,
            run_timeout_secs: DEFAULT_RUN_TIMEOUT_SECS,
            install_timeout_secs: DEFAULT_INSTALL_TIMEOUT_SECS,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }
}
