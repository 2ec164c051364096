use std::path::PathBuf;

/// Configuration overrides taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Explicit config file; disables upward discovery.
    pub config_path: Option<PathBuf>,
    pub model: Option<String>,
    pub provider: Option<String>,
    pub verbose: Option<bool>,
    pub batch_size: Option<usize>,
    pub max_iterations: Option<u32>,
}
