use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::types::PhaseId;

/// Library-level error type with user-facing reporting.
///
/// Every exemplar crate returns one of the concrete error enums below and
/// the orchestrator lifts them into `ExemplarError`. The CLI renders them
/// with [`display_for_user()`](Self::display_for_user) and exits with
/// [`ExitCode::FAILURE`](crate::ExitCode::FAILURE).
///
/// | Variant | Raised by |
/// |---------|-----------|
/// | `Config` | configuration discovery and validation |
/// | `Phase` | missing upstream documents, fatal phase failures |
/// | `Store` | document store reads and writes |
/// | `Llm` | LLM capability failures that escape a phase |
/// | `Runner` | code execution plumbing |
/// | `Io` | anything else touching the filesystem |
#[derive(Error, Debug)]
pub enum ExemplarError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Phase execution error: {0}")]
    Phase(#[from] PhaseError),

    #[error("Document store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM backend error: {0}")]
    Llm(#[from] LlmError),

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    PhaseExecution,
    LlmIntegration,
    FileSystem,
    Execution,
    Validation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::PhaseExecution => write!(f, "Phase Execution"),
            Self::LlmIntegration => write!(f, "LLM Integration"),
            Self::FileSystem => write!(f, "File System"),
            Self::Execution => write!(f, "Execution"),
            Self::Validation => write!(f, "Validation"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Configuration file not found: {path}")]
    NotFound { path: String },

    #[error("Failed to parse configuration file {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Phase-level errors that abort a phase
#[derive(Error, Debug)]
pub enum PhaseError {
    #[error(
        "Phase {phase} requires document {document} (produced by the {producer} phase), but it does not exist"
    )]
    MissingInput {
        phase: PhaseId,
        document: String,
        producer: PhaseId,
    },

    #[error("The {phase} phase capability call failed: {source}")]
    CapabilityFailed {
        phase: PhaseId,
        #[source]
        source: LlmError,
    },

    #[error("The {phase} phase could not access {path}: {reason}")]
    Filesystem {
        phase: PhaseId,
        path: String,
        reason: String,
    },
}

/// JSON document store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to write document {document} to {path}: {reason}")]
    Write {
        document: String,
        path: String,
        reason: String,
    },

    #[error("Failed to read document {document} from {path}: {reason}")]
    Read {
        document: String,
        path: String,
        reason: String,
    },

    #[error("Document {document} at {path} is not valid: {reason}")]
    Parse {
        document: String,
        path: String,
        reason: String,
    },
}

/// LLM capability errors.
///
/// Boundary validation failures (unparseable or contract-violating output)
/// share this taxonomy as `InvalidResponse`.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Transport-level failure (process spawn, HTTP connectivity)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider authentication failure (401, 403, missing API key)
    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),

    /// Provider quota/rate limit exceeded (429)
    #[error("Provider quota exceeded: {0}")]
    ProviderQuota(String),

    /// Provider service outage (5xx errors)
    #[error("Provider outage: {0}")]
    ProviderOutage(String),

    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Output could not be parsed or failed its contract
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    #[error("Unsupported provider: {0}")]
    Unsupported(String),
}

/// Code execution plumbing errors.
///
/// A failing example is not an error; these cover the runner itself.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Required tool '{tool}' was not found on PATH")]
    ToolNotFound { tool: String },

    #[error("Failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("Timed out after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => format!("The configuration file is invalid: {reason}"),
            Self::NotFound { path } => format!("No configuration file at {path}"),
            Self::Parse { path, reason } => format!("Could not parse {path}: {reason}"),
            Self::InvalidValue { key, value } => {
                format!("Configuration key '{key}' has an invalid value: {value}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        Some(
            "Configuration is resolved from CLI flags, then .exemplar/config.toml, then built-in defaults."
                .to_string(),
        )
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::NotFound { .. } => vec![
                "Check the path passed to --config".to_string(),
                "Omit --config to search for .exemplar/config.toml automatically".to_string(),
            ],
            Self::Parse { .. } | Self::InvalidFile(_) => {
                vec!["Validate the TOML syntax of the configuration file".to_string()]
            }
            Self::InvalidValue { key, .. } => vec![format!("Correct the value of '{key}'")],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

impl UserFriendlyError for PhaseError {
    fn user_message(&self) -> String {
        match self {
            Self::MissingInput {
                phase,
                document,
                producer,
            } => format!(
                "Cannot run the {phase} phase: document {document} is missing (it is produced by the {producer} phase)"
            ),
            Self::CapabilityFailed { phase, source } => {
                format!("The {phase} phase failed while calling the model: {source}")
            }
            Self::Filesystem {
                phase,
                path,
                reason,
            } => format!("The {phase} phase could not access {path}: {reason}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::MissingInput { .. } => Some(
                "Each phase reads the document written by the phase before it.".to_string(),
            ),
            Self::CapabilityFailed { .. } => Some(
                "A partial plan list cannot be merged safely, so the phase was aborted.".to_string(),
            ),
            Self::Filesystem { .. } => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::MissingInput { producer, .. } => vec![
                format!("Run `exemplar {}` first", producer.command()),
                "Or run `exemplar all` to execute the whole pipeline".to_string(),
                "Check that --input points at the directory holding the documents".to_string(),
            ],
            Self::CapabilityFailed { source, .. } => source.suggestions(),
            Self::Filesystem { .. } => {
                vec!["Check permissions on the output and examples directories".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingInput { .. } => ErrorCategory::PhaseExecution,
            Self::CapabilityFailed { .. } => ErrorCategory::LlmIntegration,
            Self::Filesystem { .. } => ErrorCategory::FileSystem,
        }
    }
}

impl UserFriendlyError for StoreError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Parse { .. } => Some(
                "The document may have been truncated by an interrupted run.".to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Write { .. } => vec!["Check free disk space and directory permissions".to_string()],
            Self::Read { .. } => vec!["Check that the input directory is readable".to_string()],
            Self::Parse { .. } => {
                vec!["Re-run the phase that produces this document".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Parse { .. } => ErrorCategory::Validation,
            _ => ErrorCategory::FileSystem,
        }
    }
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::Transport(msg) => format!("Could not reach the LLM provider: {msg}"),
            Self::ProviderAuth(msg) => format!("The LLM provider rejected the credentials: {msg}"),
            Self::ProviderQuota(msg) => format!("The LLM provider quota was exceeded: {msg}"),
            Self::ProviderOutage(msg) => format!("The LLM provider is unavailable: {msg}"),
            Self::Timeout { duration } => {
                format!("The LLM call timed out after {} seconds", duration.as_secs())
            }
            Self::InvalidResponse(msg) => {
                format!("The LLM returned output that does not match the expected shape: {msg}")
            }
            Self::Misconfiguration(msg) => format!("The LLM backend is misconfigured: {msg}"),
            Self::Unsupported(provider) => format!("Unsupported LLM provider '{provider}'"),
        }
    }

    fn context(&self) -> Option<String> {
        None
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ProviderAuth(_) | Self::Misconfiguration(_) => vec![
                "Check the API key environment variable named in [llm.anthropic].api_key_env"
                    .to_string(),
                "Or switch to the claude-cli provider with --provider claude-cli".to_string(),
            ],
            Self::Transport(_) => vec![
                "Check network connectivity, or that the claude binary is installed".to_string(),
            ],
            Self::ProviderQuota(_) | Self::ProviderOutage(_) => {
                vec!["Wait and retry the phase".to_string()]
            }
            Self::Timeout { .. } => {
                vec!["Raise [defaults].llm_timeout_secs in .exemplar/config.toml".to_string()]
            }
            Self::InvalidResponse(_) => vec![
                "Retry the phase; model output varies between calls".to_string(),
                "Try a more capable model with --model".to_string(),
            ],
            Self::Unsupported(_) => {
                vec!["Supported providers are 'claude-cli' and 'anthropic'".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidResponse(_) => ErrorCategory::Validation,
            Self::Misconfiguration(_) | Self::Unsupported(_) => ErrorCategory::Configuration,
            _ => ErrorCategory::LlmIntegration,
        }
    }
}

impl UserFriendlyError for RunnerError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        None
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ToolNotFound { tool } => vec![format!("Install '{tool}' and make sure it is on PATH")],
            Self::Spawn { .. } => vec!["Check that the example directory is accessible".to_string()],
            Self::Timeout { .. } => {
                vec!["Raise [quality].run_timeout_secs in .exemplar/config.toml".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Execution
    }
}

impl UserFriendlyError for ExemplarError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.user_message(),
            Self::Phase(e) => e.user_message(),
            Self::Store(e) => e.user_message(),
            Self::Llm(e) => e.user_message(),
            Self::Runner(e) => e.user_message(),
            Self::Io(e) => format!("File system operation failed: {e}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(e) => e.context(),
            Self::Phase(e) => e.context(),
            Self::Store(e) => e.context(),
            Self::Llm(e) => e.context(),
            Self::Runner(e) => e.context(),
            Self::Io(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(e) => e.suggestions(),
            Self::Phase(e) => e.suggestions(),
            Self::Store(e) => e.suggestions(),
            Self::Llm(e) => e.suggestions(),
            Self::Runner(e) => e.suggestions(),
            Self::Io(_) => vec!["Check file permissions and available disk space".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(e) => e.category(),
            Self::Phase(e) => e.category(),
            Self::Store(e) => e.category(),
            Self::Llm(e) => e.category(),
            Self::Runner(e) => e.category(),
            Self::Io(_) => ErrorCategory::FileSystem,
        }
    }
}

impl ExemplarError {
    /// Message with context and actionable suggestions, suitable for stderr.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut output = format!("Error: {}\n", self.user_message());

        if let Some(ctx) = self.context() {
            output.push_str(&format!("\nContext: {ctx}\n"));
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        output
    }

    /// The phase that raised this error, when known.
    #[must_use]
    pub fn phase(&self) -> Option<PhaseId> {
        match self {
            Self::Phase(PhaseError::MissingInput { phase, .. })
            | Self::Phase(PhaseError::CapabilityFailed { phase, .. })
            | Self::Phase(PhaseError::Filesystem { phase, .. }) => Some(*phase),
            _ => None,
        }
    }
}
