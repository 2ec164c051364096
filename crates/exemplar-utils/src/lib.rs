//! Foundation utilities shared by every exemplar crate.
//!
//! Error taxonomy, exit codes, atomic writes, content fingerprints,
//! tracing initialisation, path helpers and the phase identifiers.

pub mod atomic_write;
pub mod error;
pub mod exit_codes;
pub mod fingerprint;
pub mod logging;
pub mod paths;
pub mod types;

pub use error::{
    ConfigError, ErrorCategory, ExemplarError, LlmError, PhaseError, RunnerError, StoreError,
    UserFriendlyError,
};
pub use exit_codes::ExitCode;
pub use types::PhaseId;
