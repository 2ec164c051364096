//! Process execution for exemplar.
//!
//! All process execution goes through [`CommandSpec`] so arguments are
//! passed argv-style and never through a shell. [`ProjectRunner`] builds on
//! it to install and execute a generated example directory.

pub mod command_spec;
pub mod process;
pub mod project;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use command_spec::CommandSpec;
pub use exemplar_utils::error::RunnerError;
pub use process::{ProcessOutput, run_command};
pub use project::{ExampleRunner, ProjectKind, ProjectRunner, RunOutcome};
