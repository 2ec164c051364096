//! Process exit codes for the exemplar CLI.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `FAILURE` | Any unhandled error |

use crate::error::ExemplarError;

/// Type-safe process exit code.
///
/// ```rust
/// use exemplar_utils::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::from_i32(1), ExitCode::FAILURE);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Any failure surfaced to the user
    pub const FAILURE: ExitCode = ExitCode(1);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(u8::try_from(code.0).unwrap_or(1))
    }
}

impl From<&ExemplarError> for ExitCode {
    fn from(_: &ExemplarError) -> Self {
        ExitCode::FAILURE
    }
}
