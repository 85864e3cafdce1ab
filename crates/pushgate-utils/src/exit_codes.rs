//! Exit code constants for pushgate.
//!
//! A pre-push hook only distinguishes zero (proceed) from non-zero (block), but
//! the manual CLI and CI wrappers use the specific values below to tell the
//! blocking causes apart.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Push may proceed |
//! | 1 | `POLICY_VIOLATION` | Blocked: failures accepted as violations |
//! | 1 | `INTERNAL` | General/internal failure (still a block) |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 8 | `SECRET_DETECTED` | Blocked with an unresolved secret finding |
//! | 10 | `TIMEOUT` | A bounded git, filesystem or scan operation timed out |
//! | 11 | `RANGE_RESOLUTION` | Invalid commit range or hook input |
//! | 130 | `INTERRUPTED` | Justification prompt was interrupted |

/// Exit codes matching the documented exit code table.
///
/// Use the named constants, or [`as_i32()`](Self::as_i32) to get the numeric
/// value for `std::process::exit()`.
///
/// # Example
///
/// ```rust
/// use pushgate_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::SECRET_DETECTED.as_i32(), 8);
/// assert_eq!(ExitCode::SUCCESS, ExitCode::from_i32(0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - every ref may proceed
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Policy violation - at least one failure was accepted as a violation
    pub const POLICY_VIOLATION: ExitCode = ExitCode(1);

    /// Internal error - general failure; the push is blocked
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments or malformed configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Secret detected - an unresolved secret finding blocked the push
    pub const SECRET_DETECTED: ExitCode = ExitCode(8);

    /// Timeout - a bounded operation exceeded its deadline
    pub const TIMEOUT: ExitCode = ExitCode(10);

    /// Range resolution - the commit range or hook input could not be resolved
    pub const RANGE_RESOLUTION: ExitCode = ExitCode(11);

    /// Interrupted - the user cancelled a justification prompt
    pub const INTERRUPTED: ExitCode = ExitCode(130);

    /// Get the numeric exit code value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Create an ExitCode from a raw i32 value.
    ///
    /// Prefer using the named constants when possible.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }

    /// True for the proceed code.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::POLICY_VIOLATION.as_i32(), 1);
        assert_eq!(ExitCode::INTERNAL.as_i32(), 1);
        assert_eq!(ExitCode::CLI_ARGS.as_i32(), 2);
        assert_eq!(ExitCode::SECRET_DETECTED.as_i32(), 8);
        assert_eq!(ExitCode::TIMEOUT.as_i32(), 10);
        assert_eq!(ExitCode::RANGE_RESOLUTION.as_i32(), 11);
        assert_eq!(ExitCode::INTERRUPTED.as_i32(), 130);
    }

    #[test]
    fn test_only_success_is_success() {
        assert!(ExitCode::SUCCESS.is_success());
        for code in [
            ExitCode::POLICY_VIOLATION,
            ExitCode::CLI_ARGS,
            ExitCode::SECRET_DETECTED,
            ExitCode::TIMEOUT,
            ExitCode::RANGE_RESOLUTION,
            ExitCode::INTERRUPTED,
        ] {
            assert!(!code.is_success(), "{code:?} must block");
        }
    }

    #[test]
    fn test_i32_round_trip() {
        let raw: i32 = ExitCode::TIMEOUT.into();
        assert_eq!(ExitCode::from(raw), ExitCode::TIMEOUT);
    }
}
