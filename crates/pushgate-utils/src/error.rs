use std::fmt;
use std::io;
use thiserror::Error;

pub use pushgate_runner::RunnerError;

/// Library-level error type with rich context and user-friendly reporting.
///
/// `GateError` is the error every pushgate stage reports upward. The gate never
/// lets one of these escape to the hook: each is turned into a Block with a
/// diagnostic, and [`to_exit_code()`](Self::to_exit_code) picks the exit code.
///
/// # Error Categories
///
/// | Category | Description |
/// |----------|-------------|
/// | `Config` | Malformed configuration, pattern library or rule table |
/// | `Range` | Commit range could not be resolved |
/// | `Scan` | Secret scan could not complete |
/// | `Audit` | Audit record could not be appended |
/// | `HookInput` | Malformed pre-push stdin |
/// | `Runner` | Process execution failed |
/// | `Interrupted` | A justification prompt was cancelled |
///
/// # Example
///
/// ```rust
/// use pushgate_utils::error::{ConfigError, GateError};
/// use pushgate_utils::exit_codes::ExitCode;
///
/// let err = GateError::Config(ConfigError::InvalidFile("bad toml".to_string()));
/// assert_eq!(err.to_exit_code(), ExitCode::CLI_ARGS);
/// assert!(err.display_for_user().contains("Suggestions:"));
/// ```
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Commit range error: {0}")]
    Range(#[from] RangeError),

    #[error("Secret scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Audit log error: {0}")]
    Audit(#[from] AuditError),

    #[error("Hook input error: {0}")]
    HookInput(#[from] HookInputError),

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Justification prompt interrupted")]
    Interrupted,
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
    Repository,
    Scanning,
    Audit,
    Input,
    Process,
    FileSystem,
    Interrupted,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Repository => write!(f, "Repository"),
            Self::Scanning => write!(f, "Secret Scanning"),
            Self::Audit => write!(f, "Audit"),
            Self::Input => write!(f, "Hook Input"),
            Self::Process => write!(f, "Process Execution"),
            Self::FileSystem => write!(f, "File System"),
            Self::Interrupted => write!(f, "Interrupted"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },

    #[error("Configuration validation failed: {error_count} errors")]
    ValidationFailed {
        errors: Vec<String>,
        error_count: usize,
    },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => format!("Configuration file not found: {path}"),
            Self::DiscoveryFailed { reason } => {
                format!("Failed to discover configuration: {reason}")
            }
            Self::ValidationFailed { errors, .. } => format!(
                "Configuration validation failed with {} errors: {}",
                errors.len(),
                errors.join(", ")
            ),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "pushgate reads TOML configuration, a JSON exclusions document and a TOML rule table."
                    .to_string(),
            ),
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' option has specific format requirements."
            )),
            Self::NotFound { .. } | Self::DiscoveryFailed { .. } => Some(
                "pushgate searches for .pushgate/config.toml from the repository upward.".to_string(),
            ),
            Self::ValidationFailed { .. } => Some(
                "Every mandatory metadata field must be owned by exactly one rule.".to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the file syntax with a TOML or JSON validator".to_string(),
                "Run 'pushgate --show-config' to see which files were loaded".to_string(),
            ],
            Self::InvalidValue { key, .. } => vec![
                format!("Fix the value of '{key}'"),
                "Glob and regex values must compile".to_string(),
            ],
            Self::NotFound { path } => vec![
                format!("Create the file at {path} or drop the explicit path"),
            ],
            Self::DiscoveryFailed { .. } => vec![
                "Pass --config <path> to skip discovery".to_string(),
            ],
            Self::ValidationFailed { .. } => vec![
                "Remove duplicate rule ids and duplicate field owners".to_string(),
                "Give every enum rule at least one allowed value".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Commit range resolution errors
#[derive(Error, Debug)]
pub enum RangeError {
    #[error("Invalid commit range '{range}': {reason}")]
    InvalidRange { range: String, reason: String },

    #[error("Resolving '{range}' timed out after {timeout_seconds} seconds")]
    Timeout { range: String, timeout_seconds: u64 },

    #[error("git is not available: {reason}")]
    GitUnavailable { reason: String },
}

impl UserFriendlyError for RangeError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidRange { range, reason } => {
                format!("Could not resolve commit range '{range}': {reason}")
            }
            Self::Timeout {
                range,
                timeout_seconds,
            } => format!("Listing changes in '{range}' took longer than {timeout_seconds}s"),
            Self::GitUnavailable { reason } => format!("Could not run git: {reason}"),
        }
    }

    fn context(&self) -> Option<String> {
        Some("The push is blocked because its changed files could not be determined.".to_string())
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidRange { .. } => vec![
                "Check that both commits exist locally ('git fetch' may help)".to_string(),
                "Use the form <from>..<to> or a single revision".to_string(),
            ],
            Self::Timeout { .. } => vec![
                "Raise [defaults] git_timeout_secs or pass --git-timeout".to_string(),
            ],
            Self::GitUnavailable { .. } => vec!["Install git and make sure it is on PATH".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Repository
    }
}

/// Secret scan errors that abort the whole scan
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Secret scan timed out after {timeout_seconds} seconds ({scanned}/{total} files)")]
    Timeout {
        timeout_seconds: u64,
        scanned: usize,
        total: usize,
    },

    /// Metadata discovery or reads overran the same deadline the scan uses.
    #[error("{stage} timed out after {timeout_seconds} seconds ({done} files read)")]
    StageTimeout {
        stage: &'static str,
        timeout_seconds: u64,
        done: usize,
    },

    #[error("Secret scan worker failed: {reason}")]
    WorkerFailed { reason: String },
}

impl ScanError {
    #[must_use]
    pub fn stage_timeout(stage: &'static str, timeout: std::time::Duration, done: usize) -> Self {
        Self::StageTimeout {
            stage,
            timeout_seconds: pushgate_runner::ceil_secs(timeout),
            done,
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::StageTimeout { .. })
    }
}

impl UserFriendlyError for ScanError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        Some("An incomplete scan blocks the push.".to_string())
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Timeout { .. } | Self::StageTimeout { .. } => vec![
                "Raise [defaults] scan_timeout_secs".to_string(),
                "Exclude generated or vendored directories in exclusions.json".to_string(),
            ],
            Self::WorkerFailed { .. } => vec!["Re-run with --verbose for details".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Scanning
    }
}

/// Audit log errors
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Failed to append to audit log {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("Audit log {path} is locked by another process")]
    Locked { path: String },

    #[error("Failed to serialize audit record: {0}")]
    Serialize(String),
}

impl UserFriendlyError for AuditError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        Some("An override is only honoured once its audit record is written.".to_string())
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Write { .. } => vec![
                "Check permissions on the audit log directory".to_string(),
                "Set [audit] log_path to a writable location".to_string(),
            ],
            Self::Locked { .. } => vec!["Wait for the other push to finish and retry".to_string()],
            Self::Serialize(_) => vec!["Re-run with --verbose for details".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Audit
    }
}

/// Malformed pre-push hook input
#[derive(Error, Debug)]
pub enum HookInputError {
    #[error("Malformed ref record on line {line_number}: {reason}")]
    Malformed { line_number: usize, reason: String },

    #[error("Failed to read hook input: {0}")]
    Read(String),
}

impl UserFriendlyError for HookInputError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        Some(
            "git passes one '<local ref> <local sha> <remote ref> <remote sha>' record per line."
                .to_string(),
        )
    }

    fn suggestions(&self) -> Vec<String> {
        vec!["Invoke 'pushgate pre-push' only from a git pre-push hook".to_string()]
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Input
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
            RunnerError::Timeout { .. } => vec!["Raise the git timeout".to_string()],
            _ => vec!["Check that git is installed and on PATH".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Process
    }
}

impl UserFriendlyError for GateError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.user_message(),
            Self::Range(err) => err.user_message(),
            Self::Scan(err) => err.user_message(),
            Self::Audit(err) => err.user_message(),
            Self::HookInput(err) => err.user_message(),
            Self::Runner(err) => err.user_message(),
            Self::Io(err) => format!("File system error: {err}"),
            Self::Interrupted => "Justification was interrupted; the push is blocked".to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(err) => err.context(),
            Self::Range(err) => err.context(),
            Self::Scan(err) => err.context(),
            Self::Audit(err) => err.context(),
            Self::HookInput(err) => err.context(),
            Self::Runner(err) => err.context(),
            Self::Io(_) => None,
            Self::Interrupted => {
                Some("Overrides already recorded stay in the audit log.".to_string())
            }
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(err) => err.suggestions(),
            Self::Range(err) => err.suggestions(),
            Self::Scan(err) => err.suggestions(),
            Self::Audit(err) => err.suggestions(),
            Self::HookInput(err) => err.suggestions(),
            Self::Runner(err) => err.suggestions(),
            Self::Io(_) => vec!["Check file permissions".to_string()],
            Self::Interrupted => vec!["Push again when ready to answer the prompts".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(err) => err.category(),
            Self::Range(err) => err.category(),
            Self::Scan(err) => err.category(),
            Self::Audit(err) => err.category(),
            Self::HookInput(err) => err.category(),
            Self::Runner(err) => err.category(),
            Self::Io(_) => ErrorCategory::FileSystem,
            Self::Interrupted => ErrorCategory::Interrupted,
        }
    }
}

impl GateError {
    /// User-facing message with context and suggestions.
    ///
    /// Output format:
    /// ```text
    /// Error: <message>
    ///
    /// Context: <context>
    ///
    /// Suggestions:
    ///   • <suggestion 1>
    /// ```
    ///
    /// The rendered text is passed through the default secret signature set so
    /// that nothing echoed from a config value or git stderr leaks a credential.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error: {}\n", self.user_message()));

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

        pushgate_redaction::default_signatures().redact_string(&output)
    }

    /// Map this error to the CLI exit code.
    ///
    /// This is the single mapping from errors to exit codes; see
    /// [`ExitCode`](crate::exit_codes::ExitCode) for the table.
    #[must_use]
    pub fn to_exit_code(&self) -> crate::exit_codes::ExitCode {
        use crate::exit_codes::ExitCode;

        match self {
            GateError::Config(_) => ExitCode::CLI_ARGS,
            GateError::Range(RangeError::Timeout { .. }) => ExitCode::TIMEOUT,
            GateError::Range(_) => ExitCode::RANGE_RESOLUTION,
            GateError::HookInput(_) => ExitCode::RANGE_RESOLUTION,
            GateError::Scan(e) if e.is_timeout() => ExitCode::TIMEOUT,
            GateError::Runner(RunnerError::Timeout { .. }) => ExitCode::TIMEOUT,
            GateError::Interrupted => ExitCode::INTERRUPTED,
            _ => ExitCode::INTERNAL,
        }
    }
}
