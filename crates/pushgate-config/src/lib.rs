//! Configuration for pushgate.
//!
//! [`Config`] merges built-in defaults, a discovered `.pushgate/config.toml`
//! and CLI flags (in increasing precedence) and remembers where every value
//! came from. [`PatternLibrary`] is the compiled exclusion and signature
//! configuration the scanner consumes; both are loaded once per run.

mod discovery;
mod model;
mod patterns;
mod sources;
mod validation;

pub use model::{
    AuditConfig, BusinessUnitsConfig, CliArgs, Config, ConfigSource, DEFAULT_BUSINESS_UNITS,
    DEFAULT_GIT_TIMEOUT_SECS, DEFAULT_MAX_FILE_BYTES, DEFAULT_MIN_JUSTIFICATION_CHARS,
    DEFAULT_SCAN_TIMEOUT_SECS, Defaults, HooksConfig, MAX_SCAN_WORKERS, PatternsConfig,
    RulesConfig,
};
pub use patterns::{ExclusionsOrigin, PatternLibrary};
