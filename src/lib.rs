//! pushgate - git pre-push compliance gate
//!
//! pushgate runs from a `pre-push` hook (or by hand) and decides whether a push
//! may proceed. For every pushed ref it:
//!
//! 1. classifies the repository (General, PCF or SHP_IKP),
//! 2. resolves the changed files of the ref update,
//! 3. checks changed API metadata files against the rule table for the project type,
//! 4. scans changed files for secret signatures,
//! 5. presents every failure for justification (interactive runs only) and
//!    records accepted overrides in an append-only audit log.
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! # Hook mode: .git/hooks/pre-push
//! exec pushgate pre-push "$@"
//!
//! # Manual runs
//! pushgate --identify-only
//! pushgate --commit-range origin/main..HEAD --interactive
//! pushgate --files svc/api.meta --json
//! ```
//!
//! # Quick Start (Library)
//!
//! ```no_run
//! use pushgate::{Config, GateContext, NativeRunner, PushGate, RefUpdate};
//!
//! let config = Config::builtin();
//! let context = GateContext::from_config("/path/to/repo", &config);
//! let mut gate = PushGate::new(config, context, NativeRunner::new())?;
//! let report = gate.evaluate_push(&[RefUpdate {
//!     local_ref: "refs/heads/main".into(),
//!     local_sha: "1111111111111111111111111111111111111111".into(),
//!     remote_ref: "refs/heads/main".into(),
//!     remote_sha: "0000000000000000000000000000000000000000".into(),
//! }]);
//! println!("{report}");
//! std::process::exit(report.exit_code().as_i32());
//! # Ok::<(), pushgate::ConfigError>(())
//! ```
//!
//! # JSON Contracts
//!
//! `--json` emits the [`PushReport`] in JCS (RFC 8785) canonical form; see
//! [`emit_push_json`].

pub mod cli;

pub use pushgate_config::{CliArgs, Config, PatternLibrary};
pub use pushgate_engine::{
    AuditLog, BatchPresenter, CommitRange, GitClient, InteractivePresenter, Presenter, Resolution,
    ScanReport, SecretScanner,
};
pub use pushgate_gate::{
    BlockCause, GateCondition, GateContext, PushGate, PushReport, RefReport, RefUpdate,
    emit_push_json, read_ref_updates,
};
pub use pushgate_runner::{NativeRunner, ProcessRunner};
pub use pushgate_utils::error::{ConfigError, GateError, UserFriendlyError};
pub use pushgate_utils::exit_codes::ExitCode;
pub use pushgate_utils::types::{
    AuditRecord, ChangeSet, Failure, GateDecision, Justification, ProjectType, SecretFinding,
    ValidationResult,
};
pub use pushgate_validation::{MetadataReport, MetadataRuleEngine, RuleBook};
pub use pushgate_workspace::{Classification, classify, find_meta_files};
