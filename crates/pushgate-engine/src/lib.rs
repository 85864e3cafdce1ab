//! The push evaluation stages that touch git, file content and people.
//!
//! - [`GitClient`] resolves a ref update into a [`ChangeSet`](pushgate_utils::types::ChangeSet)
//! - [`SecretScanner`] matches changed file content against the signature set
//! - [`ResolutionController`] walks failures through a [`Presenter`] and
//!   records overrides in the [`AuditLog`]

pub mod audit;
pub mod range;
pub mod resolution;
pub mod scanner;

pub use audit::AuditLog;
pub use range::{CommitRange, GitClient};
pub use resolution::{
    BatchPresenter, InteractivePresenter, MAX_JUSTIFICATION_ATTEMPTS, Presenter, Resolution,
    ResolutionController, ResolutionOutcome, ResolutionState, ResolutionSummary,
};
pub use scanner::{
    FORBIDDEN_FILE_ID, ScanOptions, ScanReport, SecretScanner, SkipReason, SkippedFile,
};
