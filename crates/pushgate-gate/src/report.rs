//! Gate reports: one [`RefReport`] per evaluated ref, aggregated into a
//! [`PushReport`] that carries the decision and the exit code.

use pushgate_engine::{ResolutionState, ResolutionSummary, ScanReport};
use pushgate_utils::error::{GateError, RangeError, RunnerError};
use pushgate_utils::exit_codes::ExitCode;
use pushgate_utils::types::{ChangeSet, GateDecision, ProjectType};
use pushgate_validation::MetadataReport;
use pushgate_workspace::Classification;
use serde::Serialize;
use std::fmt;

/// Why a ref (or the whole push) was blocked.
///
/// Declaration order is exit-code priority: when several causes apply, the
/// first one listed decides the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCause {
    Interrupted,
    Config,
    Timeout,
    Range,
    Secret,
    Violation,
    Internal,
}

impl BlockCause {
    #[must_use]
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Interrupted => ExitCode::INTERRUPTED,
            Self::Config => ExitCode::CLI_ARGS,
            Self::Timeout => ExitCode::TIMEOUT,
            Self::Range => ExitCode::RANGE_RESOLUTION,
            Self::Secret => ExitCode::SECRET_DETECTED,
            Self::Violation => ExitCode::POLICY_VIOLATION,
            Self::Internal => ExitCode::INTERNAL,
        }
    }

    #[must_use]
    pub fn from_error(error: &GateError) -> Self {
        match error {
            GateError::Config(_) => Self::Config,
            GateError::Range(RangeError::Timeout { .. })
            | GateError::Runner(RunnerError::Timeout { .. }) => Self::Timeout,
            GateError::Scan(e) if e.is_timeout() => Self::Timeout,
            GateError::Range(_) | GateError::HookInput(_) => Self::Range,
            GateError::Interrupted => Self::Interrupted,
            _ => Self::Internal,
        }
    }
}

/// Individual condition evaluated by the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateCondition {
    pub name: String,
    pub description: String,
    pub passed: bool,
    pub actual: Option<String>,
    pub expected: Option<String>,
}

impl GateCondition {
    pub fn new(
        name: &str,
        description: &str,
        passed: bool,
        actual: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            passed,
            actual: Some(actual.into()),
            expected: Some(expected.into()),
        }
    }
}

/// Evaluation of one ref update (or one manual target).
#[derive(Debug, Clone, Serialize)]
pub struct RefReport {
    pub ref_name: String,
    pub range: String,
    pub project_type: ProjectType,
    pub changes: ChangeSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ResolutionSummary>,
    pub conditions: Vec<GateCondition>,
    pub diagnostics: Vec<String>,
    pub decision: GateDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<BlockCause>,
}

impl RefReport {
    #[must_use]
    pub fn new(ref_name: impl Into<String>, range: impl Into<String>, project_type: ProjectType) -> Self {
        Self {
            ref_name: ref_name.into(),
            range: range.into(),
            project_type,
            changes: ChangeSet::new(),
            metadata: None,
            scan: None,
            resolution: None,
            conditions: Vec::new(),
            diagnostics: Vec::new(),
            decision: GateDecision::Proceed,
            cause: None,
        }
    }

    /// Block with `cause`, keeping the highest-priority cause seen so far.
    pub fn block(&mut self, cause: BlockCause, diagnostic: impl Into<String>) {
        self.decision = GateDecision::Block;
        self.cause = Some(self.cause.map_or(cause, |current| current.min(cause)));
        self.diagnostics.push(diagnostic.into());
    }

    /// Block on a stage error.
    pub fn block_on(&mut self, error: &GateError) {
        self.block(BlockCause::from_error(error), error.display_for_user());
    }
}

/// Aggregate over every ref in a push.
#[derive(Debug, Clone, Serialize)]
pub struct PushReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hooks_path: Option<String>,
    pub refs: Vec<RefReport>,
    pub diagnostics: Vec<String>,
    pub decision: GateDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<BlockCause>,
}

impl Default for PushReport {
    fn default() -> Self {
        Self {
            classification: None,
            hooks_path: None,
            refs: Vec::new(),
            diagnostics: Vec::new(),
            decision: GateDecision::Proceed,
            cause: None,
        }
    }
}

impl PushReport {
    #[must_use]
    pub fn new(classification: Classification, hooks_path: Option<String>) -> Self {
        Self {
            classification: Some(classification),
            hooks_path,
            ..Self::default()
        }
    }

    /// A push that was blocked before any ref could be evaluated.
    #[must_use]
    pub fn from_error(error: &GateError) -> Self {
        let mut report = Self::default();
        report.block(BlockCause::from_error(error), error.display_for_user());
        report
    }

    pub fn push_ref(&mut self, report: RefReport) {
        if !report.decision.is_proceed() {
            self.decision = GateDecision::Block;
        }
        self.refs.push(report);
    }

    pub fn block(&mut self, cause: BlockCause, diagnostic: impl Into<String>) {
        self.decision = GateDecision::Block;
        self.cause = Some(self.cause.map_or(cause, |current| current.min(cause)));
        self.diagnostics.push(diagnostic.into());
    }

    /// Highest-priority cause across the push and its refs.
    #[must_use]
    pub fn primary_cause(&self) -> Option<BlockCause> {
        self.cause
            .into_iter()
            .chain(self.refs.iter().filter_map(|r| r.cause))
            .min()
    }

    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match (self.decision, self.primary_cause()) {
            (_, Some(cause)) => cause.exit_code(),
            (GateDecision::Block, None) => ExitCode::INTERNAL,
            (GateDecision::Proceed, None) => ExitCode::SUCCESS,
        }
    }
}

impl fmt::Display for RefReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ({}) ==", self.ref_name, self.range)?;
        writeln!(f, "Project type: {}", self.project_type)?;
        writeln!(f, "Changed files: {}", self.changes.len())?;

        if let Some(metadata) = &self.metadata {
            if metadata.skipped {
                writeln!(f, "Metadata: skipped ({} has no metadata rules)", self.project_type)?;
            } else {
                writeln!(
                    f,
                    "Metadata: {} file(s), {} failing rule(s)",
                    metadata.files.len(),
                    metadata.blocking().count()
                )?;
            }
            for result in metadata.blocking() {
                let kind = result
                    .failure_kind
                    .map_or_else(String::new, |kind| format!(" ({kind})"));
                writeln!(f, "  ✗ [{}] {}{}: {}", result.rule_id, result.file, kind, result.message)?;
            }
            for result in metadata.warnings() {
                writeln!(f, "  ! [{}] {}: {}", result.rule_id, result.file, result.message)?;
            }
        }

        match &self.scan {
            Some(scan) => {
                writeln!(
                    f,
                    "Secret scan: {} finding(s), {} excluded, {} skipped",
                    scan.findings.len(),
                    scan.excluded.len(),
                    scan.skipped.len()
                )?;
                for finding in &scan.findings {
                    writeln!(
                        f,
                        "  ✗ {}:{} [{}] {}",
                        finding.file, finding.line, finding.signature_id, finding.snippet
                    )?;
                }
                for skipped in &scan.skipped {
                    writeln!(f, "  - skipped {}: {}", skipped.file, skipped.reason)?;
                }
            }
            None if !self.changes.is_empty() => writeln!(f, "Secret scan: disabled")?,
            None => {}
        }

        if let Some(resolution) = &self.resolution
            && !resolution.outcomes.is_empty()
        {
            writeln!(f, "Resolution:")?;
            for outcome in &resolution.outcomes {
                let state = match outcome.state {
                    ResolutionState::Recorded => "justified",
                    ResolutionState::Rejected => "accepted as violation",
                    ResolutionState::Interrupted => "interrupted",
                    ResolutionState::NotPresented => "not presented",
                };
                write!(f, "  {} {}: {state}", outcome.failure.id, outcome.failure.location)?;
                match &outcome.reason {
                    Some(reason) => writeln!(f, " ({reason})")?,
                    None => writeln!(f)?,
                }
            }
        }

        for diagnostic in &self.diagnostics {
            writeln!(f, "{}", diagnostic.trim_end())?;
        }

        write!(f, "Decision: {}", self.decision)
    }
}

impl fmt::Display for PushReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(classification) = &self.classification {
            writeln!(
                f,
                "Repository: {} ({})",
                classification.repo_name.as_deref().unwrap_or("unknown"),
                classification.project_type
            )?;
        }
        if let Some(hooks_path) = &self.hooks_path {
            writeln!(f, "Hooks path: {hooks_path}")?;
        }
        if self.refs.is_empty() && self.diagnostics.is_empty() {
            writeln!(f, "Nothing to validate")?;
        }

        for report in &self.refs {
            writeln!(f)?;
            writeln!(f, "{report}")?;
        }

        for diagnostic in &self.diagnostics {
            writeln!(f)?;
            writeln!(f, "{}", diagnostic.trim_end())?;
        }

        writeln!(f)?;
        if self.decision.is_proceed() {
            write!(f, "✓ Push may proceed")
        } else {
            write!(f, "✗ Push blocked")
        }
    }
}
