//! Shared data model for a push evaluation.
//!
//! Everything here is plain data: classification, the changed-file set, rule
//! results, secret findings, and the justification/audit records that let a
//! human override a failure.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Returns true for git's all-zero object id (SHA-1 or SHA-256 width).
///
/// Git sends this sentinel in pre-push records for the side of a ref that does
/// not exist: the local side of a deletion, the remote side of a new branch.
#[must_use]
pub fn is_null_sha(sha: &str) -> bool {
    (sha.len() == 40 || sha.len() == 64) && sha.bytes().all(|b| b == b'0')
}

/// Classification of a repository; selects which metadata rule table applies.
///
/// Serializes to the names used in reports and rule documents:
/// `"General"`, `"PCF"`, `"SHP_IKP"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "test-utils", derive(strum::VariantNames))]
pub enum ProjectType {
    /// No metadata rules apply.
    #[serde(rename = "General")]
    General,
    /// Decision-service repositories.
    #[serde(rename = "PCF")]
    Pcf,
    /// SHP/IKP repositories.
    #[serde(rename = "SHP_IKP")]
    ShpIkp,
}

impl ProjectType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Pcf => "PCF",
            Self::ShpIkp => "SHP_IKP",
        }
    }

    /// Whether metadata rules are evaluated for this type.
    #[must_use]
    pub const fn requires_validation(&self) -> bool {
        matches!(self, Self::Pcf | Self::ShpIkp)
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered set of distinct repository-relative paths.
///
/// Insertion order is preserved and duplicates are dropped on insert. The
/// all-zero sentinel never enters the set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Utf8PathBuf>", into = "Vec<Utf8PathBuf>")]
pub struct ChangeSet {
    paths: Vec<Utf8PathBuf>,
    seen: HashSet<Utf8PathBuf>,
}

impl ChangeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a path, returning false when it was already present or rejected.
    pub fn insert(&mut self, path: impl Into<Utf8PathBuf>) -> bool {
        let path = path.into();
        if path.as_str().is_empty() || is_null_sha(path.as_str()) {
            return false;
        }
        if !self.seen.insert(path.clone()) {
            return false;
        }
        self.paths.push(path);
        true
    }

    #[must_use]
    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.seen.contains(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Utf8PathBuf> {
        self.paths.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Utf8PathBuf] {
        &self.paths
    }
}

impl<P: Into<Utf8PathBuf>> FromIterator<P> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        let mut set = Self::new();
        for path in iter {
            set.insert(path);
        }
        set
    }
}

impl Extend<Utf8PathBuf> for ChangeSet {
    fn extend<I: IntoIterator<Item = Utf8PathBuf>>(&mut self, iter: I) {
        for path in iter {
            self.insert(path);
        }
    }
}

impl From<Vec<Utf8PathBuf>> for ChangeSet {
    fn from(paths: Vec<Utf8PathBuf>) -> Self {
        paths.into_iter().collect()
    }
}

impl From<ChangeSet> for Vec<Utf8PathBuf> {
    fn from(set: ChangeSet) -> Self {
        set.paths
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Utf8PathBuf;
    type IntoIter = std::slice::Iter<'a, Utf8PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

/// How seriously a failing rule is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "test-utils", derive(strum::VariantNames))]
pub enum Severity {
    /// Failure blocks the push unless justified.
    #[default]
    Error,
    /// Failure is reported only.
    Warning,
}

/// Why a rule failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "test-utils", derive(strum::VariantNames))]
pub enum FailureKind {
    MissingField,
    InvalidEnum,
    InvalidFormat,
    InvalidValue,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MissingField => "MissingField",
            Self::InvalidEnum => "InvalidEnum",
            Self::InvalidFormat => "InvalidFormat",
            Self::InvalidValue => "InvalidValue",
        };
        f.write_str(name)
    }
}

/// Outcome of evaluating one rule against one metadata file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub rule_id: String,
    pub file: Utf8PathBuf,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
    pub message: String,
    #[serde(default)]
    pub severity: Severity,
    /// False when a conditional rule's precondition did not hold.
    #[serde(default = "default_true")]
    pub applicable: bool,
}

fn default_true() -> bool {
    true
}

impl ValidationResult {
    #[must_use]
    pub fn pass(rule_id: impl Into<String>, file: impl Into<Utf8PathBuf>) -> Self {
        Self {
            rule_id: rule_id.into(),
            file: file.into(),
            passed: true,
            failure_kind: None,
            message: String::new(),
            severity: Severity::Error,
            applicable: true,
        }
    }

    #[must_use]
    pub fn not_applicable(
        rule_id: impl Into<String>,
        file: impl Into<Utf8PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            applicable: false,
            ..Self::pass(rule_id, file)
        }
    }

    #[must_use]
    pub fn fail(
        rule_id: impl Into<String>,
        file: impl Into<Utf8PathBuf>,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            file: file.into(),
            passed: false,
            failure_kind: Some(kind),
            message: message.into(),
            severity: Severity::Error,
            applicable: true,
        }
    }

    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// A failed result at error severity.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        !self.passed && self.severity == Severity::Error
    }
}

/// A secret signature match. `snippet` is always masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretFinding {
    pub file: Utf8PathBuf,
    /// 1-based line number; 0 for whole-file findings.
    pub line: usize,
    pub signature_id: String,
    pub snippet: String,
}

/// One failure awaiting resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Failure {
    Validation(ValidationResult),
    Secret(SecretFinding),
}

impl Failure {
    #[must_use]
    pub fn is_secret(&self) -> bool {
        matches!(self, Self::Secret(_))
    }

    /// Rule id or signature id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Validation(result) => &result.rule_id,
            Self::Secret(finding) => &finding.signature_id,
        }
    }

    #[must_use]
    pub fn location(&self) -> String {
        match self {
            Self::Validation(result) => result.file.to_string(),
            Self::Secret(finding) if finding.line == 0 => finding.file.to_string(),
            Self::Secret(finding) => format!("{}:{}", finding.file, finding.line),
        }
    }

    /// Stable reference used by justifications and audit records.
    #[must_use]
    pub fn reference(&self) -> FailureRef {
        let (kind, detail) = match self {
            Self::Validation(result) => (FailureRefKind::Validation, result.message.as_str()),
            Self::Secret(finding) => (FailureRefKind::Secret, finding.snippet.as_str()),
        };
        let location = self.location();

        let mut hasher = blake3::Hasher::new();
        for part in [kind.as_str(), self.id(), location.as_str(), detail] {
            hasher.update(part.as_bytes());
            hasher.update(&[0]);
        }

        FailureRef {
            kind,
            id: self.id().to_string(),
            location,
            fingerprint: hasher.finalize().to_hex().to_string(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(result) => {
                let kind = result
                    .failure_kind
                    .map_or_else(String::new, |kind| format!(" ({kind})"));
                write!(
                    f,
                    "[{}] {}{}: {}",
                    result.rule_id, result.file, kind, result.message
                )
            }
            Self::Secret(finding) => write!(
                f,
                "[{}] {}: {}",
                finding.signature_id,
                self.location(),
                finding.snippet
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureRefKind {
    Validation,
    Secret,
}

impl FailureRefKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Secret => "secret",
        }
    }
}

/// Identifies the failure a justification overrides.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FailureRef {
    pub kind: FailureRefKind,
    pub id: String,
    pub location: String,
    /// blake3 over kind, id, location and the (masked) detail.
    pub fingerprint: String,
}

/// Free-text reason a human gave for overriding a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Justification {
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub failure: FailureRef,
    pub reason: String,
}

impl Justification {
    /// Builds a justification stamped now. Returns `None` for a blank reason.
    #[must_use]
    pub fn new(author: impl Into<String>, failure: FailureRef, reason: &str) -> Option<Self> {
        let reason = reason.trim();
        if reason.is_empty() {
            return None;
        }
        Some(Self {
            author: author.into(),
            timestamp: Utc::now(),
            failure,
            reason: reason.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditOutcome {
    JustifiedOverride,
}

/// Where an override happened.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuditContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_type: Option<ProjectType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
}

/// One line of the append-only audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub failure: FailureRef,
    pub reason: String,
    pub outcome: AuditOutcome,
    #[serde(flatten)]
    pub context: AuditContext,
}

impl AuditRecord {
    #[must_use]
    pub fn justified(justification: Justification, context: AuditContext) -> Self {
        Self {
            timestamp: justification.timestamp,
            author: justification.author,
            failure: justification.failure,
            reason: justification.reason,
            outcome: AuditOutcome::JustifiedOverride,
            context,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateDecision {
    Proceed,
    Block,
}

impl GateDecision {
    #[must_use]
    pub const fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed)
    }
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proceed => f.write_str("proceed"),
            Self::Block => f.write_str("block"),
        }
    }
}
