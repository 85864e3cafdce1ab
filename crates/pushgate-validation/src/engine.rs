//! The metadata rule engine.
//!
//! ```text
//! NotStarted -> Evaluating -> Passed | Failed
//! ```
//!
//! General repositories skip `Evaluating` and end `Passed` with no results,
//! flagged `skipped` so reports can tell them apart from an applicable but
//! empty run. Rules are evaluated independently; the report carries every
//! result in table order per file.

use camino::{Utf8Path, Utf8PathBuf};
use pushgate_utils::error::ScanError;
use pushgate_utils::types::{ChangeSet, FailureKind, ProjectType, ValidationResult};
use pushgate_workspace::{find_meta_files, is_metadata_file};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::{PARSE_RULE_ID, PRESENCE_RULE_ID};
use crate::metadata::{MetadataDocument, parse_metadata};
use crate::rulebook::{CompiledRule, RuleBook, parse_version};
use crate::rules::Predicate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    NotStarted,
    Evaluating,
    Passed,
    Failed,
}

/// Outcome of one engine run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataReport {
    pub state: EngineState,
    /// No rule table applies to the project type.
    pub skipped: bool,
    /// Metadata files that were evaluated.
    pub files: Vec<Utf8PathBuf>,
    pub results: Vec<ValidationResult>,
}

impl MetadataReport {
    fn skipped() -> Self {
        Self {
            state: EngineState::Passed,
            skipped: true,
            files: Vec::new(),
            results: Vec::new(),
        }
    }

    /// Failed results that block the push.
    pub fn blocking(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| r.is_blocking())
    }

    /// Failed results at warning severity.
    pub fn warnings(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results
            .iter()
            .filter(|r| !r.passed && !r.is_blocking())
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.state == EngineState::Passed
    }
}

pub struct MetadataRuleEngine<'a> {
    rules: &'a RuleBook,
    state: EngineState,
    /// Bound on discovery plus reads from disk.
    timeout: Option<Duration>,
}

impl<'a> MetadataRuleEngine<'a> {
    #[must_use]
    pub fn new(rules: &'a RuleBook) -> Self {
        Self {
            rules,
            state: EngineState::NotStarted,
            timeout: None,
        }
    }

    /// Give up on the working tree once `timeout` has passed.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Evaluate the metadata files among `changes`, read from the working tree.
    ///
    /// # Errors
    ///
    /// [`ScanError::StageTimeout`] when reading overruns the timeout.
    pub fn evaluate_changed(
        &mut self,
        project_type: ProjectType,
        root: &Path,
        changes: &ChangeSet,
    ) -> Result<MetadataReport, ScanError> {
        let files: Vec<Utf8PathBuf> = changes
            .iter()
            .filter(|path| is_metadata_file(path))
            .cloned()
            .collect();
        self.evaluate_files(project_type, root, &files)
    }

    /// Evaluate every metadata file in the repository.
    ///
    /// A repository that needs metadata but has none gets a
    /// `metadata.presence` failure.
    ///
    /// # Errors
    ///
    /// [`ScanError::StageTimeout`] when discovery or reading overruns the
    /// timeout.
    pub fn evaluate_repository(
        &mut self,
        project_type: ProjectType,
        root: &Path,
    ) -> Result<MetadataReport, ScanError> {
        if !project_type.requires_validation() {
            return Ok(self.skip());
        }

        let files = find_meta_files(root, self.timeout)?;
        if files.is_empty() {
            self.state = EngineState::Failed;
            return Ok(MetadataReport {
                state: EngineState::Failed,
                skipped: false,
                files,
                results: vec![ValidationResult::fail(
                    PRESENCE_RULE_ID,
                    ".",
                    FailureKind::MissingField,
                    format!("no metadata file found; {project_type} repositories require api.meta"),
                )],
            });
        }

        self.evaluate_files(project_type, root, &files)
    }

    /// Read and evaluate `files` (repository-relative) under `root`.
    ///
    /// Files missing from the working tree were deleted in the pushed range
    /// and are skipped, as are paths that are not regular files.
    ///
    /// # Errors
    ///
    /// [`ScanError::StageTimeout`] when reading overruns the timeout.
    pub fn evaluate_files(
        &mut self,
        project_type: ProjectType,
        root: &Path,
        files: &[Utf8PathBuf],
    ) -> Result<MetadataReport, ScanError> {
        if !project_type.requires_validation() {
            return Ok(self.skip());
        }

        let deadline = self
            .timeout
            .and_then(|limit| Some((Instant::now().checked_add(limit)?, limit)));

        let mut sources = Vec::with_capacity(files.len());
        for (done, file) in files.iter().enumerate() {
            if let Some((at, limit)) = deadline
                && Instant::now() >= at
            {
                tracing::warn!(done, total = files.len(), "metadata reads timed out");
                return Err(ScanError::stage_timeout("metadata read", limit, done));
            }

            let path = root.join(file.as_std_path());
            if std::fs::metadata(&path).is_ok_and(|meta| !meta.is_file()) {
                tracing::debug!(file = %file, "metadata path is not a regular file, skipping");
                continue;
            }
            match std::fs::read(&path) {
                Ok(bytes) => {
                    sources.push((file.clone(), Ok(String::from_utf8_lossy(&bytes).into_owned())));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(file = %file, "metadata file not in working tree, skipping");
                }
                Err(e) => sources.push((file.clone(), Err(format!("cannot read file: {e}")))),
            }
        }

        Ok(self.run(project_type, sources))
    }

    /// Evaluate in-memory `(path, content)` pairs.
    pub fn evaluate_sources(
        &mut self,
        project_type: ProjectType,
        sources: &[(Utf8PathBuf, String)],
    ) -> MetadataReport {
        if !project_type.requires_validation() {
            return self.skip();
        }
        let sources = sources
            .iter()
            .map(|(path, content)| (path.clone(), Ok(content.clone())))
            .collect();
        self.run(project_type, sources)
    }

    fn skip(&mut self) -> MetadataReport {
        self.state = EngineState::Passed;
        MetadataReport::skipped()
    }

    fn run(
        &mut self,
        project_type: ProjectType,
        sources: Vec<(Utf8PathBuf, Result<String, String>)>,
    ) -> MetadataReport {
        self.state = EngineState::Evaluating;
        let table = self.rules.table(project_type);
        let mut results = Vec::new();
        let mut files = Vec::with_capacity(sources.len());

        for (file, content) in sources {
            let parsed = content.and_then(|text| {
                parse_metadata(&file, &text).map_err(|e| e.reason)
            });

            match parsed {
                Ok(document) => {
                    for rule in table {
                        results.push(evaluate_rule(rule, &document, self.rules.business_units()));
                    }
                }
                Err(reason) => {
                    tracing::warn!(file = %file, reason = %reason, "metadata file unparseable");
                    results.push(ValidationResult::fail(
                        PARSE_RULE_ID,
                        file.clone(),
                        FailureKind::InvalidFormat,
                        reason,
                    ));
                }
            }
            files.push(file);
        }

        let state = if results.iter().any(ValidationResult::is_blocking) {
            EngineState::Failed
        } else {
            EngineState::Passed
        };
        self.state = state;

        tracing::debug!(
            project_type = %project_type,
            files = files.len(),
            results = results.len(),
            state = ?state,
            "metadata rules evaluated"
        );

        MetadataReport {
            state,
            skipped: false,
            files,
            results,
        }
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    match (actual, expected) {
        (Value::String(s), Value::Bool(b)) => s == if *b { "true" } else { "false" },
        _ => false,
    }
}

fn evaluate_rule(
    compiled: &CompiledRule,
    document: &MetadataDocument,
    business_units: &[String],
) -> ValidationResult {
    let rule = &compiled.rule;
    let file: &Utf8Path = &document.file;

    if let Some(condition) = &rule.when {
        let holds =
            document.lookup(&condition.field).and_then(Value::as_str) == Some(condition.equals.as_str());
        if !holds {
            return ValidationResult::not_applicable(
                &rule.id,
                file,
                format!("applies only when {} is {}", condition.field, condition.equals),
            );
        }
    }

    let fail = |kind: FailureKind, message: String| {
        ValidationResult::fail(&rule.id, file, kind, message).with_severity(rule.severity)
    };

    let Some((path, value)) = rule
        .paths()
        .find_map(|path| document.lookup(path).map(|value| (path, value)))
    else {
        let message = if rule.aliases.is_empty() {
            format!("{} is missing", rule.field)
        } else {
            format!(
                "{} is missing (also checked {})",
                rule.field,
                rule.aliases.join(", ")
            )
        };
        return fail(FailureKind::MissingField, message);
    };

    match &rule.check {
        Predicate::Required if is_empty(value) => {
            fail(FailureKind::MissingField, format!("{path} is empty"))
        }
        Predicate::Required => ValidationResult::pass(&rule.id, file),
        Predicate::OneOf { values } => match value.as_str() {
            Some(actual) if values.iter().any(|allowed| allowed == actual) => {
                ValidationResult::pass(&rule.id, file)
            }
            _ => fail(
                FailureKind::InvalidEnum,
                format!(
                    "{path} '{}' is not one of [{}]",
                    render(value),
                    values.join(", ")
                ),
            ),
        },
        Predicate::Pattern { regex: source } => {
            let text = render(value);
            match &compiled.regex {
                Some(re) if re.is_match(&text) => ValidationResult::pass(&rule.id, file),
                _ => fail(
                    FailureKind::InvalidFormat,
                    format!("{path} '{text}' does not match {source}"),
                ),
            }
        }
        Predicate::MinVersion { version } => {
            let text = render(value);
            match (parse_version(&text), compiled.min_version) {
                (None, _) => fail(
                    FailureKind::InvalidFormat,
                    format!("{path} '{text}' is not a major.minor.patch version"),
                ),
                (Some(actual), Some(minimum)) if actual < minimum => fail(
                    FailureKind::InvalidValue,
                    format!("{path} {text} is lower than {version}"),
                ),
                (Some(_), _) => ValidationResult::pass(&rule.id, file),
            }
        }
        Predicate::Equals { value: expected } => {
            if values_equal(value, expected) {
                ValidationResult::pass(&rule.id, file)
            } else {
                fail(
                    FailureKind::InvalidValue,
                    format!("{path} must be {}, got {}", render(expected), render(value)),
                )
            }
        }
        Predicate::BusinessUnit => match value.as_str() {
            Some(code) if business_units.iter().any(|unit| unit == code) => {
                ValidationResult::pass(&rule.id, file)
            }
            _ => fail(
                FailureKind::InvalidEnum,
                format!(
                    "{path} '{}' is not a configured business unit",
                    render(value)
                ),
            ),
        },
        Predicate::ContainsEntry { key, value: wanted } => match value.as_array() {
            None => fail(
                FailureKind::InvalidFormat,
                format!("{path} must be a list"),
            ),
            Some(items)
                if items
                    .iter()
                    .any(|item| item.get(key).and_then(Value::as_str) == Some(wanted.as_str())) =>
            {
                ValidationResult::pass(&rule.id, file)
            }
            Some(_) => fail(
                FailureKind::InvalidValue,
                format!("{path} has no entry with {key} = {wanted}"),
            ),
        },
    }
}
