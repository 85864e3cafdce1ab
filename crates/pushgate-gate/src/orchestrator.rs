//! Push orchestration.
//!
//! [`PushGate`] sequences classification, range resolution, metadata rules,
//! the secret scan and failure resolution for each ref update and folds the
//! results into a [`PushReport`]. Every stage error becomes a Block on the
//! ref that hit it; nothing escapes to the hook.

use std::path::PathBuf;

use camino::Utf8PathBuf;
use pushgate_config::{Config, PatternLibrary};
use pushgate_engine::{
    AuditLog, BatchPresenter, CommitRange, GitClient, InteractivePresenter, Presenter,
    ResolutionController, ResolutionState, ResolutionSummary, ScanOptions, SecretScanner,
};
use pushgate_runner::ProcessRunner;
use pushgate_utils::error::{ConfigError, GateError, RangeError};
use pushgate_utils::logging::{ref_span, stage_span};
use pushgate_utils::types::{AuditContext, ChangeSet, Failure};
use pushgate_validation::{MetadataRuleEngine, RuleBook};
use pushgate_workspace::{Classification, classify};

use crate::hook_input::RefUpdate;
use crate::report::{BlockCause, GateCondition, PushReport, RefReport};

/// Explicit invocation state handed to the gate.
///
/// `hooks_path` is the configured stand-in for git's global `core.hooksPath`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateContext {
    pub repo_root: PathBuf,
    pub hooks_path: Option<PathBuf>,
}

impl GateContext {
    #[must_use]
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            hooks_path: None,
        }
    }

    #[must_use]
    pub fn from_config(repo_root: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            repo_root: repo_root.into(),
            hooks_path: config.hooks.hooks_path.clone(),
        }
    }
}

/// What a single evaluation is about.
struct Target {
    ref_name: String,
    local_sha: Option<String>,
    range: String,
}

pub struct PushGate<R: ProcessRunner> {
    config: Config,
    context: GateContext,
    git: GitClient<R>,
    library: PatternLibrary,
    rules: RuleBook,
    classification: Classification,
    audit: AuditLog,
    presenter: Box<dyn Presenter + Send>,
}

impl<R: ProcessRunner> PushGate<R> {
    /// Load rules and patterns and classify the repository, once per run.
    ///
    /// Starts non-interactive; see [`PushGate::attach_terminal`].
    pub fn new(config: Config, context: GateContext, runner: R) -> Result<Self, ConfigError> {
        let root = context.repo_root.clone();
        let units = config.business_units.codes.clone();

        let rules = match config.rules_file(&root) {
            Some(path) => RuleBook::load(&path, units)?,
            None => RuleBook::builtin(units)?,
        };
        let library = PatternLibrary::load(&config, &root)?;
        let classification = classify(&root);
        let audit = AuditLog::new(config.audit_log_path(&root));
        let git = GitClient::new(runner, &root, config.git_timeout());

        tracing::info!(
            root = %root.display(),
            project_type = %classification.project_type,
            exclusions = %library.origin,
            hooks_path = ?context.hooks_path,
            "gate ready"
        );

        Ok(Self {
            config,
            context,
            git,
            library,
            rules,
            classification,
            audit,
            presenter: Box::new(BatchPresenter),
        })
    }

    #[must_use]
    pub fn with_presenter(mut self, presenter: impl Presenter + Send + 'static) -> Self {
        self.presenter = Box::new(presenter);
        self
    }

    /// Prompt on the controlling terminal when interactive mode is on.
    ///
    /// Falls back to batch resolution when no terminal can be opened.
    #[must_use]
    pub fn attach_terminal(self) -> Self {
        if !self.config.interactive() {
            return self;
        }
        match InteractivePresenter::from_terminal(
            self.git.author(),
            self.config.min_justification_chars(),
        ) {
            Some(presenter) => self.with_presenter(presenter),
            None => {
                tracing::warn!("interactive mode requested but no terminal is attached");
                self
            }
        }
    }

    #[must_use]
    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    #[must_use]
    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    /// Evaluate every ref update of a push independently.
    ///
    /// An interrupted justification stops the push; later refs are not
    /// evaluated.
    pub fn evaluate_push(&mut self, updates: &[RefUpdate]) -> PushReport {
        let mut push = self.new_report();

        for (index, update) in updates.iter().enumerate() {
            let report = self.evaluate_update(update);
            let interrupted = report.cause == Some(BlockCause::Interrupted);
            push.push_ref(report);

            let remaining = updates.len() - index - 1;
            if interrupted && remaining > 0 {
                push.block(
                    BlockCause::Interrupted,
                    format!("Interrupted; {remaining} remaining ref(s) were not evaluated"),
                );
                break;
            }
        }

        push
    }

    /// Evaluate the files touched by a manual commit range.
    pub fn evaluate_range(&mut self, range: &CommitRange) -> PushReport {
        let target = Target {
            ref_name: "commit-range".to_string(),
            local_sha: None,
            range: range.to_string(),
        };
        let report = self.evaluate_target(target, |git| git.changed_files(range));
        self.single(report)
    }

    /// Evaluate an explicit list of repository-relative paths.
    pub fn evaluate_files(&mut self, files: Vec<Utf8PathBuf>) -> PushReport {
        let changes: ChangeSet = files.into_iter().collect();
        let target = Target {
            ref_name: "files".to_string(),
            local_sha: None,
            range: format!("{} explicit file(s)", changes.len()),
        };
        let report = self.evaluate_target(target, move |_| Ok(changes));
        self.single(report)
    }

    /// Evaluate the files staged in the index.
    pub fn evaluate_staged(&mut self) -> PushReport {
        let target = Target {
            ref_name: "staged".to_string(),
            local_sha: None,
            range: "index".to_string(),
        };
        let report = self.evaluate_target(target, |git| git.staged_files());
        self.single(report)
    }

    fn new_report(&self) -> PushReport {
        PushReport::new(
            self.classification.clone(),
            self.context
                .hooks_path
                .as_ref()
                .map(|path| path.display().to_string()),
        )
    }

    fn single(&self, report: RefReport) -> PushReport {
        let mut push = self.new_report();
        push.push_ref(report);
        push
    }

    fn evaluate_update(&mut self, update: &RefUpdate) -> RefReport {
        let range = CommitRange::for_update(&update.local_sha, &update.remote_sha);
        let target = Target {
            ref_name: update.name().to_string(),
            local_sha: Some(update.local_sha.clone()),
            range: range.to_string(),
        };
        self.evaluate_target(target, |git| git.changed_files(&range))
    }

    fn evaluate_target<F>(&mut self, target: Target, resolve: F) -> RefReport
    where
        F: FnOnce(&GitClient<R>) -> Result<ChangeSet, RangeError>,
    {
        let span = ref_span(&target.ref_name, &target.range);
        let _enter = span.enter();

        let project_type = self.classification.project_type;
        let mut report = RefReport::new(&target.ref_name, &target.range, project_type);

        if !project_type.requires_validation() && !self.config.scan_enabled() {
            tracing::info!("no metadata rules and scanning disabled, nothing to check");
            report.conditions.push(GateCondition::new(
                "Applicability",
                "Repository type has metadata rules or secret scanning is enabled",
                true,
                format!("{project_type}, scanning disabled"),
                "any checks to run",
            ));
            return report;
        }

        let resolved = {
            let _stage = stage_span("resolve").entered();
            resolve(&self.git)
        };
        match resolved {
            Ok(changes) => report.changes = changes,
            Err(e) => {
                tracing::warn!(error = %e, "commit range could not be resolved");
                report.conditions.push(GateCondition::new(
                    "Commit range",
                    "Changed files can be determined for the update",
                    false,
                    e.to_string(),
                    "a resolvable range",
                ));
                report.block_on(&GateError::Range(e));
                return report;
            }
        }
        report.conditions.push(GateCondition::new(
            "Commit range",
            "Changed files can be determined for the update",
            true,
            format!("{} changed file(s)", report.changes.len()),
            "a resolvable range",
        ));

        if report.changes.is_empty() {
            tracing::info!("no changed files");
            return report;
        }

        let root = self.context.repo_root.clone();
        let mut failures = Vec::new();

        let evaluated = {
            let _stage = stage_span("metadata").entered();
            let mut engine =
                MetadataRuleEngine::new(&self.rules).with_timeout(self.config.scan_timeout());
            if self.config.validate_all_meta() {
                engine.evaluate_repository(project_type, &root)
            } else {
                engine.evaluate_changed(project_type, &root, &report.changes)
            }
        };
        let metadata = match evaluated {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(error = %e, "metadata evaluation incomplete");
                report.conditions.push(GateCondition::new(
                    "Metadata rules",
                    "Metadata files satisfy the rule table for the project type",
                    false,
                    e.to_string(),
                    "0 failing rules",
                ));
                report.block_on(&GateError::Scan(e));
                return report;
            }
        };
        let failing = metadata.blocking().count();
        report.conditions.push(GateCondition::new(
            "Metadata rules",
            "Metadata files satisfy the rule table for the project type",
            failing == 0,
            if metadata.skipped {
                format!("skipped ({project_type})")
            } else {
                format!("{failing} failing rule(s) in {} file(s)", metadata.files.len())
            },
            "0 failing rules",
        ));
        failures.extend(metadata.blocking().cloned().map(Failure::Validation));
        report.metadata = Some(metadata);

        if self.config.scan_enabled() {
            let _stage = stage_span("scan").entered();
            let scanner =
                SecretScanner::new(&self.library, ScanOptions::from_config(&self.config));
            match scanner.scan(&root, &report.changes) {
                Ok(scan) => {
                    report.conditions.push(GateCondition::new(
                        "Secret scan",
                        "Changed files contain no secret signatures",
                        scan.findings.is_empty(),
                        format!("{} finding(s) in {} file(s)", scan.findings.len(), scan.scanned),
                        "0 findings",
                    ));
                    failures.extend(scan.findings.iter().cloned().map(Failure::Secret));
                    report.scan = Some(scan);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "secret scan incomplete");
                    report.conditions.push(GateCondition::new(
                        "Secret scan",
                        "Changed files contain no secret signatures",
                        false,
                        e.to_string(),
                        "a complete scan",
                    ));
                    report.block_on(&GateError::Scan(e));
                    return report;
                }
            }
        }

        if failures.is_empty() {
            return report;
        }

        let context = AuditContext {
            ref_name: Some(target.ref_name.clone()),
            local_sha: target.local_sha.clone(),
            project_type: Some(project_type),
            repository: self.classification.repo_name.clone(),
        };
        let summary = {
            let _stage = stage_span("resolution").entered();
            ResolutionController::new(&mut self.presenter, &self.audit)
                .resolve(&failures, &context)
        };

        report.conditions.push(GateCondition::new(
            "Failure resolution",
            "Every failure is justified and recorded",
            summary.decision.is_proceed(),
            format!("{}/{} justified", summary.recorded(), failures.len()),
            "all failures justified",
        ));
        if let Some(error) = &summary.audit_error {
            report.diagnostics.push(format!(
                "Audit log write failed ({error}); overrides were not accepted"
            ));
        }
        if !summary.decision.is_proceed() {
            let (cause, message) = block_cause(&failures, &summary);
            report.block(cause, message);
        }
        report.resolution = Some(summary);

        report
    }
}

fn block_cause(failures: &[Failure], summary: &ResolutionSummary) -> (BlockCause, String) {
    if summary.interrupted {
        return (
            BlockCause::Interrupted,
            "Justification interrupted; push blocked".to_string(),
        );
    }

    let unresolved: Vec<&Failure> = failures
        .iter()
        .zip(&summary.outcomes)
        .filter(|(_, outcome)| outcome.state != ResolutionState::Recorded)
        .map(|(failure, _)| failure)
        .collect();
    let secrets = unresolved.iter().filter(|f| f.is_secret()).count();

    if secrets > 0 {
        (
            BlockCause::Secret,
            format!(
                "{} unresolved failure(s), {secrets} of them secret finding(s)",
                unresolved.len()
            ),
        )
    } else {
        (
            BlockCause::Violation,
            format!("{} unresolved failure(s)", unresolved.len()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushgate_engine::{Resolution, ResolutionState};
    use pushgate_runner::ScriptedRunner;
    use pushgate_utils::exit_codes::ExitCode;
    use pushgate_utils::test_support;
    use pushgate_utils::types::{GateDecision, Justification, ProjectType};
    use std::fs;
    use std::path::Path;

    const LOCAL: &str = "1111111111111111111111111111111111111111";
    const REMOTE: &str = "2222222222222222222222222222222222222222";
    const NULL: &str = "0000000000000000000000000000000000000000";

    const META: &str = r#"
metaDataVersion: 6.2.0
assetName: orders-api
assetVersion: 1.0.0.42
autoIncrementAssetVersion: true
contractFileName: orders.yaml
ignore: false
API:
  layer: xAPI
  audience: AUDIENCE
  contract:
    GBGF: WPB
  contractOwner:
    serviceLine: Payments
    teamName: Orders
    teamEmailAddress: orders@example.com
  version:
    contractVersion: v1.2
    status: live
    privateAPI: false
    apiStyle: HYDROGEN
    implementationFramework: SPRING_BOOT
    architecturalStyle: REST
    dataClassification: internal
"#;

    /// Answers every presented failure with a justification.
    struct Justify;

    impl Presenter for Justify {
        fn present(&mut self, failure: &Failure) -> Resolution {
            let reason = "approved exception";
            match Justification::new("Dev <dev@example.com>", failure.reference(), reason) {
                Some(j) => Resolution::JustifiedOverride(j),
                None => Resolution::AcceptedAsViolation,
            }
        }
    }

    struct Cancel;

    impl Presenter for Cancel {
        fn present(&mut self, _failure: &Failure) -> Resolution {
            Resolution::Interrupted
        }
    }

    fn shp_repo(audience: &str) -> (tempfile::TempDir, PathBuf) {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("orders-ds-api");
        fs::create_dir_all(root.join("svc")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("svc/api.meta"), META.replace("AUDIENCE", audience)).unwrap();
        fs::write(root.join("svc/main.py"), "print('hello')\n").unwrap();
        (temp, root)
    }

    fn gate(root: &Path, runner: ScriptedRunner) -> PushGate<ScriptedRunner> {
        PushGate::new(Config::default(), GateContext::new(root), runner).unwrap()
    }

    fn log_runner(files: &str) -> ScriptedRunner {
        ScriptedRunner::new().on(&["log", &format!("{REMOTE}..{LOCAL}")], files)
    }

    fn update(local: &str, remote: &str) -> RefUpdate {
        RefUpdate {
            local_ref: "refs/heads/main".to_string(),
            local_sha: local.to_string(),
            remote_ref: "refs/heads/main".to_string(),
            remote_sha: remote.to_string(),
        }
    }

    #[test]
    fn test_clean_push_proceeds() {
        let (_temp, root) = shp_repo("internal");
        let mut gate = gate(&root, log_runner("svc/api.meta\nsvc/main.py\n"));
        assert_eq!(gate.classification().project_type, ProjectType::ShpIkp);

        let push = gate.evaluate_push(&[update(LOCAL, REMOTE)]);
        assert_eq!(push.decision, GateDecision::Proceed);
        assert_eq!(push.exit_code(), ExitCode::SUCCESS);
        assert_eq!(push.refs[0].changes.len(), 2);
        assert!(push.refs[0].conditions.iter().all(|c| c.passed));
    }

    #[test]
    fn test_deletion_proceeds_without_git() {
        let (_temp, root) = shp_repo("Internal");
        let mut gate = gate(&root, ScriptedRunner::new());

        let push = gate.evaluate_push(&[update(NULL, REMOTE)]);
        assert_eq!(push.decision, GateDecision::Proceed);
        assert!(push.refs[0].changes.is_empty());
        assert!(push.refs[0].metadata.is_none());
    }

    #[test]
    fn test_violation_blocks_in_batch_mode() {
        let (_temp, root) = shp_repo("Internal");
        let mut gate = gate(&root, log_runner("svc/api.meta\n"));

        let push = gate.evaluate_push(&[update(LOCAL, REMOTE)]);
        assert_eq!(push.exit_code(), ExitCode::POLICY_VIOLATION);

        let report = &push.refs[0];
        let resolution = report.resolution.as_ref().unwrap();
        assert_eq!(resolution.outcomes.len(), 1);
        assert_eq!(resolution.outcomes[0].failure.id, "api.audience");
        assert_eq!(resolution.outcomes[0].state, ResolutionState::Rejected);
        assert!(gate.audit_log().read_all().unwrap().is_empty());
        assert!(push.to_string().contains("api.audience"));
    }

    #[test]
    fn test_justified_violation_proceeds_and_records() {
        let (_temp, root) = shp_repo("Internal");
        let mut gate = gate(&root, log_runner("svc/api.meta\n")).with_presenter(Justify);

        let push = gate.evaluate_push(&[update(LOCAL, REMOTE)]);
        assert_eq!(push.exit_code(), ExitCode::SUCCESS);

        let records = gate.audit_log().read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].failure.id, "api.audience");
        assert_eq!(records[0].context.ref_name.as_deref(), Some("refs/heads/main"));
        assert_eq!(records[0].context.local_sha.as_deref(), Some(LOCAL));
        assert_eq!(records[0].context.repository.as_deref(), Some("orders-ds-api"));
    }

    #[test]
    fn test_secret_finding_blocks_with_secret_exit_code() {
        let (_temp, root) = shp_repo("internal");
        fs::write(
            root.join("svc/settings.py"),
            format!("TOKEN = \"{}\"\n", test_support::github_pat()),
        )
        .unwrap();
        let mut gate = gate(&root, log_runner("svc/settings.py\n"));

        let push = gate.evaluate_push(&[update(LOCAL, REMOTE)]);
        assert_eq!(push.exit_code(), ExitCode::SECRET_DETECTED);

        let scan = push.refs[0].scan.as_ref().unwrap();
        assert_eq!(scan.findings.len(), 1);
        assert!(!push.to_string().contains(&test_support::github_pat()));
    }

    #[test]
    fn test_range_error_blocks() {
        let (_temp, root) = shp_repo("internal");
        let runner = ScriptedRunner::new().on_failure(
            &["log"],
            "fatal: bad revision '2222..1111'\n",
            128,
        );
        let mut gate = gate(&root, runner);

        let push = gate.evaluate_push(&[update(LOCAL, REMOTE)]);
        assert_eq!(push.exit_code(), ExitCode::RANGE_RESOLUTION);
        assert!(push.refs[0].diagnostics[0].contains("bad revision"));
    }

    #[test]
    fn test_timeout_blocks() {
        let (_temp, root) = shp_repo("internal");
        let mut gate = gate(&root, ScriptedRunner::new().on_timeout(&["log"]));

        let push = gate.evaluate_push(&[update(LOCAL, REMOTE)]);
        assert_eq!(push.exit_code(), ExitCode::TIMEOUT);
    }

    #[test]
    fn test_any_blocking_ref_blocks_the_push() {
        let (_temp, root) = shp_repo("Internal");
        let runner = ScriptedRunner::new()
            .on(&["log", &format!("{REMOTE}..{LOCAL}")], "svc/main.py\n")
            .on(&["log", LOCAL], "svc/api.meta\n");
        let mut gate = gate(&root, runner);

        let other = RefUpdate {
            local_ref: "refs/heads/feature".to_string(),
            local_sha: LOCAL.to_string(),
            remote_ref: "refs/heads/feature".to_string(),
            remote_sha: NULL.to_string(),
        };
        let push = gate.evaluate_push(&[update(LOCAL, REMOTE), other]);

        assert_eq!(push.refs.len(), 2);
        assert_eq!(push.refs[0].decision, GateDecision::Proceed);
        assert_eq!(push.refs[1].decision, GateDecision::Block);
        assert_eq!(push.decision, GateDecision::Block);
    }

    #[test]
    fn test_interrupt_stops_remaining_refs() {
        let (_temp, root) = shp_repo("Internal");
        let mut gate = gate(&root, log_runner("svc/api.meta\n")).with_presenter(Cancel);

        let push = gate.evaluate_push(&[update(LOCAL, REMOTE), update(LOCAL, REMOTE)]);
        assert_eq!(push.refs.len(), 1);
        assert_eq!(push.exit_code(), ExitCode::INTERRUPTED);
    }

    #[test]
    fn test_general_repo_without_scanning_skips_git() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("plain");
        fs::create_dir_all(&root).unwrap();

        let mut config = Config::default();
        config.defaults.scan_enabled = Some(false);
        let mut gate =
            PushGate::new(config, GateContext::new(&root), ScriptedRunner::new()).unwrap();

        let push = gate.evaluate_push(&[update(LOCAL, REMOTE)]);
        assert_eq!(push.decision, GateDecision::Proceed);
        assert!(push.refs[0].changes.is_empty());
    }

    #[test]
    fn test_explicit_files_bypass_git() {
        let (_temp, root) = shp_repo("Internal");
        let mut gate = gate(&root, ScriptedRunner::new());

        let push = gate.evaluate_files(vec![Utf8PathBuf::from("svc/api.meta")]);
        assert_eq!(push.exit_code(), ExitCode::POLICY_VIOLATION);
        assert_eq!(push.refs[0].ref_name, "files");
    }

    #[test]
    fn test_staged_files() {
        let (_temp, root) = shp_repo("internal");
        let runner = ScriptedRunner::new().on(&["diff", "--cached"], "svc/api.meta\n");
        let mut gate = gate(&root, runner);

        let push = gate.evaluate_staged();
        assert_eq!(push.exit_code(), ExitCode::SUCCESS);
        assert_eq!(push.refs[0].changes.len(), 1);
    }

    #[test]
    fn test_hooks_path_is_reported() {
        let (_temp, root) = shp_repo("internal");
        let mut config = Config::default();
        config.hooks.hooks_path = Some(PathBuf::from("/opt/hooks"));
        let context = GateContext::from_config(&root, &config);
        let mut gate = PushGate::new(config, context, ScriptedRunner::new()).unwrap();

        let push = gate.evaluate_push(&[]);
        assert_eq!(push.hooks_path.as_deref(), Some("/opt/hooks"));
        assert_eq!(push.exit_code(), ExitCode::SUCCESS);
    }
}
