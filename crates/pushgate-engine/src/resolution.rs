//! Failure resolution: present each blocking failure, collect justifications,
//! record overrides.
//!
//! ```text
//! Presenting -> AwaitingJustification -> Recorded | Rejected -> Resolved
//! ```
//!
//! How a failure is presented is a [`Presenter`]: [`InteractivePresenter`]
//! prompts a human, [`BatchPresenter`] accepts every failure as a violation.
//! Overrides are therefore unreachable without a human at a terminal.

use pushgate_utils::types::{AuditContext, AuditRecord, Failure, FailureRef, GateDecision, Justification};
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};

use crate::audit::AuditLog;

/// Reason prompts offered before a failure is rejected.
pub const MAX_JUSTIFICATION_ATTEMPTS: usize = 3;

/// What a presenter decided for one failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    AcceptedAsViolation,
    JustifiedOverride(Justification),
    /// Input ended or was cancelled; no further failures are presented.
    Interrupted,
}

pub trait Presenter {
    fn present(&mut self, failure: &Failure) -> Resolution;
}

impl<P: Presenter + ?Sized> Presenter for &mut P {
    fn present(&mut self, failure: &Failure) -> Resolution {
        (**self).present(failure)
    }
}

impl<P: Presenter + ?Sized> Presenter for Box<P> {
    fn present(&mut self, failure: &Failure) -> Resolution {
        (**self).present(failure)
    }
}

/// Non-interactive presenter: every failure blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchPresenter;

impl Presenter for BatchPresenter {
    fn present(&mut self, failure: &Failure) -> Resolution {
        tracing::debug!(failure = %failure.id(), "non-interactive, accepted as violation");
        Resolution::AcceptedAsViolation
    }
}

/// Prompts on a line-oriented input/output pair.
pub struct InteractivePresenter<R, W> {
    input: R,
    output: W,
    author: String,
    min_chars: usize,
}

impl<R: BufRead, W: Write> InteractivePresenter<R, W> {
    pub fn new(input: R, output: W, author: impl Into<String>, min_chars: usize) -> Self {
        Self {
            input,
            output,
            author: author.into(),
            min_chars,
        }
    }

    /// Show `text` and read one line; `None` on end of input or a read error.
    fn prompt(&mut self, text: &str) -> Option<String> {
        write!(self.output, "{text}").ok()?;
        self.output.flush().ok()?;

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }

    fn say(&mut self, text: &str) {
        if let Err(e) = writeln!(self.output, "{text}") {
            tracing::debug!(error = %e, "prompt output failed");
        }
    }
}

impl InteractivePresenter<BufReader<File>, File> {
    /// Prompt on the controlling terminal.
    ///
    /// In hook mode stdin carries ref records, so prompts cannot use it.
    /// Returns `None` when no terminal can be opened.
    pub fn from_terminal(author: impl Into<String>, min_chars: usize) -> Option<Self> {
        let (input, output) = open_terminal()?;
        Some(Self::new(BufReader::new(input), output, author, min_chars))
    }
}

#[cfg(unix)]
fn open_terminal() -> Option<(File, File)> {
    let input = File::open("/dev/tty").ok()?;
    let output = std::fs::OpenOptions::new().write(true).open("/dev/tty").ok()?;
    Some((input, output))
}

#[cfg(windows)]
fn open_terminal() -> Option<(File, File)> {
    let input = std::fs::OpenOptions::new().read(true).write(true).open("CONIN$").ok()?;
    let output = std::fs::OpenOptions::new().write(true).open("CONOUT$").ok()?;
    Some((input, output))
}

impl<R: BufRead, W: Write> Presenter for InteractivePresenter<R, W> {
    fn present(&mut self, failure: &Failure) -> Resolution {
        self.say("");
        self.say(&failure.to_string());

        let Some(answer) = self.prompt("Override this failure? [y/N] ") else {
            return Resolution::Interrupted;
        };
        if !matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes") {
            return Resolution::AcceptedAsViolation;
        }

        for attempt in 1..=MAX_JUSTIFICATION_ATTEMPTS {
            let Some(reason) = self.prompt("Justification: ") else {
                return Resolution::Interrupted;
            };

            if reason.chars().count() >= self.min_chars
                && let Some(justification) =
                    Justification::new(self.author.clone(), failure.reference(), &reason)
            {
                return Resolution::JustifiedOverride(justification);
            }

            let left = MAX_JUSTIFICATION_ATTEMPTS - attempt;
            self.say(&format!(
                "Justification must be at least {} characters ({left} attempts left)",
                self.min_chars
            ));
        }

        Resolution::AcceptedAsViolation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionState {
    /// Justified and written to the audit log.
    Recorded,
    /// Accepted as a violation.
    Rejected,
    Interrupted,
    /// Not reached because an earlier prompt was interrupted.
    NotPresented,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionOutcome {
    pub failure: FailureRef,
    pub state: ResolutionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionSummary {
    pub outcomes: Vec<ResolutionOutcome>,
    pub decision: GateDecision,
    pub interrupted: bool,
    /// Set when an override could not be recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit_error: Option<String>,
}

impl ResolutionSummary {
    #[must_use]
    pub fn recorded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.state == ResolutionState::Recorded)
            .count()
    }
}

pub struct ResolutionController<'a, P> {
    presenter: P,
    audit: &'a AuditLog,
}

impl<'a, P: Presenter> ResolutionController<'a, P> {
    pub fn new(presenter: P, audit: &'a AuditLog) -> Self {
        Self { presenter, audit }
    }

    /// Resolve `failures` one at a time, in order.
    ///
    /// The decision is Proceed only when every failure was recorded. After an
    /// interrupt nothing else is presented; after an audit write failure no
    /// further override is offered.
    pub fn resolve(&mut self, failures: &[Failure], context: &AuditContext) -> ResolutionSummary {
        let mut outcomes = Vec::with_capacity(failures.len());
        let mut interrupted = false;
        let mut audit_error = None;

        for failure in failures {
            let failure_ref = failure.reference();

            if interrupted {
                outcomes.push(outcome(failure_ref, ResolutionState::NotPresented, None));
                continue;
            }
            if audit_error.is_some() {
                outcomes.push(outcome(failure_ref, ResolutionState::Rejected, None));
                continue;
            }

            match self.presenter.present(failure) {
                Resolution::AcceptedAsViolation => {
                    outcomes.push(outcome(failure_ref, ResolutionState::Rejected, None));
                }
                Resolution::Interrupted => {
                    tracing::warn!(failure = %failure.id(), "justification interrupted");
                    interrupted = true;
                    outcomes.push(outcome(failure_ref, ResolutionState::Interrupted, None));
                }
                Resolution::JustifiedOverride(justification) => {
                    let reason = justification.reason.clone();
                    let record = AuditRecord::justified(justification, context.clone());
                    match self.audit.append(&record) {
                        Ok(()) => outcomes.push(outcome(
                            failure_ref,
                            ResolutionState::Recorded,
                            Some(reason),
                        )),
                        Err(e) => {
                            tracing::error!(error = %e, "override not recorded, failure stands");
                            audit_error = Some(e.to_string());
                            outcomes.push(outcome(
                                failure_ref,
                                ResolutionState::Rejected,
                                Some(reason),
                            ));
                        }
                    }
                }
            }
        }

        let all_recorded = outcomes
            .iter()
            .all(|o| o.state == ResolutionState::Recorded);
        let decision = if all_recorded && !interrupted {
            GateDecision::Proceed
        } else {
            GateDecision::Block
        };

        ResolutionSummary {
            outcomes,
            decision,
            interrupted,
            audit_error,
        }
    }
}

fn outcome(failure: FailureRef, state: ResolutionState, reason: Option<String>) -> ResolutionOutcome {
    ResolutionOutcome {
        failure,
        state,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushgate_utils::types::{FailureKind, SecretFinding, ValidationResult};
    use std::io::Cursor;

    fn failures() -> Vec<Failure> {
        vec![
            Failure::Validation(ValidationResult::fail(
                "api.audience",
                "svc/api.meta",
                FailureKind::InvalidEnum,
                "API.audience 'Internal' is not one of [internal, external]",
            )),
            Failure::Secret(SecretFinding {
                file: "src/app.py".into(),
                line: 3,
                signature_id: "github_pat".to_string(),
                snippet: "TOKEN = \"ghp*****xyz\"".to_string(),
            }),
        ]
    }

    fn interactive(script: &str) -> InteractivePresenter<Cursor<Vec<u8>>, Vec<u8>> {
        InteractivePresenter::new(
            Cursor::new(script.as_bytes().to_vec()),
            Vec::new(),
            "Dev <dev@example.com>",
            10,
        )
    }

    fn audit() -> (tempfile::TempDir, AuditLog) {
        let temp = tempfile::tempdir().unwrap();
        let log = AuditLog::new(temp.path().join("audit.jsonl"));
        (temp, log)
    }

    #[test]
    fn test_batch_never_records() {
        let (_temp, log) = audit();
        let mut controller = ResolutionController::new(BatchPresenter, &log);
        let summary = controller.resolve(&failures(), &AuditContext::default());

        assert_eq!(summary.decision, GateDecision::Block);
        assert!(summary
            .outcomes
            .iter()
            .all(|o| o.state == ResolutionState::Rejected));
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_no_failures_proceeds() {
        let (_temp, log) = audit();
        let summary =
            ResolutionController::new(BatchPresenter, &log).resolve(&[], &AuditContext::default());
        assert_eq!(summary.decision, GateDecision::Proceed);
    }

    #[test]
    fn test_all_justified_proceeds_with_one_record_each() {
        let (_temp, log) = audit();
        let presenter = interactive(
            "y\nconsumer contract frozen until Q3\nyes\nrotated already, false alarm\n",
        );
        let mut controller = ResolutionController::new(presenter, &log);
        let summary = controller.resolve(&failures(), &AuditContext::default());

        assert_eq!(summary.decision, GateDecision::Proceed);
        assert_eq!(summary.recorded(), 2);
        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].failure.id, "api.audience");
        assert_eq!(records[1].author, "Dev <dev@example.com>");
    }

    #[test]
    fn test_declined_override_blocks() {
        let (_temp, log) = audit();
        let presenter = interactive("n\ny\nthis one is fine to push\n");
        let summary =
            ResolutionController::new(presenter, &log).resolve(&failures(), &AuditContext::default());

        assert_eq!(summary.decision, GateDecision::Block);
        assert_eq!(summary.outcomes[0].state, ResolutionState::Rejected);
        assert_eq!(summary.outcomes[1].state, ResolutionState::Recorded);
        assert_eq!(log.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_short_reasons_exhaust_attempts() {
        let mut presenter = interactive("y\nok\n   \nshort\n");
        let resolution = presenter.present(&failures()[0]);
        assert_eq!(resolution, Resolution::AcceptedAsViolation);

        let transcript = String::from_utf8(presenter.output).unwrap();
        assert!(transcript.contains("Override this failure? [y/N]"));
        assert!(transcript.contains("0 attempts left"));
    }

    #[test]
    fn test_short_reason_then_valid_reason() {
        let mut presenter = interactive("y\ntoo short\nreviewed with security team\n");
        match presenter.present(&failures()[1]) {
            Resolution::JustifiedOverride(justification) => {
                assert_eq!(justification.reason, "reviewed with security team");
                assert_eq!(justification.failure.id, "github_pat");
            }
            other => panic!("unexpected resolution: {other:?}"),
        }
    }

    #[test]
    fn test_end_of_input_interrupts_and_stops_presenting() {
        let (_temp, log) = audit();
        let presenter = interactive("y\n");
        let summary =
            ResolutionController::new(presenter, &log).resolve(&failures(), &AuditContext::default());

        assert!(summary.interrupted);
        assert_eq!(summary.decision, GateDecision::Block);
        assert_eq!(summary.outcomes[0].state, ResolutionState::Interrupted);
        assert_eq!(summary.outcomes[1].state, ResolutionState::NotPresented);
        assert!(log.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_unwritable_audit_log_fails_closed() {
        let temp = tempfile::tempdir().unwrap();
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        let log = AuditLog::new(blocker.join("audit.jsonl"));

        let presenter = interactive("y\nvalid justification text\ny\nanother valid reason\n");
        let summary =
            ResolutionController::new(presenter, &log).resolve(&failures(), &AuditContext::default());

        assert_eq!(summary.decision, GateDecision::Block);
        assert!(summary.audit_error.is_some());
        assert_eq!(summary.recorded(), 0);
    }
}
