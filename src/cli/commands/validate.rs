//! Gate runs: hook mode and the manual validation targets.
//!
//! The gate itself is synchronous and may block on a justification prompt, so
//! it runs on the blocking pool while the runtime watches for Ctrl-C.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::path::PathBuf;

use pushgate_config::Config;
use pushgate_engine::CommitRange;
use pushgate_gate::{GateContext, PushGate, PushReport, RefUpdate, emit_push_json};
use pushgate_runner::NativeRunner;
use pushgate_utils::error::GateError;
use pushgate_utils::exit_codes::ExitCode;

/// What a run validates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationTarget {
    /// Ref records from a `pre-push` hook.
    Push(Vec<RefUpdate>),
    Range(CommitRange),
    Files(Vec<Utf8PathBuf>),
    Staged,
}

/// Run the gate against `target` and print the report.
///
/// Returns the report's exit code as the error when the push is blocked.
pub async fn execute_validation(
    target: ValidationTarget,
    config: Config,
    repo_root: PathBuf,
    json: bool,
) -> Result<(), ExitCode> {
    let task = tokio::task::spawn_blocking(move || evaluate(target, config, repo_root));

    let report = tokio::select! {
        joined = task => match joined {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "gate evaluation task failed");
                eprintln!("✗ Gate evaluation failed: {e}");
                eprintln!("✗ Push blocked");
                return Err(ExitCode::INTERNAL);
            }
        },
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted");
            eprintln!();
            eprintln!("✗ Interrupted; push blocked");
            return Err(ExitCode::INTERRUPTED);
        }
    };

    if let Err(e) = render_report(&report, json) {
        eprintln!("✗ {e:#}");
        return Err(ExitCode::INTERNAL);
    }

    let code = report.exit_code();
    if code.is_success() { Ok(()) } else { Err(code) }
}

/// Print `report` on stdout, as canonical JSON when `json` is set.
pub fn render_report(report: &PushReport, json: bool) -> Result<()> {
    if json {
        let output = emit_push_json(report).context("Failed to render push report")?;
        println!("{output}");
    } else {
        println!("{report}");
    }
    Ok(())
}

fn evaluate(target: ValidationTarget, config: Config, repo_root: PathBuf) -> PushReport {
    let context = GateContext::from_config(&repo_root, &config);
    let mut gate = match PushGate::new(config, context, NativeRunner::new()) {
        Ok(gate) => gate.attach_terminal(),
        Err(e) => return PushReport::from_error(&GateError::Config(e)),
    };

    match target {
        ValidationTarget::Push(updates) => gate.evaluate_push(&updates),
        ValidationTarget::Range(range) => gate.evaluate_range(&range),
        ValidationTarget::Files(files) => gate.evaluate_files(files),
        ValidationTarget::Staged => gate.evaluate_staged(),
    }
}
