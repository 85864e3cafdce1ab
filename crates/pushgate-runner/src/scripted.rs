//! In-memory runner for tests: answers commands from a script instead of
//! spawning processes.

use crate::{CommandSpec, ProcessOutput, ProcessRunner, RunnerError};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Reply {
    Output(ProcessOutput),
    Timeout,
}

/// Replies to commands whose argv contains every registered fragment.
///
/// The first matching rule wins; unmatched commands fail with a spawn error.
/// Every received command is recorded for assertions.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Vec<(Vec<String>, Reply)>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `stdout` and exit code 0.
    #[must_use]
    pub fn on(self, fragments: &[&str], stdout: &str) -> Self {
        self.on_output(
            fragments,
            ProcessOutput::new(stdout.as_bytes().to_vec(), Vec::new(), Some(0), false),
        )
    }

    /// Reply with `stderr` and the given non-zero exit code.
    #[must_use]
    pub fn on_failure(self, fragments: &[&str], stderr: &str, exit_code: i32) -> Self {
        self.on_output(
            fragments,
            ProcessOutput::new(Vec::new(), stderr.as_bytes().to_vec(), Some(exit_code), false),
        )
    }

    /// Reply with a timeout.
    #[must_use]
    pub fn on_timeout(mut self, fragments: &[&str]) -> Self {
        self.rules.push((owned(fragments), Reply::Timeout));
        self
    }

    #[must_use]
    pub fn on_output(mut self, fragments: &[&str], output: ProcessOutput) -> Self {
        self.rules.push((owned(fragments), Reply::Output(output)));
        self
    }

    /// Commands received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

fn owned(fragments: &[&str]) -> Vec<String> {
    fragments.iter().map(|f| (*f).to_string()).collect()
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(cmd.clone());
        }

        let argv: Vec<String> = cmd
            .args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();

        let reply = self.rules.iter().find_map(|(fragments, reply)| {
            fragments
                .iter()
                .all(|fragment| argv.iter().any(|arg| arg == fragment))
                .then_some(reply)
        });

        match reply {
            Some(Reply::Output(output)) => Ok(output.clone()),
            Some(Reply::Timeout) => Err(RunnerError::timeout(timeout)),
            None => Err(RunnerError::NativeExecutionFailed {
                program: cmd.program.to_string_lossy().into_owned(),
                reason: format!("no scripted reply for '{}'", cmd.display_args()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_matching_rule_wins() {
        let runner = ScriptedRunner::new()
            .on(&["log", "a..b"], "one\n")
            .on(&["log"], "fallback\n");
        let out = runner
            .run(&CommandSpec::new("git").args(["log", "a..b"]), Duration::from_secs(1))
            .unwrap();
        assert_eq!(out.stdout_string(), "one\n");
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_unmatched_and_timeout() {
        let runner = ScriptedRunner::new().on_timeout(&["slow"]);
        assert!(matches!(
            runner.run(&CommandSpec::new("git").arg("slow"), Duration::from_secs(2)),
            Err(RunnerError::Timeout { timeout_seconds: 2 })
        ));
        assert!(matches!(
            runner.run(&CommandSpec::new("git").arg("other"), Duration::from_secs(2)),
            Err(RunnerError::NativeExecutionFailed { .. })
        ));
    }
}
