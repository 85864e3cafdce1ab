use crate::error::RunnerError;
use std::process::Stdio;
use std::time::Duration;

use super::{CommandSpec, ProcessOutput, ProcessRunner};

/// Runs git and friends directly on the host.
///
/// Stdin is closed, stdout/stderr are captured. The child leads its own
/// process group (a job object on Windows) so that helpers it spawns die with
/// it. A helper thread waits for the child while the caller waits on a channel
/// with the timeout; on expiry the whole group is killed, the helper thread is
/// left to reap it, and [`RunnerError::Timeout`] is returned.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRunner;

impl NativeRunner {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ProcessRunner for NativeRunner {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        use std::sync::mpsc;
        use std::thread;

        let program = cmd.program.to_string_lossy().into_owned();

        let mut command = cmd.to_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = command
            .spawn()
            .map_err(|e| RunnerError::NativeExecutionFailed {
                program: program.clone(),
                reason: format!("failed to spawn: {e}"),
            })?;

        let tree = ProcessTree::attach(&child);
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let output = child.wait_with_output();
            let _ = tx.send(output);
        });

        match rx.recv_timeout(timeout) {
            Ok(output_result) => {
                let _ = handle.join();

                let output = output_result.map_err(|e| RunnerError::NativeExecutionFailed {
                    program,
                    reason: format!("failed to wait for process: {e}"),
                })?;

                Ok(ProcessOutput::new(
                    output.stdout,
                    output.stderr,
                    output.status.code(),
                    false,
                ))
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tree.kill();
                // A descendant outside the group may still hold the pipes;
                // the waiter thread is detached rather than joined.
                drop(handle);
                Err(RunnerError::timeout(timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(RunnerError::NativeExecutionFailed {
                program,
                reason: "process monitoring thread terminated unexpectedly".to_string(),
            }),
        }
    }
}

/// The spawned child and everything it starts.
struct ProcessTree {
    pid: u32,
    #[cfg(windows)]
    job: Option<job::JobObject>,
}

impl ProcessTree {
    fn attach(child: &std::process::Child) -> Self {
        Self {
            pid: child.id(),
            #[cfg(windows)]
            job: job::JobObject::assign(child),
        }
    }

    /// SIGKILL to the process group on Unix; TerminateJobObject on Windows,
    /// falling back to the single process when no job could be created.
    fn kill(&self) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            if let Ok(raw) = i32::try_from(self.pid) {
                let _ = killpg(Pid::from_raw(raw), Signal::SIGKILL);
            }
        }

        #[cfg(windows)]
        {
            match &self.job {
                Some(job) => job.terminate(),
                None => job::terminate_pid(self.pid),
            }
        }

        #[cfg(not(any(unix, windows)))]
        {
            let _ = self.pid;
        }
    }
}

#[cfg(windows)]
mod job {
    use std::os::windows::io::AsRawHandle;
    use windows::Win32::Foundation::{CloseHandle, HANDLE};
    use windows::Win32::System::JobObjects::{
        AssignProcessToJobObject, CreateJobObjectW, TerminateJobObject,
    };
    use windows::Win32::System::Threading::{OpenProcess, PROCESS_TERMINATE, TerminateProcess};
    use windows::core::PCWSTR;

    pub(super) struct JobObject(HANDLE);

    impl JobObject {
        pub(super) fn assign(child: &std::process::Child) -> Option<Self> {
            unsafe {
                let job = CreateJobObjectW(None, PCWSTR::null()).ok()?;
                let process = HANDLE(child.as_raw_handle());
                if AssignProcessToJobObject(job, process).is_err() {
                    let _ = CloseHandle(job);
                    return None;
                }
                Some(Self(job))
            }
        }

        pub(super) fn terminate(&self) {
            unsafe {
                let _ = TerminateJobObject(self.0, 1);
            }
        }
    }

    impl Drop for JobObject {
        fn drop(&mut self) {
            unsafe {
                let _ = CloseHandle(self.0);
            }
        }
    }

    pub(super) fn terminate_pid(pid: u32) {
        unsafe {
            if let Ok(handle) = OpenProcess(PROCESS_TERMINATE, false, pid) {
                let _ = TerminateProcess(handle, 1);
                let _ = CloseHandle(handle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_missing_program_is_execution_failure() {
        let runner = NativeRunner::new();
        let cmd = CommandSpec::new("pushgate-definitely-not-a-real-program");
        let err = runner.run(&cmd, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, RunnerError::NativeExecutionFailed { .. }));
        assert!(err.to_string().contains("pushgate-definitely-not-a-real-program"));
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_stdout_and_exit_code() {
        let runner = NativeRunner::new();
        let cmd = CommandSpec::new("sh").args(["-c", "printf hello; exit 3"]);
        let output = runner.run(&cmd, Duration::from_secs(5)).unwrap();
        assert_eq!(output.stdout_string(), "hello");
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_child() {
        let runner = NativeRunner::new();
        let cmd = CommandSpec::new("sleep").arg("30");
        let started = Instant::now();
        let err = runner.run(&cmd, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, RunnerError::Timeout { timeout_seconds: 1 }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_forked_descendants_holding_pipes() {
        let runner = NativeRunner::new();
        // sh forks `sleep`, which inherits stdout and stderr.
        let cmd = CommandSpec::new("sh").args(["-c", "sleep 6; true"]);
        let started = Instant::now();
        let err = runner.run(&cmd, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, RunnerError::Timeout { .. }));
        assert!(
            started.elapsed() < Duration::from_secs(3),
            "timed out run took {:?}",
            started.elapsed()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_returns_even_if_a_descendant_leaves_the_group() {
        let runner = NativeRunner::new();
        // The background child starts its own session and keeps stdout open.
        let cmd = CommandSpec::new("sh").args([
            "-c",
            "if command -v setsid >/dev/null; then setsid sleep 6 & fi; sleep 6",
        ]);
        let started = Instant::now();
        let err = runner.run(&cmd, Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, RunnerError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
