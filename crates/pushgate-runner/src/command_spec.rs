use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

/// A program plus its argv, working directory and extra environment.
///
/// Refs and paths taken from hook input travel as separate argv entries and
/// never pass through a shell.
///
/// # Example
///
/// ```rust
/// use pushgate_runner::CommandSpec;
/// use std::ffi::OsString;
///
/// let cmd = CommandSpec::new("git")
///     .args(["log", "--name-only", "--format="])
///     .arg("main..feature")
///     .cwd("/path/to/repo");
///
/// assert_eq!(cmd.program, OsString::from("git"));
/// assert_eq!(cmd.args.len(), 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    /// One entry per argv slot
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    /// Added on top of the inherited environment
    pub env: Option<HashMap<OsString, OsString>>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Arguments rendered for diagnostics, lossily.
    #[must_use]
    pub fn display_args(&self) -> String {
        self.args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Build a `std::process::Command` using argv-style APIs only.
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        if let Some(ref env) = self.env {
            for (key, value) in env {
                cmd.env(key, value);
            }
        }

        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_spec_builder_chain() {
        let cmd = CommandSpec::new("git")
            .arg("-c")
            .args(["core.quotepath=off", "log"])
            .cwd("/repo")
            .env("GIT_TERMINAL_PROMPT", "0");

        assert_eq!(cmd.program, OsString::from("git"));
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/repo")));
        assert_eq!(
            cmd.env.as_ref().and_then(|env| env.get(&OsString::from("GIT_TERMINAL_PROMPT"))),
            Some(&OsString::from("0"))
        );
    }

    #[test]
    fn test_shell_metacharacters_stay_single_args() {
        let cmd = CommandSpec::new("git").arg("main; rm -rf /").arg("$(whoami)");
        assert_eq!(cmd.args.len(), 2);
        assert_eq!(cmd.args[0], OsString::from("main; rm -rf /"));
        assert_eq!(cmd.display_args(), "main; rm -rf / $(whoami)");
    }

    #[test]
    fn test_to_command_preserves_program_and_args() {
        let cmd = CommandSpec::new("git").args(["rev-parse", "HEAD"]);
        let command = cmd.to_command();
        assert_eq!(command.get_program(), "git");
        let args: Vec<_> = command.get_args().collect();
        assert_eq!(args, vec!["rev-parse", "HEAD"]);
    }
}
