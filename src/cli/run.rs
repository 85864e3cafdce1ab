//! CLI entry point and dispatch logic
//!
//! This module owns the `run()` function which:
//! - Parses CLI arguments
//! - Builds CliArgs and discovers Config
//! - Creates the tokio runtime
//! - Dispatches to command handlers
//! - Handles all error output

use camino::{Utf8Component, Utf8PathBuf};
use clap::Parser;
use std::path::{Path, PathBuf};

use super::args::{Cli, Commands};
use super::commands::{self, ValidationTarget};

use pushgate_config::{CliArgs, Config};
use pushgate_engine::CommitRange;
use pushgate_gate::{PushReport, read_ref_updates};
use pushgate_utils::error::{ConfigError, GateError};
use pushgate_utils::exit_codes::ExitCode;
use pushgate_utils::logging::init_tracing;

/// Main CLI execution function.
///
/// This function handles ALL output including errors. It returns `Result<(), ExitCode>`:
/// - On success (Proceed): returns `Ok(())` after printing any output
/// - On Block or error: prints the report or error, returns `Err(ExitCode)`
///
/// main.rs only calls `std::process::exit(code.as_i32())` on error - it does NOT print.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose, cli.log_json) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let repo_root = match resolve_repo_root(cli.repo_path.as_deref()) {
        Ok(root) => root,
        Err(err) => return Err(report_error(&err)),
    };

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        verbose: cli.verbose.then_some(true),
        interactive: cli.interactive.then_some(true),
        git_timeout_secs: cli.git_timeout,
        compliance_only: cli.compliance_only,
    };

    let config = match Config::discover_from(&repo_root, &cli_args) {
        Ok(config) => config,
        Err(err) => return Err(report_error(&GateError::Config(err))),
    };

    if cli.show_config {
        return finish(commands::execute_show_config_command(&config, cli.json));
    }
    if cli.identify_only {
        return finish(commands::execute_identify_command(&repo_root, cli.json));
    }
    if cli.find_meta {
        return finish(commands::execute_find_meta_command(
            &repo_root,
            config.scan_timeout(),
            cli.json,
        ));
    }

    let target = match build_target(&cli, &repo_root) {
        Ok(Some(target)) => target,
        Ok(None) => {
            eprintln!("No validation mode specified. Use --help for options.");
            return Err(ExitCode::CLI_ARGS);
        }
        Err(err) => {
            let report = PushReport::from_error(&err);
            if let Err(e) = commands::render_report(&report, cli.json) {
                eprintln!("✗ {e:#}");
            }
            return Err(report.exit_code());
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let result = rt.block_on(commands::execute_validation(
        target, config, repo_root, cli.json,
    ));

    // A prompt may still be blocked on the terminal after an interrupt.
    rt.shutdown_background();
    result
}

fn report_error(err: &GateError) -> ExitCode {
    eprintln!("{}", err.display_for_user());
    err.to_exit_code()
}

fn finish(result: anyhow::Result<()>) -> Result<(), ExitCode> {
    result.map_err(|e| {
        eprintln!("✗ {e:#}");
        ExitCode::INTERNAL
    })
}

fn resolve_repo_root(repo_path: Option<&Path>) -> Result<PathBuf, GateError> {
    let path = match repo_path {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()?,
    };

    dunce::canonicalize(&path).map_err(|e| {
        GateError::Config(ConfigError::InvalidValue {
            key: "repo-path".to_string(),
            value: format!("{}: {e}", path.display()),
        })
    })
}

fn build_target(cli: &Cli, repo_root: &Path) -> Result<Option<ValidationTarget>, GateError> {
    if let Some(Commands::PrePush { remote, .. }) = &cli.command {
        tracing::info!(remote = remote.as_deref().unwrap_or(""), "pre-push hook invoked");
        let updates = read_ref_updates(std::io::stdin().lock())?;
        return Ok(Some(ValidationTarget::Push(updates)));
    }

    if let Some(range) = &cli.commit_range {
        let range = range.trim();
        if range.is_empty() {
            return Err(GateError::Config(ConfigError::InvalidValue {
                key: "commit-range".to_string(),
                value: "empty range".to_string(),
            }));
        }
        return Ok(Some(ValidationTarget::Range(CommitRange::Expression(
            range.to_string(),
        ))));
    }

    if !cli.files.is_empty() {
        let files = cli
            .files
            .iter()
            .map(|file| repo_relative(repo_root, file))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Some(ValidationTarget::Files(files)));
    }

    if cli.staged_files {
        return Ok(Some(ValidationTarget::Staged));
    }

    Ok(None)
}

/// Convert a `--files` argument into a repository-relative path.
fn repo_relative(repo_root: &Path, file: &Path) -> Result<Utf8PathBuf, GateError> {
    let invalid = |reason: &str| {
        GateError::Config(ConfigError::InvalidValue {
            key: "files".to_string(),
            value: format!("{}: {reason}", file.display()),
        })
    };

    let relative = if file.is_absolute() {
        let file = dunce::canonicalize(file).unwrap_or_else(|_| file.to_path_buf());
        file.strip_prefix(repo_root)
            .map(Path::to_path_buf)
            .map_err(|_| invalid("outside the repository"))?
    } else {
        file.to_path_buf()
    };

    let relative = Utf8PathBuf::from_path_buf(relative).map_err(|_| invalid("not valid UTF-8"))?;

    // Resolve `.` and `..` lexically; climbing above the root escapes the repository.
    let mut normalized = Utf8PathBuf::new();
    for component in relative.components() {
        match component {
            Utf8Component::Normal(part) => normalized.push(part),
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => {
                if !normalized.pop() {
                    return Err(invalid("outside the repository"));
                }
            }
            Utf8Component::RootDir | Utf8Component::Prefix(_) => {
                return Err(invalid("outside the repository"));
            }
        }
    }

    if normalized.as_str().is_empty() {
        return Err(invalid("not a file in the repository"));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_relative_keeps_relative_paths() {
        let root = Path::new("/repo");
        assert_eq!(
            repo_relative(root, Path::new("svc/api.meta")).unwrap(),
            Utf8PathBuf::from("svc/api.meta")
        );
        assert_eq!(
            repo_relative(root, Path::new("./svc/api.meta")).unwrap(),
            Utf8PathBuf::from("svc/api.meta")
        );
    }

    #[test]
    fn test_repo_relative_strips_root_from_absolute_paths() {
        let temp = tempfile::tempdir().unwrap();
        let root = dunce::canonicalize(temp.path()).unwrap();
        std::fs::create_dir_all(root.join("svc")).unwrap();
        std::fs::write(root.join("svc/api.meta"), "").unwrap();

        let relative = repo_relative(&root, &root.join("svc/api.meta")).unwrap();
        assert_eq!(relative, Utf8PathBuf::from("svc/api.meta"));
    }

    #[test]
    fn test_repo_relative_rejects_outside_paths() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("repo");
        std::fs::create_dir_all(&root).unwrap();

        let err = repo_relative(&root, &temp.path().join("elsewhere.txt")).unwrap_err();
        assert_eq!(err.to_exit_code(), ExitCode::CLI_ARGS);

        for escape in ["../../etc/passwd", "svc/../../outside.txt", "..", "."] {
            let err = repo_relative(&root, Path::new(escape)).unwrap_err();
            assert_eq!(err.to_exit_code(), ExitCode::CLI_ARGS, "{escape}");
        }
    }

    #[test]
    fn test_repo_relative_resolves_inner_parent_components() {
        let root = Path::new("/repo");
        assert_eq!(
            repo_relative(root, Path::new("svc/../src/./app.py")).unwrap(),
            Utf8PathBuf::from("src/app.py")
        );
    }
}
