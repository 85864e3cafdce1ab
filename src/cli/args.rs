//! CLI argument definitions and parsing structures

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pushgate - git pre-push compliance gate
#[derive(Parser, Debug)]
#[command(name = "pushgate")]
#[command(about = "Validate API metadata and scan for secrets before a push leaves the machine")]
#[command(long_about = r#"
pushgate checks what a push is about to publish: API metadata files are
validated against the rule table for the repository's project type and every
changed file is scanned for secret signatures. Failures block the push unless
they are justified interactively; each justification is appended to an audit log.

EXAMPLES:
  # As the pre-push hook (ref records arrive on stdin)
  pushgate pre-push origin git@example.com:team/orders-ds-api.git

  # Show how the repository is classified
  pushgate --identify-only

  # Validate everything pushed since origin/main, offering overrides
  pushgate --commit-range origin/main..HEAD --interactive

  # Validate specific files and print the report as JSON
  pushgate --files svc/api.meta src/settings.py --json

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  The config file is discovered upward from the repository path as .pushgate/config.toml
  Use --config to specify an explicit config file path and --show-config to inspect it

EXIT CODES:
  0 proceed, 1 policy violation, 2 invalid arguments or configuration,
  8 secret detected, 10 timeout, 11 bad commit range or hook input, 130 interrupted
"#)]
#[command(version)]
pub struct Cli {
    /// Repository root (defaults to the current directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub repo_path: Option<PathBuf>,

    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Validate files touched in RANGE (A..B or a single revision)
    #[arg(long, value_name = "RANGE", conflicts_with_all = ["files", "staged_files"])]
    pub commit_range: Option<String>,

    /// Validate an explicit list of files
    #[arg(long, num_args = 1.., value_name = "PATH", conflicts_with = "staged_files")]
    pub files: Vec<PathBuf>,

    /// Validate files staged in the index
    #[arg(long)]
    pub staged_files: bool,

    /// Offer justification prompts for failures
    #[arg(long, global = true)]
    pub interactive: bool,

    /// Print the repository classification and whether validation applies
    #[arg(long)]
    pub identify_only: bool,

    /// List metadata files in the repository
    #[arg(long)]
    pub find_meta: bool,

    /// Skip secret scanning
    #[arg(long, global = true)]
    pub compliance_only: bool,

    /// Emit output as canonical JSON (RFC 8785)
    #[arg(long, global = true)]
    pub json: bool,

    /// Print the effective configuration with the source of each value
    #[arg(long)]
    pub show_config: bool,

    /// Timeout for git operations, in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub git_timeout: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write log lines as JSON on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run as the git pre-push hook; ref records are read from stdin
    PrePush {
        /// Name of the remote being pushed to
        remote: Option<String>,

        /// URL of the remote being pushed to
        url: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manual_flags() {
        let cli = Cli::try_parse_from([
            "pushgate",
            "--commit-range",
            "main..HEAD",
            "--interactive",
            "--git-timeout",
            "5",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.commit_range.as_deref(), Some("main..HEAD"));
        assert!(cli.interactive);
        assert!(cli.json);
        assert_eq!(cli.git_timeout, Some(5));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_files_list() {
        let cli =
            Cli::try_parse_from(["pushgate", "--files", "svc/api.meta", "src/main.py"]).unwrap();
        assert_eq!(cli.files.len(), 2);
    }

    #[test]
    fn test_parse_pre_push_subcommand() {
        let cli = Cli::try_parse_from([
            "pushgate",
            "pre-push",
            "origin",
            "git@example.com:team/repo.git",
            "--compliance-only",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::PrePush { remote, url }) => {
                assert_eq!(remote.as_deref(), Some("origin"));
                assert_eq!(url.as_deref(), Some("git@example.com:team/repo.git"));
            }
            None => panic!("expected pre-push"),
        }
        assert!(cli.compliance_only);
    }

    #[test]
    fn test_range_conflicts_with_files() {
        let result = Cli::try_parse_from([
            "pushgate",
            "--commit-range",
            "a..b",
            "--files",
            "x",
        ]);
        assert!(result.is_err());
    }
}
