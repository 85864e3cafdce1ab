use pushgate_redaction::SignatureConfigProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_GIT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SCAN_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_MIN_JUSTIFICATION_CHARS: usize = 10;
pub const MAX_SCAN_WORKERS: usize = 8;

/// Business-unit codes accepted by the `owner.business-unit` rule.
pub const DEFAULT_BUSINESS_UNITS: &[&str] = &[
    "CMB",
    "Central-Architecture",
    "Corporate-Functions",
    "Group-Data",
    "FCR",
    "GBM",
    "GPB",
    "Cyber-Security",
    "ITID",
    "OSS",
    "Payments",
    "RBWM",
    "HBFR",
    "Risk",
    "DAO",
    "WSIT",
    "WPB",
    "Compliance",
    "CTO",
    "Enterprise Technology",
    "GOA",
];

/// Source of a configuration value.
///
/// Serializes to `"cli"`, `"config"` or `"default"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Cli,
    Config,
    Default,
}

impl ConfigSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::Config => "config",
            Self::Default => "default",
        }
    }
}

/// `[defaults]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    pub verbose: Option<bool>,
    pub interactive: Option<bool>,
    pub git_timeout_secs: Option<u64>,
    pub scan_timeout_secs: Option<u64>,
    pub scan_workers: Option<usize>,
    pub max_file_bytes: Option<u64>,
    pub min_justification_chars: Option<usize>,
    pub scan_enabled: Option<bool>,
    pub validate_all_meta: Option<bool>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            verbose: Some(false),
            interactive: Some(false),
            git_timeout_secs: Some(DEFAULT_GIT_TIMEOUT_SECS),
            scan_timeout_secs: Some(DEFAULT_SCAN_TIMEOUT_SECS),
            scan_workers: None,
            max_file_bytes: Some(DEFAULT_MAX_FILE_BYTES),
            min_justification_chars: Some(DEFAULT_MIN_JUSTIFICATION_CHARS),
            scan_enabled: Some(true),
            validate_all_meta: Some(false),
        }
    }
}

/// `[patterns]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PatternsConfig {
    /// Explicit `exclusions.json`; relative paths resolve against the repository root.
    #[serde(default)]
    pub exclusions_file: Option<PathBuf>,
    #[serde(default)]
    pub extra_exclusions: Vec<String>,
    #[serde(default)]
    pub extra_signatures: Vec<String>,
    #[serde(default)]
    pub ignore_signatures: Vec<String>,
    #[serde(default)]
    pub forbidden_files: Vec<String>,
}

impl SignatureConfigProvider for PatternsConfig {
    fn extra_signatures(&self) -> &[String] {
        &self.extra_signatures
    }

    fn ignore_signatures(&self) -> &[String] {
        &self.ignore_signatures
    }
}

/// `[rules]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub rules_file: Option<PathBuf>,
}

/// `[business_units]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BusinessUnitsConfig {
    #[serde(default)]
    pub codes: Vec<String>,
}

impl Default for BusinessUnitsConfig {
    fn default() -> Self {
        Self {
            codes: DEFAULT_BUSINESS_UNITS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

/// `[audit]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub log_path: Option<PathBuf>,
}

/// `[hooks]` section.
///
/// `hooks_path` stands in for git's global `core.hooksPath`; it is passed to the
/// gate explicitly instead of being read from ambient git state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct HooksConfig {
    #[serde(default)]
    pub hooks_path: Option<PathBuf>,
}

/// CLI-provided overrides. `None` means "not given on the command line".
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub verbose: Option<bool>,
    pub interactive: Option<bool>,
    pub git_timeout_secs: Option<u64>,
    /// `--compliance-only`: disables secret scanning.
    pub compliance_only: bool,
}

/// Effective configuration for one run.
///
/// Precedence is CLI > config file > built-in defaults. Every key records its
/// [`ConfigSource`] in `source_attribution`.
///
/// # Configuration File Format
///
/// ```toml
/// [defaults]
/// interactive = true
/// git_timeout_secs = 30
/// scan_workers = 4
///
/// [patterns]
/// exclusions_file = ".pushgate/exclusions.json"
/// extra_exclusions = ["generated/**"]
/// ignore_signatures = ["jwt_token"]
///
/// [rules]
/// rules_file = ".pushgate/rules.toml"
///
/// [business_units]
/// codes = ["WPB", "CMB"]
///
/// [audit]
/// log_path = ".git/pushgate/audit.jsonl"
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub defaults: Defaults,
    pub patterns: PatternsConfig,
    pub rules: RulesConfig,
    pub business_units: BusinessUnitsConfig,
    pub audit: AuditConfig,
    pub hooks: HooksConfig,
    /// The config file that was loaded, if any.
    pub config_file: Option<PathBuf>,
    pub source_attribution: HashMap<String, ConfigSource>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            defaults: Defaults::default(),
            patterns: PatternsConfig::default(),
            rules: RulesConfig::default(),
            business_units: BusinessUnitsConfig::default(),
            audit: AuditConfig::default(),
            hooks: HooksConfig::default(),
            config_file: None,
            source_attribution: HashMap::new(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn verbose(&self) -> bool {
        self.defaults.verbose.unwrap_or(false)
    }

    #[must_use]
    pub fn interactive(&self) -> bool {
        self.defaults.interactive.unwrap_or(false)
    }

    #[must_use]
    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(
            self.defaults
                .git_timeout_secs
                .unwrap_or(DEFAULT_GIT_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(
            self.defaults
                .scan_timeout_secs
                .unwrap_or(DEFAULT_SCAN_TIMEOUT_SECS),
        )
    }

    /// Configured worker count, or available parallelism capped at [`MAX_SCAN_WORKERS`].
    #[must_use]
    pub fn scan_workers(&self) -> usize {
        self.defaults.scan_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .min(MAX_SCAN_WORKERS)
        })
    }

    #[must_use]
    pub fn max_file_bytes(&self) -> u64 {
        self.defaults.max_file_bytes.unwrap_or(DEFAULT_MAX_FILE_BYTES)
    }

    #[must_use]
    pub fn min_justification_chars(&self) -> usize {
        self.defaults
            .min_justification_chars
            .unwrap_or(DEFAULT_MIN_JUSTIFICATION_CHARS)
    }

    #[must_use]
    pub fn scan_enabled(&self) -> bool {
        self.defaults.scan_enabled.unwrap_or(true)
    }

    #[must_use]
    pub fn validate_all_meta(&self) -> bool {
        self.defaults.validate_all_meta.unwrap_or(false)
    }

    /// Audit log location for `repo_root`.
    ///
    /// Defaults to `<repo>/.git/pushgate/audit.jsonl`, or
    /// `<repo>/.pushgate/audit.jsonl` when `.git` is not a directory
    /// (worktrees and submodules use a `.git` file).
    #[must_use]
    pub fn audit_log_path(&self, repo_root: &Path) -> PathBuf {
        match &self.audit.log_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => repo_root.join(path),
            None => {
                let git_dir = repo_root.join(".git");
                if git_dir.is_dir() {
                    git_dir.join("pushgate").join("audit.jsonl")
                } else {
                    repo_root.join(".pushgate").join("audit.jsonl")
                }
            }
        }
    }

    /// Rule document location, resolved against `repo_root` when relative.
    #[must_use]
    pub fn rules_file(&self, repo_root: &Path) -> Option<PathBuf> {
        self.rules.rules_file.as_ref().map(|path| {
            if path.is_absolute() {
                path.clone()
            } else {
                repo_root.join(path)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_fall_back_to_defaults() {
        let config = Config::default();
        assert_eq!(config.git_timeout(), Duration::from_secs(30));
        assert_eq!(config.scan_timeout(), Duration::from_secs(120));
        assert_eq!(config.max_file_bytes(), 5 * 1024 * 1024);
        assert_eq!(config.min_justification_chars(), 10);
        assert!(config.scan_enabled());
        assert!(!config.interactive());
        assert!(!config.validate_all_meta());
        assert!((1..=MAX_SCAN_WORKERS).contains(&config.scan_workers()));
        assert_eq!(config.business_units.codes.len(), DEFAULT_BUSINESS_UNITS.len());
    }

    #[test]
    fn test_audit_log_path_prefers_git_dir() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config::default();

        assert_eq!(
            config.audit_log_path(temp.path()),
            temp.path().join(".pushgate").join("audit.jsonl")
        );

        std::fs::create_dir(temp.path().join(".git")).unwrap();
        assert_eq!(
            config.audit_log_path(temp.path()),
            temp.path().join(".git").join("pushgate").join("audit.jsonl")
        );
    }

    #[test]
    fn test_relative_paths_resolve_against_repo() {
        let mut config = Config::default();
        config.audit.log_path = Some(PathBuf::from("logs/audit.jsonl"));
        config.rules.rules_file = Some(PathBuf::from(".pushgate/rules.toml"));

        let root = Path::new("/repo");
        assert_eq!(
            config.audit_log_path(root),
            PathBuf::from("/repo/logs/audit.jsonl")
        );
        assert_eq!(
            config.rules_file(root),
            Some(PathBuf::from("/repo/.pushgate/rules.toml"))
        );
    }

    #[test]
    fn test_config_source_serializes_lowercase() {
        assert_eq!(ConfigSource::Cli.as_str(), "cli");
        assert_eq!(ConfigSource::Config.as_str(), "config");
        assert_eq!(ConfigSource::Default.as_str(), "default");
    }
}
