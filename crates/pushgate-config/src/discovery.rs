use pushgate_utils::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::model::{
    AuditConfig, BusinessUnitsConfig, CliArgs, Config, ConfigSource, Defaults, HooksConfig,
    PatternsConfig, RulesConfig,
};

/// Keys that always carry attribution in `--show-config`.
const ATTRIBUTED_KEYS: &[&str] = &[
    "verbose",
    "interactive",
    "git_timeout_secs",
    "scan_timeout_secs",
    "scan_workers",
    "max_file_bytes",
    "min_justification_chars",
    "scan_enabled",
    "validate_all_meta",
    "patterns",
    "rules_file",
    "business_units",
    "audit_log_path",
    "hooks_path",
];

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
struct TomlConfig {
    defaults: Option<Defaults>,
    patterns: Option<PatternsConfig>,
    rules: Option<RulesConfig>,
    business_units: Option<BusinessUnitsConfig>,
    audit: Option<AuditConfig>,
    hooks: Option<HooksConfig>,
}

macro_rules! merge_default {
    ($target:expr, $file:expr, $attr:expr, $( $field:ident ),+ $(,)?) => {
        $(
            if $file.$field.is_some() {
                $target.$field = $file.$field;
                $attr.insert(stringify!($field).to_string(), ConfigSource::Config);
            }
        )+
    };
}

impl Config {
    /// Discover and load configuration starting from the current directory.
    pub fn discover(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let start_dir = std::env::current_dir().map_err(|e| ConfigError::DiscoveryFailed {
            reason: format!("cannot determine current directory: {e}"),
        })?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from `start_dir`.
    ///
    /// Lookup: `--config`, then `.pushgate/config.toml` upward from
    /// `start_dir`, then `<config_dir>/pushgate/config.toml`.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let config_path = match &cli_args.config_path {
            Some(explicit) if !explicit.exists() => {
                return Err(ConfigError::NotFound {
                    path: explicit.display().to_string(),
                });
            }
            Some(explicit) => Some(explicit.clone()),
            None => Self::discover_config_file_from(start_dir).or_else(user_config_file),
        };

        let mut config = match &config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::builtin(),
        };

        config.apply_cli(cli_args);
        config.validate()?;

        tracing::debug!(
            config_file = ?config.config_file,
            "configuration loaded"
        );

        Ok(config)
    }

    /// Built-in defaults, every key attributed to `default`.
    #[must_use]
    pub fn builtin() -> Self {
        let source_attribution = ATTRIBUTED_KEYS
            .iter()
            .map(|key| ((*key).to_string(), ConfigSource::Default))
            .collect::<HashMap<_, _>>();

        Self {
            source_attribution,
            ..Self::default()
        }
    }

    /// Load one config file over the built-in defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::InvalidFile(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content, Some(path))
    }

    fn from_toml_str(content: &str, path: Option<&Path>) -> Result<Self, ConfigError> {
        let label = path.map_or_else(|| "<inline>".to_string(), |p| p.display().to_string());
        let file: TomlConfig = toml::from_str(content)
            .map_err(|e| ConfigError::InvalidFile(format!("{label}: {e}")))?;

        let mut config = Self::builtin();
        config.config_file = path.map(Path::to_path_buf);
        let attr = &mut config.source_attribution;

        if let Some(file_defaults) = file.defaults {
            merge_default!(
                config.defaults,
                file_defaults,
                attr,
                verbose,
                interactive,
                git_timeout_secs,
                scan_timeout_secs,
                scan_workers,
                max_file_bytes,
                min_justification_chars,
                scan_enabled,
                validate_all_meta,
            );
        }

        if let Some(patterns) = file.patterns {
            if patterns != PatternsConfig::default() {
                attr.insert("patterns".to_string(), ConfigSource::Config);
            }
            config.patterns = patterns;
        }

        if let Some(rules) = file.rules
            && rules.rules_file.is_some()
        {
            config.rules = rules;
            attr.insert("rules_file".to_string(), ConfigSource::Config);
        }

        if let Some(units) = file.business_units {
            config.business_units = units;
            attr.insert("business_units".to_string(), ConfigSource::Config);
        }

        if let Some(audit) = file.audit
            && audit.log_path.is_some()
        {
            config.audit = audit;
            attr.insert("audit_log_path".to_string(), ConfigSource::Config);
        }

        if let Some(hooks) = file.hooks
            && hooks.hooks_path.is_some()
        {
            config.hooks = hooks;
            attr.insert("hooks_path".to_string(), ConfigSource::Config);
        }

        Ok(config)
    }

    fn apply_cli(&mut self, cli_args: &CliArgs) {
        let attr = &mut self.source_attribution;

        if let Some(verbose) = cli_args.verbose {
            self.defaults.verbose = Some(verbose);
            attr.insert("verbose".to_string(), ConfigSource::Cli);
        }
        if let Some(interactive) = cli_args.interactive {
            self.defaults.interactive = Some(interactive);
            attr.insert("interactive".to_string(), ConfigSource::Cli);
        }
        if let Some(timeout) = cli_args.git_timeout_secs {
            self.defaults.git_timeout_secs = Some(timeout);
            attr.insert("git_timeout_secs".to_string(), ConfigSource::Cli);
        }
        if cli_args.compliance_only {
            self.defaults.scan_enabled = Some(false);
            attr.insert("scan_enabled".to_string(), ConfigSource::Cli);
        }
    }

    /// Walk upward from `start_dir` looking for `.pushgate/config.toml`,
    /// stopping at repository root markers (.git, .hg, .svn) or the
    /// filesystem root.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current = Some(start_dir);

        while let Some(dir) = current {
            let candidate = dir.join(".pushgate").join("config.toml");
            if candidate.is_file() {
                return Some(candidate);
            }

            if dir.join(".git").exists() || dir.join(".hg").exists() || dir.join(".svn").exists()
            {
                break;
            }

            current = dir.parent();
        }

        None
    }
}

fn user_config_file() -> Option<PathBuf> {
    let candidate = dirs::config_dir()?.join("pushgate").join("config.toml");
    candidate.is_file().then_some(candidate)
}
