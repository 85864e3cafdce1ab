use std::collections::BTreeMap;

use super::model::{Config, ConfigSource};

impl Config {
    fn source_of(&self, key: &str) -> &'static str {
        self.source_attribution
            .get(key)
            .copied()
            .unwrap_or(ConfigSource::Default)
            .as_str()
    }

    /// Effective configuration as `key -> (value, source)`, sorted by key.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut config = BTreeMap::new();

        let mut add = |key: &str, value: String| {
            config.insert(key.to_string(), (value, self.source_of(key).to_string()));
        };

        add("verbose", self.verbose().to_string());
        add("interactive", self.interactive().to_string());
        add("git_timeout_secs", self.git_timeout().as_secs().to_string());
        add("scan_timeout_secs", self.scan_timeout().as_secs().to_string());
        add("scan_workers", self.scan_workers().to_string());
        add("max_file_bytes", self.max_file_bytes().to_string());
        add(
            "min_justification_chars",
            self.min_justification_chars().to_string(),
        );
        add("scan_enabled", self.scan_enabled().to_string());
        add("validate_all_meta", self.validate_all_meta().to_string());

        let patterns = &self.patterns;
        add(
            "patterns",
            format!(
                "exclusions_file={} extra_exclusions=[{}] extra_signatures={} ignore_signatures=[{}] forbidden_files=[{}]",
                patterns
                    .exclusions_file
                    .as_ref()
                    .map_or_else(|| "auto".to_string(), |p| p.display().to_string()),
                patterns.extra_exclusions.join(", "),
                patterns.extra_signatures.len(),
                patterns.ignore_signatures.join(", "),
                patterns.forbidden_files.join(", "),
            ),
        );
        add(
            "rules_file",
            self.rules
                .rules_file
                .as_ref()
                .map_or_else(|| "built-in".to_string(), |p| p.display().to_string()),
        );
        add("business_units", self.business_units.codes.join(", "));
        add(
            "audit_log_path",
            self.audit
                .log_path
                .as_ref()
                .map_or_else(|| ".git/pushgate/audit.jsonl".to_string(), |p| {
                    p.display().to_string()
                }),
        );
        add(
            "hooks_path",
            self.hooks
                .hooks_path
                .as_ref()
                .map_or_else(|| "unset".to_string(), |p| p.display().to_string()),
        );

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CliArgs;

    #[test]
    fn test_effective_config_reports_sources() {
        let temp = tempfile::tempdir().unwrap();
        let cli = CliArgs {
            interactive: Some(true),
            config_path: None,
            ..CliArgs::default()
        };
        std::fs::create_dir(temp.path().join(".git")).unwrap();
        std::fs::create_dir(temp.path().join(".pushgate")).unwrap();
        std::fs::write(
            temp.path().join(".pushgate").join("config.toml"),
            "[defaults]\nscan_timeout_secs = 60\n",
        )
        .unwrap();

        let config = Config::discover_from(temp.path(), &cli).unwrap();
        let effective = config.effective_config();

        assert_eq!(
            effective.get("interactive"),
            Some(&("true".to_string(), "cli".to_string()))
        );
        assert_eq!(
            effective.get("scan_timeout_secs"),
            Some(&("60".to_string(), "config".to_string()))
        );
        assert_eq!(
            effective.get("git_timeout_secs"),
            Some(&("30".to_string(), "default".to_string()))
        );
        assert_eq!(
            effective.get("rules_file").map(|(v, _)| v.as_str()),
            Some("built-in")
        );
    }
}
