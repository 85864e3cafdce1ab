use pushgate_selectors::PathSelector;
use pushgate_utils::error::ConfigError;

use super::model::Config;

impl Config {
    /// Validate configuration values, collecting every problem.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let d = &self.defaults;

        if d.git_timeout_secs == Some(0) {
            errors.push("git_timeout_secs must be greater than 0".to_string());
        }
        if d.scan_timeout_secs == Some(0) {
            errors.push("scan_timeout_secs must be greater than 0".to_string());
        }
        if let Some(workers) = d.scan_workers
            && !(1..=64).contains(&workers)
        {
            errors.push(format!("scan_workers must be between 1 and 64, got {workers}"));
        }
        if d.max_file_bytes == Some(0) {
            errors.push("max_file_bytes must be greater than 0".to_string());
        }
        if d.min_justification_chars == Some(0) {
            errors.push("min_justification_chars must be at least 1".to_string());
        }
        if self.business_units.codes.is_empty() {
            errors.push("business_units.codes must not be empty".to_string());
        }
        if self
            .business_units
            .codes
            .iter()
            .any(|code| code.trim().is_empty())
        {
            errors.push("business_units.codes must not contain blank entries".to_string());
        }

        if let Err(e) = PathSelector::new(
            self.patterns.extra_exclusions.iter().cloned(),
            "patterns.extra_exclusions",
        ) {
            errors.push(e.to_string());
        }
        if let Err(e) = PathSelector::new(
            self.patterns.forbidden_files.iter().cloned(),
            "patterns.forbidden_files",
        ) {
            errors.push(e.to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationFailed {
                error_count: errors.len(),
                errors,
            })
        }
    }
}
