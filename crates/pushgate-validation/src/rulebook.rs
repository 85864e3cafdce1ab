//! Rule tables keyed by project type, loaded once per run.
//!
//! A rule document is TOML with `[[pcf]]` and `[[shp_ikp]]` arrays; a present
//! array replaces the built-in table for that type.
//!
//! ```toml
//! [[shp_ikp]]
//! id = "api.layer"
//! field = "API.layer"
//! check = { kind = "one_of", values = ["xAPI", "sAPI", "eAPI"] }
//! ```

use pushgate_utils::error::ConfigError;
use pushgate_utils::types::ProjectType;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::rules::{Predicate, Rule, builtin_rules};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleDocument {
    pcf: Option<Vec<Rule>>,
    shp_ikp: Option<Vec<Rule>>,
}

/// A rule with its regex or version bound prepared.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: Rule,
    pub(crate) regex: Option<Regex>,
    pub(crate) min_version: Option<(u64, u64, u64)>,
}

/// Validated rule tables plus the business-unit set they reference.
#[derive(Debug, Clone)]
pub struct RuleBook {
    pcf: Vec<CompiledRule>,
    shp_ikp: Vec<CompiledRule>,
    business_units: Vec<String>,
}

impl RuleBook {
    /// The built-in tables.
    pub fn builtin(business_units: Vec<String>) -> Result<Self, ConfigError> {
        Self::from_tables(
            builtin_rules(ProjectType::Pcf),
            builtin_rules(ProjectType::ShpIkp),
            business_units,
        )
    }

    /// Validate and compile explicit tables.
    pub fn from_tables(
        pcf: Vec<Rule>,
        shp_ikp: Vec<Rule>,
        business_units: Vec<String>,
    ) -> Result<Self, ConfigError> {
        let mut errors = Vec::new();
        let pcf = compile_table("pcf", pcf, &business_units, &mut errors);
        let shp_ikp = compile_table("shp_ikp", shp_ikp, &business_units, &mut errors);

        if !errors.is_empty() {
            return Err(ConfigError::ValidationFailed {
                error_count: errors.len(),
                errors,
            });
        }

        Ok(Self {
            pcf,
            shp_ikp,
            business_units,
        })
    }

    /// Load a rule document over the built-in tables.
    pub fn load(path: &Path, business_units: Vec<String>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.display().to_string(),
                }
            } else {
                ConfigError::InvalidFile(format!("failed to read {}: {e}", path.display()))
            }
        })?;
        Self::from_toml_str(&content, &path.display().to_string(), business_units)
    }

    pub fn from_toml_str(
        content: &str,
        source: &str,
        business_units: Vec<String>,
    ) -> Result<Self, ConfigError> {
        let document: RuleDocument = toml::from_str(content)
            .map_err(|e| ConfigError::InvalidFile(format!("{source}: {e}")))?;

        Self::from_tables(
            document
                .pcf
                .unwrap_or_else(|| builtin_rules(ProjectType::Pcf)),
            document
                .shp_ikp
                .unwrap_or_else(|| builtin_rules(ProjectType::ShpIkp)),
            business_units,
        )
    }

    /// The table for `project_type`; empty for General.
    #[must_use]
    pub fn table(&self, project_type: ProjectType) -> &[CompiledRule] {
        match project_type {
            ProjectType::General => &[],
            ProjectType::Pcf => &self.pcf,
            ProjectType::ShpIkp => &self.shp_ikp,
        }
    }

    #[must_use]
    pub fn business_units(&self) -> &[String] {
        &self.business_units
    }
}

fn compile_table(
    name: &str,
    rules: Vec<Rule>,
    business_units: &[String],
    errors: &mut Vec<String>,
) -> Vec<CompiledRule> {
    let mut ids = HashSet::new();
    let mut owners = HashSet::new();
    let mut compiled = Vec::with_capacity(rules.len());

    for rule in rules {
        let at = format!("{name}.{}", rule.id);

        if rule.id.trim().is_empty() {
            errors.push(format!("{name}: rule with empty id"));
        } else if !ids.insert(rule.id.clone()) {
            errors.push(format!("{at}: duplicate rule id"));
        }

        for path in rule.paths() {
            if path.trim().is_empty() {
                errors.push(format!("{at}: empty field path"));
            } else if !owners.insert(path.to_string()) {
                errors.push(format!("{at}: field '{path}' is owned by more than one rule"));
            }
        }

        if let Some(condition) = &rule.when
            && condition.field.trim().is_empty()
        {
            errors.push(format!("{at}: condition has an empty field"));
        }

        let mut regex = None;
        let mut min_version = None;
        match &rule.check {
            Predicate::Pattern { regex: source } => match Regex::new(source) {
                Ok(re) => regex = Some(re),
                Err(e) => errors.push(format!("{at}: invalid regex '{source}': {e}")),
            },
            Predicate::OneOf { values } if values.is_empty() => {
                errors.push(format!("{at}: one_of needs at least one value"));
            }
            Predicate::MinVersion { version } => match parse_version(version) {
                Some(parsed) => min_version = Some(parsed),
                None => errors.push(format!("{at}: invalid minimum version '{version}'")),
            },
            Predicate::BusinessUnit if business_units.is_empty() => {
                errors.push(format!("{at}: business unit set is empty"));
            }
            Predicate::ContainsEntry { key, .. } if key.trim().is_empty() => {
                errors.push(format!("{at}: contains_entry needs a key"));
            }
            _ => {}
        }

        compiled.push(CompiledRule {
            rule,
            regex,
            min_version,
        });
    }

    compiled
}

/// `major.minor.patch[.more]` with numeric leading parts.
pub(crate) fn parse_version(raw: &str) -> Option<(u64, u64, u64)> {
    let mut parts = raw.trim().split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    Some((major, minor, patch))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units() -> Vec<String> {
        vec!["WPB".to_string(), "CMB".to_string()]
    }

    #[test]
    fn test_builtin_compiles() {
        let book = RuleBook::builtin(units()).unwrap();
        assert_eq!(book.table(ProjectType::Pcf).len(), 21);
        assert_eq!(book.table(ProjectType::ShpIkp).len(), 21);
        assert!(book.table(ProjectType::General).is_empty());
    }

    #[test]
    fn test_document_replaces_only_present_tables() {
        let book = RuleBook::from_toml_str(
            r#"
[[pcf]]
id = "meta.asset-name"
field = "assetName"
check = { kind = "required" }
"#,
            "rules.toml",
            units(),
        )
        .unwrap();
        assert_eq!(book.table(ProjectType::Pcf).len(), 1);
        assert_eq!(book.table(ProjectType::ShpIkp).len(), 21);
    }

    #[test]
    fn test_validation_collects_all_problems() {
        let err = RuleBook::from_toml_str(
            r#"
[[shp_ikp]]
id = "a"
field = "x"
check = { kind = "pattern", regex = "(" }

[[shp_ikp]]
id = "a"
field = "x"
check = { kind = "one_of", values = [] }

[[shp_ikp]]
id = "b"
field = "y"
check = { kind = "business_unit" }
"#,
            "rules.toml",
            Vec::new(),
        )
        .unwrap_err();

        match err {
            ConfigError::ValidationFailed { errors, error_count } => {
                assert_eq!(error_count, 5, "{errors:?}");
                assert!(errors.iter().any(|e| e.contains("invalid regex")));
                assert!(errors.iter().any(|e| e.contains("duplicate rule id")));
                assert!(errors.iter().any(|e| e.contains("owned by more than one rule")));
                assert!(errors.iter().any(|e| e.contains("one_of")));
                assert!(errors.iter().any(|e| e.contains("business unit set is empty")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_table_and_bad_toml_are_invalid_file() {
        assert!(matches!(
            RuleBook::from_toml_str("[[general]]\nid = \"x\"\n", "rules.toml", units()),
            Err(ConfigError::InvalidFile(_))
        ));
        assert!(matches!(
            RuleBook::from_toml_str("[[pcf]\n", "rules.toml", units()),
            Err(ConfigError::InvalidFile(_))
        ));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        assert!(matches!(
            RuleBook::load(&temp.path().join("rules.toml"), units()),
            Err(ConfigError::NotFound { .. })
        ));
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("6.0.0"), Some((6, 0, 0)));
        assert_eq!(parse_version("6.10.2.1"), Some((6, 10, 2)));
        assert_eq!(parse_version("6.0"), None);
        assert_eq!(parse_version("v6.0.0"), None);
    }
}
