//! Path selectors for the secret scanner.
//!
//! Two glob sets are built here: the exclusion set (paths the scanner never
//! opens) and the forbidden-file set (key material whose mere presence in a
//! push is a finding). Both match case-sensitively against repository-relative
//! paths with `/` separators.

use camino::Utf8Path;
use globset::{Glob, GlobSet, GlobSetBuilder};
use pushgate_utils::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Built-in file-name exclusions, including the test-file heuristics.
pub const DEFAULT_FILE_EXCLUSIONS: &[&str] = &[
    "*.jar",
    "*.war",
    "*.ear",
    "*.pyc",
    "*.class",
    "*.log",
    "*.tmp",
    "*.DS_Store",
    "*.pdf",
    "*.png",
    "*.jpg",
    "*.jpeg",
    "*.gif",
    "*.xlsx",
    "*.xlsb",
    "*.xls",
    "*.csv",
    "**/*test*.*",
    "**/*Test*.*",
];

/// Built-in directory exclusions.
pub const DEFAULT_DIRECTORY_EXCLUSIONS: &[&str] = &[
    "**/node_modules/**",
    "**/dist/**",
    "**/build/**",
    "**/target/**",
    "**/.git/**",
    "**/test/**",
    "**/tests/**",
    "**/Test/**",
    "**/Tests/**",
    "**/*test*/**",
    "**/*Test*/**",
];

/// Key-material files that must never be pushed.
///
/// - `*.pem`, `*.key`, `*.p8` - PEM/PKCS#8 private keys
/// - `*.p12`, `*.pfx`, `*.jks`, `*.keystore` - certificate stores
/// - `*.kdbx` - KeePass databases
/// - `id_rsa`, `id_ed25519` - SSH private keys
/// - `.env` - environment files
pub const FORBIDDEN_FILE_PATTERNS: &[&str] = &[
    "**/*.pem",
    "**/*.key",
    "**/*.p12",
    "**/*.pfx",
    "**/*.jks",
    "**/*.keystore",
    "**/*.p8",
    "**/*.kdbx",
    "**/id_rsa",
    "**/id_ed25519",
    "**/.env",
];

/// The externally editable `exclusions.json` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionsDocument {
    #[serde(default)]
    pub file_extensions: Vec<String>,
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default)]
    pub additional_exclusions: Vec<String>,
}

impl Default for ExclusionsDocument {
    fn default() -> Self {
        Self {
            file_extensions: DEFAULT_FILE_EXCLUSIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            directories: DEFAULT_DIRECTORY_EXCLUSIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            additional_exclusions: Vec::new(),
        }
    }
}

impl ExclusionsDocument {
    /// Parse an `exclusions.json` document. `source` names the file in errors.
    pub fn from_json(content: &str, source: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content)
            .map_err(|e| ConfigError::InvalidFile(format!("{source}: {e}")))
    }

    /// All globs in document order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.file_extensions
            .iter()
            .chain(&self.directories)
            .chain(&self.additional_exclusions)
            .map(String::as_str)
    }
}

/// A compiled, case-sensitive glob set that remembers its source patterns.
#[derive(Debug, Clone)]
pub struct PathSelector {
    patterns: Vec<String>,
    set: GlobSet,
}

impl PathSelector {
    /// Compile `patterns`; `key` names the configuration entry in errors.
    pub fn new<I, S>(patterns: I, key: &str) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut kept = Vec::new();

        for pattern in patterns {
            let pattern = pattern.into();
            let glob = Glob::new(&pattern).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                value: format!("Invalid glob pattern '{pattern}': {e}"),
            })?;
            builder.add(glob);
            kept.push(pattern);
        }

        let set = builder.build().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value: format!("glob set failed to build: {e}"),
        })?;

        Ok(Self {
            patterns: kept,
            set,
        })
    }

    /// Exclusion set built from an exclusions document plus extra globs.
    pub fn exclusions(
        document: &ExclusionsDocument,
        extra: &[String],
    ) -> Result<Self, ConfigError> {
        Self::new(
            document
                .patterns()
                .chain(extra.iter().map(String::as_str)),
            "patterns.exclusions",
        )
    }

    /// Forbidden-file set: built-ins plus configured globs.
    pub fn forbidden(extra: &[String]) -> Result<Self, ConfigError> {
        Self::new(
            FORBIDDEN_FILE_PATTERNS
                .iter()
                .copied()
                .chain(extra.iter().map(String::as_str)),
            "patterns.forbidden_files",
        )
    }

    #[must_use]
    pub fn is_match(&self, path: &Utf8Path) -> bool {
        self.set.is_match(normalize(path).as_str())
    }

    /// The first pattern (in configuration order) matching `path`.
    #[must_use]
    pub fn first_match(&self, path: &Utf8Path) -> Option<&str> {
        self.set
            .matches(normalize(path).as_str())
            .into_iter()
            .min()
            .map(|idx| self.patterns[idx].as_str())
    }

    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Forward slashes, no leading `./`.
fn normalize(path: &Utf8Path) -> String {
    let unified = path.as_str().replace('\\', "/");
    let mut trimmed = unified.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin() -> PathSelector {
        PathSelector::exclusions(&ExclusionsDocument::default(), &[]).unwrap()
    }

    #[test]
    fn test_directory_exclusions_match_at_any_depth() {
        let set = builtin();
        assert!(set.is_match(Utf8Path::new("node_modules/pkg/index.js")));
        assert!(set.is_match(Utf8Path::new("web/node_modules/pkg/index.js")));
        assert!(set.is_match(Utf8Path::new("target/debug/app")));
        assert!(!set.is_match(Utf8Path::new("src/main.rs")));
    }

    #[test]
    fn test_test_name_heuristics() {
        let set = builtin();
        assert!(set.is_match(Utf8Path::new("src/user_test.py")));
        assert!(set.is_match(Utf8Path::new("src/UserTest.java")));
        assert!(set.is_match(Utf8Path::new("src/tests/fixtures.yaml")));
        assert!(!set.is_match(Utf8Path::new("src/config.yaml")));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let set = builtin();
        assert!(set.is_match(Utf8Path::new("docs/diagram.png")));
        assert!(!set.is_match(Utf8Path::new("docs/diagram.PNG")));
        assert!(!set.is_match(Utf8Path::new("src/TEST_data.json")));
    }

    #[test]
    fn test_first_match_reports_configuration_order() {
        let set = builtin();
        assert_eq!(
            set.first_match(Utf8Path::new("build/report.log")),
            Some("*.log")
        );
        assert_eq!(set.first_match(Utf8Path::new("README.md")), None);
    }

    #[test]
    fn test_windows_separators_and_dot_prefix_normalized() {
        let set = builtin();
        assert!(set.is_match(Utf8Path::new("web\\node_modules\\a.js")));
        assert!(set.is_match(Utf8Path::new("./dist/bundle.js")));
    }

    #[test]
    fn test_document_parsing_defaults_missing_keys() {
        let doc =
            ExclusionsDocument::from_json(r#"{"file_extensions": ["*.bin"]}"#, "x.json").unwrap();
        assert_eq!(doc.file_extensions, vec!["*.bin"]);
        assert!(doc.directories.is_empty());

        let set = PathSelector::exclusions(&doc, &["vendor/**".to_string()]).unwrap();
        assert!(set.is_match(Utf8Path::new("blob.bin")));
        assert!(set.is_match(Utf8Path::new("vendor/lib.c")));
        assert!(!set.is_match(Utf8Path::new("node_modules/a.js")));
    }

    #[test]
    fn test_malformed_document_is_config_error() {
        let err = ExclusionsDocument::from_json("{not json", "exclusions.json").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFile(ref msg) if msg.contains("exclusions.json")));
    }

    #[test]
    fn test_invalid_glob_is_config_error() {
        let err = PathSelector::new(["src/[unclosed"], "patterns.extra_exclusions").unwrap_err();
        match err {
            ConfigError::InvalidValue { key, value } => {
                assert_eq!(key, "patterns.extra_exclusions");
                assert!(value.contains("src/[unclosed"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_forbidden_files() {
        let set = PathSelector::forbidden(&[]).unwrap();
        assert!(set.is_match(Utf8Path::new("certs/server.pem")));
        assert!(set.is_match(Utf8Path::new("id_rsa")));
        assert!(set.is_match(Utf8Path::new("deploy/.env")));
        assert!(!set.is_match(Utf8Path::new("deploy/.env.example")));
        assert!(!set.is_match(Utf8Path::new("src/keys.rs")));
    }
}
