use pushgate_redaction::SignatureSet;
use pushgate_selectors::{ExclusionsDocument, PathSelector};
use pushgate_utils::error::ConfigError;
use std::path::{Path, PathBuf};

use super::model::Config;

/// Where the exclusion globs came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionsOrigin {
    /// `patterns.exclusions_file`
    Explicit(PathBuf),
    /// `<repo>/.pushgate/exclusions.json`
    Repository(PathBuf),
    /// `~/.pushgate/exclusions.json`
    User(PathBuf),
    BuiltIn,
}

impl std::fmt::Display for ExclusionsOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit(p) | Self::Repository(p) | Self::User(p) => {
                write!(f, "{}", p.display())
            }
            Self::BuiltIn => f.write_str("built-in"),
        }
    }
}

/// Compiled scanner configuration: exclusions, forbidden files and signatures.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    pub exclusions: PathSelector,
    pub forbidden: PathSelector,
    pub signatures: SignatureSet,
    pub origin: ExclusionsOrigin,
}

impl PatternLibrary {
    /// Load the library for `repo_root` using the user's home directory for
    /// the per-user exclusions document.
    pub fn load(config: &Config, repo_root: &Path) -> Result<Self, ConfigError> {
        Self::load_with_home(config, repo_root, dirs::home_dir().as_deref())
    }

    /// Load with an explicit home directory (`None` skips the per-user lookup).
    pub fn load_with_home(
        config: &Config,
        repo_root: &Path,
        home: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let (document, origin) = locate_exclusions(config, repo_root, home)?;

        let exclusions = PathSelector::exclusions(&document, &config.patterns.extra_exclusions)?;
        let forbidden = PathSelector::forbidden(&config.patterns.forbidden_files)?;
        let signatures =
            SignatureSet::from_config(&config.patterns).map_err(|e| ConfigError::InvalidValue {
                key: "patterns.extra_signatures".to_string(),
                value: format!("{e:#}"),
            })?;

        tracing::debug!(
            exclusions = exclusions.len(),
            forbidden = forbidden.len(),
            signatures = signatures.signature_ids().len(),
            origin = %origin,
            "pattern library loaded"
        );

        Ok(Self {
            exclusions,
            forbidden,
            signatures,
            origin,
        })
    }
}

fn locate_exclusions(
    config: &Config,
    repo_root: &Path,
    home: Option<&Path>,
) -> Result<(ExclusionsDocument, ExclusionsOrigin), ConfigError> {
    if let Some(explicit) = &config.patterns.exclusions_file {
        let path = if explicit.is_absolute() {
            explicit.clone()
        } else {
            repo_root.join(explicit)
        };
        if !path.is_file() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }
        let document = read_document(&path)?;
        return Ok((document, ExclusionsOrigin::Explicit(path)));
    }

    let repo_candidate = repo_root.join(".pushgate").join("exclusions.json");
    if repo_candidate.is_file() {
        let document = read_document(&repo_candidate)?;
        return Ok((document, ExclusionsOrigin::Repository(repo_candidate)));
    }

    if let Some(home) = home {
        let user_candidate = home.join(".pushgate").join("exclusions.json");
        if user_candidate.is_file() {
            let document = read_document(&user_candidate)?;
            return Ok((document, ExclusionsOrigin::User(user_candidate)));
        }
    }

    Ok((ExclusionsDocument::default(), ExclusionsOrigin::BuiltIn))
}

fn read_document(path: &Path) -> Result<ExclusionsDocument, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::InvalidFile(format!("failed to read {}: {e}", path.display()))
    })?;
    ExclusionsDocument::from_json(&content, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use std::fs;

    fn write(path: &Path, body: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn test_builtin_when_nothing_configured() {
        let repo = tempfile::tempdir().unwrap();
        let library =
            PatternLibrary::load_with_home(&Config::builtin(), repo.path(), None).unwrap();
        assert_eq!(library.origin, ExclusionsOrigin::BuiltIn);
        assert!(library.exclusions.is_match(Utf8Path::new("node_modules/a/index.js")));
        assert!(library.forbidden.is_match(Utf8Path::new("keys/server.pem")));
        assert!(library.signatures.signature_ids().contains(&"github_pat"));
    }

    #[test]
    fn test_repository_document_beats_user_document() {
        let repo = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let repo_doc = repo.path().join(".pushgate").join("exclusions.json");
        write(&repo_doc, r#"{"file_extensions": ["*.snap"]}"#);
        write(
            &home.path().join(".pushgate").join("exclusions.json"),
            r#"{"file_extensions": ["*.user"]}"#,
        );

        let library =
            PatternLibrary::load_with_home(&Config::builtin(), repo.path(), Some(home.path()))
                .unwrap();
        assert_eq!(library.origin, ExclusionsOrigin::Repository(repo_doc));
        assert!(library.exclusions.is_match(Utf8Path::new("ui/view.snap")));
        assert!(!library.exclusions.is_match(Utf8Path::new("a.user")));
        // A document replaces the built-in globs.
        assert!(!library.exclusions.is_match(Utf8Path::new("node_modules/a.js")));
    }

    #[test]
    fn test_user_document_used_as_fallback() {
        let repo = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();
        let user_doc = home.path().join(".pushgate").join("exclusions.json");
        write(&user_doc, r#"{"directories": ["**/vendor/**"]}"#);

        let library =
            PatternLibrary::load_with_home(&Config::builtin(), repo.path(), Some(home.path()))
                .unwrap();
        assert_eq!(library.origin, ExclusionsOrigin::User(user_doc));
        assert!(library.exclusions.is_match(Utf8Path::new("third/vendor/x.go")));
    }

    #[test]
    fn test_explicit_document_and_extras() {
        let repo = tempfile::tempdir().unwrap();
        write(
            &repo.path().join("cfg").join("ex.json"),
            r#"{"additional_exclusions": ["docs/**"]}"#,
        );
        let mut config = Config::builtin();
        config.patterns.exclusions_file = Some(PathBuf::from("cfg/ex.json"));
        config.patterns.extra_exclusions = vec!["*.lock".to_string()];
        config.patterns.forbidden_files = vec!["**/*.secret".to_string()];
        config.patterns.ignore_signatures = vec!["jwt_token".to_string()];

        let library = PatternLibrary::load_with_home(&config, repo.path(), None).unwrap();
        assert!(matches!(library.origin, ExclusionsOrigin::Explicit(_)));
        assert!(library.exclusions.is_match(Utf8Path::new("docs/guide.md")));
        assert!(library.exclusions.is_match(Utf8Path::new("Cargo.lock")));
        assert!(library.forbidden.is_match(Utf8Path::new("app/db.secret")));
        assert!(!library.signatures.signature_ids().contains(&"jwt_token"));
    }

    #[test]
    fn test_configuration_errors() {
        let repo = tempfile::tempdir().unwrap();

        let mut missing = Config::builtin();
        missing.patterns.exclusions_file = Some(PathBuf::from("absent.json"));
        assert!(matches!(
            PatternLibrary::load_with_home(&missing, repo.path(), None),
            Err(ConfigError::NotFound { .. })
        ));

        write(&repo.path().join(".pushgate").join("exclusions.json"), "{oops");
        assert!(matches!(
            PatternLibrary::load_with_home(&Config::builtin(), repo.path(), None),
            Err(ConfigError::InvalidFile(_))
        ));

        let other = tempfile::tempdir().unwrap();
        let mut bad_signature = Config::builtin();
        bad_signature.patterns.extra_signatures = vec!["(unclosed".to_string()];
        assert!(matches!(
            PatternLibrary::load_with_home(&bad_signature, other.path(), None),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
