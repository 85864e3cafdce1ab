use camino::Utf8PathBuf;
use thiserror::Error;

/// A metadata file could not be read or parsed.
///
/// Never escapes the engine: it becomes an `InvalidFormat` result with rule
/// id [`PARSE_RULE_ID`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot parse metadata file {file}: {reason}")]
pub struct MetadataParseError {
    pub file: Utf8PathBuf,
    pub reason: String,
}

/// Rule id used for unparseable metadata.
pub const PARSE_RULE_ID: &str = "metadata.parse";

/// Rule id used when a repository that needs metadata has none.
pub const PRESENCE_RULE_ID: &str = "metadata.presence";
