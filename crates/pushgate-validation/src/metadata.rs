//! Metadata document parsing.
//!
//! Parse order: JSON when the name ends in `.json` or the content starts with
//! `{`/`[`, then YAML, then a `key=value` / `key: value` properties format
//! whose dotted keys nest.

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};

use crate::error::MetadataParseError;

/// A parsed metadata file: a mapping from field names to values.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataDocument {
    pub file: Utf8PathBuf,
    pub fields: Map<String, Value>,
}

impl MetadataDocument {
    /// Resolve a dot-separated field path. `null` counts as absent.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.fields.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        (!current.is_null()).then_some(current)
    }
}

pub fn parse_metadata(file: &Utf8Path, content: &str) -> Result<MetadataDocument, MetadataParseError> {
    let error = |reason: String| MetadataParseError {
        file: file.to_path_buf(),
        reason,
    };
    let trimmed = content.trim_start_matches('\u{feff}').trim();

    if trimmed.is_empty() {
        return Err(error("file is empty".to_string()));
    }

    let looks_json = file.as_str().ends_with(".json") || trimmed.starts_with(['{', '[']);
    if looks_json {
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(fields)) => return Ok(document(file, fields)),
            Ok(_) => return Err(error("top-level JSON value is not an object".to_string())),
            Err(e) if file.as_str().ends_with(".json") => {
                return Err(error(format!("invalid JSON: {e}")));
            }
            Err(e) => tracing::debug!(file = %file, error = %e, "not JSON, trying YAML"),
        }
    }

    match serde_yaml::from_str::<Value>(trimmed) {
        Ok(Value::Object(fields)) => return Ok(document(file, fields)),
        Ok(_) => {}
        Err(e) => tracing::debug!(file = %file, error = %e, "not YAML, trying properties"),
    }

    let fields = parse_properties(trimmed);
    if fields.is_empty() {
        return Err(error(
            "content is neither a JSON object, a YAML mapping nor key=value pairs".to_string(),
        ));
    }
    Ok(document(file, fields))
}

fn document(file: &Utf8Path, fields: Map<String, Value>) -> MetadataDocument {
    MetadataDocument {
        file: file.to_path_buf(),
        fields,
    }
}

fn parse_properties(content: &str) -> Map<String, Value> {
    let mut root = Map::new();

    for raw in content.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some(split_at) = line.find(['=', ':']) else {
            continue;
        };
        let key = line[..split_at].trim();
        let value = line[split_at + 1..].trim();
        if key.is_empty() {
            continue;
        }
        insert_dotted(&mut root, key, scalar(value));
    }

    root
}

fn scalar(raw: &str) -> Value {
    let unquoted = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(raw);
    match unquoted {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => Value::String(other.to_string()),
    }
}

fn insert_dotted(root: &mut Map<String, Value>, key: &str, value: Value) {
    let mut segments: Vec<&str> = key.split('.').collect();
    let Some(last) = segments.pop() else {
        return;
    };

    let mut current = root;
    for segment in segments {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }
    current.insert(last.to_string(), value);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(name: &str, content: &str) -> MetadataDocument {
        parse_metadata(Utf8Path::new(name), content).unwrap()
    }

    #[test]
    fn test_json_document() {
        let doc = parse(
            "api.meta.json",
            r#"{"assetName": "orders", "API": {"layer": "xAPI", "version": {"status": "live"}}}"#,
        );
        assert_eq!(doc.lookup("API.layer"), Some(&Value::from("xAPI")));
        assert_eq!(doc.lookup("API.version.status"), Some(&Value::from("live")));
        assert_eq!(doc.lookup("API.version.missing"), None);
        assert_eq!(doc.lookup("assetName.deeper"), None);
    }

    #[test]
    fn test_json_detected_by_content() {
        let doc = parse("api.meta", "  {\"ignore\": false}\n");
        assert_eq!(doc.lookup("ignore"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_yaml_document() {
        let doc = parse(
            "api.meta",
            "metaDataVersion: 6.1.0\nAPI:\n  audience: internal\n  version:\n    businessModels:\n      - name: WPB-CIDM\n",
        );
        assert_eq!(doc.lookup("metaDataVersion"), Some(&Value::from("6.1.0")));
        assert_eq!(doc.lookup("API.audience"), Some(&Value::from("internal")));
        assert!(doc.lookup("API.version.businessModels").unwrap().is_array());
    }

    #[test]
    fn test_null_is_absent() {
        let doc = parse("api.meta", "API:\n  layer: ~\n");
        assert_eq!(doc.lookup("API.layer"), None);
    }

    #[test]
    fn test_properties_fallback_nests_dotted_keys() {
        let doc = parse(
            "API.meta",
            "# comment\nAPI.layer=sAPI\nAPI.version.privateAPI = true\nassetName=orders\n",
        );
        assert_eq!(doc.lookup("API.layer"), Some(&Value::from("sAPI")));
        assert_eq!(doc.lookup("API.version.privateAPI"), Some(&Value::Bool(true)));
        assert_eq!(doc.lookup("assetName"), Some(&Value::from("orders")));
    }

    #[test]
    fn test_malformed_documents_are_errors() {
        let err = parse_metadata(Utf8Path::new("api.meta.json"), "{\"a\": ").unwrap_err();
        assert!(err.reason.contains("invalid JSON"));

        let err = parse_metadata(Utf8Path::new("api.meta"), "   \n").unwrap_err();
        assert_eq!(err.reason, "file is empty");

        let err = parse_metadata(Utf8Path::new("api.meta"), "just some words").unwrap_err();
        assert_eq!(err.file, Utf8PathBuf::from("api.meta"));

        let err = parse_metadata(Utf8Path::new("api.meta.json"), "[1, 2]").unwrap_err();
        assert!(err.reason.contains("not an object"));
    }
}
