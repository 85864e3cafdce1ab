//! Pre-push hook input.
//!
//! git writes one record per pushed ref to the hook's stdin:
//!
//! ```text
//! <local ref> SP <local sha> SP <remote ref> SP <remote sha> LF
//! ```

use pushgate_utils::error::HookInputError;
use pushgate_utils::types::is_null_sha;
use serde::Serialize;
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefUpdate {
    pub local_ref: String,
    pub local_sha: String,
    pub remote_ref: String,
    pub remote_sha: String,
}

impl RefUpdate {
    #[must_use]
    pub fn is_deletion(&self) -> bool {
        is_null_sha(&self.local_sha)
    }

    #[must_use]
    pub fn is_new_branch(&self) -> bool {
        !self.is_deletion() && is_null_sha(&self.remote_sha)
    }

    /// Name reported for this update: the remote ref, which is what the push changes.
    #[must_use]
    pub fn name(&self) -> &str {
        if self.remote_ref.is_empty() {
            &self.local_ref
        } else {
            &self.remote_ref
        }
    }
}

fn is_object_id(value: &str) -> bool {
    matches!(value.len(), 40 | 64) && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Parse one record. `line_number` is 1-based and only used in errors.
pub fn parse_ref_update(line: &str, line_number: usize) -> Result<RefUpdate, HookInputError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [local_ref, local_sha, remote_ref, remote_sha] = fields.as_slice() else {
        return Err(HookInputError::Malformed {
            line_number,
            reason: format!("expected 4 fields, found {}", fields.len()),
        });
    };

    for (label, sha) in [("local", local_sha), ("remote", remote_sha)] {
        if !is_object_id(sha) {
            return Err(HookInputError::Malformed {
                line_number,
                reason: format!("{label} object id '{sha}' is not a hex object id"),
            });
        }
    }

    Ok(RefUpdate {
        local_ref: (*local_ref).to_string(),
        local_sha: (*local_sha).to_string(),
        remote_ref: (*remote_ref).to_string(),
        remote_sha: (*remote_sha).to_string(),
    })
}

/// Read every record from `reader`. Blank lines are ignored; empty input is
/// an empty push.
pub fn read_ref_updates<R: BufRead>(reader: R) -> Result<Vec<RefUpdate>, HookInputError> {
    let mut updates = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| HookInputError::Read(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        updates.push(parse_ref_update(&line, index + 1)?);
    }
    Ok(updates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const A: &str = "1111111111111111111111111111111111111111";
    const B: &str = "2222222222222222222222222222222222222222";
    const Z: &str = "0000000000000000000000000000000000000000";

    #[test]
    fn test_reads_multiple_records() {
        let input = format!(
            "refs/heads/main {A} refs/heads/main {B}\n\nrefs/heads/topic {A} refs/heads/topic {Z}\n"
        );
        let updates = read_ref_updates(Cursor::new(input)).unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].remote_sha, B);
        assert!(updates[1].is_new_branch());
        assert!(!updates[1].is_deletion());
    }

    #[test]
    fn test_deletion_record() {
        let update = parse_ref_update(&format!("(delete) {Z} refs/heads/old {B}"), 1).unwrap();
        assert!(update.is_deletion());
        assert!(!update.is_new_branch());
        assert_eq!(update.name(), "refs/heads/old");
    }

    #[test]
    fn test_empty_input_is_empty_push() {
        assert!(read_ref_updates(Cursor::new("")).unwrap().is_empty());
        assert!(read_ref_updates(Cursor::new("\n  \n")).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_records() {
        let err = read_ref_updates(Cursor::new(format!("\nrefs/heads/main {A}\n"))).unwrap_err();
        assert!(matches!(
            err,
            HookInputError::Malformed { line_number: 2, .. }
        ));

        let err = parse_ref_update(&format!("refs/heads/main {A} refs/heads/main nothex"), 7)
            .unwrap_err();
        match err {
            HookInputError::Malformed { line_number, reason } => {
                assert_eq!(line_number, 7);
                assert!(reason.contains("remote object id"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_sha256_ids_accepted() {
        let long = "a".repeat(64);
        let update =
            parse_ref_update(&format!("refs/heads/main {long} refs/heads/main {long}"), 1).unwrap();
        assert_eq!(update.local_sha.len(), 64);
    }
}
