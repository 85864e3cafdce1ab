//! Secret scanning over a change set.
//!
//! Workers pull file indices from a shared cursor and the merged report is
//! put back into change-set order, so output never depends on scheduling.
//! A missed deadline aborts the scan; an unreadable or binary file does not.

use camino::{Utf8Path, Utf8PathBuf};
use pushgate_config::{Config, PatternLibrary};
use pushgate_utils::error::ScanError;
use pushgate_utils::types::{ChangeSet, SecretFinding};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Finding id for key-material files that must never be pushed.
pub const FORBIDDEN_FILE_ID: &str = "forbidden_file";

/// Bytes inspected for a NUL when deciding whether a file is binary.
const BINARY_SNIFF_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub workers: usize,
    pub timeout: Duration,
    pub max_file_bytes: u64,
}

impl ScanOptions {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            workers: config.scan_workers(),
            timeout: config.scan_timeout(),
            max_file_bytes: config.max_file_bytes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// Not in the working tree (deleted in the range).
    Missing,
    /// A directory (submodule), FIFO, socket or device.
    NotRegularFile,
    TooLarge { bytes: u64, limit: u64 },
    Binary,
    Unreadable { reason: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("not in working tree"),
            Self::NotRegularFile => f.write_str("not a regular file"),
            Self::TooLarge { bytes, limit } => write!(f, "{bytes} bytes exceeds {limit}"),
            Self::Binary => f.write_str("binary content"),
            Self::Unreadable { reason } => write!(f, "unreadable: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub file: Utf8PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Files whose content was matched.
    pub scanned: usize,
    pub findings: Vec<SecretFinding>,
    pub excluded: Vec<Utf8PathBuf>,
    pub skipped: Vec<SkippedFile>,
}

enum FileOutcome {
    Excluded,
    Skipped(SkipReason),
    Scanned(Vec<SecretFinding>),
}

pub struct SecretScanner<'a> {
    library: &'a PatternLibrary,
    options: ScanOptions,
}

impl<'a> SecretScanner<'a> {
    #[must_use]
    pub fn new(library: &'a PatternLibrary, options: ScanOptions) -> Self {
        Self { library, options }
    }

    /// Scan every path of `changes` under `root`.
    ///
    /// # Errors
    ///
    /// [`ScanError::Timeout`] when the deadline passes before every file was
    /// handled, [`ScanError::WorkerFailed`] when a worker panics.
    pub fn scan(&self, root: &Path, changes: &ChangeSet) -> Result<ScanReport, ScanError> {
        let files = changes.as_slice();
        let total = files.len();
        if total == 0 {
            return Ok(ScanReport::default());
        }

        let deadline = Instant::now() + self.options.timeout;
        let cursor = AtomicUsize::new(0);
        let expired = AtomicBool::new(false);
        let workers = self.options.workers.clamp(1, total);

        let mut outcomes: Vec<(usize, FileOutcome)> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut local = Vec::new();
                        loop {
                            if Instant::now() >= deadline {
                                expired.store(true, Ordering::Relaxed);
                                break;
                            }
                            let index = cursor.fetch_add(1, Ordering::Relaxed);
                            let Some(file) = files.get(index) else {
                                break;
                            };
                            local.push((index, self.scan_file(root, file)));
                        }
                        local
                    })
                })
                .collect();

            let mut merged = Vec::with_capacity(total);
            for handle in handles {
                match handle.join() {
                    Ok(local) => merged.extend(local),
                    Err(_) => {
                        return Err(ScanError::WorkerFailed {
                            reason: "scan worker panicked".to_string(),
                        });
                    }
                }
            }
            Ok(merged)
        })?;

        if expired.load(Ordering::Relaxed) && outcomes.len() < total {
            return Err(ScanError::Timeout {
                timeout_seconds: pushgate_runner::ceil_secs(self.options.timeout),
                scanned: outcomes.len(),
                total,
            });
        }

        outcomes.sort_by_key(|(index, _)| *index);

        let mut report = ScanReport::default();
        for (index, outcome) in outcomes {
            let file = &files[index];
            match outcome {
                FileOutcome::Excluded => report.excluded.push(file.clone()),
                FileOutcome::Skipped(reason) => report.skipped.push(SkippedFile {
                    file: file.clone(),
                    reason,
                }),
                FileOutcome::Scanned(findings) => {
                    report.scanned += 1;
                    report.findings.extend(findings);
                }
            }
        }

        tracing::debug!(
            files = total,
            scanned = report.scanned,
            excluded = report.excluded.len(),
            skipped = report.skipped.len(),
            findings = report.findings.len(),
            "secret scan complete"
        );
        Ok(report)
    }

    /// Match `content` line by line. Exclusions are not consulted.
    #[must_use]
    pub fn scan_text(&self, file: &Utf8Path, content: &str) -> Vec<SecretFinding> {
        content
            .lines()
            .enumerate()
            .flat_map(|(idx, line)| self.library.signatures.scan_line(line, idx + 1))
            .map(|m| SecretFinding {
                file: file.to_path_buf(),
                line: m.line_number,
                signature_id: m.signature_id,
                snippet: m.snippet,
            })
            .collect()
    }

    fn scan_file(&self, root: &Path, file: &Utf8Path) -> FileOutcome {
        if self.library.exclusions.is_match(file) {
            tracing::trace!(file = %file, "excluded from scan");
            return FileOutcome::Excluded;
        }

        if let Some(pattern) = self.library.forbidden.first_match(file) {
            return FileOutcome::Scanned(vec![SecretFinding {
                file: file.to_path_buf(),
                line: 0,
                signature_id: FORBIDDEN_FILE_ID.to_string(),
                snippet: format!("key material file matches {pattern}"),
            }]);
        }

        let path = root.join(file.as_std_path());
        let metadata = match std::fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(file = %file, "not in working tree, skipping");
                return FileOutcome::Skipped(SkipReason::Missing);
            }
            Err(e) => return unreadable(file, &e),
        };

        if !metadata.is_file() {
            tracing::debug!(file = %file, "not a regular file, skipping");
            return FileOutcome::Skipped(SkipReason::NotRegularFile);
        }

        if metadata.len() > self.options.max_file_bytes {
            tracing::warn!(file = %file, bytes = metadata.len(), "file too large to scan, skipping");
            return FileOutcome::Skipped(SkipReason::TooLarge {
                bytes: metadata.len(),
                limit: self.options.max_file_bytes,
            });
        }

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => return unreadable(file, &e),
        };

        if bytes[..bytes.len().min(BINARY_SNIFF_BYTES)].contains(&0) {
            tracing::debug!(file = %file, "binary file, skipping");
            return FileOutcome::Skipped(SkipReason::Binary);
        }

        let content = String::from_utf8_lossy(&bytes);
        FileOutcome::Scanned(self.scan_text(file, &content))
    }
}

fn unreadable(file: &Utf8Path, error: &std::io::Error) -> FileOutcome {
    tracing::warn!(file = %file, error = %error, "cannot read file, skipping");
    FileOutcome::Skipped(SkipReason::Unreadable {
        reason: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushgate_utils::test_support;
    use std::fs;

    fn library() -> PatternLibrary {
        PatternLibrary::load_with_home(&Config::builtin(), Path::new("/nonexistent"), None).unwrap()
    }

    fn options(workers: usize) -> ScanOptions {
        ScanOptions {
            workers,
            timeout: Duration::from_secs(30),
            max_file_bytes: 1024 * 1024,
        }
    }

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_finding_is_masked_and_located() {
        let temp = tempfile::tempdir().unwrap();
        let token = test_support::github_pat();
        write(
            temp.path(),
            "src/settings.py",
            format!("DEBUG = True\nTOKEN = \"{token}\"\n").as_bytes(),
        );

        let library = library();
        let scanner = SecretScanner::new(&library, options(2));
        let changes: ChangeSet = ["src/settings.py"].into_iter().collect();
        let report = scanner.scan(temp.path(), &changes).unwrap();

        assert_eq!(report.scanned, 1);
        assert_eq!(report.findings.len(), 1);
        let finding = &report.findings[0];
        assert_eq!(finding.line, 2);
        assert_eq!(finding.file, Utf8PathBuf::from("src/settings.py"));
        assert!(!finding.snippet.contains(&token));
    }

    #[test]
    fn test_builtin_signatures_detect_each_credential_format() {
        let cases = [
            (format!("key_id = {}", test_support::aws_access_key_id()), "aws_access_key_id"),
            (test_support::pem_marker("RSA "), "private_key"),
            (test_support::pem_marker(""), "private_key"),
            (format!("token: {}", test_support::github_pat()), "github_pat"),
            (
                format!("GH = '{}'", test_support::github_fine_grained_pat()),
                "github_fine_grained_pat",
            ),
            (format!("client({})", test_support::openai_key()), "openai_api_key"),
            (format!("maps = \"{}\"", test_support::gcp_api_key()), "gcp_api_key"),
            (format!("session = \"{}\"", test_support::jwt_token()), "jwt_token"),
            (test_support::aws_secret_assignment(), "aws_secret_assignment"),
            (format!("DSN = {}", test_support::postgres_url()), "database_url"),
            (
                format!("Authorization: {}", test_support::bearer_token()),
                "bearer_token",
            ),
            (test_support::password_assignment(), "password_assignment"),
        ];

        let library = library();
        let scanner = SecretScanner::new(&library, options(1));
        for (line, expected) in &cases {
            let findings = scanner.scan_text(Utf8Path::new("corpus.txt"), line);
            assert_eq!(findings.len(), 1, "{expected}: {findings:?}");
            assert_eq!(findings[0].signature_id, *expected);
            assert_eq!(findings[0].line, 1);
        }
    }

    #[test]
    fn test_excluded_paths_never_report() {
        let temp = tempfile::tempdir().unwrap();
        let token = test_support::github_pat();
        write(
            temp.path(),
            "web/node_modules/pkg/index.js",
            format!("const t = '{token}';").as_bytes(),
        );
        write(temp.path(), "build.log", token.as_bytes());

        let library = library();
        let scanner = SecretScanner::new(&library, options(4));
        let changes: ChangeSet = ["web/node_modules/pkg/index.js", "build.log"]
            .into_iter()
            .collect();
        let report = scanner.scan(temp.path(), &changes).unwrap();

        assert!(report.findings.is_empty());
        assert_eq!(report.excluded.len(), 2);
        assert_eq!(report.scanned, 0);
    }

    #[test]
    fn test_results_follow_change_set_order() {
        let temp = tempfile::tempdir().unwrap();
        let names: Vec<String> = (0..24).map(|i| format!("src/mod_{i:02}.py")).collect();
        for name in &names {
            write(
                temp.path(),
                name,
                format!("KEY = \"{}\"\n", test_support::github_pat()).as_bytes(),
            );
        }
        let changes: ChangeSet = names.iter().rev().map(String::as_str).collect();

        let library = library();
        let report = SecretScanner::new(&library, options(8))
            .scan(temp.path(), &changes)
            .unwrap();

        let order: Vec<&str> = report.findings.iter().map(|f| f.file.as_str()).collect();
        let expected: Vec<&str> = names.iter().rev().map(String::as_str).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn test_binary_large_and_missing_files_are_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let token = test_support::github_pat();
        let mut binary = b"\x00\x01".to_vec();
        binary.extend_from_slice(token.as_bytes());
        write(temp.path(), "assets/blob.bin", &binary);
        write(temp.path(), "data/big.txt", &vec![b'a'; 2048]);

        let library = library();
        let scanner = SecretScanner::new(
            &library,
            ScanOptions {
                max_file_bytes: 1024,
                ..options(1)
            },
        );
        let changes: ChangeSet = ["assets/blob.bin", "data/big.txt", "gone.txt"]
            .into_iter()
            .collect();
        let report = scanner.scan(temp.path(), &changes).unwrap();

        assert!(report.findings.is_empty());
        let reasons: Vec<&SkipReason> = report.skipped.iter().map(|s| &s.reason).collect();
        assert_eq!(
            reasons,
            vec![
                &SkipReason::Binary,
                &SkipReason::TooLarge {
                    bytes: 2048,
                    limit: 1024
                },
                &SkipReason::Missing,
            ]
        );
    }

    #[test]
    fn test_directories_are_skipped_as_not_regular_files() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir_all(temp.path().join("vendor/lib")).unwrap();

        let library = library();
        let scanner = SecretScanner::new(&library, options(1));
        let changes: ChangeSet = ["vendor/lib"].into_iter().collect();
        let report = scanner.scan(temp.path(), &changes).unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::NotRegularFile);
        assert_eq!(report.skipped[0].reason.to_string(), "not a regular file");
    }

    #[cfg(unix)]
    #[test]
    fn test_fifo_is_skipped_without_blocking() {
        let temp = tempfile::tempdir().unwrap();
        let made = std::process::Command::new("mkfifo")
            .arg(temp.path().join("pipe"))
            .status()
            .is_ok_and(|status| status.success());
        if !made {
            return;
        }

        let library = library();
        let scanner = SecretScanner::new(&library, options(1));
        let changes: ChangeSet = ["pipe"].into_iter().collect();
        let report = scanner.scan(temp.path(), &changes).unwrap();

        assert_eq!(report.skipped[0].reason, SkipReason::NotRegularFile);
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let temp = tempfile::tempdir().unwrap();
        let mut content = b"caf\xe9 = 1\n".to_vec();
        content.extend_from_slice(format!("k = \"{}\"\n", test_support::github_pat()).as_bytes());
        write(temp.path(), "legacy.cfg", &content);

        let library = library();
        let changes: ChangeSet = ["legacy.cfg"].into_iter().collect();
        let report = SecretScanner::new(&library, options(1))
            .scan(temp.path(), &changes)
            .unwrap();
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].line, 2);
    }

    #[test]
    fn test_forbidden_key_material() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "deploy/server.pem", b"not really a key");
        write(temp.path(), ".env", b"A=1");

        let library = library();
        let changes: ChangeSet = ["deploy/server.pem", ".env"].into_iter().collect();
        let report = SecretScanner::new(&library, options(2))
            .scan(temp.path(), &changes)
            .unwrap();
        assert_eq!(report.findings.len(), 2);
        assert!(report
            .findings
            .iter()
            .all(|f| f.signature_id == FORBIDDEN_FILE_ID && f.line == 0));
    }

    #[test]
    fn test_zero_timeout_is_scan_timeout() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "a.py", b"x = 1");
        let library = library();
        let scanner = SecretScanner::new(
            &library,
            ScanOptions {
                timeout: Duration::ZERO,
                ..options(1)
            },
        );
        let changes: ChangeSet = ["a.py"].into_iter().collect();
        assert!(matches!(
            scanner.scan(temp.path(), &changes),
            Err(ScanError::Timeout { total: 1, .. })
        ));
    }

    #[test]
    fn test_empty_change_set() {
        let library = library();
        let report = SecretScanner::new(&library, options(4))
            .scan(Path::new("/nonexistent"), &ChangeSet::new())
            .unwrap();
        assert_eq!(report, ScanReport::default());
    }
}
