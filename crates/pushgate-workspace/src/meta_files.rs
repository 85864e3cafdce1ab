use camino::{Utf8Path, Utf8PathBuf};
use pushgate_utils::error::ScanError;
use std::path::Path;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// File names recognised as API metadata.
pub const METADATA_FILE_NAMES: &[&str] = &[
    "api.meta",
    "api.meta.yaml",
    "api.meta.yml",
    "api.meta.json",
    "API.meta",
    "API.META",
];

const SKIPPED_DIRS: &[&str] = &["node_modules", "target", "build", "dist", "venv", "__pycache__"];

#[must_use]
pub fn is_metadata_file(path: &Utf8Path) -> bool {
    path.file_name()
        .is_some_and(|name| METADATA_FILE_NAMES.contains(&name))
}

/// All metadata files under `root`, repository-relative and sorted.
///
/// Hidden directories and build/dependency directories are not descended
/// into. Unreadable entries and non-UTF-8 paths are skipped. With a `timeout`,
/// the walk stops with [`ScanError::StageTimeout`] once it is exceeded.
pub fn find_meta_files(
    root: &Path,
    timeout: Option<Duration>,
) -> Result<Vec<Utf8PathBuf>, ScanError> {
    let deadline = timeout.and_then(|limit| Some((Instant::now().checked_add(limit)?, limit)));

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !name.starts_with('.') && !SKIPPED_DIRS.contains(&name.as_ref())
        });

    let mut found = Vec::new();
    for entry in walker {
        if let Some((at, limit)) = deadline
            && Instant::now() >= at
        {
            tracing::warn!(root = %root.display(), found = found.len(), "metadata discovery timed out");
            return Err(ScanError::stage_timeout("metadata discovery", limit, found.len()));
        }

        let Ok(entry) = entry else {
            continue;
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(relative) = entry
            .path()
            .strip_prefix(root)
            .ok()
            .and_then(Utf8Path::from_path)
        else {
            continue;
        };
        if is_metadata_file(relative) {
            found.push(unix_style(relative));
        }
    }

    found.sort();
    Ok(found)
}

fn unix_style(path: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(path.as_str().replace('\\', "/"))
}
