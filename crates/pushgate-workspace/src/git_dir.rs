//! Read-only access to the repository's git directory.
//!
//! Only files are read here; no git process is spawned, so classification
//! stays pure and cannot hang.

use std::fs;
use std::path::{Path, PathBuf};

/// Resolve the git directory for a working tree root.
///
/// Handles a plain `.git` directory and the `gitdir: <path>` file used by
/// worktrees and submodules. Returns `None` when neither is present.
#[must_use]
pub fn resolve_git_dir(root: &Path) -> Option<PathBuf> {
    let dot_git = root.join(".git");
    if dot_git.is_dir() {
        return Some(dot_git);
    }

    let content = fs::read_to_string(&dot_git).ok()?;
    let target = content
        .lines()
        .find_map(|line| line.strip_prefix("gitdir:"))?
        .trim();
    let path = Path::new(target);
    Some(if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    })
}

/// The git directory holding shared config (`commondir` for linked worktrees).
fn common_dir(git_dir: &Path) -> PathBuf {
    match fs::read_to_string(git_dir.join("commondir")) {
        Ok(content) => {
            let target = Path::new(content.trim());
            if target.is_absolute() {
                target.to_path_buf()
            } else {
                git_dir.join(target)
            }
        }
        Err(_) => git_dir.to_path_buf(),
    }
}

/// The `origin` remote URL from the repository's git config file.
#[must_use]
pub fn origin_url(root: &Path) -> Option<String> {
    let git_dir = resolve_git_dir(root)?;
    let config = fs::read_to_string(common_dir(&git_dir).join("config")).ok()?;
    parse_origin_url(&config)
}

fn parse_origin_url(config: &str) -> Option<String> {
    let mut in_origin = false;

    for raw in config.lines() {
        let line = raw.trim();
        if line.starts_with('[') {
            let header: String = line.chars().filter(|c| !c.is_whitespace()).collect();
            in_origin = header == "[remote\"origin\"]";
            continue;
        }
        if !in_origin {
            continue;
        }
        if let Some((key, value)) = line.split_once('=')
            && key.trim().eq_ignore_ascii_case("url")
        {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Repository name from a remote URL: last path segment without `.git`.
///
/// Works for `https://host/org/name.git`, `git@host:org/name.git` and local
/// paths.
#[must_use]
pub fn repo_name_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let name = trimmed.rsplit(['/', ':', '\\']).next()?;
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origin_url_picks_origin_section() {
        let config = r#"
[core]
	bare = false
[remote "upstream"]
	url = https://example.com/upstream/other.git
[remote "origin"]
	url = git@github.example.com:payments/orders-ds-api.git
	fetch = +refs/heads/*:refs/remotes/origin/*
"#;
        assert_eq!(
            parse_origin_url(config).as_deref(),
            Some("git@github.example.com:payments/orders-ds-api.git")
        );
        assert_eq!(parse_origin_url("[core]\n\tbare = false\n"), None);
    }

    #[test]
    fn test_repo_name_from_url_forms() {
        assert_eq!(
            repo_name_from_url("https://host/org/pricing-decision-service-eu.git").as_deref(),
            Some("pricing-decision-service-eu")
        );
        assert_eq!(
            repo_name_from_url("git@host:org/orders-ds-api.git").as_deref(),
            Some("orders-ds-api")
        );
        assert_eq!(
            repo_name_from_url("git@host:standalone.git").as_deref(),
            Some("standalone")
        );
        assert_eq!(
            repo_name_from_url("/srv/git/local/").as_deref(),
            Some("local")
        );
        assert_eq!(repo_name_from_url(""), None);
    }

    #[test]
    fn test_resolve_git_dir_follows_gitdir_file() {
        let temp = tempfile::tempdir().unwrap();
        let real = temp.path().join("real-git");
        fs::create_dir(&real).unwrap();
        let work = temp.path().join("work");
        fs::create_dir(&work).unwrap();
        fs::write(work.join(".git"), "gitdir: ../real-git\n").unwrap();

        assert_eq!(resolve_git_dir(&work), Some(work.join("../real-git")));

        fs::write(
            real.join("config"),
            "[remote \"origin\"]\n\turl = https://h/o/svc-ds-x.git\n",
        )
        .unwrap();
        assert_eq!(
            origin_url(&work).as_deref(),
            Some("https://h/o/svc-ds-x.git")
        );
    }

    #[test]
    fn test_no_git_dir() {
        let temp = tempfile::tempdir().unwrap();
        assert_eq!(resolve_git_dir(temp.path()), None);
        assert_eq!(origin_url(temp.path()), None);
    }
}
