//! Facts about the repository being pushed: its project type and where its
//! metadata files live.

pub mod classify;
pub mod git_dir;
pub mod meta_files;

pub use classify::{Classification, ClassificationSignals, classify};
pub use git_dir::{origin_url, repo_name_from_url, resolve_git_dir};
pub use meta_files::{METADATA_FILE_NAMES, find_meta_files, is_metadata_file};
