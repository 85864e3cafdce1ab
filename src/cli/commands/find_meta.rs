//! `--find-meta`: list the repository's metadata files.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

use pushgate_gate::emit_jcs;
use pushgate_utils::types::ProjectType;
use pushgate_workspace::{classify, find_meta_files};

#[derive(Debug, Serialize)]
struct FindMetaOutput {
    project_type: ProjectType,
    requires_validation: bool,
    files: Vec<Utf8PathBuf>,
}

pub fn execute_find_meta_command(repo_root: &Path, timeout: Duration, json: bool) -> Result<()> {
    let classification = classify(repo_root);
    let requires_validation = classification.requires_validation();
    let files = if requires_validation {
        find_meta_files(repo_root, Some(timeout)).context("Failed to list metadata files")?
    } else {
        Vec::new()
    };

    if json {
        let output = FindMetaOutput {
            project_type: classification.project_type,
            requires_validation,
            files,
        };
        println!(
            "{}",
            emit_jcs(&output).context("Failed to emit metadata file list JSON")?
        );
        return Ok(());
    }

    println!("Project type: {}", classification.project_type);
    if !requires_validation {
        println!("Repository does not require API validation");
    } else if files.is_empty() {
        println!("No metadata files found");
    } else {
        println!("Metadata files:");
        for file in &files {
            println!("  {file}");
        }
    }

    Ok(())
}
