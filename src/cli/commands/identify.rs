//! `--identify-only`: classification without a rule run.

use anyhow::{Context, Result};
use std::path::Path;

use pushgate_gate::emit_jcs;
use pushgate_workspace::classify;

pub fn execute_identify_command(repo_root: &Path, json: bool) -> Result<()> {
    let classification = classify(repo_root);

    if json {
        let output = emit_jcs(&classification).context("Failed to emit classification JSON")?;
        println!("{output}");
    } else {
        println!("{classification}");
    }

    Ok(())
}
