//! `--show-config`: effective configuration with per-key sources.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use pushgate_config::Config;
use pushgate_gate::emit_jcs;

#[derive(Debug, Serialize)]
struct ConfigEntry<'a> {
    value: &'a str,
    source: &'a str,
}

pub fn execute_show_config_command(config: &Config, json: bool) -> Result<()> {
    let effective = config.effective_config();

    if json {
        let entries: BTreeMap<&str, ConfigEntry<'_>> = effective
            .iter()
            .map(|(key, (value, source))| (key.as_str(), ConfigEntry { value, source }))
            .collect();
        println!(
            "{}",
            emit_jcs(&entries).context("Failed to emit configuration JSON")?
        );
        return Ok(());
    }

    match &config.config_file {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: none (built-in defaults)"),
    }
    println!();
    for (key, (value, source)) in &effective {
        println!("  {key} = {value}  [{source}]");
    }

    Ok(())
}
