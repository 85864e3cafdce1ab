//! Repository classification.
//!
//! | Signal | Type |
//! |--------|------|
//! | root directory `SHP` or `IKP` | `SHP_IKP` |
//! | name contains `-ds-` | `SHP_IKP` |
//! | name contains `-decision-service-` | `PCF` |
//! | none of the above | `General` |
//!
//! When several signals match, `SHP_IKP` wins over `PCF`. Directory names are
//! compared case-sensitively; the repository name is lowercased first.

use pushgate_utils::types::ProjectType;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::git_dir::{origin_url, repo_name_from_url};

/// Which classification signals were observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationSignals {
    pub shp_dir: bool,
    pub ikp_dir: bool,
    pub ds_name: bool,
    pub decision_service_name: bool,
}

/// Result of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub project_type: ProjectType,
    pub repo_name: Option<String>,
    /// Where the name came from: `origin` or `directory`.
    pub name_source: Option<&'static str>,
    pub signals: ClassificationSignals,
    /// Set when the root could not be read and the type defaulted to General.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

impl Classification {
    #[must_use]
    pub fn requires_validation(&self) -> bool {
        self.project_type.requires_validation()
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Project type: {}", self.project_type)?;
        writeln!(
            f,
            "Repository name: {} ({})",
            self.repo_name.as_deref().unwrap_or("unknown"),
            self.name_source.unwrap_or("none")
        )?;
        writeln!(f, "SHP directory: {}", yes_no(self.signals.shp_dir))?;
        writeln!(f, "IKP directory: {}", yes_no(self.signals.ikp_dir))?;
        writeln!(f, "Name contains '-ds-': {}", yes_no(self.signals.ds_name))?;
        writeln!(
            f,
            "Name contains '-decision-service-': {}",
            yes_no(self.signals.decision_service_name)
        )?;
        if let Some(reason) = &self.fallback {
            writeln!(f, "Fallback: {reason}")?;
        }
        write!(
            f,
            "Validation applies: {}",
            yes_no(self.requires_validation())
        )
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Classify the repository rooted at `root`.
///
/// Never fails: an unreadable root yields `General` with `fallback` set.
#[must_use]
pub fn classify(root: &Path) -> Classification {
    let (repo_name, name_source) = match origin_url(root).as_deref().and_then(repo_name_from_url) {
        Some(name) => (Some(name), Some("origin")),
        None => match directory_name(root) {
            Some(name) => (Some(name), Some("directory")),
            None => (None, None),
        },
    };

    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(root = %root.display(), error = %e, "repository root unreadable, classifying as General");
            return Classification {
                project_type: ProjectType::General,
                repo_name,
                name_source,
                signals: ClassificationSignals::default(),
                fallback: Some(format!("cannot read {}: {e}", root.display())),
            };
        }
    };

    let mut signals = ClassificationSignals::default();
    for entry in entries.flatten() {
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }
        match entry.file_name().to_str() {
            Some("SHP") => signals.shp_dir = true,
            Some("IKP") => signals.ikp_dir = true,
            _ => {}
        }
    }

    if let Some(name) = &repo_name {
        let lowered = name.to_lowercase();
        signals.ds_name = lowered.contains("-ds-");
        signals.decision_service_name = lowered.contains("-decision-service-");
    }

    let project_type = if signals.shp_dir || signals.ikp_dir || signals.ds_name {
        ProjectType::ShpIkp
    } else if signals.decision_service_name {
        ProjectType::Pcf
    } else {
        ProjectType::General
    };

    tracing::debug!(
        project_type = %project_type,
        repo_name = repo_name.as_deref().unwrap_or(""),
        "repository classified"
    );

    Classification {
        project_type,
        repo_name,
        name_source,
        signals,
        fallback: None,
    }
}

fn directory_name(root: &Path) -> Option<String> {
    let canonical = dunce::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    canonical
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}
