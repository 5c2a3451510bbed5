//! Workspace initialization.
//!
//! `autopilot init` creates the `.autopilot/` directory of a project:
//!
//! ```text
//! .autopilot/
//! ├── autopilot.toml   # Configuration (defaults written on init)
//! ├── storage.json     # Selected idea, artifacts, refined spec
//! ├── checklist.json   # Optional checklist override
//! └── ideas.json       # Optional idea catalog override
//! ```

use crate::autopilot_config::{AutopilotToml, CONFIG_FILE, STORAGE_FILE};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// The name of the autopilot workspace directory.
pub const AUTOPILOT_DIR: &str = ".autopilot";

/// Result of initializing a workspace.
#[derive(Debug)]
pub struct InitResult {
    /// Path to the `.autopilot` directory
    pub autopilot_dir: PathBuf,
    /// Whether the directory was newly created (false if it already existed)
    pub created: bool,
}

/// Initialize the workspace in `project_dir`.
///
/// Idempotent: an existing directory is completed, never overwritten.
pub fn init_project(project_dir: &Path) -> Result<InitResult> {
    let autopilot_dir = project_dir.join(AUTOPILOT_DIR);
    let created = !autopilot_dir.exists();

    std::fs::create_dir_all(&autopilot_dir)
        .with_context(|| format!("Failed to create directory: {}", autopilot_dir.display()))?;
    ensure_workspace_files(&autopilot_dir)?;

    Ok(InitResult {
        autopilot_dir,
        created,
    })
}

fn ensure_workspace_files(autopilot_dir: &Path) -> Result<()> {
    let config_file = autopilot_dir.join(CONFIG_FILE);
    if !config_file.exists() {
        AutopilotToml::default().save(&config_file)?;
    }

    let storage_file = autopilot_dir.join(STORAGE_FILE);
    if !storage_file.exists() {
        std::fs::write(&storage_file, "{}\n").with_context(|| {
            format!("Failed to create storage file: {}", storage_file.display())
        })?;
    }

    Ok(())
}

/// Check if a project has an autopilot workspace.
pub fn is_initialized(project_dir: &Path) -> bool {
    project_dir.join(AUTOPILOT_DIR).exists()
}

pub fn get_autopilot_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(AUTOPILOT_DIR)
}
