//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module      | Commands handled                                            |
//! |-------------|-------------------------------------------------------------|
//! | `workspace` | `Init`, `Ideas`, `Select`, `Brainstorm`, `List`, `Status`, `Show`, `Reset` |
//! | `run`       | `Run`, `Build`                                              |
//! | `export`    | `Export`, `Manifest`                                        |
//! | `config`    | `Config`                                                    |

pub mod config;
pub mod export;
pub mod run;
pub mod workspace;

pub use config::cmd_config;
pub use export::{cmd_export, cmd_manifest};
pub use run::{cmd_build, cmd_run};
pub use workspace::{
    cmd_brainstorm, cmd_ideas, cmd_init, cmd_list, cmd_reset, cmd_select, cmd_show, cmd_status,
};

use anyhow::Result;
use autopilot::autopilot_config::AutopilotConfig;
use autopilot::session::Session;
use std::path::Path;

use super::Cli;

pub fn check_initialized(project_dir: &Path) -> Result<()> {
    if !autopilot::init::is_initialized(project_dir) {
        anyhow::bail!("Project not initialized. Run 'autopilot init' first.");
    }
    Ok(())
}

/// Load configuration and open the session for `project_dir`.
pub fn open_session(project_dir: &Path, cli: &Cli) -> Result<(AutopilotConfig, Session)> {
    let config = AutopilotConfig::with_cli_args(project_dir.to_path_buf(), cli.verbose)?;
    let session = Session::open(&config)?;
    Ok((config, session))
}
