//! Unit execution: `autopilot run <unit>` and `autopilot build`.

use anyhow::Result;
use console::style;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::super::Cli;
use super::{check_initialized, open_session};
use autopilot::session::Session;
use autopilot::ui::{BuildUI, UiListener};

/// Longest wait for the last narration before the process exits.
const NARRATION_SETTLE_LIMIT: Duration = Duration::from_secs(30);

struct Progress {
    ui: Arc<BuildUI>,
    listener: UiListener,
}

fn start_progress(session: &Session, verbose: bool) -> Progress {
    let catalog = session.catalog();
    let done = catalog
        .units()
        .map(|unit| unit.key())
        .filter(|key| session.store().contains(key));
    let ui = Arc::new(BuildUI::new(catalog.total_units() as u64, done, verbose));
    let listener = UiListener::spawn(
        Arc::clone(&ui),
        session.subscribe_events(),
        session.subscribe_narration(),
    );
    Progress { ui, listener }
}

async fn finish_progress(session: &Session, progress: Progress) {
    session.settle_narration(NARRATION_SETTLE_LIMIT).await;
    progress.listener.stop().await;
    progress.ui.finish();
}

pub async fn cmd_run(project_dir: &Path, cli: &Cli, unit_key: &str, silent: bool) -> Result<()> {
    use autopilot::catalog::UnitId;
    use autopilot::orchestrator::{RunOptions, RunOutcome};

    check_initialized(project_dir)?;
    let id: UnitId = unit_key.parse()?;
    let (_config, session) = open_session(project_dir, cli)?;

    println!(
        "Running {} for {}",
        style(id.key()).yellow(),
        style(session.active_idea()).bold()
    );
    let progress = start_progress(&session, cli.verbose);
    let outcome = session.run_unit(id, RunOptions { silent }).await;
    finish_progress(&session, progress).await;

    match outcome? {
        RunOutcome::Completed => {
            if let Some(path) = session.store().derived_path(&id.key()) {
                println!("Wrote {}", style(path).cyan());
            }
            Ok(())
        }
        RunOutcome::Failed => anyhow::bail!(
            "Unit {} failed. Nothing was stored; run it again to retry.",
            id
        ),
        RunOutcome::Rejected(reason) => anyhow::bail!("Unit {} not started: {}", id, reason),
    }
}

pub async fn cmd_build(project_dir: &Path, cli: &Cli) -> Result<()> {
    use autopilot::ui::icons::SPARKLE;

    check_initialized(project_dir)?;
    let (_config, session) = open_session(project_dir, cli)?;

    println!(
        "Building {} ({} of {} units done)",
        style(session.active_idea()).bold(),
        session.progress().completed,
        session.catalog().total_units()
    );
    let progress = start_progress(&session, cli.verbose);
    let report = session.run_all().await;
    finish_progress(&session, progress).await;
    let report = report?;

    println!();
    println!(
        "{} completed, {} failed, {} skipped",
        style(report.completed.len()).green(),
        style(report.failed.len()).red(),
        report.skipped.len()
    );
    if report.halted {
        println!("Stopped at the first failure (run.halt_on_error).");
    }

    if !report.failed.is_empty() {
        anyhow::bail!(
            "{} unit(s) failed: {}. Run 'autopilot build' again to retry them.",
            report.failed.len(),
            report.failed.join(", ")
        );
    }
    if session.progress().complete {
        println!("{}Build complete. Run 'autopilot export' to get the bundle.", SPARKLE);
    }
    Ok(())
}
