//! Workspace commands: init, ideas, select, brainstorm, list, status, show, reset.

use anyhow::Result;
use console::style;
use std::path::Path;

use super::super::Cli;
use super::{check_initialized, open_session};

pub fn cmd_init(project_dir: &Path) -> Result<()> {
    use autopilot::init::{init_project, is_initialized};

    let was_initialized = is_initialized(project_dir);
    let result = init_project(project_dir)?;

    if result.created {
        println!(
            "Initialized autopilot workspace at {}",
            result.autopilot_dir.display()
        );
        println!();
        println!("Created directory structure:");
        println!("  .autopilot/");
        println!("  ├── autopilot.toml   # Configuration (use `autopilot config show`)");
        println!("  └── storage.json     # Selected idea and generated artifacts");
        println!();
        println!("Next steps:");
        println!("  1. Run `autopilot ideas` to browse the idea catalog");
        println!("  2. Run `autopilot select <idea>` to pick one");
        println!("  3. Run `autopilot build` to generate every unit");
    } else if was_initialized {
        println!(
            "Autopilot workspace already initialized at {}",
            result.autopilot_dir.display()
        );
        println!("Directory structure verified.");
    }

    Ok(())
}

pub fn cmd_ideas(project_dir: &Path, cli: &Cli, search: Option<&str>) -> Result<()> {
    let (_config, session) = open_session(project_dir, cli)?;
    let active = session.active_idea();

    let ideas: Vec<_> = match search {
        Some(term) => session.ideas().search(term).collect(),
        None => session.ideas().ideas().iter().collect(),
    };

    println!();
    if ideas.is_empty() {
        println!("No ideas match '{}'.", search.unwrap_or_default());
        println!();
        return Ok(());
    }

    for idea in ideas {
        let marker = if idea.title == active {
            style("*").green().bold()
        } else {
            style(" ")
        };
        println!(
            "{} {:<18} {} {}",
            marker,
            style(&idea.id).cyan(),
            style(&idea.title).bold(),
            style(format!("({})", idea.monetization)).dim()
        );
        println!("    {} {}", style("Problem:").dim(), idea.problem);
        println!("    {} {}", style("Solution:").dim(), idea.solution);
        println!("    {} {}", style("For:").dim(), idea.target);
    }
    println!();
    println!("Run 'autopilot select <id>' to start building one.");
    println!();
    Ok(())
}

pub fn cmd_select(project_dir: &Path, cli: &Cli, idea: &str) -> Result<()> {
    check_initialized(project_dir)?;
    let (_config, session) = open_session(project_dir, cli)?;

    let had_artifacts = !session.store().is_empty();
    let name = session.select_idea(idea)?;

    println!("Selected idea: {}", style(&name).green().bold());
    if had_artifacts {
        println!("Previous artifacts were cleared.");
    }
    Ok(())
}

pub async fn cmd_brainstorm(project_dir: &Path, cli: &Cli, text: &str, adopt: bool) -> Result<()> {
    if adopt {
        check_initialized(project_dir)?;
    }
    let (_config, session) = open_session(project_dir, cli)?;

    println!("Refining '{}'...", text);
    let refined = session.brainstorm(text).await?;

    println!();
    println!("{}", style(&refined.refined_name).bold().underlined());
    println!();
    println!("{} {}", style("Formula:").dim(), refined.formula);
    println!("{} {}", style("SLC:").dim(), refined.slc_breakdown);
    println!("{} {}", style("Verdict:").dim(), refined.market_verdict);
    println!();
    println!("3-day MVP plan:");
    for (idx, step) in refined.three_day_mvp_plan.iter().enumerate() {
        println!("  Day {}: {}", idx + 1, step);
    }
    println!();

    if adopt {
        session.adopt(&refined)?;
        println!(
            "Selected idea: {}",
            style(&refined.refined_name).green().bold()
        );
    } else {
        println!("Run again with --adopt to build this idea.");
    }
    Ok(())
}

pub fn cmd_list(project_dir: &Path, cli: &Cli) -> Result<()> {
    use autopilot::ui::icons::{CHECK, PENDING};

    let (_config, session) = open_session(project_dir, cli)?;
    let store = session.store();

    println!();
    for phase in session.catalog().phases() {
        println!(
            "{} {}",
            style(phase.label()).yellow().bold(),
            style(&phase.title).bold()
        );
        if !phase.description.is_empty() {
            println!("  {}", style(&phase.description).dim());
        }
        for (idx, task) in phase.tasks.iter().enumerate() {
            let key = format!("{}-{}", phase.day, idx);
            let icon = if store.contains(&key) { CHECK } else { PENDING };
            println!("  {}{:<6} {}", icon, key, task);
        }
        println!();
    }
    Ok(())
}

pub fn cmd_status(project_dir: &Path, cli: &Cli) -> Result<()> {
    use autopilot::init::is_initialized;
    use autopilot::ui::icons::SPARKLE;

    println!();
    println!("Autopilot Status");
    println!("================");
    println!();

    if !is_initialized(project_dir) {
        println!("Workspace: Not initialized");
        println!();
        println!("Run 'autopilot init' to initialize the workspace.");
        println!();
        return Ok(());
    }

    let (_config, session) = open_session(project_dir, cli)?;
    let progress = session.progress();

    println!("Workspace: Initialized");
    println!("Idea:      {}", style(session.active_idea()).bold());
    if let Some(refined) = session.refined_spec()? {
        println!("Formula:   {}", refined.formula);
    }
    println!(
        "Progress:  {}/{} units ({}%)",
        progress.completed, progress.total, progress.percent
    );
    println!();

    for phase_progress in &progress.phases {
        let title = session
            .catalog()
            .phase(phase_progress.day)
            .map(|p| p.title.as_str())
            .unwrap_or_default();
        let marker = if progress.current_phase == Some(phase_progress.day) {
            style("▶").green().bold().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "{} Phase {:<3} {:<28} {}/{}",
            marker, phase_progress.day, title, phase_progress.completed, phase_progress.total
        );
    }
    println!();

    if progress.complete {
        println!("{}Build complete. Run 'autopilot export' to get the bundle.", SPARKLE);
    } else if progress.completed == 0 {
        println!("Run 'autopilot build' to start generating.");
    } else {
        println!("Run 'autopilot build' to generate the remaining units.");
    }
    println!();
    Ok(())
}

pub fn cmd_show(project_dir: &Path, cli: &Cli, unit_key: &str) -> Result<()> {
    use autopilot::archive::synthetic_path;
    use autopilot::catalog::UnitId;

    let id: UnitId = unit_key.parse()?;
    let (_config, session) = open_session(project_dir, cli)?;
    let Some(unit) = session.catalog().unit(id) else {
        anyhow::bail!("Unit {} is not part of the checklist", id);
    };
    let key = unit.key();

    println!();
    println!(
        "{} {} {}",
        style(format!("[{}]", key)).yellow(),
        style(unit.phase.label()).dim(),
        style(unit.task).bold()
    );

    match session.store().parsed(&key) {
        Some(parsed) => {
            let path = match &parsed.path {
                Some(path) => path.clone(),
                None => format!("{} (no path declared)", synthetic_path(&key)),
            };
            println!("{} {}", style("File:").dim(), path);
            println!();
            println!("{}", parsed.body());
        }
        None => {
            println!();
            println!("No artifact yet. Run 'autopilot run {}' to generate it.", key);
        }
    }
    println!();
    Ok(())
}

pub fn cmd_reset(project_dir: &Path, cli: &Cli, force: bool) -> Result<()> {
    use dialoguer::Confirm;

    check_initialized(project_dir)?;
    let (_config, session) = open_session(project_dir, cli)?;

    if !force {
        let confirm = Confirm::new()
            .with_prompt(format!(
                "This will delete all {} artifacts of '{}'. Are you sure?",
                session.store().len(),
                session.active_idea()
            ))
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirm {
            println!("Reset cancelled");
            return Ok(());
        }
    }

    session.reset()?;
    println!("Reset complete");
    Ok(())
}
