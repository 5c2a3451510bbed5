//! Bundle commands: `autopilot export` and `autopilot manifest`.

use anyhow::Result;
use console::style;
use std::path::Path;

use super::super::Cli;
use super::open_session;

pub fn cmd_export(project_dir: &Path, cli: &Cli, output: Option<&Path>) -> Result<()> {
    use autopilot::ui::icons::PACKAGE;

    let (config, session) = open_session(project_dir, cli)?;
    let progress = session.progress();
    let out_dir = output.unwrap_or(config.project_dir.as_path());

    let path = session.export_to(out_dir)?;
    let files = session.manifest()?.file_count();

    println!("{}Wrote {} ({} files)", PACKAGE, style(path.display()).cyan(), files);
    if !progress.complete {
        println!(
            "{}",
            style(format!(
                "Note: only {}/{} units are done; the bundle is partial.",
                progress.completed, progress.total
            ))
            .yellow()
        );
    }
    Ok(())
}

pub fn cmd_manifest(project_dir: &Path, cli: &Cli) -> Result<()> {
    use autopilot::archive::ManifestGroup;
    use autopilot::ui::icons::{FILE, FOLDER};

    let (_config, session) = open_session(project_dir, cli)?;
    let manifest = session.manifest()?;

    println!();
    println!("{}{}/", FOLDER, style(&manifest.folder).bold());
    if manifest.file_count() == 0 {
        println!("  {}", style("(empty, nothing generated yet)").dim());
    }
    for group in ManifestGroup::ALL {
        let entries = manifest.group(group);
        if entries.is_empty() {
            continue;
        }
        println!("  {}{}", FOLDER, style(group).cyan());
        for entry in entries {
            println!(
                "    {}{} {}",
                FILE,
                entry.path,
                style(format!("[{}]", entry.key)).dim()
            );
        }
    }
    println!();
    Ok(())
}
