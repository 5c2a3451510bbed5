use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "autopilot")]
#[command(version, about = "Checklist-driven app builder with spoken progress")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the .autopilot workspace
    Init,
    /// List the idea catalog
    Ideas {
        /// Only ideas whose title, problem or audience contains this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Select an idea by id, title or free-form name (clears all artifacts)
    Select { idea: String },
    /// Refine a rough idea into a structured concept
    Brainstorm {
        text: String,
        /// Select the refined idea afterwards
        #[arg(long)]
        adopt: bool,
    },
    /// List checklist phases and units
    List,
    Status,
    /// Run one unit, e.g. `autopilot run 1-0`
    Run {
        unit_key: String,
        /// Do not narrate this run
        #[arg(long)]
        silent: bool,
    },
    /// Run every unit that has no artifact yet, in order
    Build,
    /// Show the artifact of one unit
    Show { unit_key: String },
    /// Show the file structure the bundle would contain
    Manifest,
    /// Write the project bundle zip
    Export {
        /// Directory to write into (defaults to the project directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete all artifacts of the selected idea
    Reset {
        #[arg(long)]
        force: bool,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    Show,
    Validate,
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    autopilot::telemetry::init(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Init => cmd::cmd_init(&project_dir)?,
        Commands::Ideas { search } => cmd::cmd_ideas(&project_dir, &cli, search.as_deref())?,
        Commands::Select { idea } => cmd::cmd_select(&project_dir, &cli, idea)?,
        Commands::Brainstorm { text, adopt } => {
            cmd::cmd_brainstorm(&project_dir, &cli, text, *adopt).await?
        }
        Commands::List => cmd::cmd_list(&project_dir, &cli)?,
        Commands::Status => cmd::cmd_status(&project_dir, &cli)?,
        Commands::Run { unit_key, silent } => {
            cmd::cmd_run(&project_dir, &cli, unit_key, *silent).await?
        }
        Commands::Build => cmd::cmd_build(&project_dir, &cli).await?,
        Commands::Show { unit_key } => cmd::cmd_show(&project_dir, &cli, unit_key)?,
        Commands::Manifest => cmd::cmd_manifest(&project_dir, &cli)?,
        Commands::Export { output } => cmd::cmd_export(&project_dir, &cli, output.as_deref())?,
        Commands::Reset { force } => cmd::cmd_reset(&project_dir, &cli, *force)?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}
