//! Configuration view and validation commands: `autopilot config`.

use anyhow::Result;

use super::super::ConfigCommands;

fn print_toml(toml: &autopilot::autopilot_config::AutopilotToml) {
    println!("[workspace]");
    println!("  default_idea = \"{}\"", toml.workspace.default_idea);
    println!();

    println!("[backend]");
    if let Some(url) = &toml.backend.base_url {
        println!("  base_url = \"{}\"", url);
    }
    println!("  api_key_env = \"{}\"", toml.backend.api_key_env);
    println!("  task_model = \"{}\"", toml.backend.task_model);
    println!("  brainstorm_model = \"{}\"", toml.backend.brainstorm_model);
    println!("  speech_model = \"{}\"", toml.backend.speech_model);
    println!("  voice = \"{}\"", toml.backend.voice);
    println!("  request_timeout_secs = {}", toml.backend.request_timeout_secs);
    println!();

    println!("[narration]");
    println!("  enabled = {}", toml.narration.enabled);
    println!("  grace_secs = {}", toml.narration.grace_secs);
    println!();

    println!("[run]");
    println!("  halt_on_error = {}", toml.run.halt_on_error);
    if let Some(secs) = toml.run.task_timeout_secs {
        println!("  task_timeout_secs = {}", secs);
    }
    println!();

    println!("[export]");
    println!("  on_collision = \"{}\"", toml.export.on_collision);
    println!();
}

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    use autopilot::autopilot_config::{AutopilotConfig, AutopilotToml, CONFIG_FILE};
    use autopilot::init::get_autopilot_dir;

    let autopilot_dir = get_autopilot_dir(project_dir);
    let config_path = autopilot_dir.join(CONFIG_FILE);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Autopilot Configuration");
            println!("=======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();
                print_toml(&AutopilotToml::load(&config_path)?);
            } else {
                println!("No autopilot.toml found at {}", config_path.display());
                println!();
                println!("Using default configuration:");
                println!();
                print_toml(&AutopilotToml::default());
                println!("Run 'autopilot config init' to create an autopilot.toml file.");
                println!();
            }

            // Effective values (including env overrides)
            let config = AutopilotConfig::new(project_dir.to_path_buf())?;
            let settings = config.gemini_settings();
            println!("Effective values (with env overrides):");
            println!("  base_url = \"{}\"", settings.base_url);
            println!("  task_model = \"{}\"", settings.task_model);
            println!(
                "  api key = {}",
                if settings.api_key.as_deref().is_some_and(|k| !k.is_empty()) {
                    format!("set (${})", settings.api_key_env)
                } else {
                    format!("missing (${} is not set)", settings.api_key_env)
                }
            );
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No autopilot.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = AutopilotToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("autopilot.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !autopilot_dir.exists() {
                std::fs::create_dir_all(&autopilot_dir)?;
            }

            AutopilotToml::default().save(&config_path)?;

            println!("Created autopilot.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [workspace] default_idea");
            println!("  - [backend] models, voice and the API key variable");
            println!("  - [narration] enabled, grace_secs");
            println!("  - [run] halt_on_error, task_timeout_secs");
            println!("  - [export] on_collision");
            println!();
        }
    }

    Ok(())
}
