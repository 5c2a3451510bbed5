//! Configuration for autopilot, read from `.autopilot/autopilot.toml`.
//!
//! Settings are layered file → environment → CLI:
//! - file values (or their defaults) form the base
//! - `AUTOPILOT_BASE_URL` and `AUTOPILOT_TASK_MODEL` override the backend
//! - `--verbose` and `--project-dir` come from the command line
//!
//! A `.env` file in the project directory is loaded before any environment
//! lookup, so the API key can live next to the project.
//!
//! # Configuration File Format
//!
//! ```toml
//! [workspace]
//! default_idea = "Solo App Builder"
//!
//! [backend]
//! api_key_env = "GEMINI_API_KEY"
//! task_model = "gemini-3-pro-preview"
//! brainstorm_model = "gemini-3-flash-preview"
//! speech_model = "gemini-2.5-flash-preview-tts"
//! voice = "Kore"
//! request_timeout_secs = 120
//!
//! [narration]
//! enabled = true
//! grace_secs = 3
//!
//! [run]
//! halt_on_error = false
//! task_timeout_secs = 300
//!
//! [export]
//! on_collision = "overwrite"
//! ```

use crate::archive::CollisionPolicy;
use crate::backend::GeminiSettings;
use crate::backend::gemini::DEFAULT_BASE_URL;
use crate::init::AUTOPILOT_DIR;
use crate::narration::NarrationSettings;
use crate::orchestrator::RunPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "autopilot.toml";
pub const STORAGE_FILE: &str = "storage.json";
pub const CHECKLIST_FILE: &str = "checklist.json";
pub const IDEAS_FILE: &str = "ideas.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSection {
    /// Idea used while none has been selected
    #[serde(default = "default_idea")]
    pub default_idea: String,
}

fn default_idea() -> String {
    "Solo App Builder".to_string()
}

impl Default for WorkspaceSection {
    fn default() -> Self {
        Self {
            default_idea: default_idea(),
        }
    }
}

/// Generative backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSection {
    /// API root; the public Gemini endpoint when unset
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_task_model")]
    pub task_model: String,
    #[serde(default = "default_brainstorm_model")]
    pub brainstorm_model: String,
    #[serde(default = "default_speech_model")]
    pub speech_model: String,
    /// Prebuilt voice for narration
    #[serde(default = "default_voice")]
    pub voice: String,
    /// HTTP timeout for one request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_task_model() -> String {
    "gemini-3-pro-preview".to_string()
}

fn default_brainstorm_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_speech_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_voice() -> String {
    "Kore".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key_env: default_api_key_env(),
            task_model: default_task_model(),
            brainstorm_model: default_brainstorm_model(),
            speech_model: default_speech_model(),
            voice: default_voice(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Narration playback settings. The payload format itself is fixed, see
/// [`crate::audio::NARRATION_SAMPLE_RATE`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrationSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Seconds a transcript stays visible after playback
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_grace_secs() -> u64 {
    3
}

impl Default for NarrationSection {
    fn default() -> Self {
        Self {
            enabled: true,
            grace_secs: default_grace_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSection {
    /// Stop build-all at the first failed unit
    #[serde(default)]
    pub halt_on_error: bool,
    /// Per-unit backend timeout; no limit when unset
    #[serde(default)]
    pub task_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportSection {
    #[serde(default)]
    pub on_collision: CollisionPolicy,
}

/// The complete autopilot.toml configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutopilotToml {
    #[serde(default)]
    pub workspace: WorkspaceSection,
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub narration: NarrationSection,
    #[serde(default)]
    pub run: RunSection,
    #[serde(default)]
    pub export: ExportSection,
}

impl AutopilotToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse autopilot.toml")
    }

    /// Load from `<autopilot_dir>/autopilot.toml`, or defaults if it does not exist.
    pub fn load_or_default(autopilot_dir: &Path) -> Result<Self> {
        let config_path = autopilot_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize autopilot.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Backend base URL (env → file → default).
    pub fn base_url(&self) -> String {
        std::env::var("AUTOPILOT_BASE_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.backend.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    /// Task model (env → file).
    pub fn task_model(&self) -> String {
        std::env::var("AUTOPILOT_TASK_MODEL")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.backend.task_model.clone())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for (name, value) in [
            ("backend.task_model", &self.backend.task_model),
            ("backend.brainstorm_model", &self.backend.brainstorm_model),
            ("backend.speech_model", &self.backend.speech_model),
            ("backend.api_key_env", &self.backend.api_key_env),
        ] {
            if value.trim().is_empty() {
                warnings.push(format!("{} is empty", name));
            }
        }

        if self.backend.request_timeout_secs == 0 {
            warnings.push("backend.request_timeout_secs is 0; every request would time out".to_string());
        }
        if self.run.task_timeout_secs == Some(0) {
            warnings.push("run.task_timeout_secs is 0; every unit would time out".to_string());
        }
        if let Some(url) = &self.backend.base_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            warnings.push(format!(
                "backend.base_url '{}' should start with http:// or https://",
                url
            ));
        }

        warnings
    }
}

/// Unified configuration: the parsed file plus project paths and CLI flags.
#[derive(Debug, Clone)]
pub struct AutopilotConfig {
    pub project_dir: PathBuf,
    pub autopilot_dir: PathBuf,
    pub toml: AutopilotToml,
    /// CLI override: verbose mode
    pub verbose: bool,
}

impl AutopilotConfig {
    /// Resolve the project directory, load `.env` and the config file.
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let autopilot_dir = project_dir.join(AUTOPILOT_DIR);

        let env_file = project_dir.join(".env");
        if env_file.exists()
            && let Err(e) = dotenvy::from_path(&env_file)
        {
            tracing::warn!(path = %env_file.display(), error = %e, "failed to load .env");
        }

        let toml = AutopilotToml::load_or_default(&autopilot_dir)?;
        Ok(Self {
            project_dir,
            autopilot_dir,
            toml,
            verbose: false,
        })
    }

    pub fn with_cli_args(project_dir: PathBuf, verbose: bool) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        Ok(config)
    }

    pub fn config_file(&self) -> PathBuf {
        self.autopilot_dir.join(CONFIG_FILE)
    }

    pub fn storage_file(&self) -> PathBuf {
        self.autopilot_dir.join(STORAGE_FILE)
    }

    pub fn checklist_file(&self) -> PathBuf {
        self.autopilot_dir.join(CHECKLIST_FILE)
    }

    pub fn ideas_file(&self) -> PathBuf {
        self.autopilot_dir.join(IDEAS_FILE)
    }

    pub fn default_idea(&self) -> &str {
        &self.toml.workspace.default_idea
    }

    /// Backend client settings with the API key read from the environment.
    pub fn gemini_settings(&self) -> GeminiSettings {
        let backend = &self.toml.backend;
        GeminiSettings {
            base_url: self.toml.base_url(),
            api_key_env: backend.api_key_env.clone(),
            api_key: std::env::var(&backend.api_key_env).ok(),
            task_model: self.toml.task_model(),
            brainstorm_model: backend.brainstorm_model.clone(),
            speech_model: backend.speech_model.clone(),
            voice: backend.voice.clone(),
            request_timeout: Duration::from_secs(backend.request_timeout_secs),
        }
    }

    pub fn narration_enabled(&self) -> bool {
        self.toml.narration.enabled
    }

    pub fn narration_settings(&self) -> NarrationSettings {
        NarrationSettings {
            grace: Duration::from_secs(self.toml.narration.grace_secs),
        }
    }

    pub fn run_policy(&self) -> RunPolicy {
        RunPolicy {
            halt_on_error: self.toml.run.halt_on_error,
            task_timeout: self.toml.run.task_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn collision_policy(&self) -> CollisionPolicy {
        self.toml.export.on_collision
    }

    /// Validate configuration and return warnings.
    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_empty_uses_defaults() {
        let toml = AutopilotToml::parse("").unwrap();
        assert_eq!(toml.workspace.default_idea, "Solo App Builder");
        assert_eq!(toml.backend.api_key_env, "GEMINI_API_KEY");
        assert_eq!(toml.backend.voice, "Kore");
        assert!(toml.narration.enabled);
        assert_eq!(toml.narration.grace_secs, 3);
        assert!(!toml.run.halt_on_error);
        assert_eq!(toml.run.task_timeout_secs, None);
        assert_eq!(toml.export.on_collision, CollisionPolicy::Overwrite);
    }

    #[test]
    fn test_parse_sections() {
        let toml = AutopilotToml::parse(
            r#"
[workspace]
default_idea = "OEE Pulse"

[backend]
base_url = "http://localhost:9999"
task_model = "custom-pro"

[narration]
enabled = false

[run]
halt_on_error = true
task_timeout_secs = 90

[export]
on_collision = "error"
"#,
        )
        .unwrap();
        assert_eq!(toml.workspace.default_idea, "OEE Pulse");
        assert_eq!(toml.backend.base_url.as_deref(), Some("http://localhost:9999"));
        assert_eq!(toml.backend.task_model, "custom-pro");
        assert_eq!(toml.backend.speech_model, "gemini-2.5-flash-preview-tts");
        assert!(!toml.narration.enabled);
        assert!(toml.run.halt_on_error);
        assert_eq!(toml.run.task_timeout_secs, Some(90));
        assert_eq!(toml.export.on_collision, CollisionPolicy::Error);
    }

    #[test]
    fn test_parse_rejects_unknown_policy() {
        assert!(AutopilotToml::parse("[export]\non_collision = \"merge\"").is_err());
    }

    #[test]
    fn test_validate_default_is_clean() {
        assert!(AutopilotToml::default().validate().is_empty());
    }

    #[test]
    fn test_validate_reports_problems() {
        let mut toml = AutopilotToml::default();
        toml.backend.task_model = " ".to_string();
        toml.backend.request_timeout_secs = 0;
        toml.run.task_timeout_secs = Some(0);
        toml.backend.base_url = Some("localhost".to_string());
        let warnings = toml.validate();
        assert_eq!(warnings.len(), 4);
        assert!(warnings.iter().any(|w| w.contains("backend.task_model")));
    }

    #[test]
    fn test_narration_payload_format_is_not_configurable() {
        let dir = tempdir().unwrap();
        let autopilot_dir = dir.path().join(AUTOPILOT_DIR);
        std::fs::create_dir_all(&autopilot_dir).unwrap();
        std::fs::write(
            autopilot_dir.join(CONFIG_FILE),
            "[narration]\nsample_rate = 48000\nchannels = 2\ngrace_secs = 5\n",
        )
        .unwrap();

        let config = AutopilotConfig::new(dir.path().to_path_buf()).unwrap();
        assert_eq!(
            config.narration_settings(),
            NarrationSettings {
                grace: Duration::from_secs(5),
            }
        );
        assert!(config.validate().is_empty());
        assert!(!toml::to_string(&config.toml).unwrap().contains("channels"));
    }

    #[test]
    fn test_save_and_load_roundtrip_through_dir() {
        let dir = tempdir().unwrap();
        let mut toml = AutopilotToml::default();
        toml.run.task_timeout_secs = Some(45);
        toml.save(&dir.path().join(CONFIG_FILE)).unwrap();

        let loaded = AutopilotToml::load_or_default(dir.path()).unwrap();
        assert_eq!(loaded.run.task_timeout_secs, Some(45));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempdir().unwrap();
        let loaded = AutopilotToml::load_or_default(dir.path()).unwrap();
        assert_eq!(loaded.backend.task_model, "gemini-3-pro-preview");
    }

    #[test]
    fn test_config_paths_and_policies() {
        let dir = tempdir().unwrap();
        let autopilot_dir = dir.path().join(AUTOPILOT_DIR);
        std::fs::create_dir_all(&autopilot_dir).unwrap();
        std::fs::write(
            autopilot_dir.join(CONFIG_FILE),
            "[run]\nhalt_on_error = true\ntask_timeout_secs = 10\n[narration]\ngrace_secs = 1\n",
        )
        .unwrap();

        let config = AutopilotConfig::with_cli_args(dir.path().to_path_buf(), true).unwrap();
        assert!(config.verbose);
        assert!(config.storage_file().ends_with(".autopilot/storage.json"));
        assert!(config.checklist_file().ends_with(".autopilot/checklist.json"));
        assert_eq!(
            config.run_policy(),
            RunPolicy {
                halt_on_error: true,
                task_timeout: Some(Duration::from_secs(10)),
            }
        );
        assert_eq!(config.narration_settings().grace, Duration::from_secs(1));
        assert_eq!(config.gemini_settings().request_timeout, Duration::from_secs(120));
    }
}
