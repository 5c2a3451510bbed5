//! Per-process application context.
//!
//! A [`Session`] is built once from [`AutopilotConfig`] and owns everything a
//! command needs: storage, artifacts, backend, narration and the orchestrator.

use crate::archive::{self, ArchiveManifest, CollisionPolicy};
use crate::artifact::{ArtifactStore, PhaseProgress};
use crate::audio::AudioSink;
use crate::autopilot_config::AutopilotConfig;
use crate::backend::{GeminiBackend, GenerationBackend};
use crate::catalog::{Catalog, UnitId};
use crate::errors::OrchestratorError;
use crate::ideas::{IdeaCatalog, RefinedIdea};
use crate::narration::{NarrationSettings, NarrationSnapshot, Narrator};
use crate::orchestrator::{BatchReport, RunOptions, RunOutcome, RunPolicy, TaskEvent, TaskOrchestrator};
use crate::storage::{JsonFileStore, KeyValueStore, REFINED_SPEC_KEY, SELECTED_IDEA_KEY};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

/// Build progress derived from the artifact store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
    pub complete: bool,
    pub current_phase: Option<u32>,
    pub phases: Vec<PhaseProgress>,
}

/// Everything a [`Session`] is assembled from.
pub struct SessionParts {
    pub kv: Arc<dyn KeyValueStore>,
    pub catalog: Catalog,
    pub ideas: IdeaCatalog,
    pub backend: Arc<dyn GenerationBackend>,
    /// `None` disables narration.
    pub sink: Option<Arc<dyn AudioSink>>,
    pub narration: NarrationSettings,
    pub policy: RunPolicy,
    pub collision: CollisionPolicy,
    pub default_idea: String,
}

pub struct Session {
    kv: Arc<dyn KeyValueStore>,
    catalog: Arc<Catalog>,
    ideas: IdeaCatalog,
    store: Arc<ArtifactStore>,
    backend: Arc<dyn GenerationBackend>,
    narrator: Option<Arc<Narrator>>,
    orchestrator: TaskOrchestrator,
    collision: CollisionPolicy,
}

impl Session {
    /// Open the workspace described by `config`.
    pub fn open(config: &AutopilotConfig) -> Result<Self> {
        let kv = JsonFileStore::open(&config.storage_file())
            .with_context(|| format!("Failed to open {}", config.storage_file().display()))?;
        let catalog = Catalog::load_or_default(&config.checklist_file())?;
        let ideas = IdeaCatalog::load_or_default(&config.ideas_file())?;
        let backend = GeminiBackend::new(config.gemini_settings())
            .context("Failed to create backend client")?;
        let sink = config.narration_enabled().then(default_sink);

        Self::from_parts(SessionParts {
            kv: Arc::new(kv),
            catalog,
            ideas,
            backend: Arc::new(backend),
            sink,
            narration: config.narration_settings(),
            policy: config.run_policy(),
            collision: config.collision_policy(),
            default_idea: config.default_idea().to_string(),
        })
    }

    pub fn from_parts(parts: SessionParts) -> Result<Self> {
        let store = Arc::new(ArtifactStore::load(Arc::clone(&parts.kv))?);
        let catalog = Arc::new(parts.catalog);
        let idea = parts
            .kv
            .get(SELECTED_IDEA_KEY)?
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(parts.default_idea);

        let narrator = parts.sink.map(|sink| {
            Arc::new(Narrator::new(
                Arc::clone(&parts.backend),
                sink,
                parts.narration,
            ))
        });

        let mut orchestrator = TaskOrchestrator::new(
            Arc::clone(&catalog),
            Arc::clone(&store),
            Arc::clone(&parts.backend),
            idea,
        )
        .with_policy(parts.policy);
        if let Some(narrator) = &narrator {
            orchestrator = orchestrator.with_narrator(Arc::clone(narrator));
        }

        Ok(Self {
            kv: parts.kv,
            catalog,
            ideas: parts.ideas,
            store,
            backend: parts.backend,
            narrator,
            orchestrator,
            collision: parts.collision,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn ideas(&self) -> &IdeaCatalog {
        &self.ideas
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn orchestrator(&self) -> &TaskOrchestrator {
        &self.orchestrator
    }

    pub fn active_idea(&self) -> String {
        self.orchestrator.idea()
    }

    /// Switch to another idea. Resolves catalog ids and titles; any other
    /// text is taken as a free-form idea name. Clears every artifact and
    /// any adopted refined spec.
    pub fn select_idea(&self, name: &str) -> Result<String> {
        let name = match self.ideas.find(name) {
            Some(idea) => idea.title.clone(),
            None => name.trim().to_string(),
        };
        self.activate(&name)?;
        self.kv.remove(REFINED_SPEC_KEY)?;
        Ok(name)
    }

    fn activate(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            anyhow::bail!("Idea name must not be empty");
        }
        if self.orchestrator.is_batch_active() {
            anyhow::bail!(OrchestratorError::BatchInProgress);
        }
        self.store.clear_all()?;
        self.kv.set(SELECTED_IDEA_KEY, name)?;
        self.orchestrator.set_idea(name);
        tracing::info!(idea = %name, "idea selected, workspace reset");
        Ok(())
    }

    /// Drop all artifacts but keep the selected idea.
    pub fn reset(&self) -> Result<()> {
        self.store.clear_all()?;
        Ok(())
    }

    pub async fn brainstorm(&self, text: &str) -> Result<RefinedIdea> {
        let refined = self
            .backend
            .brainstorm(text)
            .await
            .context("Brainstorm request failed")?;
        Ok(refined)
    }

    /// Select the refined idea and keep its full spec alongside.
    pub fn adopt(&self, refined: &RefinedIdea) -> Result<()> {
        self.activate(refined.refined_name.trim())?;
        let json = serde_json::to_string(refined)?;
        self.kv.set(REFINED_SPEC_KEY, &json)?;
        Ok(())
    }

    pub fn refined_spec(&self) -> Result<Option<RefinedIdea>> {
        match self.kv.get(REFINED_SPEC_KEY)? {
            Some(json) => Ok(Some(
                serde_json::from_str(&json).context("Stored refined spec is malformed")?,
            )),
            None => Ok(None),
        }
    }

    pub async fn run_unit(
        &self,
        id: UnitId,
        options: RunOptions,
    ) -> Result<RunOutcome, OrchestratorError> {
        self.orchestrator.run_unit(id, options).await
    }

    pub async fn run_all(&self) -> Result<BatchReport, OrchestratorError> {
        self.orchestrator.run_all().await
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<TaskEvent> {
        self.orchestrator.subscribe()
    }

    pub fn subscribe_narration(&self) -> Option<watch::Receiver<NarrationSnapshot>> {
        self.narrator.as_ref().map(|n| n.subscribe())
    }

    /// Wait until narration is idle, at most `limit`.
    ///
    /// Detached narrations die with the process; commands call this before
    /// returning so the last utterance is heard.
    pub async fn settle_narration(&self, limit: Duration) {
        let Some(mut rx) = self.subscribe_narration() else {
            return;
        };
        let idle = rx.wait_for(|snap| !snap.speaking && snap.transcript.is_none());
        if tokio::time::timeout(limit, idle).await.is_err() {
            tracing::debug!("narration still active at exit");
        }
    }

    pub fn progress(&self) -> Progress {
        let catalog = &self.catalog;
        Progress {
            completed: self.store.completed_count(catalog),
            total: catalog.total_units(),
            percent: self.store.progress_percent(catalog),
            complete: self.store.is_build_complete(catalog),
            current_phase: self.store.current_phase(catalog),
            phases: self.store.phase_progress(catalog),
        }
    }

    pub fn snapshot(&self) -> Vec<(String, String)> {
        self.store.snapshot(&self.catalog)
    }

    /// Build the project bundle in memory.
    pub fn export(&self) -> Result<Vec<u8>> {
        let bytes = archive::build_archive(&self.snapshot(), &self.active_idea(), self.collision)?;
        Ok(bytes)
    }

    /// Build the bundle and write it into `dir`.
    pub fn export_to(&self, dir: &Path) -> Result<PathBuf> {
        let bytes = self.export()?;
        let path = archive::write_bundle(dir, &self.active_idea(), &bytes)
            .with_context(|| format!("Failed to write bundle to {}", dir.display()))?;
        Ok(path)
    }

    pub fn manifest(&self) -> Result<ArchiveManifest> {
        let manifest =
            ArchiveManifest::build(&self.snapshot(), &self.active_idea(), self.collision)?;
        Ok(manifest)
    }
}

#[cfg(feature = "rodio")]
fn default_sink() -> Arc<dyn AudioSink> {
    Arc::new(crate::audio::RodioSink)
}

#[cfg(not(feature = "rodio"))]
fn default_sink() -> Arc<dyn AudioSink> {
    Arc::new(crate::audio::TimedSink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::ScriptedBackend;
    use crate::errors::StorageError;
    use crate::storage::MemoryStore;
    use std::io::{Cursor, Read};

    fn parts(kv: Arc<dyn KeyValueStore>, backend: Arc<ScriptedBackend>) -> SessionParts {
        SessionParts {
            kv,
            catalog: Catalog::default(),
            ideas: IdeaCatalog::default(),
            backend,
            sink: None,
            narration: NarrationSettings::default(),
            policy: RunPolicy::default(),
            collision: CollisionPolicy::Overwrite,
            default_idea: "Solo App Builder".to_string(),
        }
    }

    fn session() -> (Session, Arc<dyn KeyValueStore>, Arc<ScriptedBackend>) {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let backend = Arc::new(ScriptedBackend::new());
        let session = Session::from_parts(parts(Arc::clone(&kv), Arc::clone(&backend))).unwrap();
        (session, kv, backend)
    }

    #[test]
    fn test_default_idea_when_nothing_selected() {
        let (session, _, _) = session();
        assert_eq!(session.active_idea(), "Solo App Builder");
        assert_eq!(session.progress().completed, 0);
        assert_eq!(session.progress().total, 9);
    }

    #[test]
    fn test_stored_selection_is_restored() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        kv.set(SELECTED_IDEA_KEY, "Shift Log").unwrap();
        let session =
            Session::from_parts(parts(kv, Arc::new(ScriptedBackend::new()))).unwrap();
        assert_eq!(session.active_idea(), "Shift Log");
    }

    #[tokio::test]
    async fn test_select_idea_resolves_catalog_and_clears_artifacts() {
        let (session, kv, backend) = session();
        session.run_unit(UnitId::new(1, 0), RunOptions { silent: true }).await.unwrap();
        assert_eq!(session.progress().completed, 1);

        let name = session.select_idea("oee-pulse").unwrap();

        assert_eq!(name, "OEE Pulse");
        assert_eq!(session.active_idea(), "OEE Pulse");
        assert_eq!(kv.get(SELECTED_IDEA_KEY).unwrap().as_deref(), Some("OEE Pulse"));
        assert_eq!(session.progress().completed, 0);

        session.run_unit(UnitId::new(1, 1), RunOptions { silent: true }).await.unwrap();
        assert_eq!(backend.generate_calls().len(), 2);
    }

    /// Memory store whose `remove` always fails.
    struct NoRemoveStore(MemoryStore);

    impl KeyValueStore for NoRemoveStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.0.set(key, value)
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::LockPoisoned)
        }
    }

    #[tokio::test]
    async fn test_failed_clear_keeps_previous_selection() {
        let kv: Arc<dyn KeyValueStore> = Arc::new(NoRemoveStore(MemoryStore::new()));
        let session =
            Session::from_parts(parts(Arc::clone(&kv), Arc::new(ScriptedBackend::new()))).unwrap();
        session.run_unit(UnitId::new(1, 0), RunOptions { silent: true }).await.unwrap();

        assert!(session.select_idea("Shift Log").is_err());

        assert_eq!(kv.get(SELECTED_IDEA_KEY).unwrap(), None);
        assert_eq!(session.active_idea(), "Solo App Builder");
        assert_eq!(session.manifest().unwrap().folder, "solo-app-builder");
        assert_eq!(session.progress().completed, 1);
    }

    #[test]
    fn test_select_free_form_idea() {
        let (session, _, _) = session();
        assert_eq!(session.select_idea("  Pallet Tracker ").unwrap(), "Pallet Tracker");
        assert!(session.select_idea("   ").is_err());
    }

    #[tokio::test]
    async fn test_brainstorm_and_adopt() {
        let (session, _, _) = session();
        let refined = session.brainstorm("Scrap tracker").await.unwrap();
        assert_eq!(refined.refined_name, "Scrap tracker Pro");
        assert!(session.refined_spec().unwrap().is_none());

        session.adopt(&refined).unwrap();

        assert_eq!(session.active_idea(), "Scrap tracker Pro");
        assert_eq!(session.refined_spec().unwrap(), Some(refined));

        session.select_idea("Energy Ledger").unwrap();
        assert!(session.refined_spec().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset_keeps_idea() {
        let (session, _, _) = session();
        session.select_idea("Defect Lens").unwrap();
        session.run_all().await.unwrap();
        assert!(session.progress().complete);

        session.reset().unwrap();

        assert_eq!(session.progress().completed, 0);
        assert_eq!(session.active_idea(), "Defect Lens");
    }

    #[tokio::test]
    async fn test_export_uses_active_idea_as_root() {
        let (session, _, _) = session();
        session.select_idea("My Idea").unwrap();
        session.run_unit(UnitId::new(1, 0), RunOptions { silent: true }).await.unwrap();

        let bytes = session.export().unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name("my-idea/docs/1.md").unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        assert!(!content.is_empty());

        let manifest = session.manifest().unwrap();
        assert_eq!(manifest.folder, "my-idea");
        assert_eq!(manifest.file_count(), 1);
    }

    #[tokio::test]
    async fn test_export_to_writes_named_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let (session, _, _) = session();
        session.select_idea("OEE Pulse").unwrap();
        let path = session.export_to(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("oee-pulse-project-bundle.zip"));
        assert!(path.is_file());
    }

    #[tokio::test]
    async fn test_settle_without_narrator_returns_immediately() {
        let (session, _, _) = session();
        assert!(session.subscribe_narration().is_none());
        session.settle_narration(Duration::from_secs(60)).await;
    }
}
