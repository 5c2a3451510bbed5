use super::parser::{self, ParsedArtifact};
use crate::catalog::{Catalog, UnitId};
use crate::errors::StorageError;
use crate::storage::{ARTIFACTS_KEY, KeyValueStore};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Completion of one checklist phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseProgress {
    pub day: u32,
    pub completed: usize,
    pub total: usize,
}

impl PhaseProgress {
    pub fn is_done(&self) -> bool {
        self.completed == self.total
    }
}

/// Unit key -> raw backend output, persisted write-through under
/// [`ARTIFACTS_KEY`].
///
/// Writes build the next map, persist it, and only then replace the in-memory
/// map, so a failed write leaves the previous artifact in place.
pub struct ArtifactStore {
    kv: Arc<dyn KeyValueStore>,
    entries: Mutex<HashMap<String, String>>,
}

impl ArtifactStore {
    /// Read the persisted artifact map once.
    pub fn load(kv: Arc<dyn KeyValueStore>) -> Result<Self, StorageError> {
        let entries = match kv.get(ARTIFACTS_KEY)? {
            Some(json) if !json.trim().is_empty() => {
                serde_json::from_str(&json).map_err(|e| StorageError::Corrupt {
                    key: ARTIFACTS_KEY.to_string(),
                    message: e.to_string(),
                })?
            }
            _ => HashMap::new(),
        };
        Ok(Self {
            kv,
            entries: Mutex::new(entries),
        })
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `raw` under `key`, overwriting any previous artifact.
    pub fn set(&self, key: &str, raw: String) -> Result<(), StorageError> {
        let mut entries = self.entries();
        let mut next = entries.clone();
        next.insert(key.to_string(), raw);
        self.kv.set(ARTIFACTS_KEY, &serde_json::to_string(&next)?)?;
        *entries = next;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Remove every artifact. Used when the active idea changes.
    pub fn clear_all(&self) -> Result<(), StorageError> {
        let mut entries = self.entries();
        self.kv.remove(ARTIFACTS_KEY)?;
        entries.clear();
        Ok(())
    }

    pub fn parsed(&self, key: &str) -> Option<ParsedArtifact> {
        self.entries().get(key).map(|raw| parser::parse(raw))
    }

    pub fn derived_path(&self, key: &str) -> Option<String> {
        self.entries().get(key).and_then(|raw| parser::extract_path(raw))
    }

    /// Parsed content for `key`; empty when nothing is stored.
    pub fn derived_content(&self, key: &str) -> String {
        self.entries()
            .get(key)
            .map(|raw| parser::extract_content(raw).to_string())
            .unwrap_or_default()
    }

    /// All artifacts: catalog units first in catalog order, then any keys the
    /// catalog does not know, sorted.
    pub fn snapshot(&self, catalog: &Catalog) -> Vec<(String, String)> {
        let entries = self.entries();
        let mut ordered: Vec<(String, String)> = catalog
            .units()
            .filter_map(|unit| {
                let key = unit.key();
                entries.get(&key).map(|raw| (key, raw.clone()))
            })
            .collect();

        let mut extra: Vec<(String, String)> = entries
            .iter()
            .filter(|(key, _)| !key.parse::<UnitId>().is_ok_and(|id| catalog.contains(id)))
            .map(|(key, raw)| (key.clone(), raw.clone()))
            .collect();
        extra.sort();
        ordered.extend(extra);
        ordered
    }

    /// Number of catalog units that have an artifact.
    pub fn completed_count(&self, catalog: &Catalog) -> usize {
        let entries = self.entries();
        catalog
            .units()
            .filter(|unit| entries.contains_key(&unit.key()))
            .count()
    }

    /// Fraction of catalog units with an artifact, recomputed on every call.
    pub fn completion_ratio(&self, catalog: &Catalog) -> f64 {
        let total = catalog.total_units();
        if total == 0 {
            return 0.0;
        }
        self.completed_count(catalog) as f64 / total as f64
    }

    /// Completion as a whole percentage, rounded down. Only a complete
    /// build reports 100.
    pub fn progress_percent(&self, catalog: &Catalog) -> u8 {
        let total = catalog.total_units();
        if total == 0 {
            return 0;
        }
        (self.completed_count(catalog) * 100 / total) as u8
    }

    pub fn is_build_complete(&self, catalog: &Catalog) -> bool {
        self.completed_count(catalog) == catalog.total_units()
    }

    pub fn phase_progress(&self, catalog: &Catalog) -> Vec<PhaseProgress> {
        let entries = self.entries();
        catalog
            .phases()
            .iter()
            .map(|phase| PhaseProgress {
                day: phase.day,
                completed: phase
                    .unit_ids()
                    .filter(|id| entries.contains_key(&id.key()))
                    .count(),
                total: phase.tasks.len(),
            })
            .collect()
    }

    /// The phase to highlight as in progress: the first unfinished phase that
    /// is either first or whose predecessor has started.
    pub fn current_phase(&self, catalog: &Catalog) -> Option<u32> {
        let progress = self.phase_progress(catalog);
        progress.iter().enumerate().find_map(|(idx, phase)| {
            let started_before = idx == 0 || progress[idx - 1].completed > 0;
            (!phase.is_done() && started_before).then_some(phase.day)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ChecklistPhase;
    use crate::storage::{JsonFileStore, MemoryStore};
    use tempfile::tempdir;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            ChecklistPhase::new(1, "One", "", &["a", "b"]),
            ChecklistPhase::new(2, "Two", "", &["c", "d"]),
        ])
        .unwrap()
    }

    fn memory_store() -> (ArtifactStore, Arc<MemoryStore>) {
        let kv = Arc::new(MemoryStore::new());
        let store = ArtifactStore::load(kv.clone()).unwrap();
        (store, kv)
    }

    #[test]
    fn test_set_get_overwrite() {
        let (store, _) = memory_store();
        store.set("1-0", "first".to_string()).unwrap();
        store.set("1-0", "second".to_string()).unwrap();
        assert_eq!(store.get("1-0").as_deref(), Some("second"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_set_writes_through() {
        let (store, kv) = memory_store();
        store.set("2-1", "raw".to_string()).unwrap();
        let persisted: HashMap<String, String> =
            serde_json::from_str(&kv.get(ARTIFACTS_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted.get("2-1").unwrap(), "raw");
    }

    #[test]
    fn test_derived_accessors() {
        let (store, _) = memory_store();
        store
            .set("1-0", "FILE_PATH: api/x.ts\n---CONTENT---\nfoo".to_string())
            .unwrap();
        assert_eq!(store.derived_path("1-0").as_deref(), Some("api/x.ts"));
        assert_eq!(store.derived_content("1-0"), "\nfoo");
        assert_eq!(store.derived_path("9-9"), None);
        assert_eq!(store.derived_content("9-9"), "");
    }

    #[test]
    fn test_completion_ratio_is_recomputed() {
        let (store, _) = memory_store();
        let catalog = catalog();
        assert_eq!(store.completion_ratio(&catalog), 0.0);
        store.set("1-0", "x".to_string()).unwrap();
        assert_eq!(store.completion_ratio(&catalog), 0.25);
        store.set("1-0", "y".to_string()).unwrap();
        assert_eq!(store.completed_count(&catalog), 1);
        for key in ["1-1", "2-0", "2-1"] {
            store.set(key, "z".to_string()).unwrap();
        }
        assert_eq!(store.progress_percent(&catalog), 100);
        assert!(store.is_build_complete(&catalog));
    }

    #[test]
    fn test_percent_reaches_100_only_when_complete() {
        let names: Vec<String> = (0..201).map(|i| format!("task {i}")).collect();
        let tasks: Vec<&str> = names.iter().map(String::as_str).collect();
        let catalog = Catalog::new(vec![ChecklistPhase::new(1, "Big", "", &tasks)]).unwrap();
        let (store, _) = memory_store();

        for i in 0..200 {
            store.set(&format!("1-{i}"), "x".to_string()).unwrap();
        }
        assert_eq!(store.progress_percent(&catalog), 99);
        assert!(!store.is_build_complete(&catalog));

        store.set("1-200", "x".to_string()).unwrap();
        assert_eq!(store.progress_percent(&catalog), 100);
        assert!(store.is_build_complete(&catalog));
    }

    #[test]
    fn test_percent_rounds_down() {
        let catalog = Catalog::new(vec![ChecklistPhase::new(1, "One", "", &["a", "b", "c"])]).unwrap();
        let (store, _) = memory_store();
        store.set("1-0", "x".to_string()).unwrap();
        store.set("1-1", "x".to_string()).unwrap();
        assert_eq!(store.progress_percent(&catalog), 66);
    }

    #[test]
    fn test_unknown_keys_do_not_count_towards_completion() {
        let (store, _) = memory_store();
        store.set("7-7", "stale".to_string()).unwrap();
        assert_eq!(store.completed_count(&catalog()), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clear_all_resets_progress() {
        let (store, kv) = memory_store();
        let catalog = catalog();
        store.set("1-0", "x".to_string()).unwrap();
        store.set("2-0", "y".to_string()).unwrap();
        store.clear_all().unwrap();
        assert!(store.is_empty());
        assert_eq!(store.progress_percent(&catalog), 0);
        assert_eq!(kv.get(ARTIFACTS_KEY).unwrap(), None);
    }

    #[test]
    fn test_snapshot_follows_catalog_order() {
        let (store, _) = memory_store();
        store.set("2-1", "d".to_string()).unwrap();
        store.set("7-0", "extra".to_string()).unwrap();
        store.set("1-0", "a".to_string()).unwrap();
        store.set("2-0", "c".to_string()).unwrap();

        let keys: Vec<String> = store
            .snapshot(&catalog())
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["1-0", "2-0", "2-1", "7-0"]);
    }

    #[test]
    fn test_phase_progress_and_current_phase() {
        let (store, _) = memory_store();
        let catalog = catalog();
        assert_eq!(store.current_phase(&catalog), Some(1));

        store.set("1-0", "a".to_string()).unwrap();
        store.set("1-1", "b".to_string()).unwrap();
        let progress = store.phase_progress(&catalog);
        assert!(progress[0].is_done());
        assert_eq!(progress[1].completed, 0);
        assert_eq!(store.current_phase(&catalog), Some(2));

        store.set("2-0", "c".to_string()).unwrap();
        store.set("2-1", "d".to_string()).unwrap();
        assert_eq!(store.current_phase(&catalog), None);
    }

    #[test]
    fn test_reload_from_file_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        {
            let kv = Arc::new(JsonFileStore::open(&path).unwrap());
            let store = ArtifactStore::load(kv).unwrap();
            store.set("1-1", "persisted".to_string()).unwrap();
        }
        let kv = Arc::new(JsonFileStore::open(&path).unwrap());
        let store = ArtifactStore::load(kv).unwrap();
        assert_eq!(store.get("1-1").as_deref(), Some("persisted"));
    }

    #[test]
    fn test_corrupt_artifact_map_errors() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(ARTIFACTS_KEY, "[not a map]").unwrap();
        assert!(matches!(
            ArtifactStore::load(kv),
            Err(StorageError::Corrupt { .. })
        ));
    }
}
