use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Transient run state: which units are in flight and whether a batch holds
/// the build-all flag. Nothing here is persisted.
#[derive(Debug, Default)]
pub struct RunRegistry {
    running: Mutex<BTreeSet<String>>,
    batch: AtomicBool,
}

/// Marks a unit as running until dropped.
#[derive(Debug)]
pub struct RunGuard<'a> {
    registry: &'a RunRegistry,
    key: String,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.registry.running().remove(&self.key);
    }
}

/// Holds the build-all flag until dropped.
#[derive(Debug)]
pub struct BatchGuard<'a> {
    registry: &'a RunRegistry,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.registry.batch.store(false, Ordering::SeqCst);
    }
}

impl RunRegistry {
    fn running(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `key` as running, or `None` if it already is.
    pub fn try_start(&self, key: &str) -> Option<RunGuard<'_>> {
        if !self.running().insert(key.to_string()) {
            return None;
        }
        Some(RunGuard {
            registry: self,
            key: key.to_string(),
        })
    }

    /// Take the build-all flag, or `None` if a batch already holds it.
    pub fn try_start_batch(&self) -> Option<BatchGuard<'_>> {
        self.batch
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| BatchGuard { registry: self })
    }

    pub fn is_running(&self, key: &str) -> bool {
        self.running().contains(key)
    }

    pub fn running_keys(&self) -> Vec<String> {
        self.running().iter().cloned().collect()
    }

    pub fn is_batch_active(&self) -> bool {
        self.batch.load(Ordering::SeqCst)
    }
}
