//! Checklist catalog and unit identity.
//!
//! This module provides:
//! - `UnitId`, the `(phase, task)` identity of one unit of work and its string key
//! - `ChecklistPhase` and `Catalog`, the ordered, read-only checklist
//! - JSON loading with validation, falling back to the built-in checklist

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Identity of one unit: a phase number (>= 1) and a task index (>= 0).
///
/// The derived key `"{phase}-{task}"` is unique within a catalog and is the
/// key artifacts are stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId {
    pub phase: u32,
    pub task: usize,
}

impl UnitId {
    pub fn new(phase: u32, task: usize) -> Self {
        Self { phase, task }
    }

    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.phase, self.task)
    }
}

impl FromStr for UnitId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (phase, task) = s
            .trim()
            .split_once('-')
            .with_context(|| format!("Invalid unit key '{}'. Expected <phase>-<task>, e.g. 1-0", s))?;
        let phase: u32 = phase
            .parse()
            .with_context(|| format!("Invalid phase number in unit key '{}'", s))?;
        let task: usize = task
            .parse()
            .with_context(|| format!("Invalid task index in unit key '{}'", s))?;
        if phase == 0 {
            bail!("Invalid unit key '{}': phase numbers start at 1", s);
        }
        Ok(Self { phase, task })
    }
}

/// One phase of the checklist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChecklistPhase {
    /// Phase number, starting at 1
    pub day: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Ordered task descriptions
    pub tasks: Vec<String>,
}

impl ChecklistPhase {
    pub fn new(day: u32, title: &str, description: &str, tasks: &[&str]) -> Self {
        Self {
            day,
            title: title.to_string(),
            description: description.to_string(),
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Label passed to the generation backend, e.g. `"Phase 2"`.
    pub fn label(&self) -> String {
        format!("Phase {}", self.day)
    }

    pub fn unit_ids(&self) -> impl Iterator<Item = UnitId> + '_ {
        (0..self.tasks.len()).map(move |idx| UnitId::new(self.day, idx))
    }
}

/// A resolved unit: identity plus the data the backend needs to run it.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit<'a> {
    pub id: UnitId,
    pub phase: &'a ChecklistPhase,
    pub task: &'a str,
}

impl Unit<'_> {
    pub fn key(&self) -> String {
        self.id.key()
    }
}

/// The ordered checklist. Defines total unit count and iteration order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Catalog {
    phases: Vec<ChecklistPhase>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate or zero phase numbers and empty phases.
    pub fn new(phases: Vec<ChecklistPhase>) -> Result<Self> {
        if phases.is_empty() {
            bail!("Checklist must contain at least one phase");
        }
        let mut seen = HashSet::new();
        for phase in &phases {
            if phase.day == 0 {
                bail!("Phase '{}' has number 0; phase numbers start at 1", phase.title);
            }
            if !seen.insert(phase.day) {
                bail!("Phase number {} appears more than once", phase.day);
            }
            if phase.tasks.is_empty() {
                bail!("Phase {} ('{}') has no tasks", phase.day, phase.title);
            }
        }
        Ok(Self { phases })
    }

    /// Load a catalog from a JSON array of phases.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read checklist file: {}", path.display()))?;
        let phases: Vec<ChecklistPhase> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse checklist JSON: {}", path.display()))?;
        Self::new(phases).with_context(|| format!("Invalid checklist: {}", path.display()))
    }

    /// Load from `path` if it exists, otherwise use the built-in checklist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn phases(&self) -> &[ChecklistPhase] {
        &self.phases
    }

    pub fn phase(&self, day: u32) -> Option<&ChecklistPhase> {
        self.phases.iter().find(|p| p.day == day)
    }

    pub fn total_units(&self) -> usize {
        self.phases.iter().map(|p| p.tasks.len()).sum()
    }

    /// Resolve a unit identity against this catalog.
    pub fn unit(&self, id: UnitId) -> Option<Unit<'_>> {
        let phase = self.phase(id.phase)?;
        let task = phase.tasks.get(id.task)?;
        Some(Unit { id, phase, task })
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.unit(id).is_some()
    }

    /// All units in declared phase/task order.
    pub fn units(&self) -> impl Iterator<Item = Unit<'_>> + '_ {
        self.phases.iter().flat_map(|phase| {
            phase
                .tasks
                .iter()
                .enumerate()
                .map(move |(idx, task)| Unit {
                    id: UnitId::new(phase.day, idx),
                    phase,
                    task,
                })
        })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            phases: default_phases(),
        }
    }
}

/// The built-in checklist used when no `checklist.json` is present.
pub fn default_phases() -> Vec<ChecklistPhase> {
    vec![
        ChecklistPhase::new(
            1,
            "Blueprint & Data Foundation",
            "Pin down the problem, the data model and the project skeleton.",
            &[
                "Write the product requirements document with the X -> Y -> Z formula",
                "Design the database schema and core data models",
                "Scaffold the project structure and environment configuration",
            ],
        ),
        ChecklistPhase::new(
            2,
            "Core Engine & Interface",
            "Build the data ingestion path, the API and the main screens.",
            &[
                "Implement the IoT data ingestion API routes",
                "Build the OEE calculation service",
                "Create the main dashboard UI components",
            ],
        ),
        ChecklistPhase::new(
            3,
            "Launch Readiness",
            "Harden, package and document the product for its first customers.",
            &[
                "Add authentication and subscription billing",
                "Write deployment configuration for Vercel",
                "Write the launch README and operator documentation",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn two_phase_catalog() -> Catalog {
        Catalog::new(vec![
            ChecklistPhase::new(1, "One", "", &["a", "b"]),
            ChecklistPhase::new(2, "Two", "", &["c"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_unit_key_format() {
        assert_eq!(UnitId::new(1, 0).key(), "1-0");
        assert_eq!(UnitId::new(12, 3).to_string(), "12-3");
    }

    #[test]
    fn test_unit_key_parse() {
        let id: UnitId = "2-1".parse().unwrap();
        assert_eq!(id, UnitId::new(2, 1));
        assert!("2".parse::<UnitId>().is_err());
        assert!("x-1".parse::<UnitId>().is_err());
        assert!("0-1".parse::<UnitId>().is_err());
    }

    #[test]
    fn test_units_iterate_in_declared_order() {
        let catalog = two_phase_catalog();
        let keys: Vec<String> = catalog.units().map(|u| u.key()).collect();
        assert_eq!(keys, vec!["1-0", "1-1", "2-0"]);
        assert_eq!(catalog.total_units(), 3);
    }

    #[test]
    fn test_unit_lookup() {
        let catalog = two_phase_catalog();
        let unit = catalog.unit(UnitId::new(1, 1)).unwrap();
        assert_eq!(unit.task, "b");
        assert_eq!(unit.phase.label(), "Phase 1");
        assert!(catalog.unit(UnitId::new(1, 2)).is_none());
        assert!(catalog.unit(UnitId::new(3, 0)).is_none());
    }

    #[test]
    fn test_catalog_rejects_duplicate_phase_numbers() {
        let result = Catalog::new(vec![
            ChecklistPhase::new(1, "One", "", &["a"]),
            ChecklistPhase::new(1, "Again", "", &["b"]),
        ]);
        assert!(result.unwrap_err().to_string().contains("more than once"));
    }

    #[test]
    fn test_catalog_rejects_empty_phase() {
        let result = Catalog::new(vec![ChecklistPhase::new(1, "One", "", &[])]);
        assert!(result.unwrap_err().to_string().contains("no tasks"));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempdir().unwrap();
        let catalog = Catalog::load_or_default(&dir.path().join("checklist.json")).unwrap();
        assert_eq!(catalog, Catalog::default());
        assert_eq!(catalog.total_units(), 9);
    }

    #[test]
    fn test_load_from_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checklist.json");
        fs::write(
            &path,
            r#"[{"day": 1, "title": "Only", "tasks": ["write docs", "ship it"]}]"#,
        )
        .unwrap();

        let catalog = Catalog::load_or_default(&path).unwrap();
        assert_eq!(catalog.total_units(), 2);
        assert_eq!(catalog.phases()[0].description, "");
    }

    #[test]
    fn test_load_invalid_json_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checklist.json");
        fs::write(&path, "not json").unwrap();
        assert!(Catalog::load(&path).is_err());
    }
}
