//! Idea catalog and brainstorm results.
//!
//! The catalog is static reference data: a built-in list, or
//! `.autopilot/ideas.json` when present. Selecting an idea is a session
//! operation (see `Session::select_idea`), not a catalog mutation.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// How an idea is expected to earn money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Monetization {
    #[serde(rename = "One-time")]
    OneTime,
    Subscription,
    #[serde(rename = "Usage-based")]
    UsageBased,
}

impl std::fmt::Display for Monetization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Monetization::OneTime => write!(f, "One-time"),
            Monetization::Subscription => write!(f, "Subscription"),
            Monetization::UsageBased => write!(f, "Usage-based"),
        }
    }
}

/// A candidate project idea.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppIdea {
    pub id: String,
    pub title: String,
    pub problem: String,
    pub solution: String,
    pub target: String,
    pub monetization: Monetization,
    #[serde(default)]
    pub icon: String,
}

impl AppIdea {
    /// Case-insensitive match against title, problem and target audience.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term)
            || self.problem.to_lowercase().contains(&term)
            || self.target.to_lowercase().contains(&term)
    }
}

/// A brainstormed refinement of a free-form idea.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinedIdea {
    pub refined_name: String,
    /// "X (pain) -> Y (solution) -> Z (return)".
    pub formula: String,
    pub slc_breakdown: String,
    pub market_verdict: String,
    pub three_day_mvp_plan: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdeaCatalog {
    ideas: Vec<AppIdea>,
}

impl IdeaCatalog {
    /// Build a catalog, rejecting duplicate ids and blank titles.
    pub fn new(ideas: Vec<AppIdea>) -> Result<Self> {
        let mut seen = HashSet::new();
        for idea in &ideas {
            if idea.title.trim().is_empty() {
                bail!("Idea '{}' has an empty title", idea.id);
            }
            if !seen.insert(idea.id.as_str()) {
                bail!("Idea id '{}' appears more than once", idea.id);
            }
        }
        Ok(Self { ideas })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ideas file: {}", path.display()))?;
        let ideas: Vec<AppIdea> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse ideas JSON: {}", path.display()))?;
        Self::new(ideas).with_context(|| format!("Invalid ideas file: {}", path.display()))
    }

    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn ideas(&self) -> &[AppIdea] {
        &self.ideas
    }

    pub fn search<'a>(&'a self, term: &'a str) -> impl Iterator<Item = &'a AppIdea> + 'a {
        self.ideas.iter().filter(move |idea| idea.matches(term))
    }

    /// Look up an idea by id, or by title ignoring case.
    pub fn find(&self, needle: &str) -> Option<&AppIdea> {
        self.ideas
            .iter()
            .find(|idea| idea.id == needle)
            .or_else(|| {
                self.ideas
                    .iter()
                    .find(|idea| idea.title.eq_ignore_ascii_case(needle))
            })
    }
}

impl Default for IdeaCatalog {
    fn default() -> Self {
        Self {
            ideas: default_ideas(),
        }
    }
}

fn idea(
    id: &str,
    title: &str,
    problem: &str,
    solution: &str,
    target: &str,
    monetization: Monetization,
    icon: &str,
) -> AppIdea {
    AppIdea {
        id: id.to_string(),
        title: title.to_string(),
        problem: problem.to_string(),
        solution: solution.to_string(),
        target: target.to_string(),
        monetization,
        icon: icon.to_string(),
    }
}

/// The built-in idea list used when no `ideas.json` is present.
pub fn default_ideas() -> Vec<AppIdea> {
    vec![
        idea(
            "oee-pulse",
            "OEE Pulse",
            "Small plants track machine uptime on paper and see losses a week late",
            "Stream PLC counters into a live OEE dashboard with shift-level loss breakdowns",
            "Contract manufacturers with 5-50 machines",
            Monetization::Subscription,
            "📈",
        ),
        idea(
            "defect-lens",
            "Defect Lens",
            "Visual inspection misses surface defects on fast lines",
            "Camera plus vision model that flags defects and logs them against the batch",
            "Quality managers in packaging and metal finishing",
            Monetization::UsageBased,
            "🔍",
        ),
        idea(
            "maint-whisper",
            "Maintenance Whisper",
            "Unplanned downtime from bearings and motors that degrade silently",
            "Vibration sensors with anomaly detection that schedule maintenance before failure",
            "Maintenance leads at mid-size factories",
            Monetization::Subscription,
            "🛠️",
        ),
        idea(
            "changeover-coach",
            "Changeover Coach",
            "Line changeovers take twice as long as they should",
            "Step-by-step SMED checklists with timing analytics per operator",
            "Food and beverage co-packers",
            Monetization::OneTime,
            "⏱️",
        ),
        idea(
            "energy-ledger",
            "Energy Ledger",
            "Energy bills are a lump sum nobody can attribute to products",
            "Per-machine metering that allocates kWh to work orders",
            "Plant controllers and sustainability officers",
            Monetization::UsageBased,
            "⚡",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_catalog_is_valid() {
        let catalog = IdeaCatalog::default();
        assert!(IdeaCatalog::new(catalog.ideas().to_vec()).is_ok());
        assert!(!catalog.ideas().is_empty());
    }

    #[test]
    fn test_search_is_case_insensitive_over_title_problem_target() {
        let catalog = IdeaCatalog::default();
        assert_eq!(catalog.search("oee").count(), 1);
        assert_eq!(catalog.search("DOWNTIME").count(), 1);
        assert_eq!(catalog.search("co-packers").count(), 1);
        assert_eq!(catalog.search("").count(), catalog.ideas().len());
        assert_eq!(catalog.search("no such thing").count(), 0);
    }

    #[test]
    fn test_find_by_id_or_title() {
        let catalog = IdeaCatalog::default();
        assert_eq!(catalog.find("defect-lens").unwrap().title, "Defect Lens");
        assert_eq!(catalog.find("defect lens").unwrap().id, "defect-lens");
        assert!(catalog.find("missing").is_none());
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let mut ideas = default_ideas();
        ideas.push(ideas[0].clone());
        assert!(IdeaCatalog::new(ideas).is_err());
    }

    #[test]
    fn test_monetization_serde_names() {
        let json = serde_json::to_string(&Monetization::UsageBased).unwrap();
        assert_eq!(json, "\"Usage-based\"");
        let parsed: Monetization = serde_json::from_str("\"One-time\"").unwrap();
        assert_eq!(parsed, Monetization::OneTime);
    }

    #[test]
    fn test_load_ideas_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ideas.json");
        std::fs::write(
            &path,
            r#"[{"id":"a","title":"Alpha","problem":"p","solution":"s","target":"t","monetization":"Subscription"}]"#,
        )
        .unwrap();
        let catalog = IdeaCatalog::load_or_default(&path).unwrap();
        assert_eq!(catalog.ideas().len(), 1);
        assert_eq!(catalog.ideas()[0].icon, "");
    }

    #[test]
    fn test_refined_idea_camel_case() {
        let refined: RefinedIdea = serde_json::from_str(
            r#"{"refinedName":"N","formula":"X -> Y -> Z","slcBreakdown":"s","marketVerdict":"m","threeDayMvpPlan":["a","b"]}"#,
        )
        .unwrap();
        assert_eq!(refined.refined_name, "N");
        assert_eq!(refined.three_day_mvp_plan.len(), 2);
    }
}
