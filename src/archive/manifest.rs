use super::{CollisionPolicy, PlacedFile, place_files, root_slug};
use crate::errors::ArchiveError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Pseudo-directory a file is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestGroup {
    Models,
    Ui,
    Api,
    Docs,
    Root,
}

impl ManifestGroup {
    pub const ALL: [ManifestGroup; 5] = [
        ManifestGroup::Models,
        ManifestGroup::Ui,
        ManifestGroup::Api,
        ManifestGroup::Docs,
        ManifestGroup::Root,
    ];

    /// First matching rule wins: `models/`, then `views/` or `components/`,
    /// then `api/`, then anything mentioning `.md` or `.txt`.
    pub fn classify(path: &str) -> Self {
        if path.contains("models/") {
            ManifestGroup::Models
        } else if path.contains("views/") || path.contains("components/") {
            ManifestGroup::Ui
        } else if path.contains("api/") {
            ManifestGroup::Api
        } else if path.contains(".md") || path.contains(".txt") {
            ManifestGroup::Docs
        } else {
            ManifestGroup::Root
        }
    }
}

impl std::fmt::Display for ManifestGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManifestGroup::Models => write!(f, "models"),
            ManifestGroup::Ui => write!(f, "ui"),
            ManifestGroup::Api => write!(f, "api"),
            ManifestGroup::Docs => write!(f, "docs"),
            ManifestGroup::Root => write!(f, "root"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub key: String,
    pub path: String,
    pub content: String,
}

impl From<PlacedFile> for ManifestEntry {
    fn from(file: PlacedFile) -> Self {
        Self {
            key: file.key,
            path: file.path,
            content: file.content,
        }
    }
}

/// On-demand projection of the artifact store into grouped files.
/// Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveManifest {
    pub folder: String,
    pub groups: BTreeMap<ManifestGroup, Vec<ManifestEntry>>,
}

impl ArchiveManifest {
    /// Group the files the bundle for `snapshot` would contain.
    pub fn build(
        snapshot: &[(String, String)],
        root_name: &str,
        policy: CollisionPolicy,
    ) -> Result<Self, ArchiveError> {
        let mut groups: BTreeMap<ManifestGroup, Vec<ManifestEntry>> = ManifestGroup::ALL
            .into_iter()
            .map(|group| (group, Vec::new()))
            .collect();
        for file in place_files(snapshot, policy)? {
            groups
                .entry(ManifestGroup::classify(&file.path))
                .or_default()
                .push(file.into());
        }
        Ok(Self {
            folder: root_slug(root_name),
            groups,
        })
    }

    pub fn group(&self, group: ManifestGroup) -> &[ManifestEntry] {
        self.groups.get(&group).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn file_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}
