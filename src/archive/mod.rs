//! Project bundle export.
//!
//! Every artifact becomes one file under a single top-level folder named
//! after the idea. The file's place comes from its declared `FILE_PATH`, or
//! `generated-output-<unit-key>.txt` when none was declared.
//!
//! ```text
//! my-idea/
//! ├── api/x.ts
//! └── generated-output-1-1.txt
//! ```

pub mod manifest;

pub use manifest::{ArchiveManifest, ManifestEntry, ManifestGroup};

use crate::artifact::parse;
use crate::errors::ArchiveError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

/// What to do when two units resolve to the same file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// The unit processed later replaces the earlier file.
    #[default]
    Overwrite,
    /// Refuse to build the bundle.
    Error,
}

impl std::fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollisionPolicy::Overwrite => write!(f, "overwrite"),
            CollisionPolicy::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for CollisionPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overwrite" => Ok(CollisionPolicy::Overwrite),
            "error" => Ok(CollisionPolicy::Error),
            _ => anyhow::bail!(
                "Invalid collision policy '{}'. Valid values: overwrite, error",
                s
            ),
        }
    }
}

/// One file of the bundle, relative to the root folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedFile {
    /// Unit whose content ended up in this file.
    pub key: String,
    pub path: String,
    pub content: String,
}

/// Folder name for `root_name`: trimmed, whitespace runs collapsed to `-`,
/// lower-cased.
pub fn root_slug(root_name: &str) -> String {
    let slug = root_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase();
    if slug.is_empty() {
        "project".to_string()
    } else {
        slug
    }
}

pub fn bundle_file_name(root_name: &str) -> String {
    format!("{}-project-bundle.zip", root_slug(root_name))
}

pub fn synthetic_path(key: &str) -> String {
    format!("generated-output-{key}.txt")
}

/// Make a declared path safe to place inside the root folder.
///
/// Backslashes become `/`; empty, `.` and `..` components are dropped, which
/// also strips leading `/` and `./`. `None` if nothing is left.
pub fn normalize_path(declared: &str) -> Option<String> {
    let cleaned = declared.replace('\\', "/");
    let parts: Vec<&str> = cleaned
        .split('/')
        .map(str::trim)
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Resolve every artifact of `snapshot` to a file, in snapshot order.
///
/// A later unit resolving to an already placed path replaces that file's
/// content under [`CollisionPolicy::Overwrite`]; the file keeps its original
/// position.
pub fn place_files(
    snapshot: &[(String, String)],
    policy: CollisionPolicy,
) -> Result<Vec<PlacedFile>, ArchiveError> {
    let mut files: Vec<PlacedFile> = Vec::with_capacity(snapshot.len());
    let mut by_path: HashMap<String, usize> = HashMap::new();

    for (key, raw) in snapshot {
        let parsed = parse(raw);
        let path = parsed
            .path
            .as_deref()
            .and_then(normalize_path)
            .unwrap_or_else(|| synthetic_path(key));
        let content = parsed.body().to_string();

        match by_path.get(&path) {
            Some(&idx) => {
                let earlier = &mut files[idx];
                if policy == CollisionPolicy::Error {
                    return Err(ArchiveError::PathCollision {
                        path,
                        first: earlier.key.clone(),
                        second: key.clone(),
                    });
                }
                tracing::warn!(
                    path = %path,
                    first = %earlier.key,
                    second = %key,
                    "two units resolve to the same file; keeping the later one"
                );
                earlier.key = key.clone();
                earlier.content = content;
            }
            None => {
                by_path.insert(path.clone(), files.len());
                files.push(PlacedFile {
                    key: key.clone(),
                    path,
                    content,
                });
            }
        }
    }

    Ok(files)
}

/// Pack `snapshot` into an in-memory zip under the `root_name` folder.
pub fn build_archive(
    snapshot: &[(String, String)],
    root_name: &str,
    policy: CollisionPolicy,
) -> Result<Vec<u8>, ArchiveError> {
    let folder = root_slug(root_name);
    let files = place_files(snapshot, policy)?;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for file in &files {
        writer.start_file(format!("{}/{}", folder, file.path), options)?;
        writer.write_all(file.content.as_bytes())?;
    }
    let bytes = writer.finish()?.into_inner();

    tracing::debug!(files = files.len(), bytes = bytes.len(), folder = %folder, "bundle built");
    Ok(bytes)
}

/// Write a built bundle into `dir` as `<slug>-project-bundle.zip`.
pub fn write_bundle(dir: &Path, root_name: &str, bytes: &[u8]) -> Result<PathBuf, ArchiveError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(bundle_file_name(root_name));
    std::fs::write(&path, bytes)?;
    Ok(path)
}
