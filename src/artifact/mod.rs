//! Artifacts: raw backend output per unit and the path/content derived from it.

pub mod parser;
pub mod store;

pub use parser::{CONTENT_SEPARATOR, ParsedArtifact, parse};
pub use store::{ArtifactStore, PhaseProgress};
