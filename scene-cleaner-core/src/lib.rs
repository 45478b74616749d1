//! # Scene Cleaner Core
//!
//! Rule engine that audits and cleans 3D scene documents.
//! Designed for use by CLI tools and batch pipelines.
//!
//! ## Architecture
//!
//! - [`scene`] - Scene data model (nodes, layers, texture references)
//! - [`provider`] - Host scene capability trait and transaction helpers
//! - [`memory`] - JSON-backed in-memory scene provider
//! - [`options`] - Cleanup option flags
//! - [`scan`] - Read-only audit rules
//! - [`clean`] - Transform and scene cleanup passes
//! - [`relink`] - Missing texture relinking
//! - [`material_audit`] - Material count and missing texture audit
//! - [`report`] - Report generation from scan and cleanup results
//! - [`batch`] - Folder batch processing

pub mod batch;
pub mod clean;
pub mod entry;
pub mod material_audit;
pub mod memory;
pub mod options;
pub mod provider;
pub mod relink;
pub mod report;
pub mod report_export;
pub mod scan;
pub mod scene;

#[cfg(test)]
mod testing;

// Re-export main types for convenient access
pub use batch::{run_batch, BatchJob, BatchRunner, BatchSummary, JobStatus};
pub use clean::{clean, clean_scene, clean_transforms};
pub use entry::{ActionEntry, Entry, IssueEntry, Level};
pub use material_audit::audit_materials;
pub use memory::{MemoryScene, SceneDocument};
pub use options::Options;
pub use provider::{with_transaction, SceneError, SceneProvider, SceneResult};
pub use relink::{missing_textures, relink, FileIndex};
pub use report::{build_report, Report, ReportBuilder};
pub use report_export::{save_html, save_json};
pub use scan::{scan, ScanRule, Scanner};
pub use scene::{Layer, LayerId, NodeId, NodeKind, SceneNode, TextureId, TextureReference, Transform};

/// Common result type for scene cleaner operations
pub type Result<T> = std::result::Result<T, Error>;

/// Library-wide error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    #[error("{0}")]
    Other(String),
}
