//! Scene Provider capability.
//!
//! The host application owns a single open scene document. Every engine
//! operation receives the provider explicitly; nothing in this crate holds a
//! global handle, so tests substitute [`MemoryScene`](crate::memory::MemoryScene)
//! or a wrapper around it.

use crate::scene::{Layer, LayerId, NodeId, SceneNode, TextureId, TextureReference};
use std::path::{Path, PathBuf};

/// Faults raised by a Scene Provider
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("layer {0} not found")]
    LayerNotFound(LayerId),

    #[error("texture {0} not found")]
    TextureNotFound(TextureId),

    #[error("node {id} could not be read: {reason}")]
    Unreadable { id: NodeId, reason: String },

    #[error("cannot delete layer '{0}'")]
    LayerNotDeletable(String),

    #[error("transaction '{label}' failed: {reason}")]
    Transaction { label: String, reason: String },

    #[error("failed to load document {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("failed to save document {path}: {reason}")]
    Save { path: PathBuf, reason: String },

    #[error("{0}")]
    Host(String),
}

pub type SceneResult<T> = std::result::Result<T, SceneError>;

/// Access to the host's open scene document.
///
/// Every call is blocking and in-process. Per-item accessors return
/// `SceneResult` so callers can skip a single unreadable item.
pub trait SceneProvider {
    /// Replace the open document with the one stored at `path`.
    fn load_document(&mut self, path: &Path) -> SceneResult<()>;

    /// Persist the open document to `path`.
    fn save_document(&mut self, path: &Path) -> SceneResult<()>;

    /// Handles of every node, in scene order.
    fn node_ids(&self) -> SceneResult<Vec<NodeId>>;

    /// Snapshot of one node.
    fn node(&self, id: NodeId) -> SceneResult<SceneNode>;

    /// Every layer, in layer-manager order.
    fn layers(&self) -> SceneResult<Vec<Layer>>;

    fn current_layer(&self) -> SceneResult<LayerId>;

    fn set_current_layer(&mut self, id: LayerId) -> SceneResult<()>;

    fn delete_node(&mut self, id: NodeId) -> SceneResult<()>;

    fn delete_layer(&mut self, id: LayerId) -> SceneResult<()>;

    /// Number of materials in the scene material collection.
    fn material_count(&self) -> SceneResult<usize>;

    /// Every bitmap path referenced by a material.
    fn texture_refs(&self) -> SceneResult<Vec<TextureReference>>;

    fn set_texture_path(&mut self, id: TextureId, path: &Path) -> SceneResult<()>;

    /// Bake the current transform into the geometry and reset it to identity.
    fn reset_xform(&mut self, id: NodeId) -> SceneResult<()>;

    /// Flatten the modifier stack into the base object.
    fn collapse_stack(&mut self, id: NodeId) -> SceneResult<()>;

    /// Normalize the base object to the canonical polygon representation.
    fn convert_to_poly(&mut self, id: NodeId) -> SceneResult<()>;

    /// Open a revertible mutation block. Everything until the matching
    /// [`commit_transaction`](Self::commit_transaction) becomes one undo step.
    fn begin_transaction(&mut self, label: &str) -> SceneResult<()>;

    fn commit_transaction(&mut self) -> SceneResult<()>;

    /// Force a viewport refresh. Headless hosts ignore it.
    fn redraw(&mut self) {}
}

/// Run `f` inside one revertible transaction labelled `label`.
///
/// Failure to open or close the block is returned as an error; whatever `f`
/// already mutated stays mutated.
pub fn with_transaction<P, T, F>(provider: &mut P, label: &str, f: F) -> SceneResult<T>
where
    P: SceneProvider + ?Sized,
    F: FnOnce(&mut P) -> T,
{
    provider.begin_transaction(label)?;
    let out = f(provider);
    provider.commit_transaction()?;
    Ok(out)
}

/// Per-item try/skip: turn a fault on one item into `None` and keep going.
pub fn best_effort<T>(what: impl std::fmt::Display, result: SceneResult<T>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            log::debug!("skipping {}: {}", what, e);
            None
        }
    }
}

/// Every node the provider can read. Unreadable nodes are skipped; an
/// enumeration failure yields an empty list.
pub fn readable_nodes<P: SceneProvider + ?Sized>(provider: &P) -> Vec<SceneNode> {
    let Some(ids) = best_effort("node enumeration", provider.node_ids()) else {
        return Vec::new();
    };
    ids.into_iter()
        .filter_map(|id| best_effort(format!("node {}", id), provider.node(id)))
        .collect()
}

/// Every layer, or an empty list when the layer manager cannot be read.
pub fn readable_layers<P: SceneProvider + ?Sized>(provider: &P) -> Vec<Layer> {
    best_effort("layer enumeration", provider.layers()).unwrap_or_default()
}
