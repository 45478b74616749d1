//! Fault-injecting provider for engine tests.

use crate::memory::MemoryScene;
use crate::provider::{SceneError, SceneProvider, SceneResult};
use crate::scene::{Layer, LayerId, NodeId, SceneNode, TextureId, TextureReference};
use std::collections::HashSet;
use std::path::Path;

/// Wraps a [`MemoryScene`] and fails selected calls.
#[derive(Default)]
pub struct FlakyScene {
    pub inner: MemoryScene,
    pub unreadable: HashSet<NodeId>,
    pub undeletable: HashSet<NodeId>,
    pub fail_transactions: bool,
    pub fail_materials: bool,
    pub fail_textures: bool,
    pub fail_layers: bool,
}

impl FlakyScene {
    pub fn new(inner: MemoryScene) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }
}

fn host(msg: &str) -> SceneError {
    SceneError::Host(msg.to_string())
}

impl SceneProvider for FlakyScene {
    fn load_document(&mut self, path: &Path) -> SceneResult<()> {
        self.inner.load_document(path)
    }

    fn save_document(&mut self, path: &Path) -> SceneResult<()> {
        self.inner.save_document(path)
    }

    fn node_ids(&self) -> SceneResult<Vec<NodeId>> {
        self.inner.node_ids()
    }

    fn node(&self, id: NodeId) -> SceneResult<SceneNode> {
        if self.unreadable.contains(&id) {
            return Err(SceneError::Unreadable {
                id,
                reason: "injected".to_string(),
            });
        }
        self.inner.node(id)
    }

    fn layers(&self) -> SceneResult<Vec<Layer>> {
        if self.fail_layers {
            return Err(host("layer manager unavailable"));
        }
        self.inner.layers()
    }

    fn current_layer(&self) -> SceneResult<LayerId> {
        self.inner.current_layer()
    }

    fn set_current_layer(&mut self, id: LayerId) -> SceneResult<()> {
        self.inner.set_current_layer(id)
    }

    fn delete_node(&mut self, id: NodeId) -> SceneResult<()> {
        if self.undeletable.contains(&id) {
            return Err(host("node is locked"));
        }
        self.inner.delete_node(id)
    }

    fn delete_layer(&mut self, id: LayerId) -> SceneResult<()> {
        self.inner.delete_layer(id)
    }

    fn material_count(&self) -> SceneResult<usize> {
        if self.fail_materials {
            return Err(host("material collection unavailable"));
        }
        self.inner.material_count()
    }

    fn texture_refs(&self) -> SceneResult<Vec<TextureReference>> {
        if self.fail_textures {
            return Err(host("bitmap collection unavailable"));
        }
        self.inner.texture_refs()
    }

    fn set_texture_path(&mut self, id: TextureId, path: &Path) -> SceneResult<()> {
        self.inner.set_texture_path(id, path)
    }

    fn reset_xform(&mut self, id: NodeId) -> SceneResult<()> {
        if self.unreadable.contains(&id) {
            return Err(host("node is locked"));
        }
        self.inner.reset_xform(id)
    }

    fn collapse_stack(&mut self, id: NodeId) -> SceneResult<()> {
        self.inner.collapse_stack(id)
    }

    fn convert_to_poly(&mut self, id: NodeId) -> SceneResult<()> {
        self.inner.convert_to_poly(id)
    }

    fn begin_transaction(&mut self, label: &str) -> SceneResult<()> {
        if self.fail_transactions {
            return Err(SceneError::Transaction {
                label: label.to_string(),
                reason: "host execution error".to_string(),
            });
        }
        self.inner.begin_transaction(label)
    }

    fn commit_transaction(&mut self) -> SceneResult<()> {
        self.inner.commit_transaction()
    }
}
