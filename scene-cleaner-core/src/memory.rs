//! In-memory scene document backed by a JSON file format.
//!
//! Used by the CLI as its host and by tests as the substitute provider.
//! Transactions snapshot the document and committed ones land on a bounded
//! undo history, so one cleanup group reverts with a single [`MemoryScene::undo`].

use crate::provider::{SceneError, SceneProvider, SceneResult};
use crate::scene::{Layer, LayerId, NodeId, NodeKind, SceneNode, TextureId, TextureReference, Transform};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Undo steps kept per document
pub const UNDO_HISTORY_SIZE: usize = 32;

/// Base object class produced by [`SceneProvider::convert_to_poly`]
pub const POLY_BASE_OBJECT: &str = "Editable_Poly";

/// Modifier pushed by [`SceneProvider::reset_xform`]
pub const XFORM_MODIFIER: &str = "XForm";

/// A bitmap slot of a material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bitmap {
    pub id: TextureId,
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    #[serde(default)]
    pub bitmaps: Vec<Bitmap>,
}

/// On-disk scene document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(default)]
    pub nodes: Vec<SceneNode>,
    #[serde(default)]
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub current_layer: Option<LayerId>,
    #[serde(default)]
    pub materials: Vec<Material>,
}

impl Default for SceneDocument {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            layers: vec![Layer::new(0, "0")],
            current_layer: Some(LayerId(0)),
            materials: Vec::new(),
        }
    }
}

impl SceneDocument {
    /// Make sure a default layer exists and the current layer points somewhere valid.
    fn normalize(&mut self) {
        if !self.layers.iter().any(Layer::is_default) {
            let id = self.layers.iter().map(|l| l.id.0 + 1).max().unwrap_or(0);
            self.layers.insert(0, Layer::new(id, "0"));
        }
        let current_valid = self
            .current_layer
            .map_or(false, |c| self.layers.iter().any(|l| l.id == c));
        if !current_valid {
            self.current_layer = self.layers.iter().find(|l| l.is_default()).map(|l| l.id);
        }
    }
}

/// A committed transaction that can be reverted
#[derive(Debug, Clone)]
pub struct UndoEntry {
    pub label: String,
    pub timestamp: String,
    snapshot: SceneDocument,
}

/// Bounded undo history, newest first
#[derive(Debug, Clone)]
pub struct UndoHistory {
    pub max_size: usize,
    entries: Vec<UndoEntry>,
}

impl UndoHistory {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            entries: Vec::new(),
        }
    }

    /// Push an entry. Drops oldest if over max_size.
    fn push(&mut self, entry: UndoEntry) {
        self.entries.insert(0, entry);
        if self.entries.len() > self.max_size {
            self.entries.truncate(self.max_size);
        }
    }

    fn pop(&mut self) -> Option<UndoEntry> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    /// Labels of the last N entries (newest first)
    pub fn labels(&self, limit: usize) -> Vec<String> {
        self.entries.iter().take(limit).map(|e| e.label.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

struct OpenTransaction {
    label: String,
    snapshot: SceneDocument,
}

/// Scene Provider holding the whole document in memory
pub struct MemoryScene {
    doc: SceneDocument,
    history: UndoHistory,
    open: Option<OpenTransaction>,
    path: Option<PathBuf>,
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryScene {
    /// Empty document with only the default layer "0".
    pub fn new() -> Self {
        Self::from_document(SceneDocument::default())
    }

    pub fn from_document(mut doc: SceneDocument) -> Self {
        doc.normalize();
        Self {
            doc,
            history: UndoHistory::new(UNDO_HISTORY_SIZE),
            open: None,
            path: None,
        }
    }

    pub fn document(&self) -> &SceneDocument {
        &self.doc
    }

    /// Path of the last loaded or saved document
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    /// Id of the default layer
    pub fn default_layer(&self) -> LayerId {
        self.doc
            .layers
            .iter()
            .find(|l| l.is_default())
            .map(|l| l.id)
            .unwrap_or(LayerId(0))
    }

    pub fn add_layer(&mut self, name: impl Into<String>) -> LayerId {
        let id = LayerId(self.doc.layers.iter().map(|l| l.id.0 + 1).max().unwrap_or(0));
        self.doc.layers.push(Layer {
            id,
            name: name.into(),
        });
        id
    }

    /// Add a node on the default layer and return a mutable handle for further setup.
    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind) -> &mut SceneNode {
        let id = self.doc.nodes.iter().map(|n| n.id.0 + 1).max().unwrap_or(1);
        let layer = self.default_layer();
        let mut node = SceneNode::new(id, name, kind, layer);
        if kind == NodeKind::Geometry {
            node.base_object = "Box".to_string();
        }
        self.doc.nodes.push(node);
        let last = self.doc.nodes.len() - 1;
        &mut self.doc.nodes[last]
    }

    pub fn add_material(&mut self, name: impl Into<String>) {
        self.doc.materials.push(Material {
            name: name.into(),
            bitmaps: Vec::new(),
        });
    }

    /// Add a bitmap to the named material, creating the material if needed.
    pub fn add_bitmap(
        &mut self,
        material: &str,
        bitmap: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> TextureId {
        let id = TextureId(
            self.doc
                .materials
                .iter()
                .flat_map(|m| m.bitmaps.iter())
                .map(|b| b.id.0 + 1)
                .max()
                .unwrap_or(1),
        );
        if !self.doc.materials.iter().any(|m| m.name == material) {
            self.add_material(material);
        }
        if let Some(m) = self.doc.materials.iter_mut().find(|m| m.name == material) {
            m.bitmaps.push(Bitmap {
                id,
                name: bitmap.into(),
                path: path.into(),
            });
        }
        id
    }

    pub fn find_node(&self, name: &str) -> Option<&SceneNode> {
        self.doc.nodes.iter().find(|n| n.name == name)
    }

    pub fn bitmap(&self, id: TextureId) -> Option<&Bitmap> {
        self.doc
            .materials
            .iter()
            .flat_map(|m| m.bitmaps.iter())
            .find(|b| b.id == id)
    }

    /// Revert the most recent committed transaction. Returns its label.
    pub fn undo(&mut self) -> Option<String> {
        let entry = self.history.pop()?;
        self.doc = entry.snapshot;
        Some(entry.label)
    }

    fn node_mut(&mut self, id: NodeId) -> SceneResult<&mut SceneNode> {
        self.doc
            .nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(SceneError::NodeNotFound(id))
    }
}

impl SceneProvider for MemoryScene {
    fn load_document(&mut self, path: &Path) -> SceneResult<()> {
        let bytes = std::fs::read(path).map_err(|e| SceneError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut doc: SceneDocument = serde_json::from_slice(&bytes).map_err(|e| SceneError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        doc.normalize();
        self.doc = doc;
        self.history.clear();
        self.open = None;
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    fn save_document(&mut self, path: &Path) -> SceneResult<()> {
        let save_err = |reason: String| SceneError::Save {
            path: path.to_path_buf(),
            reason,
        };
        let json = serde_json::to_string_pretty(&self.doc).map_err(|e| save_err(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| save_err(e.to_string()))?;
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    fn node_ids(&self) -> SceneResult<Vec<NodeId>> {
        Ok(self.doc.nodes.iter().map(|n| n.id).collect())
    }

    fn node(&self, id: NodeId) -> SceneResult<SceneNode> {
        self.doc
            .nodes
            .iter()
            .find(|n| n.id == id)
            .cloned()
            .ok_or(SceneError::NodeNotFound(id))
    }

    fn layers(&self) -> SceneResult<Vec<Layer>> {
        Ok(self.doc.layers.clone())
    }

    fn current_layer(&self) -> SceneResult<LayerId> {
        self.doc
            .current_layer
            .ok_or_else(|| SceneError::Host("no current layer".to_string()))
    }

    fn set_current_layer(&mut self, id: LayerId) -> SceneResult<()> {
        if !self.doc.layers.iter().any(|l| l.id == id) {
            return Err(SceneError::LayerNotFound(id));
        }
        self.doc.current_layer = Some(id);
        Ok(())
    }

    fn delete_node(&mut self, id: NodeId) -> SceneResult<()> {
        let before = self.doc.nodes.len();
        self.doc.nodes.retain(|n| n.id != id);
        if self.doc.nodes.len() == before {
            return Err(SceneError::NodeNotFound(id));
        }
        Ok(())
    }

    fn delete_layer(&mut self, id: LayerId) -> SceneResult<()> {
        let layer = self
            .doc
            .layers
            .iter()
            .find(|l| l.id == id)
            .cloned()
            .ok_or(SceneError::LayerNotFound(id))?;
        // Same refusals as the host layer manager: default, current, or populated layers stay.
        if layer.is_default()
            || self.doc.current_layer == Some(id)
            || self.doc.nodes.iter().any(|n| n.layer == id)
        {
            return Err(SceneError::LayerNotDeletable(layer.name));
        }
        self.doc.layers.retain(|l| l.id != id);
        Ok(())
    }

    fn material_count(&self) -> SceneResult<usize> {
        Ok(self.doc.materials.len())
    }

    fn texture_refs(&self) -> SceneResult<Vec<TextureReference>> {
        Ok(self
            .doc
            .materials
            .iter()
            .flat_map(|m| {
                m.bitmaps.iter().map(move |b| TextureReference {
                    id: b.id,
                    owner: b.name.clone(),
                    material: m.name.clone(),
                    path: b.path.clone(),
                })
            })
            .collect())
    }

    fn set_texture_path(&mut self, id: TextureId, path: &Path) -> SceneResult<()> {
        let bitmap = self
            .doc
            .materials
            .iter_mut()
            .flat_map(|m| m.bitmaps.iter_mut())
            .find(|b| b.id == id)
            .ok_or(SceneError::TextureNotFound(id))?;
        bitmap.path = path.to_path_buf();
        Ok(())
    }

    fn reset_xform(&mut self, id: NodeId) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        node.modifiers.insert(0, XFORM_MODIFIER.to_string());
        node.transform = Transform::IDENTITY;
        Ok(())
    }

    fn collapse_stack(&mut self, id: NodeId) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        node.modifiers.clear();
        Ok(())
    }

    fn convert_to_poly(&mut self, id: NodeId) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        if node.kind != NodeKind::Geometry {
            return Err(SceneError::Host(format!(
                "{} is not geometry and cannot be converted",
                node.name
            )));
        }
        node.base_object = POLY_BASE_OBJECT.to_string();
        Ok(())
    }

    fn begin_transaction(&mut self, label: &str) -> SceneResult<()> {
        if let Some(open) = &self.open {
            return Err(SceneError::Transaction {
                label: label.to_string(),
                reason: format!("transaction '{}' is still open", open.label),
            });
        }
        self.open = Some(OpenTransaction {
            label: label.to_string(),
            snapshot: self.doc.clone(),
        });
        Ok(())
    }

    fn commit_transaction(&mut self) -> SceneResult<()> {
        let open = self.open.take().ok_or_else(|| SceneError::Transaction {
            label: String::new(),
            reason: "no open transaction".to_string(),
        })?;
        self.history.push(UndoEntry {
            label: open.label,
            timestamp: Utc::now().to_rfc3339(),
            snapshot: open.snapshot,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::with_transaction;

    #[test]
    fn new_scene_has_default_layer_as_current() {
        let scene = MemoryScene::new();
        let layers = scene.layers().unwrap();
        assert_eq!(layers.len(), 1);
        assert!(layers[0].is_default());
        assert_eq!(scene.current_layer().unwrap(), layers[0].id);
    }

    #[test]
    fn transaction_reverts_as_one_step() {
        let mut scene = MemoryScene::new();
        scene.add_node("a", NodeKind::Geometry);
        scene.add_node("b", NodeKind::Helper);
        let ids = scene.node_ids().unwrap();

        with_transaction(&mut scene, "delete all", |s| {
            for id in &ids {
                s.delete_node(*id).unwrap();
            }
        })
        .unwrap();
        assert!(scene.node_ids().unwrap().is_empty());

        assert_eq!(scene.undo().as_deref(), Some("delete all"));
        assert_eq!(scene.node_ids().unwrap().len(), 2);
        assert!(scene.history().is_empty());
    }

    #[test]
    fn nested_transaction_is_refused() {
        let mut scene = MemoryScene::new();
        scene.begin_transaction("outer").unwrap();
        assert!(matches!(
            scene.begin_transaction("inner"),
            Err(SceneError::Transaction { .. })
        ));
    }

    #[test]
    fn history_is_bounded() {
        let mut history = UndoHistory::new(2);
        for i in 0..3 {
            history.push(UndoEntry {
                label: format!("step{}", i),
                timestamp: String::new(),
                snapshot: SceneDocument::default(),
            });
        }
        assert_eq!(history.labels(10), vec!["step2", "step1"]);
    }

    #[test]
    fn delete_layer_refuses_default_current_and_populated() {
        let mut scene = MemoryScene::new();
        let default = scene.default_layer();
        let props = scene.add_layer("props");
        let lights = scene.add_layer("lights");
        scene.add_node("lamp", NodeKind::Light).layer = lights;

        assert!(scene.delete_layer(default).is_err());
        assert!(scene.delete_layer(lights).is_err());
        scene.set_current_layer(props).unwrap();
        assert!(scene.delete_layer(props).is_err());
        scene.set_current_layer(default).unwrap();
        assert!(scene.delete_layer(props).is_ok());
    }

    #[test]
    fn save_and_load_roundtrip_through_json() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("shot.scene");

        let mut scene = MemoryScene::new();
        scene.add_node("Box01", NodeKind::Geometry).hidden = true;
        scene.add_bitmap("Wood", "wood_diffuse", "/maps/wood.png");
        scene.save_document(&path).unwrap();

        let mut loaded = MemoryScene::new();
        loaded.load_document(&path).unwrap();
        assert_eq!(loaded.document(), scene.document());
        assert_eq!(loaded.path(), Some(path.as_path()));
    }

    #[test]
    fn load_rejects_malformed_document() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.scene");
        std::fs::write(&path, "{ not json").unwrap();

        let mut scene = MemoryScene::new();
        assert!(matches!(scene.load_document(&path), Err(SceneError::Load { .. })));
    }

    #[test]
    fn load_inserts_missing_default_layer() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nolayers.scene");
        std::fs::write(&path, r#"{"layers": [{"id": 3, "name": "props"}]}"#).unwrap();

        let mut scene = MemoryScene::new();
        scene.load_document(&path).unwrap();
        let layers = scene.layers().unwrap();
        assert!(layers.iter().any(Layer::is_default));
        assert_eq!(scene.current_layer().unwrap(), scene.default_layer());
    }

    #[test]
    fn reset_xform_then_collapse_leaves_clean_poly() {
        let mut scene = MemoryScene::new();
        let node = scene.add_node("Box01", NodeKind::Geometry);
        node.transform = Transform::from_position([5.0, 0.0, 0.0]);
        node.modifiers = vec!["Bend".into()];
        let id = node.id;

        scene.reset_xform(id).unwrap();
        assert_eq!(scene.node(id).unwrap().modifier_count(), 2);
        scene.collapse_stack(id).unwrap();
        scene.convert_to_poly(id).unwrap();

        let node = scene.node(id).unwrap();
        assert_eq!(node.transform, Transform::IDENTITY);
        assert_eq!(node.modifier_count(), 0);
        assert_eq!(node.base_object, POLY_BASE_OBJECT);
    }
}
