//! Mutating cleanup groups.
//!
//! Group A normalizes geometry transforms, group B deletes hidden objects,
//! frozen helpers and empty layers. Each group runs inside one transaction so
//! the host reverts it in a single undo step, and reports before/after counts
//! taken with the same queries the scan rules use.

use crate::entry::{ActionEntry, Entry};
use crate::options::Options;
use crate::provider::{best_effort, readable_layers, readable_nodes, with_transaction, SceneProvider};
use crate::scan::{empty_layers, frozen_helpers, geometry_modifier_count, hidden_nodes};
use crate::scene::{NodeId, NodeKind};

/// Undo label of the transform group
pub const TRANSFORM_UNDO_LABEL: &str = "SceneCleaner_TransformFixes";
/// Undo label of the deletion group
pub const CLEANUP_UNDO_LABEL: &str = "SceneCleaner_SceneCleanup";

/// Run group A then group B.
pub fn clean(options: &Options, scene: &mut dyn SceneProvider) -> Vec<ActionEntry> {
    let mut actions = clean_transforms(options, scene);
    actions.extend(clean_scene(options, scene));
    actions
}

/// Group A: reset transforms and collapse modifier stacks on every geometry node.
pub fn clean_transforms(options: &Options, scene: &mut dyn SceneProvider) -> Vec<ActionEntry> {
    if !options.transforms_enabled() {
        return Vec::new();
    }

    let geometry: Vec<NodeId> = readable_nodes(&*scene)
        .into_iter()
        .filter(|n| n.kind == NodeKind::Geometry)
        .map(|n| n.id)
        .collect();
    if geometry.is_empty() {
        return Vec::new();
    }

    let before = geometry_modifier_count(&*scene);

    let result = with_transaction(&mut *scene, TRANSFORM_UNDO_LABEL, |s| {
        let mut changed = 0usize;
        for &id in &geometry {
            let mut ok = true;
            if options.reset_xform {
                ok &= best_effort(format!("reset xform on {}", id), s.reset_xform(id)).is_some();
            }
            if options.collapse_stack {
                ok &= best_effort(format!("collapse stack on {}", id), s.collapse_stack(id)).is_some();
                ok &= best_effort(format!("convert {} to poly", id), s.convert_to_poly(id)).is_some();
            }
            if ok {
                changed += 1;
            }
        }
        changed
    });

    let changed = match result {
        Ok(changed) => changed,
        Err(e) => {
            log::warn!("transform cleanup failed: {}", e);
            return vec![Entry::warning("Scene", format!("Transform cleanup failed: {}", e))];
        }
    };
    log::info!("cleaned {} of {} geometry node(s)", changed, geometry.len());

    scene.redraw();
    let after = geometry_modifier_count(&*scene);

    vec![
        Entry::info("Scene", "Transform cleanup completed (geometry set)"),
        Entry::info(
            "Scene",
            format!("Modifiers on geometry (before -> after): {} -> {}", before, after),
        ),
    ]
}

/// Counts of the deletion targets, zero for disabled checks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TargetCounts {
    hidden: usize,
    frozen_helpers: usize,
    empty_layers: usize,
}

impl TargetCounts {
    fn take(options: &Options, scene: &dyn SceneProvider) -> Self {
        Self {
            hidden: if options.delete_hidden { hidden_nodes(scene).len() } else { 0 },
            frozen_helpers: if options.delete_frozen_helpers {
                frozen_helpers(scene).len()
            } else {
                0
            },
            empty_layers: if options.delete_empty_layers {
                empty_layers(scene).len()
            } else {
                0
            },
        }
    }
}

/// Group B: delete hidden objects, frozen helpers and empty layers.
pub fn clean_scene(options: &Options, scene: &mut dyn SceneProvider) -> Vec<ActionEntry> {
    if !options.deletions_enabled() {
        return Vec::new();
    }

    let before = TargetCounts::take(options, &*scene);

    let result = with_transaction(&mut *scene, CLEANUP_UNDO_LABEL, |s| {
        let mut deleted = TargetCounts::default();
        if options.delete_hidden {
            for node in hidden_nodes(&*s) {
                if best_effort(format!("delete {}", node.name), s.delete_node(node.id)).is_some() {
                    deleted.hidden += 1;
                }
            }
        }
        if options.delete_frozen_helpers {
            for node in frozen_helpers(&*s) {
                if best_effort(format!("delete {}", node.name), s.delete_node(node.id)).is_some() {
                    deleted.frozen_helpers += 1;
                }
            }
        }
        if options.delete_empty_layers {
            deleted.empty_layers = delete_empty_layers(s);
        }
        deleted
    });

    let deleted = match result {
        Ok(deleted) => deleted,
        Err(e) => {
            log::warn!("scene cleanup failed: {}", e);
            return vec![Entry::warning("Scene", format!("Cleanup failed: {}", e))];
        }
    };
    log::info!(
        "cleanup deleted hidden={} frozen_helpers={} empty_layers={}",
        deleted.hidden,
        deleted.frozen_helpers,
        deleted.empty_layers
    );

    scene.redraw();
    let after = TargetCounts::take(options, &*scene);

    let mut actions = Vec::new();
    if options.delete_hidden {
        actions.push(Entry::info(
            "Scene",
            format!("Hidden objects: {} -> {}", before.hidden, after.hidden),
        ));
    }
    if options.delete_frozen_helpers {
        actions.push(Entry::info(
            "Scene",
            format!("Frozen helpers: {} -> {}", before.frozen_helpers, after.frozen_helpers),
        ));
    }
    if options.delete_empty_layers {
        actions.push(Entry::info(
            "Scene",
            format!("Empty layers: {} -> {}", before.empty_layers, after.empty_layers),
        ));
    }
    actions
}

/// Delete every non-default layer without members, last layer first.
/// Returns how many were deleted.
fn delete_empty_layers(scene: &mut dyn SceneProvider) -> usize {
    let layers = readable_layers(&*scene);
    let default = layers.iter().find(|l| l.is_default()).map(|l| l.id);
    if let Some(default) = default {
        best_effort("switch to default layer", scene.set_current_layer(default));
    }

    let mut deleted = 0;
    for layer in layers.iter().rev() {
        if layer.is_default() {
            continue;
        }
        let members = readable_nodes(&*scene)
            .iter()
            .filter(|n| n.layer == layer.id)
            .count();
        if members > 0 {
            continue;
        }

        let is_current = best_effort("current layer", scene.current_layer()) == Some(layer.id);
        if is_current {
            if let Some(default) = default {
                best_effort("switch to default layer", scene.set_current_layer(default));
            }
        }

        if best_effort(format!("delete layer {}", layer.name), scene.delete_layer(layer.id)).is_some() {
            deleted += 1;
        }
    }
    deleted
}
