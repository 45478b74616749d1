//! Read-only scan rules.
//!
//! Rules run in a fixed order and their findings are concatenated. A rule
//! never mutates the scene, and a node that cannot be read is skipped rather
//! than aborting the rule.

use crate::entry::{Entry, IssueEntry};
use crate::options::Options;
use crate::provider::{best_effort, readable_layers, readable_nodes, SceneProvider};
use crate::scene::{Layer, NodeKind, SceneNode};

/// Position tolerance against the origin
pub const POSITION_TOLERANCE: f64 = 1e-3;
/// Rotation tolerance in Euler degrees
pub const ROTATION_TOLERANCE_DEG: f64 = 1e-2;
/// Scale tolerance against (1, 1, 1)
pub const SCALE_TOLERANCE: f64 = 1e-3;
/// Modifier stacks deeper than this are worth collapsing
pub const MAX_MODIFIERS: usize = 8;
/// Above this many scene materials the count becomes a warning
pub const HIGH_MATERIAL_COUNT: usize = 50;

/// One scan pass over the scene
pub trait ScanRule {
    /// Unique identifier for this rule
    fn id(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Whether the rule runs under these options
    fn enabled(&self, _options: &Options) -> bool {
        true
    }

    /// Findings, in node/layer order
    fn scan(&self, scene: &dyn SceneProvider) -> Vec<IssueEntry>;
}

/// Runs scan rules in registration order
pub struct Scanner {
    rules: Vec<Box<dyn ScanRule>>,
}

impl Scanner {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule<R: ScanRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    pub fn scan(&self, options: &Options, scene: &dyn SceneProvider) -> Vec<IssueEntry> {
        self.rules
            .iter()
            .filter(|r| r.enabled(options))
            .flat_map(|r| {
                let found = r.scan(scene);
                log::debug!("scan rule {}: {} finding(s)", r.id(), found.len());
                found
            })
            .collect()
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
            .with_rule(TransformRule)
            .with_rule(HiddenObjectRule)
            .with_rule(FrozenObjectRule)
            .with_rule(EmptyLayerRule)
            .with_rule(MaterialCountRule)
            .with_rule(NamingRule)
    }
}

/// Scan the scene with the default rule set.
pub fn scan(options: &Options, scene: &dyn SceneProvider) -> Vec<IssueEntry> {
    Scanner::default().scan(options, scene)
}

/// Nodes with the hidden flag set
pub fn hidden_nodes(scene: &dyn SceneProvider) -> Vec<SceneNode> {
    readable_nodes(scene).into_iter().filter(|n| n.hidden).collect()
}

/// Nodes with the frozen flag set, of any kind
pub fn frozen_nodes(scene: &dyn SceneProvider) -> Vec<SceneNode> {
    readable_nodes(scene).into_iter().filter(|n| n.frozen).collect()
}

/// Frozen nodes of the helper kind
pub fn frozen_helpers(scene: &dyn SceneProvider) -> Vec<SceneNode> {
    frozen_nodes(scene)
        .into_iter()
        .filter(|n| n.kind == NodeKind::Helper)
        .collect()
}

/// Non-default layers with no member node.
///
/// Membership is recounted from every node's layer reference on each call;
/// the provider's own bookkeeping is never consulted.
pub fn empty_layers(scene: &dyn SceneProvider) -> Vec<Layer> {
    let layers = readable_layers(scene);
    let nodes = readable_nodes(scene);
    layers
        .into_iter()
        .filter(|layer| !layer.is_default())
        .filter(|layer| !nodes.iter().any(|n| n.layer == layer.id))
        .collect()
}

/// Total modifier count over every geometry node
pub fn geometry_modifier_count(scene: &dyn SceneProvider) -> usize {
    readable_nodes(scene)
        .iter()
        .filter(|n| n.kind == NodeKind::Geometry)
        .map(SceneNode::modifier_count)
        .sum()
}

fn out_of_tolerance(values: &[f64], target: f64, tolerance: f64) -> bool {
    values.iter().any(|v| (v - target).abs() > tolerance)
}

fn fmt_vec3(v: [f64; 3], precision: usize) -> String {
    format!(
        "({:.p$}, {:.p$}, {:.p$})",
        v[0],
        v[1],
        v[2],
        p = precision
    )
}

/// Rule: unreset transforms and deep modifier stacks
pub struct TransformRule;

impl ScanRule for TransformRule {
    fn id(&self) -> &str {
        "transform"
    }

    fn description(&self) -> &str {
        "Position at origin, zero rotation, unit scale, shallow modifier stack"
    }

    fn scan(&self, scene: &dyn SceneProvider) -> Vec<IssueEntry> {
        let mut out = Vec::new();
        for node in readable_nodes(scene) {
            if node.kind == NodeKind::Target {
                continue;
            }
            let t = &node.transform;
            if out_of_tolerance(&t.position, 0.0, POSITION_TOLERANCE) {
                out.push(Entry::warning(
                    &node.name,
                    format!("Position not at origin: {}", fmt_vec3(t.position, 3)),
                ));
            }
            let euler = t.euler_degrees();
            if out_of_tolerance(&euler, 0.0, ROTATION_TOLERANCE_DEG) {
                out.push(Entry::warning(
                    &node.name,
                    format!("Rotation not zero: {} deg", fmt_vec3(euler, 2)),
                ));
            }
            if out_of_tolerance(&t.scale, 1.0, SCALE_TOLERANCE) {
                out.push(Entry::warning(
                    &node.name,
                    format!("Scale not unit: {}", fmt_vec3(t.scale, 3)),
                ));
            }
            if node.modifier_count() > MAX_MODIFIERS {
                out.push(Entry::info(
                    &node.name,
                    format!(
                        "Modifier stack has {} modifiers; consider collapsing",
                        node.modifier_count()
                    ),
                ));
            }
        }
        out
    }
}

/// Rule: hidden objects
pub struct HiddenObjectRule;

impl ScanRule for HiddenObjectRule {
    fn id(&self) -> &str {
        "hidden_objects"
    }

    fn description(&self) -> &str {
        "Hidden objects that a cleanup would delete"
    }

    fn enabled(&self, options: &Options) -> bool {
        options.delete_hidden
    }

    fn scan(&self, scene: &dyn SceneProvider) -> Vec<IssueEntry> {
        hidden_nodes(scene)
            .into_iter()
            .map(|n| Entry::info(n.name, "Hidden object"))
            .collect()
    }
}

/// Rule: frozen helpers and other frozen objects
pub struct FrozenObjectRule;

impl ScanRule for FrozenObjectRule {
    fn id(&self) -> &str {
        "frozen_objects"
    }

    fn description(&self) -> &str {
        "Frozen objects; frozen helpers are deletion candidates"
    }

    fn enabled(&self, options: &Options) -> bool {
        options.delete_frozen_helpers
    }

    fn scan(&self, scene: &dyn SceneProvider) -> Vec<IssueEntry> {
        frozen_nodes(scene)
            .into_iter()
            .map(|n| {
                let msg = if n.kind == NodeKind::Helper {
                    "Frozen helper"
                } else {
                    "Frozen object"
                };
                Entry::info(n.name, msg)
            })
            .collect()
    }
}

/// Rule: layers without members
pub struct EmptyLayerRule;

impl ScanRule for EmptyLayerRule {
    fn id(&self) -> &str {
        "empty_layers"
    }

    fn description(&self) -> &str {
        "Layers other than the default layer with no member nodes"
    }

    fn enabled(&self, options: &Options) -> bool {
        options.delete_empty_layers
    }

    fn scan(&self, scene: &dyn SceneProvider) -> Vec<IssueEntry> {
        empty_layers(scene)
            .into_iter()
            .map(|l| Entry::info(l.name, "Empty layer"))
            .collect()
    }
}

/// Material-count heuristic. No reachability analysis: a count is all it reports.
pub(crate) fn material_count_issues(scene: &dyn SceneProvider) -> Vec<IssueEntry> {
    match best_effort("material collection", scene.material_count()) {
        Some(count) if count > HIGH_MATERIAL_COUNT => vec![Entry::warning(
            "Scene",
            format!("High scene material count: {}", count),
        )],
        Some(count) if count > 0 => {
            vec![Entry::info("Scene", format!("Scene materials: {}", count))]
        }
        _ => Vec::new(),
    }
}

/// Rule: scene material count
pub struct MaterialCountRule;

impl ScanRule for MaterialCountRule {
    fn id(&self) -> &str {
        "material_count"
    }

    fn description(&self) -> &str {
        "Best-effort material count; high counts hint at unused materials"
    }

    fn enabled(&self, options: &Options) -> bool {
        options.remove_unused_materials
    }

    fn scan(&self, scene: &dyn SceneProvider) -> Vec<IssueEntry> {
        material_count_issues(scene)
    }
}

/// Rule: node naming conventions
pub struct NamingRule;

impl ScanRule for NamingRule {
    fn id(&self) -> &str {
        "naming"
    }

    fn description(&self) -> &str {
        "Node names should be lower-case without spaces"
    }

    fn scan(&self, scene: &dyn SceneProvider) -> Vec<IssueEntry> {
        let mut out = Vec::new();
        for node in readable_nodes(scene) {
            if node.name.contains(' ') {
                out.push(Entry::warning(&node.name, "Name contains spaces"));
            }
            if node.name.chars().any(char::is_uppercase) {
                out.push(Entry::info(&node.name, "Name contains uppercase characters"));
            }
        }
        out
    }
}
