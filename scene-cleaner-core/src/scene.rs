//! Scene data model as seen through a [`SceneProvider`](crate::provider::SceneProvider).
//!
//! Nodes, layers and texture references are owned by the host document. The
//! engines only read these values, mutate transform/flag fields through the
//! provider, and request deletions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Stable node handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

/// Stable layer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub u64);

/// Stable texture (bitmap) handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextureId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Closed node category, resolved once when the provider enumerates nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Geometry,
    Helper,
    Light,
    Camera,
    /// Look-at target of a camera or light. Carries no transform of its own worth auditing.
    Target,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Geometry => "geometry",
            NodeKind::Helper => "helper",
            NodeKind::Light => "light",
            NodeKind::Camera => "camera",
            NodeKind::Target => "target",
        }
    }
}

/// Position, rotation (unit quaternion `[x, y, z, w]`) and scale of a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    #[serde(default)]
    pub position: [f64; 3],
    #[serde(default = "identity_rotation")]
    pub rotation: [f64; 4],
    #[serde(default = "unit_scale")]
    pub scale: [f64; 3],
}

fn identity_rotation() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn unit_scale() -> [f64; 3] {
    [1.0, 1.0, 1.0]
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        position: [0.0, 0.0, 0.0],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0, 1.0, 1.0],
    };

    pub fn from_position(position: [f64; 3]) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Rotation as XYZ Euler angles in degrees.
    pub fn euler_degrees(&self) -> [f64; 3] {
        let [x, y, z, w] = self.rotation;

        let sinr_cosp = 2.0 * (w * x + y * z);
        let cosr_cosp = 1.0 - 2.0 * (x * x + y * y);
        let roll = sinr_cosp.atan2(cosr_cosp);

        let sinp = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0);
        let pitch = sinp.asin();

        let siny_cosp = 2.0 * (w * z + x * y);
        let cosy_cosp = 1.0 - 2.0 * (y * y + z * z);
        let yaw = siny_cosp.atan2(cosy_cosp);

        [roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees()]
    }

    /// Build a rotation from XYZ Euler angles in degrees.
    pub fn with_euler_degrees(mut self, euler: [f64; 3]) -> Self {
        let (hr, hp, hy) = (
            euler[0].to_radians() * 0.5,
            euler[1].to_radians() * 0.5,
            euler[2].to_radians() * 0.5,
        );
        let (sr, cr) = hr.sin_cos();
        let (sp, cp) = hp.sin_cos();
        let (sy, cy) = hy.sin_cos();
        self.rotation = [
            sr * cp * cy - cr * sp * sy,
            cr * sp * cy + sr * cp * sy,
            cr * cp * sy - sr * sp * cy,
            cr * cp * cy + sr * sp * sy,
        ];
        self
    }

    pub fn with_scale(mut self, scale: [f64; 3]) -> Self {
        self.scale = scale;
        self
    }
}

/// One placeable object in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub frozen: bool,
    pub layer: LayerId,
    /// Modifier stack, top first
    #[serde(default)]
    pub modifiers: Vec<String>,
    /// Class of the base object under the modifier stack (e.g. "Box", "Editable_Poly")
    #[serde(default)]
    pub base_object: String,
}

impl SceneNode {
    pub fn new(id: u64, name: impl Into<String>, kind: NodeKind, layer: LayerId) -> Self {
        Self {
            id: NodeId(id),
            name: name.into(),
            kind,
            transform: Transform::IDENTITY,
            hidden: false,
            frozen: false,
            layer,
            modifiers: Vec::new(),
            base_object: String::new(),
        }
    }

    pub fn modifier_count(&self) -> usize {
        self.modifiers.len()
    }
}

/// Names a default layer may carry (compared lower-cased)
const DEFAULT_LAYER_NAMES: &[&str] = &["0", "default"];

/// Named organizational grouping of nodes.
///
/// Membership is never stored here; it is derived by scanning every node's
/// layer reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
}

impl Layer {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id: LayerId(id),
            name: name.into(),
        }
    }

    /// The default layer is never a deletion candidate.
    pub fn is_default(&self) -> bool {
        let lower = self.name.to_lowercase();
        DEFAULT_LAYER_NAMES.contains(&lower.as_str())
    }
}

/// Path stored on a bitmap of a material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureReference {
    pub id: TextureId,
    /// Bitmap name; used as the subject of report entries
    pub owner: String,
    /// Name of the material the bitmap belongs to
    pub material: String,
    pub path: PathBuf,
}

impl TextureReference {
    /// Missing iff the path does not resolve to an existing file right now.
    pub fn is_missing(&self) -> bool {
        !self.path.as_os_str().is_empty() && !self.path.is_file()
    }

    /// Lower-cased file name used for relink lookup
    pub fn basename_key(&self) -> Option<String> {
        // Hosts store Windows-style paths, which `Path::file_name` does not split on Unix.
        let s = self.path.to_string_lossy();
        s.rsplit(['\\', '/'])
            .next()
            .filter(|b| !b.is_empty())
            .map(str::to_lowercase)
    }
}
