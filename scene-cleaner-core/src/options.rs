//! Switches controlling which scan rules and cleanup groups run.
//!
//! Unknown keys are ignored. Missing keys take the defaults below:
//! transform normalization is on, every destructive or heuristic check is off.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Recognized option flags, in report order
pub const OPTION_FLAGS: &[&str] = &[
    "reset_xform",
    "collapse_stack",
    "delete_hidden",
    "delete_frozen_helpers",
    "delete_empty_layers",
    "remove_unused_materials",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub reset_xform: bool,
    pub collapse_stack: bool,
    pub delete_hidden: bool,
    pub delete_frozen_helpers: bool,
    pub delete_empty_layers: bool,
    pub remove_unused_materials: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            reset_xform: true,
            collapse_stack: true,
            delete_hidden: false,
            delete_frozen_helpers: false,
            delete_empty_layers: false,
            remove_unused_materials: false,
        }
    }
}

/// Options file layout: flags at top level or under an `[options]` table
#[derive(Debug, Deserialize)]
struct OptionsFile {
    options: Option<Options>,
    #[serde(flatten)]
    top_level: Options,
}

impl Options {
    /// Every flag disabled
    pub fn none() -> Self {
        Self {
            reset_xform: false,
            collapse_stack: false,
            delete_hidden: false,
            delete_frozen_helpers: false,
            delete_empty_layers: false,
            remove_unused_materials: false,
        }
    }

    /// Every flag enabled
    pub fn all() -> Self {
        Self {
            reset_xform: true,
            collapse_stack: true,
            delete_hidden: true,
            delete_frozen_helpers: true,
            delete_empty_layers: true,
            remove_unused_materials: true,
        }
    }

    /// Build from a plain flag map. Unknown keys are ignored, missing keys keep defaults.
    pub fn from_map(map: &HashMap<String, bool>) -> Self {
        let mut options = Self::default();
        for (key, value) in map {
            options.set(key, *value);
        }
        options
    }

    /// Load from a TOML (`.toml`) or JSON file.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case("toml"));
        if is_toml {
            let file: OptionsFile = toml::from_str(&text)?;
            Ok(file.options.unwrap_or(file.top_level))
        } else {
            let file: OptionsFile = serde_json::from_str(&text)?;
            Ok(file.options.unwrap_or(file.top_level))
        }
    }

    /// Set a flag by name. Returns false for an unknown flag.
    pub fn set(&mut self, flag: &str, value: bool) -> bool {
        match flag {
            "reset_xform" => self.reset_xform = value,
            "collapse_stack" => self.collapse_stack = value,
            "delete_hidden" => self.delete_hidden = value,
            "delete_frozen_helpers" => self.delete_frozen_helpers = value,
            "delete_empty_layers" => self.delete_empty_layers = value,
            "remove_unused_materials" => self.remove_unused_materials = value,
            _ => return false,
        }
        true
    }

    pub fn get(&self, flag: &str) -> Option<bool> {
        match flag {
            "reset_xform" => Some(self.reset_xform),
            "collapse_stack" => Some(self.collapse_stack),
            "delete_hidden" => Some(self.delete_hidden),
            "delete_frozen_helpers" => Some(self.delete_frozen_helpers),
            "delete_empty_layers" => Some(self.delete_empty_layers),
            "remove_unused_materials" => Some(self.remove_unused_materials),
            _ => None,
        }
    }

    /// Snapshot as a flag map (the report's `options` object), sorted by name
    pub fn to_map(&self) -> BTreeMap<String, bool> {
        OPTION_FLAGS
            .iter()
            .filter_map(|f| self.get(f).map(|v| (f.to_string(), v)))
            .collect()
    }

    /// Names of enabled flags
    pub fn enabled(&self) -> Vec<&'static str> {
        OPTION_FLAGS
            .iter()
            .copied()
            .filter(|f| self.get(f) == Some(true))
            .collect()
    }

    pub fn transforms_enabled(&self) -> bool {
        self.reset_xform || self.collapse_stack
    }

    pub fn deletions_enabled(&self) -> bool {
        self.delete_hidden || self.delete_frozen_helpers || self.delete_empty_layers
    }
}
