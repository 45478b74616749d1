//! Read-only material and texture audit.
//!
//! Cheaper than a full scan: only the material count heuristic and the
//! missing-texture check run. Any collection that cannot be read counts as
//! having nothing to report.

use crate::entry::{Entry, IssueEntry};
use crate::provider::SceneProvider;
use crate::relink::missing_textures;
use crate::scan::material_count_issues;

pub fn audit_materials(scene: &dyn SceneProvider) -> Vec<IssueEntry> {
    let mut results = material_count_issues(scene);

    let missing = missing_textures(scene);
    if missing.is_empty() {
        results.push(Entry::info("Textures", "No missing texture references detected."));
    }
    for texture in missing {
        results.push(Entry::warning(
            texture.owner,
            format!("Missing texture: {}", texture.path.display()),
        ));
    }
    results
}
