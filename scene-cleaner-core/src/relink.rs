//! Texture relink: repoint missing bitmap paths at files found under a search folder.

use crate::entry::{ActionEntry, Entry};
use crate::provider::{best_effort, with_transaction, SceneProvider};
use crate::scene::TextureReference;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Undo label of the relink pass
pub const RELINK_UNDO_LABEL: &str = "SceneCleaner_RelinkTextures";

/// Lower-cased file name → first path found under a search root.
///
/// On duplicate names the first file in walk order wins.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    files: HashMap<String, PathBuf>,
}

impl FileIndex {
    /// Walk `root` recursively. Unreadable entries are skipped.
    pub fn build(root: &Path) -> Self {
        let root = absolute(root);
        let mut files = HashMap::new();
        for entry in WalkDir::new(&root).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let key = entry.file_name().to_string_lossy().to_lowercase();
            files.entry(key).or_insert_with(|| entry.into_path());
        }
        log::debug!("indexed {} file name(s) under {}", files.len(), root.display());
        Self { files }
    }

    /// Case-insensitive lookup by file name
    pub fn get(&self, basename: &str) -> Option<&Path> {
        self.files.get(&basename.to_lowercase()).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Texture references whose path does not resolve to an existing file.
/// Empty when the bitmap collection cannot be read.
pub fn missing_textures(scene: &dyn SceneProvider) -> Vec<TextureReference> {
    best_effort("bitmap collection", scene.texture_refs())
        .unwrap_or_default()
        .into_iter()
        .filter(TextureReference::is_missing)
        .collect()
}

/// Relink every missing texture to a same-named file under `search_root`.
///
/// All rewrites of one call form a single undo step.
pub fn relink(search_root: &Path, scene: &mut dyn SceneProvider) -> Vec<ActionEntry> {
    if search_root.as_os_str().is_empty() || !search_root.is_dir() {
        return vec![Entry::warning("Relink", "Invalid search folder")];
    }

    let index = FileIndex::build(search_root);

    let missing = missing_textures(&*scene);
    if missing.is_empty() {
        return vec![Entry::info("Relink", "No missing texture references found.")];
    }

    let mut actions = Vec::new();
    let result = with_transaction(&mut *scene, RELINK_UNDO_LABEL, |s| {
        for texture in &missing {
            let Some(base) = texture.basename_key() else {
                continue;
            };
            match index.get(&base) {
                Some(new_path) => {
                    let rewritten = best_effort(
                        format!("relink {}", texture.owner),
                        s.set_texture_path(texture.id, new_path),
                    );
                    if rewritten.is_some() {
                        actions.push(Entry::info(
                            &texture.owner,
                            format!("Relinked to: {}", new_path.display()),
                        ));
                    }
                }
                None => {
                    actions.push(Entry::warning(
                        &texture.owner,
                        format!("Not found in folder: {}", base),
                    ));
                }
            }
        }
    });

    if let Err(e) = result {
        log::warn!("texture relink failed: {}", e);
        actions.push(Entry::warning("Relink", format!("Relink failed: {}", e)));
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Level;
    use crate::memory::MemoryScene;
    use crate::testing::FlakyScene;

    #[test]
    fn invalid_search_folder_fails_fast() {
        let mut scene = MemoryScene::new();
        scene.add_bitmap("Wood", "wood_diffuse", "/nowhere/wood.png");
        let actions = relink(Path::new("/definitely/not/here"), &mut scene);
        assert_eq!(actions, vec![Entry::warning("Relink", "Invalid search folder")]);
        assert!(scene.history().is_empty());
    }

    #[test]
    fn nothing_missing_is_one_info() {
        let tmp = tempfile::tempdir().unwrap();
        let mut scene = MemoryScene::new();
        let actions = relink(tmp.path(), &mut scene);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].level, Level::Info);
    }

    #[test]
    fn missing_texture_is_rewritten_to_found_file() {
        let tmp = tempfile::tempdir().unwrap();
        let sub = tmp.path().join("textures").join("sub");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join("wood.png"), b"png").unwrap();

        let mut scene = MemoryScene::new();
        let id = scene.add_bitmap("Wood", "wood_diffuse", "/old/project/maps/wood.png");

        let actions = relink(tmp.path(), &mut scene);
        let expected = sub.join("wood.png");
        assert_eq!(scene.bitmap(id).unwrap().path, expected);
        assert_eq!(
            actions,
            vec![Entry::info(
                "wood_diffuse",
                format!("Relinked to: {}", expected.display())
            )]
        );
        assert_eq!(scene.history().labels(1), vec![RELINK_UNDO_LABEL]);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("Brick_D.TGA"), b"tga").unwrap();

        let mut scene = MemoryScene::new();
        let id = scene.add_bitmap("Brick", "brick", r"C:\maps\brick_d.tga");
        relink(tmp.path(), &mut scene);
        assert_eq!(scene.bitmap(id).unwrap().path, tmp.path().join("Brick_D.TGA"));
    }

    #[test]
    fn unresolved_texture_warns_and_stays() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("stone.png"), b"png").unwrap();

        let mut scene = MemoryScene::new();
        let id = scene.add_bitmap("Wood", "wood_diffuse", "/old/maps/wood.png");
        let actions = relink(tmp.path(), &mut scene);
        assert_eq!(
            actions,
            vec![Entry::warning("wood_diffuse", "Not found in folder: wood.png")]
        );
        assert_eq!(scene.bitmap(id).unwrap().path, PathBuf::from("/old/maps/wood.png"));
    }

    #[test]
    fn existing_textures_are_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let present = tmp.path().join("metal.png");
        std::fs::write(&present, b"png").unwrap();

        let mut scene = MemoryScene::new();
        scene.add_bitmap("Metal", "metal", &present);
        assert!(missing_textures(&scene).is_empty());
    }

    #[test]
    fn transaction_failure_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let mut scene = MemoryScene::new();
        scene.add_bitmap("Wood", "wood_diffuse", "/old/maps/wood.png");
        let mut flaky = FlakyScene::new(scene);
        flaky.fail_transactions = true;

        let actions = relink(tmp.path(), &mut flaky);
        assert_eq!(actions.len(), 1);
        assert!(actions[0].message.starts_with("Relink failed"));
    }

    #[test]
    fn index_keeps_first_found_per_name() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("a")).unwrap();
        std::fs::write(tmp.path().join("a").join("wood.png"), b"1").unwrap();
        std::fs::write(tmp.path().join("WOOD.png"), b"2").unwrap();

        let index = FileIndex::build(tmp.path());
        assert_eq!(index.len(), 1);
        assert!(index.get("Wood.PNG").is_some());
    }
}
