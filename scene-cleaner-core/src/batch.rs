//! Batch cleanup over a folder of scene files.
//!
//! Files are processed one at a time through the single open document of the
//! provider: load, clean, save to the mirrored output path, write a per-file
//! report. A failure in one file is recorded on that file's result and never
//! stops the batch. The read-only scan is not part of a batch run.

use crate::clean::clean;
use crate::entry::{ActionEntry, Entry};
use crate::options::Options;
use crate::provider::SceneProvider;
use crate::report_export::write_json;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Scene file extension picked up by default (matched case-insensitively)
pub const DEFAULT_SCENE_EXTENSION: &str = "scene";
/// Subdirectory of the output folder receiving reports
pub const REPORTS_DIR: &str = "reports";
/// Aggregate summary file name
pub const SUMMARY_FILE: &str = "batch_summary.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Ok,
    Failed,
}

/// Result of one file of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    pub src_file: String,
    pub dst_file: String,
    pub status: JobStatus,
    pub errors: Vec<String>,
    pub actions: Vec<ActionEntry>,
}

impl BatchJob {
    fn new(src: &Path, dst: &Path) -> Self {
        Self {
            src_file: src.display().to_string(),
            dst_file: dst.display().to_string(),
            status: JobStatus::Ok,
            errors: Vec::new(),
            actions: Vec::new(),
        }
    }

    fn fail(&mut self, message: String, trace: String) {
        self.status = JobStatus::Failed;
        self.errors.push(message);
        self.errors.push(trace);
    }

    pub fn is_ok(&self) -> bool {
        self.status == JobStatus::Ok
    }
}

/// Outcome of one batch invocation
#[derive(Debug, Clone)]
pub struct BatchSummary {
    /// Per-file results, in processing order
    pub jobs: Vec<BatchJob>,
    /// Where the aggregate summary was written
    pub summary_path: PathBuf,
    /// Configuration problems found before any file was processed
    pub notices: Vec<ActionEntry>,
}

impl BatchSummary {
    pub fn ok_count(&self) -> usize {
        self.jobs.iter().filter(|j| j.is_ok()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.jobs.len() - self.ok_count()
    }
}

/// Drives the per-file load/clean/save/report cycle
pub struct BatchRunner {
    options: Options,
    extension: String,
    reports_dir: String,
}

impl BatchRunner {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            extension: DEFAULT_SCENE_EXTENSION.to_string(),
            reports_dir: REPORTS_DIR.to_string(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn with_reports_dir(mut self, dir: impl Into<String>) -> Self {
        self.reports_dir = dir.into();
        self
    }

    /// Scene files under `input_dir`, in directory-walk order.
    pub fn discover(&self, input_dir: &Path) -> Vec<PathBuf> {
        WalkDir::new(input_dir)
            .into_iter()
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    log::warn!("skipping unreadable entry: {}", err);
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map_or(false, |e| e.eq_ignore_ascii_case(&self.extension))
            })
            .collect()
    }

    /// Process every scene file under `input_dir`, writing cleaned copies under
    /// `output_dir` and reports under `output_dir/<reports_dir>`.
    ///
    /// Only a failure to write the aggregate summary is returned as an error.
    pub fn run(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        scene: &mut dyn SceneProvider,
    ) -> crate::Result<BatchSummary> {
        let reports_dir = output_dir.join(&self.reports_dir);
        let mut notices = Vec::new();

        let files = if input_dir.is_dir() {
            self.discover(input_dir)
        } else {
            log::warn!("input folder not found: {}", input_dir.display());
            notices.push(Entry::warning(
                "Batch",
                format!("Input folder not found: {}", input_dir.display()),
            ));
            Vec::new()
        };
        if files.is_empty() && notices.is_empty() {
            notices.push(Entry::info(
                "Batch",
                format!("No .{} files found under {}", self.extension, input_dir.display()),
            ));
        }

        let mut jobs = Vec::with_capacity(files.len());
        for src in &files {
            log::info!("Processing: {}", src.display());
            let rel = src.strip_prefix(input_dir).unwrap_or(src.as_path());
            let dst = output_dir.join(rel);

            let mut job = self.run_file(src, &dst, scene);
            let report_path = reports_dir.join(report_file_name(src));
            if let Err(e) = write_json(&job, &report_path) {
                log::warn!("could not write {}: {}", report_path.display(), e);
                job.errors.push(format!("Report not written: {}", e));
            }
            jobs.push(job);
        }

        let summary_path = write_json(&jobs, &reports_dir.join(SUMMARY_FILE))?;
        log::info!("Done. Files: {}", jobs.len());
        log::info!("Summary: {}", summary_path.display());

        Ok(BatchSummary {
            jobs,
            summary_path,
            notices,
        })
    }

    /// Load → clean → save one file. Every fault, including a panic in the
    /// provider, ends up on the returned job.
    fn run_file(&self, src: &Path, dst: &Path, scene: &mut dyn SceneProvider) -> BatchJob {
        let mut job = BatchJob::new(src, dst);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.process(src, dst, scene, &mut job)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::warn!("{} failed: {}", src.display(), e);
                job.fail(e.to_string(), format!("{:?}", e));
            }
            Err(payload) => {
                let msg = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                log::warn!("{} panicked: {}", src.display(), msg);
                job.fail(format!("panic: {}", msg), format!("panic while processing {}", src.display()));
            }
        }
        job
    }

    fn process(
        &self,
        src: &Path,
        dst: &Path,
        scene: &mut dyn SceneProvider,
        job: &mut BatchJob,
    ) -> crate::Result<()> {
        scene.load_document(src)?;
        job.actions = clean(&self.options, scene);
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)?;
        }
        scene.save_document(dst)?;
        Ok(())
    }
}

/// `<basename>_report.json`
fn report_file_name(src: &Path) -> String {
    let base = src
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "scene".to_string());
    format!("{}_report.json", base)
}

/// Clean every scene file under `input_dir` with the default extension.
pub fn run_batch(
    input_dir: &Path,
    output_dir: &Path,
    options: &Options,
    scene: &mut dyn SceneProvider,
) -> crate::Result<BatchSummary> {
    BatchRunner::new(*options).run(input_dir, output_dir, scene)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryScene;
    use crate::scene::NodeKind;
    use std::fs;

    fn write_scene(path: &Path, hidden: usize) {
        let mut scene = MemoryScene::new();
        scene.add_node("box01", NodeKind::Geometry).modifiers = vec!["Bend".into()];
        for i in 0..hidden {
            scene.add_node(format!("ghost{}", i), NodeKind::Geometry).hidden = true;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        scene.save_document(path).unwrap();
    }

    fn options() -> Options {
        let mut options = Options::default();
        options.delete_hidden = true;
        options
    }

    fn job_for<'a>(summary: &'a BatchSummary, name: &str) -> &'a BatchJob {
        summary
            .jobs
            .iter()
            .find(|j| j.src_file.ends_with(name))
            .unwrap()
    }

    #[test]
    fn corrupt_file_is_isolated() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        let output = tmp.path().join("out");
        write_scene(&input.join("one.scene"), 1);
        fs::write(input.join("two.scene"), "this is not a scene").unwrap();
        write_scene(&input.join("three.scene"), 2);

        let mut scene = MemoryScene::new();
        let summary = run_batch(&input, &output, &options(), &mut scene).unwrap();

        assert_eq!(summary.jobs.len(), 3);
        assert_eq!(summary.ok_count(), 2);
        assert!(job_for(&summary, "one.scene").is_ok());
        assert!(job_for(&summary, "three.scene").is_ok());
        let two = job_for(&summary, "two.scene");
        assert_eq!(two.status, JobStatus::Failed);
        assert_eq!(two.errors.len(), 2);
        assert!(two.errors[0].contains("failed to load document"));
        assert!(!output.join("two.scene").exists());
    }

    #[test]
    fn outputs_mirror_relative_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        let output = tmp.path().join("out");
        write_scene(&input.join("shots").join("sh010").join("layout.scene"), 1);

        let mut scene = MemoryScene::new();
        let summary = run_batch(&input, &output, &options(), &mut scene).unwrap();

        let dst = output.join("shots").join("sh010").join("layout.scene");
        assert!(dst.exists());
        assert_eq!(summary.jobs[0].dst_file, dst.display().to_string());

        let mut cleaned = MemoryScene::new();
        cleaned.load_document(&dst).unwrap();
        assert!(cleaned.find_node("ghost0").is_none());
        assert_eq!(cleaned.find_node("box01").unwrap().modifier_count(), 0);
    }

    #[test]
    fn reports_are_written_per_file_and_aggregated() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        let output = tmp.path().join("out");
        write_scene(&input.join("a.scene"), 1);
        write_scene(&input.join("b.scene"), 0);

        let mut scene = MemoryScene::new();
        let summary = run_batch(&input, &output, &options(), &mut scene).unwrap();

        let reports = output.join(REPORTS_DIR);
        assert_eq!(summary.summary_path, reports.join(SUMMARY_FILE));
        assert!(reports.join("a_report.json").exists());
        assert!(reports.join("b_report.json").exists());

        let a: BatchJob =
            serde_json::from_str(&fs::read_to_string(reports.join("a_report.json")).unwrap()).unwrap();
        assert!(a.actions.iter().any(|e| e.message == "Hidden objects: 1 -> 0"));

        let all: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&summary.summary_path).unwrap()).unwrap();
        let arr = all.as_array().unwrap();
        assert_eq!(arr.len(), 2);
        for entry in arr {
            assert_eq!(entry["status"], "ok");
            assert!(entry.get("src_file").is_some());
            assert!(entry.get("dst_file").is_some());
            assert!(entry["errors"].as_array().unwrap().is_empty());
        }
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let tmp = tempfile::tempdir().unwrap();
        write_scene(&tmp.path().join("A.SCENE"), 0);
        write_scene(&tmp.path().join("b.Scene"), 0);
        fs::write(tmp.path().join("notes.txt"), "x").unwrap();

        let runner = BatchRunner::new(Options::default());
        assert_eq!(runner.discover(tmp.path()).len(), 2);

        let runner = BatchRunner::new(Options::default()).with_extension(".txt");
        assert_eq!(runner.discover(tmp.path()).len(), 1);
    }

    #[test]
    fn empty_input_still_writes_summary() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        fs::create_dir_all(&input).unwrap();
        let output = tmp.path().join("out");

        let mut scene = MemoryScene::new();
        let summary = run_batch(&input, &output, &options(), &mut scene).unwrap();
        assert!(summary.jobs.is_empty());
        assert_eq!(summary.notices.len(), 1);
        assert_eq!(fs::read_to_string(&summary.summary_path).unwrap().trim(), "[]");
    }

    #[test]
    fn missing_input_is_a_warning_notice() {
        let tmp = tempfile::tempdir().unwrap();
        let mut scene = MemoryScene::new();
        let summary = run_batch(
            &tmp.path().join("nope"),
            &tmp.path().join("out"),
            &options(),
            &mut scene,
        )
        .unwrap();
        assert!(summary.jobs.is_empty());
        assert!(summary.notices[0].is_warning());
        assert!(summary.summary_path.exists());
    }

    struct PanickingScene;

    impl SceneProvider for PanickingScene {
        fn load_document(&mut self, _path: &Path) -> crate::provider::SceneResult<()> {
            panic!("host crashed");
        }
        fn save_document(&mut self, _path: &Path) -> crate::provider::SceneResult<()> {
            Ok(())
        }
        fn node_ids(&self) -> crate::provider::SceneResult<Vec<crate::scene::NodeId>> {
            Ok(Vec::new())
        }
        fn node(&self, id: crate::scene::NodeId) -> crate::provider::SceneResult<crate::scene::SceneNode> {
            Err(crate::provider::SceneError::NodeNotFound(id))
        }
        fn layers(&self) -> crate::provider::SceneResult<Vec<crate::scene::Layer>> {
            Ok(Vec::new())
        }
        fn current_layer(&self) -> crate::provider::SceneResult<crate::scene::LayerId> {
            Ok(crate::scene::LayerId(0))
        }
        fn set_current_layer(&mut self, _id: crate::scene::LayerId) -> crate::provider::SceneResult<()> {
            Ok(())
        }
        fn delete_node(&mut self, _id: crate::scene::NodeId) -> crate::provider::SceneResult<()> {
            Ok(())
        }
        fn delete_layer(&mut self, _id: crate::scene::LayerId) -> crate::provider::SceneResult<()> {
            Ok(())
        }
        fn material_count(&self) -> crate::provider::SceneResult<usize> {
            Ok(0)
        }
        fn texture_refs(&self) -> crate::provider::SceneResult<Vec<crate::scene::TextureReference>> {
            Ok(Vec::new())
        }
        fn set_texture_path(
            &mut self,
            _id: crate::scene::TextureId,
            _path: &Path,
        ) -> crate::provider::SceneResult<()> {
            Ok(())
        }
        fn reset_xform(&mut self, _id: crate::scene::NodeId) -> crate::provider::SceneResult<()> {
            Ok(())
        }
        fn collapse_stack(&mut self, _id: crate::scene::NodeId) -> crate::provider::SceneResult<()> {
            Ok(())
        }
        fn convert_to_poly(&mut self, _id: crate::scene::NodeId) -> crate::provider::SceneResult<()> {
            Ok(())
        }
        fn begin_transaction(&mut self, _label: &str) -> crate::provider::SceneResult<()> {
            Ok(())
        }
        fn commit_transaction(&mut self) -> crate::provider::SceneResult<()> {
            Ok(())
        }
    }

    #[test]
    fn provider_panic_marks_file_failed() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("in");
        write_scene(&input.join("crash.scene"), 0);

        let summary = run_batch(&input, &tmp.path().join("out"), &options(), &mut PanickingScene).unwrap();
        assert_eq!(summary.failed_count(), 1);
        assert!(summary.jobs[0].errors[0].contains("host crashed"));
    }
}
