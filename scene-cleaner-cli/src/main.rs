//! Scene audit and cleanup CLI

use clap::{ArgAction, Args, Parser, Subcommand};
use scene_cleaner_core::batch::BatchRunner;
use scene_cleaner_core::{
    audit_materials, build_report, clean, relink, save_html, save_json, scan, MemoryScene, Options,
    Report, SceneProvider,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "scene-cleaner")]
#[command(about = "Audit and clean 3D scene documents, one file or a whole folder.")]
#[command(version = concat!("v", env!("CARGO_PKG_VERSION")))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (TOML). Can set [options], scene_extension and reports_dir.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Debug, Default, Deserialize)]
struct CliConfig {
    #[serde(default)]
    options: Option<Options>,
    scene_extension: Option<String>,
    reports_dir: Option<String>,
}

/// Per-flag overrides applied on top of the config file
#[derive(Args, Debug, Default, Clone)]
struct OptionArgs {
    /// Enable an option flag (repeatable), e.g. --enable delete_hidden
    #[arg(long, value_name = "FLAG")]
    enable: Vec<String>,
    /// Disable an option flag (repeatable), e.g. --disable reset_xform
    #[arg(long, value_name = "FLAG")]
    disable: Vec<String>,
}

#[derive(Args, Debug, Default, Clone)]
struct ExportArgs {
    /// Write the report as JSON
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,
    /// Write the report as HTML
    #[arg(long, value_name = "PATH")]
    html: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit a scene without modifying it
    Scan {
        /// Scene document
        scene: PathBuf,
        #[command(flatten)]
        options: OptionArgs,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Audit material count and missing textures only
    ScanMaterials {
        /// Scene document
        scene: PathBuf,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Apply transform and scene cleanup
    Clean {
        /// Scene document
        scene: PathBuf,
        /// Where to save the cleaned scene (default: overwrite input)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        options: OptionArgs,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Repoint missing textures at files found under a folder
    Relink {
        /// Scene document
        scene: PathBuf,
        /// Folder searched recursively for texture files
        search_dir: PathBuf,
        /// Where to save the relinked scene (default: overwrite input)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Clean every scene file under a folder
    Batch {
        /// Folder searched recursively for scene files
        input_dir: PathBuf,
        /// Output root; cleaned scenes mirror the input layout
        output_dir: PathBuf,
        /// Scene file extension (overrides config)
        #[arg(long)]
        extension: Option<String>,
        #[command(flatten)]
        options: OptionArgs,
    },
    /// Scan, clean and write one combined report
    Report {
        /// Scene document
        scene: PathBuf,
        /// Where to save the cleaned scene (default: overwrite input)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        options: OptionArgs,
        #[command(flatten)]
        export: ExportArgs,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Scan { scene, options, export } => {
            cmd_scan(scene, &resolve_options(&config, options)?, export)
        }
        Commands::ScanMaterials { scene, export } => cmd_scan_materials(scene, export),
        Commands::Clean {
            scene,
            output,
            options,
            export,
        } => cmd_clean(scene, output.as_deref(), &resolve_options(&config, options)?, export),
        Commands::Relink {
            scene,
            search_dir,
            output,
            export,
        } => cmd_relink(scene, search_dir, output.as_deref(), export),
        Commands::Batch {
            input_dir,
            output_dir,
            extension,
            options,
        } => {
            let mut runner = BatchRunner::new(resolve_options(&config, options)?);
            if let Some(ext) = extension.as_ref().or(config.scene_extension.as_ref()) {
                runner = runner.with_extension(ext.as_str());
            }
            if let Some(dir) = &config.reports_dir {
                runner = runner.with_reports_dir(dir.as_str());
            }
            cmd_batch(input_dir, output_dir, &runner)
        }
        Commands::Report {
            scene,
            output,
            options,
            export,
        } => cmd_report(scene, output.as_deref(), &resolve_options(&config, options)?, export),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn load_config(path: Option<&Path>) -> Result<CliConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(CliConfig::default());
    };
    let s = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read config {}: {}", path.display(), e))?;
    let cfg = toml::from_str::<CliConfig>(&s)
        .map_err(|e| format!("invalid config {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn resolve_options(config: &CliConfig, args: &OptionArgs) -> Result<Options, Box<dyn std::error::Error>> {
    let mut options = config.options.unwrap_or_default();
    for (flags, value) in [(&args.enable, true), (&args.disable, false)] {
        for flag in flags {
            if !options.set(flag, value) {
                return Err(format!("unknown option flag: {}", flag).into());
            }
        }
    }
    log::debug!("options: {:?}", options.enabled());
    Ok(options)
}

fn open_scene(path: &Path) -> Result<MemoryScene, Box<dyn std::error::Error>> {
    let mut scene = MemoryScene::new();
    scene.load_document(path)?;
    Ok(scene)
}

fn export_report(report: &Report, export: &ExportArgs) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = &export.json {
        let written = save_json(report, path)?;
        println!("JSON report: {}", written.display());
    }
    if let Some(path) = &export.html {
        let written = save_html(report, path)?;
        println!("HTML report: {}", written.display());
    }
    Ok(())
}

fn cmd_scan(scene_path: &Path, options: &Options, export: &ExportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let scene = open_scene(scene_path)?;
    let issues = scan(options, &scene);
    let report = build_report(options, &issues, &[]);
    println!("{}", report.to_text());
    export_report(&report, export)
}

fn cmd_scan_materials(scene_path: &Path, export: &ExportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let scene = open_scene(scene_path)?;
    let issues = audit_materials(&scene);
    let report = build_report(&Options::default(), &issues, &[]);
    println!("{}", report.to_text());
    export_report(&report, export)
}

fn cmd_clean(
    scene_path: &Path,
    output: Option<&Path>,
    options: &Options,
    export: &ExportArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut scene = open_scene(scene_path)?;
    let actions = clean(options, &mut scene);
    scene.save_document(output.unwrap_or(scene_path))?;

    let remaining = scan(options, &scene);
    let report = build_report(options, &[], &actions);
    println!("{}", report.to_text());
    println!("Post-clean scan: {} issue(s)", remaining.len());
    export_report(&report, export)
}

fn cmd_relink(
    scene_path: &Path,
    search_dir: &Path,
    output: Option<&Path>,
    export: &ExportArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut scene = open_scene(scene_path)?;
    let actions = relink(search_dir, &mut scene);
    scene.save_document(output.unwrap_or(scene_path))?;

    let report = build_report(&Options::default(), &[], &actions);
    println!("{}", report.to_text());
    export_report(&report, export)
}

fn cmd_batch(input_dir: &Path, output_dir: &Path, runner: &BatchRunner) -> Result<(), Box<dyn std::error::Error>> {
    let mut scene = MemoryScene::new();
    let summary = runner.run(input_dir, output_dir, &mut scene)?;

    for notice in &summary.notices {
        println!("{}", notice);
    }
    for job in summary.jobs.iter().filter(|j| !j.is_ok()) {
        eprintln!("⚠ {}: {}", job.src_file, job.errors.first().map(String::as_str).unwrap_or(""));
    }
    println!(
        "Processed {} file(s): {} ok, {} failed",
        summary.jobs.len(),
        summary.ok_count(),
        summary.failed_count()
    );
    println!("Summary: {}", summary.summary_path.display());
    Ok(())
}

fn cmd_report(
    scene_path: &Path,
    output: Option<&Path>,
    options: &Options,
    export: &ExportArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut scene = open_scene(scene_path)?;
    let issues = scan(options, &scene);
    let actions = clean(options, &mut scene);
    scene.save_document(output.unwrap_or(scene_path))?;

    let report = build_report(options, &issues, &actions);
    println!("{}", report.to_text());
    export_report(&report, export)
}
