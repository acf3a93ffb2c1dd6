mod config;
mod report;

use anyhow::{ensure, Context, Result};
use clap::{Args, Parser, Subcommand};
use config::{parse_value, Config};
use facetag_core::{BatchProcessor, Gallery, OnnxProvider};
use facetag_render::LabelAnnotator;
use report::RunReport;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "facetag", about = "Label known faces in a folder of photos")]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Settings that take precedence over the config file and environment.
#[derive(Args, Debug, Default)]
struct Overrides {
    /// TOML config file (default: $FACETAG_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Known faces root, one subdirectory per person
    #[arg(long, global = true)]
    known: Option<PathBuf>,
    /// Directory of photos to label
    #[arg(long, global = true)]
    unknown: Option<PathBuf>,
    /// Where annotated copies are written
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
    /// Directory containing the ONNX models
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,
    /// Maximum distance for a match. The 0.6 default comes from 128-d dlib
    /// embeddings; ArcFace distances run 0..2 and same-person pairs often
    /// need 1.0-1.1
    #[arg(long, global = true)]
    tolerance: Option<f32>,
    /// Model set: fast or accurate
    #[arg(long, global = true)]
    model: Option<String>,
    /// Match policy: first or nearest
    #[arg(long, global = true)]
    policy: Option<String>,
    /// Output naming: prefix or hashed
    #[arg(long, global = true)]
    naming: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the gallery and label every photo in the unknown directory (default)
    Run {
        /// Write a JSON report of the run to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Build the gallery and list how many reference faces each person has
    Gallery {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn load_config(overrides: &Overrides) -> Result<Config> {
    let path = overrides
        .config
        .clone()
        .or_else(|| std::env::var_os("FACETAG_CONFIG").map(PathBuf::from));
    let mut config = Config::load(path.as_deref())?;
    apply_overrides(&mut config, overrides)?;
    config.validate()?;
    Ok(config)
}

fn apply_overrides(config: &mut Config, o: &Overrides) -> Result<()> {
    if let Some(v) = &o.known {
        config.known_faces_dir = v.clone();
    }
    if let Some(v) = &o.unknown {
        config.unknown_faces_dir = v.clone();
    }
    if let Some(v) = &o.output_dir {
        config.output_dir = v.clone();
    }
    if let Some(v) = &o.model_dir {
        config.model_dir = v.clone();
    }
    if let Some(v) = o.tolerance {
        config.tolerance = v;
    }
    if let Some(v) = &o.model {
        config.model = parse_value("--model", v)?;
    }
    if let Some(v) = &o.policy {
        config.policy = parse_value("--policy", v)?;
    }
    if let Some(v) = &o.naming {
        config.naming = parse_value("--naming", v)?;
    }
    Ok(())
}

fn run(config: &Config, report_path: Option<&Path>) -> Result<()> {
    let started_at = chrono::Utc::now();
    ensure!(
        config.unknown_faces_dir.is_dir(),
        "unknown faces directory not found: {}",
        config.unknown_faces_dir.display()
    );

    let mut provider = OnnxProvider::load(&config.model_dir, config.model)
        .with_context(|| format!("loading {} models from {}", config.model, config.model_dir.display()))?;

    let build = Gallery::build(&config.known_faces_dir, &mut provider)?;
    println!(
        "Loaded {} known faces ({} skipped)",
        build.gallery.len(),
        build.skipped.len()
    );
    if build.gallery.is_empty() {
        tracing::warn!("gallery is empty; no faces will be labeled");
    }

    let annotator = LabelAnnotator::new(config.annotation);
    let processor = BatchProcessor::new(&build.gallery, config.batch_options());
    let batch = processor.run(&config.unknown_faces_dir, &mut provider, &annotator)?;

    println!(
        "Processed {} files: {} written, {} failed, {} faces labeled",
        batch.files.len(),
        batch.written(),
        batch.failed(),
        batch.matched_faces()
    );

    if let Some(path) = report_path {
        let report = RunReport {
            started_at,
            finished_at: chrono::Utc::now(),
            config,
            known_faces: build.gallery.len(),
            labels: report::label_counts(&build.gallery),
            skipped_known: &build.skipped,
            written: batch.written(),
            failed: batch.failed(),
            matched_faces: batch.matched_faces(),
            batch: &batch,
        };
        report
            .write(path)
            .with_context(|| format!("writing report {}", path.display()))?;
        tracing::info!(path = %path.display(), "report written");
    }

    Ok(())
}

fn list_gallery(config: &Config, json: bool) -> Result<()> {
    let mut provider = OnnxProvider::load(&config.model_dir, config.model)
        .with_context(|| format!("loading {} models from {}", config.model, config.model_dir.display()))?;
    let build = Gallery::build(&config.known_faces_dir, &mut provider)?;
    let counts = report::label_counts(&build.gallery);

    if json {
        let out = serde_json::json!({
            "known_faces": build.gallery.len(),
            "labels": counts,
            "skipped": build.skipped,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if counts.is_empty() {
        println!("No known faces");
    }
    for c in &counts {
        println!("{:<24} {}", c.label, c.entries);
    }
    for s in &build.skipped {
        println!("skipped {}: {}", s.path.display(), s.reason);
    }
    Ok(())
}

fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = load_config(&cli.overrides)?;
    tracing::debug!(?config, "configuration loaded");

    match cli.command.unwrap_or(Commands::Run { report: None }) {
        Commands::Run { report } => run(&config, report.as_deref()),
        Commands::Gallery { json } => list_gallery(&config, json),
    }
}
