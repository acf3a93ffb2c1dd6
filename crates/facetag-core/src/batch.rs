//! Batch labeling of unknown images against a gallery.
//!
//! Each file runs decode → detect → match → draw → save on its own. A failure
//! at any stage is logged and recorded in the report; the batch moves on to
//! the next file without retrying.

use crate::annotate::{AnnotateError, Annotator};
use crate::gallery::Gallery;
use crate::matcher::{MatchPolicy, Matcher, DEFAULT_TOLERANCE};
use crate::provider::{EmbeddingProvider, ProviderError};
use crate::types::{DetectedFace, MatchResult};
use crate::walk;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const OUTPUT_PREFIX: &str = "output_";

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("unknown faces directory not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("cannot read {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Pipeline stage at which a file failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Decode,
    Detect,
    Save,
}

#[derive(Error, Debug)]
pub enum FileError {
    #[error("decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("face detection failed: {0}")]
    Detect(#[from] ProviderError),
    #[error(transparent)]
    Save(#[from] AnnotateError),
}

impl FileError {
    pub fn stage(&self) -> Stage {
        match self {
            FileError::Decode(_) => Stage::Decode,
            FileError::Detect(_) => Stage::Detect,
            FileError::Save(_) => Stage::Save,
        }
    }
}

/// How output file names are derived from input file names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputNaming {
    /// `output_<name>`. Inputs sharing a base name overwrite each other.
    #[default]
    Prefix,
    /// `output_<stem>_<hash>.<ext>`, hash taken over the full input path.
    Hashed,
}

impl OutputNaming {
    pub fn output_path(self, output_dir: &Path, input: &Path) -> PathBuf {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let file_name = match self {
            OutputNaming::Prefix => format!("{OUTPUT_PREFIX}{name}"),
            OutputNaming::Hashed => {
                let digest = Sha256::digest(input.to_string_lossy().as_bytes());
                let hash: String = digest[..4].iter().map(|b| format!("{b:02x}")).collect();
                let stem = input
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match input.extension() {
                    Some(ext) => format!("{OUTPUT_PREFIX}{stem}_{hash}.{}", ext.to_string_lossy()),
                    None => format!("{OUTPUT_PREFIX}{stem}_{hash}"),
                }
            }
        };
        output_dir.join(file_name)
    }
}

impl FromStr for OutputNaming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prefix" => Ok(OutputNaming::Prefix),
            "hashed" => Ok(OutputNaming::Hashed),
            other => Err(format!("unknown output naming {other:?} (expected prefix|hashed)")),
        }
    }
}

impl fmt::Display for OutputNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputNaming::Prefix => "prefix",
            OutputNaming::Hashed => "hashed",
        })
    }
}

/// Run-wide batch settings, fixed at construction.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub tolerance: f32,
    pub policy: MatchPolicy,
    pub output_dir: PathBuf,
    pub naming: OutputNaming,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            policy: MatchPolicy::First,
            output_dir: PathBuf::from("."),
            naming: OutputNaming::Prefix,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileOutcome {
    Written {
        output: PathBuf,
        faces: Vec<MatchResult>,
        /// Faces that received a label.
        matches: usize,
    },
    Failed {
        stage: Stage,
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Per-file trace of one batch run, in processing order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn written(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Written { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.written()
    }

    /// Faces that received a label across all written files.
    pub fn matched_faces(&self) -> usize {
        self.files
            .iter()
            .map(|f| match &f.outcome {
                FileOutcome::Written { matches, .. } => *matches,
                FileOutcome::Failed { .. } => 0,
            })
            .sum()
    }

    /// Output paths written by more than one input, in first-write order.
    pub fn duplicate_outputs(&self) -> Vec<&Path> {
        let mut seen = HashSet::new();
        let mut repeated = Vec::new();
        for file in &self.files {
            if let FileOutcome::Written { output, .. } = &file.outcome {
                if !seen.insert(output.as_path()) && !repeated.contains(&output.as_path()) {
                    repeated.push(output.as_path());
                }
            }
        }
        repeated
    }
}

/// Decide a label for each face, keeping detection order.
pub fn match_faces<M>(faces: &[DetectedFace], gallery: &Gallery, tolerance: f32, matcher: &M) -> Vec<MatchResult>
where
    M: Matcher + ?Sized,
{
    faces
        .iter()
        .map(|face| {
            let found = matcher.find(&face.embedding, gallery, tolerance);
            MatchResult {
                region: face.region,
                label: found.map(|c| c.label().to_string()),
                distance: found.map(|c| c.distance),
            }
        })
        .collect()
}

/// Labels every image in a directory against a read-only gallery.
pub struct BatchProcessor<'g> {
    gallery: &'g Gallery,
    options: BatchOptions,
}

impl<'g> BatchProcessor<'g> {
    pub fn new(gallery: &'g Gallery, options: BatchOptions) -> Self {
        Self { gallery, options }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Process every file in `unknown_dir`, in file-name order.
    ///
    /// Only a missing input directory or an uncreatable output directory is
    /// fatal. Per-file failures end up in the returned report.
    pub fn run<P, A>(&self, unknown_dir: &Path, provider: &mut P, annotator: &A) -> Result<BatchReport, BatchError>
    where
        P: EmbeddingProvider + ?Sized,
        A: Annotator + ?Sized,
    {
        if !unknown_dir.is_dir() {
            return Err(BatchError::InputNotFound(unknown_dir.to_path_buf()));
        }
        let inputs = walk::files(unknown_dir).map_err(|source| BatchError::ReadDir {
            path: unknown_dir.to_path_buf(),
            source,
        })?;
        fs::create_dir_all(&self.options.output_dir).map_err(|source| BatchError::OutputDir {
            path: self.options.output_dir.clone(),
            source,
        })?;

        tracing::info!(
            dir = %unknown_dir.display(),
            files = inputs.len(),
            gallery = self.gallery.len(),
            tolerance = self.options.tolerance,
            policy = %self.options.policy,
            "processing unknown faces"
        );

        let mut report = BatchReport::default();
        let mut claimed: HashSet<PathBuf> = HashSet::new();
        for input in inputs {
            let output = self.options.naming.output_path(&self.options.output_dir, &input);
            if !claimed.insert(output.clone()) {
                tracing::warn!(
                    file = %input.display(),
                    output = %output.display(),
                    "output path already used by an earlier file in this run; overwriting"
                );
            }
            let outcome = match self.process_file(&input, &output, provider, annotator) {
                Ok(faces) => {
                    tracing::info!(file = %input.display(), output = %output.display(), "result saved");
                    let matches = faces.iter().filter(|m| m.is_match()).count();
                    FileOutcome::Written { output, faces, matches }
                }
                Err(err) => {
                    tracing::warn!(file = %input.display(), stage = ?err.stage(), error = %err, "skipping file");
                    FileOutcome::Failed {
                        stage: err.stage(),
                        error: err.to_string(),
                    }
                }
            };
            report.files.push(FileReport { input, outcome });
        }

        tracing::info!(
            written = report.written(),
            failed = report.failed(),
            matched_faces = report.matched_faces(),
            collisions = report.duplicate_outputs().len(),
            "batch complete"
        );
        Ok(report)
    }

    /// Run the full pipeline for one file, writing the annotated copy to `output`.
    pub fn process_file<P, A>(
        &self,
        input: &Path,
        output: &Path,
        provider: &mut P,
        annotator: &A,
    ) -> Result<Vec<MatchResult>, FileError>
    where
        P: EmbeddingProvider + ?Sized,
        A: Annotator + ?Sized,
    {
        tracing::info!(file = %input.display(), "processing");

        let mut image = walk::load_rgb(input)?;
        tracing::debug!(width = image.width(), height = image.height(), "image loaded");

        let faces = provider.detect_faces(&image)?;
        tracing::info!(file = %input.display(), faces = faces.len(), "found faces");

        let results = match_faces(&faces, self.gallery, self.options.tolerance, &self.options.policy);
        for result in &results {
            if let (Some(label), Some(distance)) = (&result.label, result.distance) {
                tracing::info!(label = %label, distance, "found match");
                annotator.draw(&mut image, &result.region, label);
            }
        }

        if output.exists() {
            tracing::debug!(output = %output.display(), "replacing output from a previous run");
        }
        annotator.save(&image, output)?;
        Ok(results)
    }
}
