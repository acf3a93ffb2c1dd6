//! facetag-core — Label faces in a batch of photos against a known-face gallery.
//!
//! The gallery is built once from `known/<label>/<images>`, then every image
//! in the unknown directory is run through detection, first-match lookup and
//! annotation. Detection and embedding go through [`EmbeddingProvider`]; the
//! bundled [`OnnxProvider`] uses SCRFD and ArcFace via ONNX Runtime.

pub mod alignment;
pub mod annotate;
pub mod batch;
pub mod detector;
pub mod gallery;
pub mod matcher;
pub mod provider;
pub mod recognizer;
pub mod types;
pub mod walk;

#[cfg(test)]
pub(crate) mod testutil;

pub use annotate::{AnnotateError, Annotator};
pub use batch::{BatchError, BatchOptions, BatchProcessor, BatchReport, FileOutcome, OutputNaming};
pub use gallery::{Gallery, GalleryBuild, GalleryError};
pub use matcher::{match_label, FirstMatch, MatchPolicy, Matcher, Nearest, DEFAULT_TOLERANCE};
pub use provider::{EmbeddingProvider, ModelKind, OnnxProvider, ProviderError};
pub use types::{BoundingBox, DetectedFace, Embedding, GalleryEntry, MatchResult, Region};

/// Default model directory: `$XDG_DATA_HOME/facetag/models`, or
/// `~/.local/share/facetag/models`.
pub fn default_model_dir() -> std::path::PathBuf {
    let data_dir = std::env::var("XDG_DATA_HOME")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            std::path::PathBuf::from(home).join(".local/share")
        });
    data_dir.join("facetag").join("models")
}
