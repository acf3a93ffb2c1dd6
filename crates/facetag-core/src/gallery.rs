//! Known-face gallery: ordered (label, embedding) pairs built once per run.

use crate::provider::{EmbeddingProvider, ProviderError};
use crate::types::{Embedding, GalleryEntry};
use crate::walk;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("known faces directory not found: {}", .0.display())]
    RootNotFound(PathBuf),
    #[error("cannot read {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("embedding for {label:?} has {actual} dimensions, gallery has {expected}")]
    DimensionMismatch {
        label: String,
        expected: usize,
        actual: usize,
    },
}

/// Why a reference image contributed no entry.
#[derive(Error, Debug)]
pub enum EntryError {
    #[error("decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("embedding failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("no face found")]
    NoFace,
    #[error("embedding has {actual} dimensions, gallery has {expected}")]
    Dimension { expected: usize, actual: usize },
}

/// A reference image skipped during the build.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub label: String,
    pub path: PathBuf,
    pub reason: String,
}

/// Result of [`Gallery::build`].
#[derive(Debug)]
pub struct GalleryBuild {
    pub gallery: Gallery,
    pub skipped: Vec<SkippedFile>,
}

/// Ordered, read-only collection of known faces.
///
/// Insertion order is significant: the first-match policy returns the
/// earliest entry within tolerance. All entries share one dimensionality.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
}

impl Gallery {
    /// Build from `root/<label>/<images>`.
    ///
    /// Only a missing or unreadable root is fatal. Files that fail to decode,
    /// fail in the provider, or contain no face are skipped with a warning.
    /// Only the first face of each reference image is used.
    pub fn build<P>(root: &Path, provider: &mut P) -> Result<GalleryBuild, GalleryError>
    where
        P: EmbeddingProvider + ?Sized,
    {
        if !root.is_dir() {
            return Err(GalleryError::RootNotFound(root.to_path_buf()));
        }
        tracing::info!(root = %root.display(), "loading known faces");

        let label_dirs = walk::subdirectories(root).map_err(|source| GalleryError::ReadDir {
            path: root.to_path_buf(),
            source,
        })?;

        let sources = label_dirs.iter().flat_map(|dir| label_sources(dir));
        let (entries, skipped) = sources.fold(
            (Vec::<GalleryEntry>::new(), Vec::new()),
            |(mut entries, mut skipped), (label, path)| {
                let expected = entries.first().map(|e| e.embedding.dim());
                match load_entry(&path, &mut *provider, expected) {
                    Ok(embedding) => {
                        tracing::info!(label = %label, file = %path.display(), "loaded face");
                        entries.push(GalleryEntry {
                            label,
                            embedding,
                            source: path,
                        });
                    }
                    Err(err) => {
                        tracing::warn!(label = %label, file = %path.display(), error = %err, "skipping reference image");
                        skipped.push(SkippedFile {
                            label,
                            path,
                            reason: err.to_string(),
                        });
                    }
                }
                (entries, skipped)
            },
        );

        tracing::info!(count = entries.len(), skipped = skipped.len(), "loaded known faces");
        Ok(GalleryBuild {
            gallery: Gallery { entries },
            skipped,
        })
    }

    /// Build from ready-made entries, keeping their order.
    pub fn from_entries(entries: Vec<GalleryEntry>) -> Result<Self, GalleryError> {
        if let Some(first) = entries.first() {
            let expected = first.embedding.dim();
            if let Some(bad) = entries.iter().find(|e| e.embedding.dim() != expected) {
                return Err(GalleryError::DimensionMismatch {
                    label: bad.label.clone(),
                    expected,
                    actual: bad.embedding.dim(),
                });
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embedding dimensionality, `None` for an empty gallery.
    pub fn dimension(&self) -> Option<usize> {
        self.entries.first().map(|e| e.embedding.dim())
    }

    /// Distinct labels in first-appearance order with their entry counts.
    pub fn label_counts(&self) -> Vec<(&str, usize)> {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for entry in &self.entries {
            match counts.iter_mut().find(|(label, _)| *label == entry.label) {
                Some((_, n)) => *n += 1,
                None => counts.push((entry.label.as_str(), 1)),
            }
        }
        counts
    }
}

/// (label, file) pairs for one label directory. Unreadable directories yield nothing.
fn label_sources(dir: &Path) -> Vec<(String, PathBuf)> {
    let label = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match walk::files(dir) {
        Ok(files) => {
            tracing::info!(label = %label, files = files.len(), "loading faces for label");
            files.into_iter().map(|f| (label.clone(), f)).collect()
        }
        Err(err) => {
            tracing::warn!(dir = %dir.display(), error = %err, "skipping unreadable label directory");
            Vec::new()
        }
    }
}

fn load_entry<P>(path: &Path, provider: &mut P, expected_dim: Option<usize>) -> Result<Embedding, EntryError>
where
    P: EmbeddingProvider + ?Sized,
{
    let image = walk::load_rgb(path)?;
    let face = provider
        .detect_faces(&image)?
        .into_iter()
        .next()
        .ok_or(EntryError::NoFace)?;

    match expected_dim {
        Some(expected) if expected != face.embedding.dim() => Err(EntryError::Dimension {
            expected,
            actual: face.embedding.dim(),
        }),
        _ => Ok(face.embedding),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{write_faces, ColorProvider, BLUE, GREEN, POISON, RED};
    use crate::types::DetectedFace;
    use std::fs;

    #[test]
    fn test_build_one_entry_per_image_in_sorted_order() {
        let root = tempfile::tempdir().unwrap();
        write_faces(&root.path().join("bob/b1.png"), &[BLUE]);
        write_faces(&root.path().join("alice/a2.png"), &[GREEN]);
        write_faces(&root.path().join("alice/a1.png"), &[RED]);

        let build = Gallery::build(root.path(), &mut ColorProvider::default()).unwrap();
        let g = build.gallery;
        let order: Vec<_> = g
            .entries()
            .iter()
            .map(|e| (e.label.as_str(), e.source.file_name().unwrap().to_str().unwrap()))
            .collect();
        assert_eq!(order, [("alice", "a1.png"), ("alice", "a2.png"), ("bob", "b1.png")]);
        assert_eq!(g.label_counts(), [("alice", 2), ("bob", 1)]);
        assert_eq!(g.dimension(), Some(3));
        assert!(build.skipped.is_empty());
    }

    #[test]
    fn test_build_skips_images_without_faces() {
        // 5 images, 2 without faces → 3 entries
        let root = tempfile::tempdir().unwrap();
        write_faces(&root.path().join("alice/1.png"), &[RED]);
        write_faces(&root.path().join("alice/2.png"), &[]);
        write_faces(&root.path().join("alice/3.png"), &[GREEN]);
        write_faces(&root.path().join("alice/4.png"), &[]);
        write_faces(&root.path().join("alice/5.png"), &[BLUE]);

        let build = Gallery::build(root.path(), &mut ColorProvider::default()).unwrap();
        assert_eq!(build.gallery.len(), 3);
        assert_eq!(build.skipped.len(), 2);
        assert!(build.skipped.iter().all(|s| s.reason == "no face found"));
    }

    #[test]
    fn test_build_uses_first_face_only() {
        let root = tempfile::tempdir().unwrap();
        write_faces(&root.path().join("group/photo.png"), &[GREEN, RED, BLUE]);

        let g = Gallery::build(root.path(), &mut ColorProvider::default()).unwrap().gallery;
        assert_eq!(g.len(), 1);
        assert_eq!(g.entries()[0].embedding.values, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_build_skips_undecodable_and_failing_files() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("alice")).unwrap();
        fs::write(root.path().join("alice/notes.txt"), b"not an image").unwrap();
        write_faces(&root.path().join("alice/bad.png"), &[POISON]);
        write_faces(&root.path().join("alice/good.png"), &[RED]);

        let mut provider = ColorProvider::default();
        let build = Gallery::build(root.path(), &mut provider).unwrap();
        assert_eq!(build.gallery.len(), 1);
        assert_eq!(build.skipped.len(), 2);
        // the text file never reaches the provider
        assert_eq!(provider.calls, 2);
    }

    #[test]
    fn test_build_reads_misnamed_reference_photos() {
        let root = tempfile::tempdir().unwrap();
        let png = root.path().join("source.png");
        write_faces(&png, &[RED]);
        fs::create_dir_all(root.path().join("alice")).unwrap();
        fs::copy(&png, root.path().join("alice/portrait.jpeg")).unwrap();
        fs::copy(&png, root.path().join("alice/portrait")).unwrap();

        let build = Gallery::build(root.path(), &mut ColorProvider::default()).unwrap();
        assert_eq!(build.gallery.len(), 2);
        assert!(build.skipped.is_empty());
    }

    #[test]
    fn test_build_ignores_files_at_root() {
        let root = tempfile::tempdir().unwrap();
        write_faces(&root.path().join("stray.png"), &[RED]);
        write_faces(&root.path().join("bob/b.png"), &[BLUE]);

        let g = Gallery::build(root.path(), &mut ColorProvider::default()).unwrap().gallery;
        assert_eq!(g.len(), 1);
        assert_eq!(g.entries()[0].label, "bob");
    }

    #[test]
    fn test_build_empty_root_gives_empty_gallery() {
        let root = tempfile::tempdir().unwrap();
        let g = Gallery::build(root.path(), &mut ColorProvider::default()).unwrap().gallery;
        assert!(g.is_empty());
        assert_eq!(g.dimension(), None);
    }

    #[test]
    fn test_build_missing_root_is_fatal() {
        let err = Gallery::build(Path::new("/nonexistent/known"), &mut ColorProvider::default()).unwrap_err();
        assert!(matches!(err, GalleryError::RootNotFound(_)));
    }

    #[test]
    fn test_build_skips_dimension_mismatch() {
        struct Growing(usize);
        impl EmbeddingProvider for Growing {
            fn detect_faces(&mut self, _: &image::RgbImage) -> Result<Vec<DetectedFace>, ProviderError> {
                self.0 += 1;
                Ok(vec![DetectedFace {
                    region: crate::types::Region { top: 0, right: 0, bottom: 0, left: 0 },
                    embedding: Embedding::new(vec![0.0; self.0]),
                }])
            }
        }

        let root = tempfile::tempdir().unwrap();
        write_faces(&root.path().join("a/1.png"), &[RED]);
        write_faces(&root.path().join("a/2.png"), &[RED]);

        let build = Gallery::build(root.path(), &mut Growing(0)).unwrap();
        assert_eq!(build.gallery.len(), 1);
        assert_eq!(build.skipped.len(), 1);
    }

    #[test]
    fn test_from_entries_rejects_mixed_dimensions() {
        let entries = vec![
            GalleryEntry { label: "a".into(), embedding: Embedding::new(vec![0.0; 2]), source: "a".into() },
            GalleryEntry { label: "b".into(), embedding: Embedding::new(vec![0.0; 3]), source: "b".into() },
        ];
        let err = Gallery::from_entries(entries).unwrap_err();
        assert!(matches!(err, GalleryError::DimensionMismatch { expected: 2, actual: 3, .. }));
    }
}
