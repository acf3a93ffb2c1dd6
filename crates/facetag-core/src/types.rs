use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Face region in integer pixel coordinates, inclusive on all sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Region {
    /// Convert a detector box to a region clamped to a `width` x `height` image.
    ///
    /// Returns `None` for empty images or boxes that fall entirely outside.
    pub fn from_bbox(bbox: &BoundingBox, width: u32, height: u32) -> Option<Region> {
        if width == 0 || height == 0 {
            return None;
        }
        let max_x = (width - 1) as f32;
        let max_y = (height - 1) as f32;

        let x1 = bbox.x;
        let y1 = bbox.y;
        let x2 = bbox.x + bbox.width;
        let y2 = bbox.y + bbox.height;
        if x2 < 0.0 || y2 < 0.0 || x1 > max_x || y1 > max_y || !(x2 > x1 && y2 > y1) {
            return None;
        }

        Some(Region {
            top: y1.clamp(0.0, max_y).round() as u32,
            right: x2.clamp(0.0, max_x).round() as u32,
            bottom: y2.clamp(0.0, max_y).round() as u32,
            left: x1.clamp(0.0, max_x).round() as u32,
        })
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left) + 1
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top) + 1
    }
}

/// Face embedding vector. Dimensionality is fixed by the provider (512 for ArcFace).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    /// Model version that produced this embedding (e.g., "w600k_r50").
    pub model_version: Option<String>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            values,
            model_version: None,
        }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Compute Euclidean distance between two embeddings.
    ///
    /// Callers must compare embeddings of equal dimensionality; extra
    /// components of the longer vector are ignored.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// One face found in an image by an embedding provider.
#[derive(Debug, Clone)]
pub struct DetectedFace {
    pub region: Region,
    pub embedding: Embedding,
}

/// A labeled reference face: one per known image that yielded a face.
#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub label: String,
    pub embedding: Embedding,
    /// Reference image the embedding came from.
    pub source: PathBuf,
}

/// Match decision for one detected face.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub region: Region,
    /// Label of the matched gallery entry, absent when nothing was within tolerance.
    pub label: Option<String>,
    /// Distance to the matched entry.
    pub distance: Option<f32>,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        self.label.is_some()
    }
}
