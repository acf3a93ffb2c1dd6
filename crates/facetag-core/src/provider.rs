//! Embedding providers: find faces in an image and embed each one.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::{DetectedFace, Region};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("detector: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer: {0}")]
    Recognizer(#[from] RecognizerError),
    #[error("{0}")]
    Other(String),
}

/// Model selection: trades detection accuracy for speed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[default]
    #[serde(alias = "hog")]
    Fast,
    #[serde(alias = "cnn")]
    Accurate,
}

impl ModelKind {
    /// SCRFD detector file name inside the model directory.
    pub fn detector_file(self) -> &'static str {
        match self {
            ModelKind::Fast => "det_500m.onnx",
            ModelKind::Accurate => "det_10g.onnx",
        }
    }

    /// ArcFace recognizer file name inside the model directory.
    pub fn recognizer_file(self) -> &'static str {
        match self {
            ModelKind::Fast => "w600k_mbf.onnx",
            ModelKind::Accurate => "w600k_r50.onnx",
        }
    }
}

impl FromStr for ModelKind {
    type Err = String;

    /// Accepts `hog` and `cnn` as aliases for `fast` and `accurate`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" | "hog" => Ok(ModelKind::Fast),
            "accurate" | "cnn" => Ok(ModelKind::Accurate),
            other => Err(format!("unknown model {other:?} (expected fast|accurate)")),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelKind::Fast => "fast",
            ModelKind::Accurate => "accurate",
        })
    }
}

/// Source of face regions and embeddings.
///
/// Returns one entry per face in detection order; an image without faces
/// yields an empty vector, not an error.
pub trait EmbeddingProvider {
    fn detect_faces(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, ProviderError>;
}

impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for Box<P> {
    fn detect_faces(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, ProviderError> {
        (**self).detect_faces(image)
    }
}

/// SCRFD detection + ArcFace recognition via ONNX Runtime.
///
/// Embeddings are L2-normalized, so distances fall in `[0, 2]` and relate to
/// cosine similarity as `d = sqrt(2 - 2cos)`. [`DEFAULT_TOLERANCE`] of 0.6
/// was tuned for 128-d dlib embeddings and only accepts pairs with cosine
/// >= 0.82 here; most same-person pairs need a tolerance near 1.0-1.1.
///
/// [`DEFAULT_TOLERANCE`]: crate::matcher::DEFAULT_TOLERANCE
pub struct OnnxProvider {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
    kind: ModelKind,
}

impl OnnxProvider {
    /// Load both models for `kind` from `model_dir`.
    pub fn load(model_dir: &Path, kind: ModelKind) -> Result<Self, ProviderError> {
        let detector = FaceDetector::load(&model_dir.join(kind.detector_file()))?;
        let recognizer = FaceRecognizer::load(&model_dir.join(kind.recognizer_file()))?;
        tracing::info!(model = %kind, dir = %model_dir.display(), "embedding provider ready");
        Ok(Self {
            detector,
            recognizer,
            kind,
        })
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }
}

impl EmbeddingProvider for OnnxProvider {
    fn detect_faces(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, ProviderError> {
        let boxes = self.detector.detect(image)?;
        tracing::debug!(count = boxes.len(), "detector returned faces");

        let mut faces = Vec::with_capacity(boxes.len());
        for bbox in &boxes {
            let Some(region) = Region::from_bbox(bbox, image.width(), image.height()) else {
                continue;
            };
            let embedding = self.recognizer.extract(image, bbox)?;
            faces.push(DetectedFace { region, embedding });
        }
        Ok(faces)
    }
}
