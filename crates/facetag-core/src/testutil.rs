//! Fixtures shared by the gallery and batch tests.

use crate::provider::{EmbeddingProvider, ProviderError};
use crate::types::{DetectedFace, Embedding, Region};
use image::{Rgb, RgbImage};
use std::path::Path;

pub const RED: [u8; 3] = [255, 0, 0];
pub const GREEN: [u8; 3] = [0, 255, 0];
pub const BLUE: [u8; 3] = [0, 0, 255];
/// Pixel that makes [`ColorProvider`] fail.
pub const POISON: [u8; 3] = [1, 2, 3];

/// Reads faces from the first pixel row: every non-black pixel is one face
/// whose embedding is its color scaled to [0, 1]. Scanning stops at the
/// first black pixel.
#[derive(Default)]
pub struct ColorProvider {
    pub calls: usize,
}

impl EmbeddingProvider for ColorProvider {
    fn detect_faces(&mut self, image: &RgbImage) -> Result<Vec<DetectedFace>, ProviderError> {
        self.calls += 1;
        let mut faces = Vec::new();
        for x in 0..image.width() {
            let px = image.get_pixel(x, 0).0;
            if px == [0, 0, 0] {
                break;
            }
            if px == POISON {
                return Err(ProviderError::Other("poisoned pixel".into()));
            }
            faces.push(DetectedFace {
                region: Region { top: 1, right: x * 4 + 3, bottom: 6, left: x * 4 },
                embedding: Embedding::new(px.iter().map(|&c| c as f32 / 255.0).collect()),
            });
        }
        Ok(faces)
    }
}

/// Write a 64x8 PNG whose first row starts with `faces`.
pub fn write_faces(path: &Path, faces: &[[u8; 3]]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut image = RgbImage::new(64, 8);
    for (x, color) in faces.iter().enumerate() {
        image.put_pixel(x as u32, 0, Rgb(*color));
    }
    image.save(path).unwrap();
}
