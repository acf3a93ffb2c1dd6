use crate::font;
use facetag_core::{AnnotateError, Annotator, Region};
use image::{ImageFormat, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Text sits this many pixels in from the left edge and up from the bottom.
const TEXT_MARGIN: i64 = 6;

/// Colors and sizes for match annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationStyle {
    pub box_color: [u8; 3],
    pub text_color: [u8; 3],
    /// Rectangle line thickness in pixels.
    pub thickness: u32,
    /// Height of the filled label strip along the bottom edge.
    pub strip_height: u32,
    /// Integer upscale of the 5x7 font.
    pub text_scale: u32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            box_color: [0, 255, 0],
            text_color: [255, 255, 255],
            thickness: 2,
            strip_height: 35,
            text_scale: 2,
        }
    }
}

/// Draws a rectangle, a filled label strip and the label text per match.
#[derive(Debug, Clone, Default)]
pub struct LabelAnnotator {
    style: AnnotationStyle,
}

impl LabelAnnotator {
    pub fn new(style: AnnotationStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &AnnotationStyle {
        &self.style
    }
}

/// Fill the inclusive rectangle [x0, x1] x [y0, y1], clipped to the image.
fn fill_rect(image: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    let x0 = x0.max(0);
    let y0 = y0.max(0);
    let x1 = x1.min(image.width() as i64 - 1);
    let y1 = y1.min(image.height() as i64 - 1);
    for y in y0..=y1 {
        for x in x0..=x1 {
            image.put_pixel(x as u32, y as u32, color);
        }
    }
}

impl Annotator for LabelAnnotator {
    fn draw(&self, image: &mut RgbImage, region: &Region, label: &str) {
        let style = &self.style;
        let color = Rgb(style.box_color);
        let (top, right, bottom, left) = (
            region.top as i64,
            region.right as i64,
            region.bottom as i64,
            region.left as i64,
        );
        let t = style.thickness.max(1) as i64;

        fill_rect(image, left, top, right, top + t - 1, color);
        fill_rect(image, left, bottom - t + 1, right, bottom, color);
        fill_rect(image, left, top, left + t - 1, bottom, color);
        fill_rect(image, right - t + 1, top, right, bottom, color);

        let strip_top = (bottom - style.strip_height as i64).max(top);
        fill_rect(image, left, strip_top, right, bottom, color);

        let scale = style.text_scale.max(1);
        let text_top = bottom - TEXT_MARGIN - (font::GLYPH_HEIGHT * scale) as i64 + 1;
        font::draw_text(image, left + TEXT_MARGIN, text_top, label, scale, Rgb(style.text_color));
    }

    /// Format follows the extension; unknown or missing extensions get PNG.
    fn save(&self, image: &RgbImage, path: &Path) -> Result<(), AnnotateError> {
        let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Png);
        image
            .save_with_format(path, format)
            .map_err(|source| AnnotateError::Save {
                path: path.to_path_buf(),
                source,
            })
    }
}
