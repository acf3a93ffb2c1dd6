use crate::types::Region;
use image::RgbImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("cannot save {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Draws match labels onto images and writes them out.
pub trait Annotator {
    /// Draw a labeled box around `region`, in place.
    fn draw(&self, image: &mut RgbImage, region: &Region, label: &str);

    /// Write `image` to `path`, in the format implied by its extension.
    fn save(&self, image: &RgbImage, path: &Path) -> Result<(), AnnotateError>;
}
