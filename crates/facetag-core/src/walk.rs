//! Deterministic directory listings.
//!
//! Entries are sorted by file name so gallery order and batch order do not
//! depend on the filesystem's native enumeration order. Hidden entries
//! (leading `.`) are skipped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

fn sorted_entries(dir: &Path, want_dir: bool) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        // follows symlinks, so linked label dirs and images still count
        let path = entry.path();
        let keep = if want_dir { path.is_dir() } else { path.is_file() };
        if keep {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Immediate subdirectories of `dir`, sorted by name.
pub fn subdirectories(dir: &Path) -> io::Result<Vec<PathBuf>> {
    sorted_entries(dir, true)
}

/// Regular files directly inside `dir`, sorted by name.
pub fn files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    sorted_entries(dir, false)
}

/// Decode an image file to 8-bit RGB.
///
/// The format is sniffed from the file contents, falling back to the
/// extension, so misnamed or extensionless photos still load.
pub fn load_rgb(path: &Path) -> Result<image::RgbImage, image::ImageError> {
    let reader = image::ImageReader::open(path)?.with_guessed_format()?;
    Ok(reader.decode()?.to_rgb8())
}
