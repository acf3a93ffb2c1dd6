//! facetag-render — Draw match labels onto images and write them out.
//!
//! Implements the core [`facetag_core::Annotator`] with plain pixel drawing
//! on `image` buffers and a built-in bitmap font.

pub mod annotator;
pub mod font;

pub use annotator::{AnnotationStyle, LabelAnnotator};
