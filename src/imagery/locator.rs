/// Turning image references into fetchable locations

use std::path::{Path, PathBuf};

use crate::state::data::ImageRef;

/// Requested display size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeHint {
    Thumbnail(u32),
    Full(u32),
}

impl SizeHint {
    pub fn edge(self) -> u32 {
        match self {
            SizeHint::Thumbnail(edge) | SizeHint::Full(edge) => edge,
        }
    }
}

/// Where an image's bytes come from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageSource {
    Remote(String),
    Local(PathBuf),
}

/// Whether a locator points at an HTTP(S) resource
pub fn is_remote(image: &ImageRef) -> bool {
    let locator = image.locator();
    locator.starts_with("http://") || locator.starts_with("https://")
}

/// Ghost image URL with `wid`/`hei` size hints.
/// URLs that already carry a query are used as-is.
pub fn sized_source_url(image: &ImageRef, hint: SizeHint) -> String {
    let locator = image.locator();
    if locator.contains('?') {
        return locator.to_string();
    }
    let edge = hint.edge();
    format!("{locator}?wid={edge}&hei={edge}&fmt=jpg")
}

/// Resolve a ghost image (remote URL, or a local path as-is)
pub fn source_location(image: &ImageRef, hint: SizeHint) -> ImageSource {
    if is_remote(image) {
        ImageSource::Remote(sized_source_url(image, hint))
    } else {
        ImageSource::Local(PathBuf::from(image.locator()))
    }
}

/// Generated images are stored relative to the output root
pub fn candidate_path(image: &ImageRef, output_root: &Path) -> PathBuf {
    output_root.join(image.locator())
}

pub fn candidate_location(image: &ImageRef, output_root: &Path) -> ImageSource {
    ImageSource::Local(candidate_path(image, output_root))
}
