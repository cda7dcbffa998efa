/// Decoded image handles shared by the product view and the viewer

use iced::widget::image::Handle;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use crate::imagery::ImageSource;

/// A loaded image with its pixel size
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub handle: Handle,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
enum Entry {
    Pending,
    Ready(LoadedImage),
    Failed(String),
}

/// In-memory cache keyed by resolved image source
#[derive(Debug, Default)]
pub struct ImageCache {
    entries: HashMap<ImageSource, Entry>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `source` as wanted; returns true when a fetch must be started
    pub fn request(&mut self, source: &ImageSource) -> bool {
        if self.entries.contains_key(source) {
            return false;
        }
        self.entries.insert(source.clone(), Entry::Pending);
        true
    }

    /// Store a fetch result, reading the dimensions from the image header.
    /// Results for sources pruned while the fetch was running are dropped.
    pub fn insert(&mut self, source: ImageSource, result: Result<Vec<u8>, String>) {
        if !self.entries.contains_key(&source) {
            return;
        }
        let entry = match result.and_then(decode) {
            Ok(image) => Entry::Ready(image),
            Err(e) => Entry::Failed(e),
        };
        self.entries.insert(source, entry);
    }

    pub fn get(&self, source: &ImageSource) -> Option<&LoadedImage> {
        match self.entries.get(source) {
            Some(Entry::Ready(image)) => Some(image),
            _ => None,
        }
    }

    pub fn error(&self, source: &ImageSource) -> Option<&str> {
        match self.entries.get(source) {
            Some(Entry::Failed(e)) => Some(e),
            _ => None,
        }
    }

    /// Drop failed entries so the next request fetches them again
    pub fn forget_failures(&mut self) {
        self.entries.retain(|_, entry| !matches!(entry, Entry::Failed(_)));
    }

    /// Evict everything not in `keep`
    pub fn retain_only(&mut self, keep: &HashSet<ImageSource>) {
        self.entries.retain(|source, _| keep.contains(source));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn decode(bytes: Vec<u8>) -> Result<LoadedImage, String> {
    let (width, height) = image::ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()
        .map_err(|e| e.to_string())?
        .into_dimensions()
        .map_err(|e| e.to_string())?;

    Ok(LoadedImage {
        handle: Handle::from_bytes(bytes),
        width,
        height,
    })
}
