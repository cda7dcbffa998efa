/// Image retrieval module
///
/// This module handles:
/// - Resolving ghost and generated image locators (locator.rs)
/// - Fetching image bytes from the CDN or disk (fetch.rs)
/// - Generating and caching thumbnails of generated images (thumbnail.rs)

pub mod fetch;
pub mod locator;
pub mod thumbnail;

pub use locator::{ImageSource, SizeHint};
