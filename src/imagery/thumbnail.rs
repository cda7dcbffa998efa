use image::imageops::FilterType;
use sha2::{Digest, Sha256};
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, WorkbenchError};

/// Get the thumbnail cache directory
/// Returns ~/.cache/ghost-workbench/thumbnails on Linux
pub fn thumbnail_cache_dir() -> Result<PathBuf> {
    let mut path = dirs::cache_dir()
        .or_else(dirs::home_dir)
        .ok_or(WorkbenchError::NoDirectory("cache"))?;

    path.push("ghost-workbench");
    path.push("thumbnails");

    fs::create_dir_all(&path).map_err(|e| WorkbenchError::io(&path, e))?;
    Ok(path)
}

/// Leading bytes of the SHA-256 digest kept in cache file names
const KEY_BYTES: usize = 12;

/// Stable cache key for a source path: hex SHA-256 prefix of its bytes
fn path_key(path: &Path) -> String {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    let mut hex = String::with_capacity(KEY_BYTES * 2);
    for byte in &digest[..KEY_BYTES] {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Cache location of the thumbnail for `source` (doesn't generate, just returns the expected path)
pub fn thumbnail_path(cache_dir: &Path, source: &Path, size: u32) -> PathBuf {
    cache_dir.join(format!("{}_{}.jpg", path_key(source), size))
}

/// A cached thumbnail is stale when missing or older than its source
fn is_fresh(thumbnail: &Path, source: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(thumbnail), modified(source)) {
        (Some(thumb), Some(src)) => thumb >= src,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Return the cached thumbnail for `source`, generating it if needed
pub fn cached_thumbnail(source: &Path, cache_dir: &Path, size: u32) -> Result<PathBuf> {
    let thumbnail_path = thumbnail_path(cache_dir, source, size);
    if is_fresh(&thumbnail_path, source) {
        return Ok(thumbnail_path);
    }

    let img = image::open(source)?;
    let thumbnail = img.resize(size, size, FilterType::Lanczos3);
    // JPEG has no alpha channel
    thumbnail.to_rgb8().save(&thumbnail_path)?;

    debug!(path = %thumbnail_path.display(), "📸 generated thumbnail");
    Ok(thumbnail_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_thumbnail_is_generated_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("p1_l101.png");
        RgbImage::from_pixel(600, 300, Rgb([200, 10, 10])).save(&source).unwrap();
        let cache = dir.path().join("cache");
        fs::create_dir_all(&cache).unwrap();

        let first = cached_thumbnail(&source, &cache, 128).unwrap();
        let thumb = image::open(&first).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (128, 64));

        let second = cached_thumbnail(&source, &cache, 128).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_thumbnail_paths_differ_by_source_and_size() {
        let cache = Path::new("/cache");
        let a = thumbnail_path(cache, Path::new("/out/T1/a.jpg"), 256);
        assert_ne!(a, thumbnail_path(cache, Path::new("/out/T1/b.jpg"), 256));
        assert_ne!(a, thumbnail_path(cache, Path::new("/out/T1/a.jpg"), 128));
        assert_eq!(a, thumbnail_path(cache, Path::new("/out/T1/a.jpg"), 256));
    }

    #[test]
    fn test_cache_names_use_sha256_prefix() {
        // sha256("abc") = ba7816bf8f01cfea414140de5dae2223...
        assert_eq!(path_key(Path::new("abc")), "ba7816bf8f01cfea414140de");
        let name = thumbnail_path(Path::new("/cache"), Path::new("abc"), 64);
        assert_eq!(name, Path::new("/cache/ba7816bf8f01cfea414140de_64.jpg"));
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(cached_thumbnail(&dir.path().join("absent.jpg"), dir.path(), 64).is_err());
    }
}
