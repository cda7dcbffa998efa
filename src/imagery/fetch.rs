/// Loading image bytes for display

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use super::locator::ImageSource;
use super::thumbnail::{cached_thumbnail, thumbnail_path};
use crate::error::{Result, WorkbenchError};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

async fn fetch_remote(url: &str) -> Result<Vec<u8>> {
    let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

/// Read the bytes behind an image source
pub async fn fetch_bytes(source: &ImageSource) -> Result<Vec<u8>> {
    match source {
        ImageSource::Remote(url) => fetch_remote(url).await,
        ImageSource::Local(path) => tokio::fs::read(path)
            .await
            .map_err(|e| WorkbenchError::io(path, e)),
    }
}

/// Async wrapper for `Task::perform`; failures are logged and reported by key
pub async fn fetch_async(source: ImageSource) -> (ImageSource, std::result::Result<Vec<u8>, String>) {
    let result = fetch_bytes(&source).await.map_err(|e| {
        warn!(source = ?source, error = %e, "image fetch failed");
        e.to_string()
    });
    (source, result)
}

/// Cache key of a generated image's thumbnail: the thumbnail file when a
/// disk cache exists, otherwise the image itself
pub fn candidate_thumbnail_key(path: &Path, cache_dir: Option<&Path>, size: u32) -> ImageSource {
    match cache_dir {
        Some(dir) => ImageSource::Local(thumbnail_path(dir, path, size)),
        None => ImageSource::Local(path.to_path_buf()),
    }
}

/// Thumbnail of a local generated image, served from the disk cache.
/// Falls back to the original bytes if the thumbnail cannot be produced.
pub async fn candidate_thumbnail_async(
    path: PathBuf,
    cache_dir: Option<PathBuf>,
    size: u32,
) -> (ImageSource, std::result::Result<Vec<u8>, String>) {
    let key = candidate_thumbnail_key(&path, cache_dir.as_deref(), size);
    let source = match cache_dir {
        Some(dir) => {
            let original = path.clone();
            let generated = tokio::task::spawn_blocking(move || cached_thumbnail(&original, &dir, size)).await;
            match generated {
                Ok(Ok(thumbnail)) => ImageSource::Local(thumbnail),
                Ok(Err(e)) => {
                    warn!(path = %path.display(), error = %e, "thumbnail generation failed");
                    ImageSource::Local(path)
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "thumbnail task failed");
                    ImageSource::Local(path)
                }
            }
        }
        None => ImageSource::Local(path),
    };
    let (_, result) = fetch_async(source).await;
    (key, result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, b"bytes").unwrap();

        let (source, result) = fetch_async(ImageSource::Local(path.clone())).await;
        assert_eq!(source, ImageSource::Local(path));
        assert_eq!(result.unwrap(), b"bytes");

        let (_, missing) = fetch_async(ImageSource::Local(dir.path().join("b.jpg"))).await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_remote_failure_reported_as_error() {
        let url = "http://127.0.0.1:9/missing.jpg".to_string();
        let (source, result) = fetch_async(ImageSource::Remote(url.clone())).await;
        assert_eq!(source, ImageSource::Remote(url));
        assert!(result.unwrap_err().starts_with("HTTP request failed"));
    }

    #[tokio::test]
    async fn test_candidate_thumbnail_keyed_apart_from_full_image() {
        let out = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        let path = out.path().join("T1_001.png");
        image::RgbImage::new(64, 32).save(&path).unwrap();

        let (key, result) = candidate_thumbnail_async(path.clone(), Some(cache.path().to_path_buf()), 16).await;
        assert_ne!(key, ImageSource::Local(path.clone()));
        assert_eq!(key, candidate_thumbnail_key(&path, Some(cache.path()), 16));
        let bytes = result.unwrap();
        let thumbnail = image::load_from_memory(&bytes).unwrap();
        assert_eq!((thumbnail.width(), thumbnail.height()), (16, 8));

        // Without a cache the original stands in
        let (key, _) = candidate_thumbnail_async(path.clone(), None, 16).await;
        assert_eq!(key, ImageSource::Local(path));
    }
}
