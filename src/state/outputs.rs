/// Discovery of generated images from the generator's metadata logs
///
/// Each generated image `<output>/<tranche>/<id>_l<counter>.jpg` is paired
/// with a JSON log `<output>/logs/<tranche>/<id>_l<counter>.json`.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::data::{CandidateImage, EngineVersion, ImageRef, Prompts};

/// Metadata written next to every generated image
#[derive(Debug, Deserialize)]
struct GenerationLog {
    #[serde(default)]
    tranche: Option<String>,
    #[serde(default)]
    image_file: String,
    #[serde(default)]
    model_id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    engine_version: Option<String>,
    #[serde(default)]
    prompts: LoggedPrompts,
}

#[derive(Debug, Default, Deserialize)]
struct LoggedPrompts {
    #[serde(default)]
    positive: Option<String>,
    #[serde(default)]
    negative: Option<String>,
}

/// Generated images under an output root
#[derive(Debug, Clone)]
pub struct OutputIndex {
    base: PathBuf,
}

impl OutputIndex {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn logs_dir(&self) -> PathBuf {
        self.base.join("logs")
    }

    /// Absolute path of a candidate locator
    pub fn resolve(&self, image: &ImageRef) -> PathBuf {
        self.base.join(image.locator())
    }

    /// Walk every JSON log under the logs directory
    fn log_files(&self) -> impl Iterator<Item = PathBuf> {
        WalkDir::new(self.logs_dir())
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")))
    }

    /// Ids of products with at least one displayable generated image.
    /// Uses the same acceptance rule as [`OutputIndex::candidates_for`].
    pub fn products_with_generations(&self) -> HashSet<String> {
        self.log_files()
            .filter_map(|path| {
                let product_id = log_product_id(&path)?.to_string();
                self.read_candidate(&path).map(|_| product_id)
            })
            .collect()
    }

    /// Generated images of a product whose image file still exists, sorted by filename
    pub fn candidates_for(&self, product_id: &str) -> Vec<CandidateImage> {
        let mut candidates: Vec<CandidateImage> = self
            .log_files()
            .filter(|path| log_product_id(path) == Some(product_id))
            .filter_map(|path| self.read_candidate(&path))
            .collect();

        candidates.sort_by(|a, b| a.file_name().cmp(b.file_name()));
        candidates
    }

    fn read_candidate(&self, log_path: &Path) -> Option<CandidateImage> {
        let contents = match std::fs::read_to_string(log_path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(path = %log_path.display(), error = %e, "unreadable generation log");
                return None;
            }
        };
        let log: GenerationLog = match serde_json::from_str(&contents) {
            Ok(log) => log,
            Err(e) => {
                warn!(path = %log_path.display(), error = %e, "malformed generation log");
                return None;
            }
        };

        let engine_version = log
            .engine_version
            .as_deref()
            .map(EngineVersion::from_tag)
            .unwrap_or_default();
        if let EngineVersion::Other(tag) = &engine_version {
            debug!(path = %log_path.display(), engine = %tag, "unrecognised engine version");
        }
        if log.image_file.is_empty() {
            return None;
        }

        let tranche = log.tranche.unwrap_or_else(|| "Unknown".to_string());
        let image = ImageRef::new(format!("{}/{}", tranche, log.image_file));
        if !self.resolve(&image).exists() {
            return None;
        }

        Some(CandidateImage {
            image,
            engine_version,
            model_id: log
                .model_id
                .or(log.model)
                .unwrap_or_else(|| "unknown".to_string()),
            prompts: Prompts::new(log.prompts.positive.unwrap_or_default(), log.prompts.negative),
        })
    }
}

/// `"<id>_l101"` → `"<id>"`; the last segment must be `l` plus a counter
fn product_id_from_log_stem(stem: &str) -> Option<&str> {
    let (id, counter) = stem.rsplit_once('_')?;
    let digits = counter.strip_prefix('l')?;
    if id.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(id)
}

fn log_product_id(path: &Path) -> Option<&str> {
    product_id_from_log_stem(path.file_stem()?.to_str()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_generation(base: &Path, tranche: &str, stem: &str, log: &str, with_image: bool) {
        let logs = base.join("logs").join(tranche);
        fs::create_dir_all(&logs).unwrap();
        fs::write(logs.join(format!("{stem}.json")), log).unwrap();
        if with_image {
            let images = base.join(tranche);
            fs::create_dir_all(&images).unwrap();
            fs::write(images.join(format!("{stem}.jpg")), b"jpeg").unwrap();
        }
    }

    #[test]
    fn test_log_stem_parsing() {
        assert_eq!(product_id_from_log_stem("133162986_0_0_0_0_l101"), Some("133162986_0_0_0_0"));
        assert_eq!(product_id_from_log_stem("p1_l7"), Some("p1"));
        assert_eq!(product_id_from_log_stem("summary"), None);
        assert_eq!(product_id_from_log_stem("summary_latest"), None);
        assert_eq!(product_id_from_log_stem("p1_l"), None);
        assert_eq!(product_id_from_log_stem("p1_l10a"), None);
        assert_eq!(product_id_from_log_stem("_l101"), None);
    }

    #[test]
    fn test_candidates_require_existing_images() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();
        write_generation(
            base,
            "T1",
            "p1_l102",
            r#"{"tranche":"T1","image_file":"p1_l102.jpg","model":"gemini-3-pro-image-preview",
                "engine_version":"v2_nanobananapro","prompts":{"positive":"on white","negative":""}}"#,
            true,
        );
        write_generation(
            base,
            "T1",
            "p1_l101",
            r#"{"tranche":"T1","image_file":"p1_l101.jpg","model_id":"gemini-2.5-flash-image",
                "prompts":{"positive":"on white","negative":"text, logos"}}"#,
            true,
        );
        write_generation(
            base,
            "T1",
            "p1_l103",
            r#"{"tranche":"T1","image_file":"p1_l103.jpg","prompts":{"positive":"x"}}"#,
            false,
        );
        write_generation(base, "T1", "p1_l104", "{ not json", true);
        write_generation(
            base,
            "T1",
            "p10_l101",
            r#"{"tranche":"T1","image_file":"p10_l101.jpg","prompts":{"positive":"x"}}"#,
            true,
        );

        let index = OutputIndex::new(base);
        let candidates = index.candidates_for("p1");
        assert_eq!(candidates.len(), 2);

        assert_eq!(candidates[0].image, ImageRef::new("T1/p1_l101.jpg"));
        assert_eq!(candidates[0].engine_version, EngineVersion::V1);
        assert_eq!(candidates[0].model_id, "gemini-2.5-flash-image");
        assert_eq!(candidates[0].prompts.negative_display(), "text, logos");

        assert_eq!(candidates[1].engine_version, EngineVersion::V2NanoBananaPro);
        assert_eq!(candidates[1].model_id, "gemini-3-pro-image-preview");
        assert_eq!(candidates[1].prompts.negative, None);
        assert!(index.resolve(&candidates[1].image).exists());

        let generated = index.products_with_generations();
        assert!(generated.contains("p1"));
        assert!(generated.contains("p10"));
    }

    #[test]
    fn test_unknown_engine_and_missing_prompt_still_listed() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path();
        write_generation(
            base,
            "T1",
            "p1_l101",
            r#"{"tranche":"T1","image_file":"p1_l101.jpg","engine_version":"v3"}"#,
            true,
        );
        // Missing image: neither listed nor counted
        write_generation(
            base,
            "T1",
            "p2_l101",
            r#"{"tranche":"T1","image_file":"p2_l101.jpg","prompts":{"positive":"x"}}"#,
            false,
        );
        // Not a generation log
        write_generation(base, "T1", "summary_latest", r#"{"runs": 3}"#, false);

        let index = OutputIndex::new(base);
        let candidates = index.candidates_for("p1");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].engine_version, EngineVersion::Other("v3".to_string()));
        assert_eq!(candidates[0].prompts.positive, "");

        let generated = index.products_with_generations();
        assert_eq!(generated, HashSet::from(["p1".to_string()]));
    }

    #[test]
    fn test_missing_output_root_is_empty() {
        let index = OutputIndex::new("/nonexistent/ghost-workbench-output");
        assert!(index.candidates_for("p1").is_empty());
        assert!(index.products_with_generations().is_empty());
    }
}
