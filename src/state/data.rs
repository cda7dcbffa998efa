/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the catalog layer and the UI layer.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Locator for a displayable image (a URL or a path under the output root)
///
/// Two images are the same image when their locators are equal, regardless
/// of where they appear in a list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    /// The raw locator string
    pub fn locator(&self) -> &str {
        &self.0
    }

    /// Last path segment, used as a short label in the UI
    pub fn file_name(&self) -> &str {
        let trimmed = self.0.split(['?', '#']).next().unwrap_or(&self.0);
        trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which generation engine produced a candidate
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EngineVersion {
    #[default]
    V1,
    V2NanoBananaPro,
    /// Tag written by an engine this build doesn't know; kept verbatim
    Other(String),
}

impl EngineVersion {
    /// Parse the tag written into generation logs and config
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "v1" => Self::V1,
            "v2_nanobananapro" => Self::V2NanoBananaPro,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::V1 => "v1",
            Self::V2NanoBananaPro => "v2_nanobananapro",
            Self::Other(tag) => tag,
        }
    }

    /// Human readable label for the viewer header
    pub fn label(&self) -> String {
        match self {
            Self::V1 => "Engine V1".to_string(),
            Self::V2NanoBananaPro => "Engine V2 (Nano Banana Pro)".to_string(),
            Self::Other(tag) => format!("Engine {tag}"),
        }
    }
}

/// Prompts recorded for a generated image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts {
    pub positive: String,
    /// `None` when the generation ran without a negative prompt
    pub negative: Option<String>,
}

impl Prompts {
    /// Placeholder shown when no negative prompt was used
    pub const NONE_PLACEHOLDER: &'static str = "none";

    /// Build prompts, treating a blank negative prompt as absent
    pub fn new(positive: impl Into<String>, negative: Option<String>) -> Self {
        Self {
            positive: positive.into(),
            negative: negative.filter(|n| !n.trim().is_empty()),
        }
    }

    /// Negative prompt as displayed, never an empty string
    pub fn negative_display(&self) -> &str {
        self.negative.as_deref().unwrap_or(Self::NONE_PLACEHOLDER)
    }
}

/// A generated image together with its provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateImage {
    /// Path relative to the output root (e.g. "T1/<id>_l101.jpg")
    pub image: ImageRef,
    pub engine_version: EngineVersion,
    pub model_id: String,
    pub prompts: Prompts,
}

impl CandidateImage {
    pub fn file_name(&self) -> &str {
        self.image.file_name()
    }
}

/// Full product record as served by the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub class_description: String,
    pub tranche: String,
    pub specifications: BTreeMap<String, String>,
    /// Ghost shots in asset-sequence order
    pub source_images: Vec<ImageRef>,
    /// Generated images sorted by filename
    pub candidate_images: Vec<CandidateImage>,
}

/// Lightweight entry for the product list
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSummary {
    pub id: String,
    pub name: String,
    pub class_description: String,
    pub tranche: String,
    pub has_generated_images: bool,
}
