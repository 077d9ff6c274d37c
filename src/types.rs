use serde::ser::SerializeStruct;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::FetchFailure;
use crate::html_parser::ResourceType;

/// Absolute asset URL to the local reference that replaces it.
pub type UrlMap = BTreeMap<String, String>;

/// One successfully stored asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetEntry {
    pub url: String,
    /// Path relative to the destination directory, `/`-separated.
    pub local_path: String,
}

/// Why an attempted asset is missing from the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetFailure {
    Fetch(FetchFailure),
    /// The body was fetched but could not be written to disk.
    Write { url: String, message: String },
}

impl AssetFailure {
    /// Taxonomy tag: one of the [`FetchFailure::kind`] tags or `write_error`.
    pub fn kind(&self) -> &'static str {
        match self {
            AssetFailure::Fetch(failure) => failure.kind(),
            AssetFailure::Write { .. } => "write_error",
        }
    }
}

impl std::fmt::Display for AssetFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetFailure::Fetch(failure) => write!(f, "{}", failure),
            AssetFailure::Write { url, message } => write!(f, "write error for {}: {}", url, message),
        }
    }
}

impl Serialize for AssetFailure {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AssetFailure", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Record of a single attempted download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchOutcome {
    pub url: String,
    pub resource_type: ResourceType,
    pub local_path: Option<String>,
    pub failure: Option<AssetFailure>,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        self.local_path.is_some()
    }
}

/// Everything a mirror operation produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MirrorResult {
    pub html_original: String,
    pub stylesheets: Vec<AssetEntry>,
    pub scripts: Vec<AssetEntry>,
    pub images: Vec<AssetEntry>,
    /// Human-readable failures, root first, then assets in discovery order.
    pub errors: Vec<String>,
    pub url_to_local: UrlMap,
    pub base_url: String,
    /// Set when the page itself could not be fetched.
    #[serde(serialize_with = "optional_display")]
    pub root_failure: Option<FetchFailure>,
    /// Per-asset outcomes in discovery order.
    pub outcomes: Vec<FetchOutcome>,
}

impl MirrorResult {
    pub(crate) fn new(base_url: String) -> Self {
        Self { base_url, ..Self::default() }
    }

    pub fn assets(&self, resource_type: ResourceType) -> &[AssetEntry] {
        match resource_type {
            ResourceType::CSS => &self.stylesheets,
            ResourceType::JavaScript => &self.scripts,
            ResourceType::Image => &self.images,
        }
    }

    pub(crate) fn assets_mut(&mut self, resource_type: ResourceType) -> &mut Vec<AssetEntry> {
        match resource_type {
            ResourceType::CSS => &mut self.stylesheets,
            ResourceType::JavaScript => &mut self.scripts,
            ResourceType::Image => &mut self.images,
        }
    }

    /// True when the page and every discovered asset were stored, i.e. the
    /// rewritten page needs no network access.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Short report of what was mirrored.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("HTML original: {} characters", self.html_original.chars().count()),
            format!("CSS files: {}", self.stylesheets.len()),
            format!("JS files: {}", self.scripts.len()),
            format!("Images: {}", self.images.len()),
        ];
        if !self.errors.is_empty() {
            lines.push(format!("Errors: {}", self.errors.len()));
            lines.extend(self.errors.iter().map(|e| format!("  - {}", e)));
        }
        lines
    }
}

fn optional_display<T: std::fmt::Display, S: serde::Serializer>(
    value: &Option<T>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.collect_str(value),
        None => serializer.serialize_none(),
    }
}
