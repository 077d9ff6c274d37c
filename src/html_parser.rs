use anyhow::{Context, Result};
use select::document::Document;
use select::predicate::Name;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use url::Url;

/// A reference found in markup, resolved against the page URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLink {
    pub url: Url,
    pub resource_type: ResourceType,
    /// Element and attribute the reference came from, e.g. `img[src]`.
    pub origin: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    #[serde(rename = "stylesheet")]
    CSS,
    #[serde(rename = "script")]
    JavaScript,
    Image,
}

impl ResourceType {
    pub const ALL: [ResourceType; 3] = [ResourceType::CSS, ResourceType::JavaScript, ResourceType::Image];

    /// Subdirectory of the destination holding this class of asset.
    pub fn dir_name(self) -> &'static str {
        match self {
            ResourceType::CSS => "css",
            ResourceType::JavaScript => "js",
            ResourceType::Image => "images",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResourceType::CSS => "stylesheet",
            ResourceType::JavaScript => "script",
            ResourceType::Image => "image",
        }
    }
}

/// Resolves a raw attribute value against `base`.
///
/// Returns `None` for empty values and for values that cannot be joined.
/// The discoverer and the rewriter both go through this function so a given
/// attribute always yields the same mapping key.
pub fn resolve_reference(base: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    base.join(raw).ok()
}

/// Whether a `rel` attribute value lists the `stylesheet` keyword.
pub fn is_stylesheet_rel(rel: &str) -> bool {
    rel.split_ascii_whitespace().any(|token| token.eq_ignore_ascii_case("stylesheet"))
}

#[derive(Clone)]
pub struct HtmlParser {
    base_url: Url,
}

impl HtmlParser {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Failed to parse base URL: {}", base_url))?;

        Ok(Self { base_url })
    }

    pub fn from_url(base_url: Url) -> Self {
        Self { base_url }
    }

    /// Every stylesheet, script and image reference in the document.
    ///
    /// Stylesheets come first, then scripts, then images, each in document
    /// order. Duplicates are kept; see [`HtmlParser::discover`].
    pub fn extract_resources(&self, html_content: &str) -> Vec<ResourceLink> {
        let document = Document::from(html_content);
        let mut resources = Vec::new();

        for link in document.find(Name("link")) {
            let is_stylesheet = link.attr("rel").map(is_stylesheet_rel).unwrap_or(false);
            if !is_stylesheet {
                continue;
            }
            if let Some(href) = link.attr("href") {
                self.push_resource(&mut resources, href, ResourceType::CSS, "link[href]");
            }
        }

        for script in document.find(Name("script")) {
            if let Some(src) = script.attr("src") {
                self.push_resource(&mut resources, src, ResourceType::JavaScript, "script[src]");
            }
        }

        for img in document.find(Name("img")) {
            if let Some(src) = img.attr("src") {
                self.push_resource(&mut resources, src, ResourceType::Image, "img[src]");
            }
        }

        resources
    }

    /// Like [`extract_resources`](Self::extract_resources) but keeps only
    /// the first reference to each distinct URL.
    pub fn discover(&self, html_content: &str) -> Vec<ResourceLink> {
        let mut seen = HashSet::new();
        self.extract_resources(html_content)
            .into_iter()
            .filter(|resource| seen.insert(resource.url.as_str().to_string()))
            .collect()
    }

    fn push_resource(
        &self,
        resources: &mut Vec<ResourceLink>,
        raw: &str,
        resource_type: ResourceType,
        origin: &'static str,
    ) {
        match resolve_reference(&self.base_url, raw) {
            Some(url) => resources.push(ResourceLink { url, resource_type, origin }),
            None if raw.trim().is_empty() => {}
            None => log::debug!("Skipping unresolvable {} reference: {}", resource_type.label(), raw),
        }
    }

    pub fn resolve_url(&self, url: &str) -> Result<Url> {
        resolve_reference(&self.base_url, url)
            .with_context(|| format!("Cannot resolve {:?} against {}", url, self.base_url))
    }
}

/// Deduplicated references of `html`, resolved against `base_url`.
pub fn discover(html: &str, base_url: &Url) -> Vec<ResourceLink> {
    HtmlParser::from_url(base_url.clone()).discover(html)
}
