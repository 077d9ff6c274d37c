use futures::stream::{self, StreamExt};
use futures::FutureExt;
use log::{debug, info, warn};
use reqwest::Client;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use url::Url;

use crate::config::MirrorOptions;
use crate::error::{FetchFailure, MirrorError};
use crate::fetcher::{build_http_client, fetch, fetch_page};
use crate::file_manager::{FileManager, LOCAL_PAGE, ORIGINAL_PAGE};
use crate::html_parser::{discover, ResourceLink};
use crate::naming::generate_name;
use crate::rewriter::rewrite;
use crate::types::{AssetEntry, AssetFailure, FetchOutcome, MirrorResult};

/// Checks that `url` is a non-empty absolute `http(s)` URL.
pub fn validate_url(url: &str) -> Result<Url, MirrorError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(MirrorError::EmptyUrl);
    }

    let parsed = Url::parse(trimmed).map_err(|e| MirrorError::MalformedUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(MirrorError::UnsupportedScheme {
            url: trimmed.to_string(),
            scheme: parsed.scheme().to_string(),
        });
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(MirrorError::MissingHost { url: trimmed.to_string() });
    }

    Ok(parsed)
}

/// Mirrors `url` into `destination` with default options.
///
/// Only input validation can fail; every later problem is reported through
/// [`MirrorResult::errors`].
pub async fn mirror(url: &str, destination: impl AsRef<Path>) -> Result<MirrorResult, MirrorError> {
    mirror_with_options(url, destination, MirrorOptions::default()).await
}

pub async fn mirror_with_options(
    url: &str,
    destination: impl AsRef<Path>,
    options: MirrorOptions,
) -> Result<MirrorResult, MirrorError> {
    let mirror = WebsiteMirror::new(url, destination.as_ref(), options)?;
    Ok(mirror.run().await)
}

/// One page mirror operation.
pub struct WebsiteMirror {
    base_url: Url,
    output_dir: PathBuf,
    options: MirrorOptions,
}

impl WebsiteMirror {
    /// Validates the request. Nothing is touched on disk or the network yet.
    pub fn new(url: &str, output_dir: &Path, options: MirrorOptions) -> Result<Self, MirrorError> {
        let base_url = validate_url(url)?;
        Ok(Self {
            base_url,
            output_dir: output_dir.to_path_buf(),
            options,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn options(&self) -> &MirrorOptions {
        &self.options
    }

    /// Fetches the page and its assets and writes the on-disk layout.
    pub async fn run(self) -> MirrorResult {
        let mut result = MirrorResult::new(self.base_url.to_string());
        info!("Mirroring {} into {:?}", self.base_url, self.output_dir);

        let files = match FileManager::new(&self.output_dir) {
            Ok(files) => files,
            Err(e) => return Self::abort(result, format!("{:#}", e)),
        };
        if self.options.clean_before_mirror {
            if let Err(e) = files.clean() {
                return Self::abort(result, format!("{:#}", e));
            }
        }

        let client = match build_http_client(&self.options) {
            Ok(client) => client,
            Err(e) => return Self::abort(result, format!("HTTP client initialization error: {}", e)),
        };

        let page = match fetch_page(&client, self.base_url.as_str(), self.options.timeout, self.options.max_asset_size).await {
            Ok(page) => page,
            Err(failure) => {
                warn!("Failed to fetch page: {}", failure);
                result.errors.push(failure.to_string());
                result.root_failure = Some(failure);
                return result;
            }
        };

        debug!("Decoded page as {}", page.encoding.name());
        result.html_original = page.text;
        if let Err(e) = files.write_page(ORIGINAL_PAGE, &page.body) {
            return Self::abort(result, format!("{:#}", e));
        }

        let resources = discover(&result.html_original, &self.base_url);
        info!("Found {} assets", resources.len());

        let staged = self.fetch_all(&client, &files, &resources).await;

        // Names are claimed in discovery order so collisions resolve the same
        // way on every run, whatever order the fetches finished in.
        for (resource, staged) in resources.iter().zip(staged) {
            let outcome = Self::claim(&files, resource, staged);
            match (&outcome.local_path, &outcome.failure) {
                (Some(local_path), _) => {
                    result.assets_mut(resource.resource_type).push(AssetEntry {
                        url: outcome.url.clone(),
                        local_path: local_path.clone(),
                    });
                    result.url_to_local.insert(outcome.url.clone(), local_path.clone());
                }
                (None, Some(failure)) => {
                    warn!("Skipping {}: {}", outcome.url, failure);
                    result.errors.push(failure.to_string());
                }
                (None, None) => {}
            }
            result.outcomes.push(outcome);
        }

        let rewritten = rewrite(&result.html_original, &self.base_url, &result.url_to_local);
        let (encoded, _, _) = page.encoding.encode(&rewritten);
        if let Err(e) = files.write_page(LOCAL_PAGE, &encoded) {
            result.errors.push(format!("{:#}", e));
        }

        info!(
            "Mirrored {}: {} stylesheets, {} scripts, {} images, {} errors",
            self.base_url,
            result.stylesheets.len(),
            result.scripts.len(),
            result.images.len(),
            result.errors.len()
        );
        result
    }

    fn abort(mut result: MirrorResult, error: String) -> MirrorResult {
        warn!("Mirror aborted: {}", error);
        result.errors.push(error);
        result
    }

    /// Fetches every asset with at most `max_concurrent` requests in flight
    /// and stages each body in its class directory. Results come back in
    /// discovery order.
    async fn fetch_all(
        &self,
        client: &Client,
        files: &FileManager,
        resources: &[ResourceLink],
    ) -> Vec<Result<TempPath, AssetFailure>> {
        let options = &self.options;
        let mut staged: Vec<(usize, Result<TempPath, AssetFailure>)> = stream::iter(resources.iter().enumerate())
            .map(|(index, resource)| async move {
                let url = resource.url.as_str();
                let attempt = AssertUnwindSafe(Self::fetch_asset(client, files, resource, options))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        Err(AssetFailure::Fetch(FetchFailure::Unknown {
                            url: url.to_string(),
                            message: "panic while downloading".to_string(),
                        }))
                    });
                (index, attempt)
            })
            .buffer_unordered(options.concurrency())
            .collect()
            .await;

        staged.sort_by_key(|(index, _)| *index);
        staged.into_iter().map(|(_, attempt)| attempt).collect()
    }

    async fn fetch_asset(
        client: &Client,
        files: &FileManager,
        resource: &ResourceLink,
        options: &MirrorOptions,
    ) -> Result<TempPath, AssetFailure> {
        let url = resource.url.as_str();
        debug!("Downloading {} {}", resource.resource_type.label(), url);

        let body = fetch(client, url, options.timeout, options.max_asset_size)
            .await
            .map_err(AssetFailure::Fetch)?;

        files.stage(resource.resource_type, &body).map_err(|e| AssetFailure::Write {
            url: url.to_string(),
            message: format!("{:#}", e),
        })
    }

    fn claim(
        files: &FileManager,
        resource: &ResourceLink,
        staged: Result<TempPath, AssetFailure>,
    ) -> FetchOutcome {
        let url = resource.url.to_string();
        let stored = staged.and_then(|staged| {
            let name = generate_name(&resource.url, resource.resource_type);
            files
                .persist_asset(staged, resource.resource_type, &name)
                .and_then(|path| files.local_reference(&path))
                .map_err(|e| AssetFailure::Write {
                    url: url.clone(),
                    message: format!("{:#}", e),
                })
        });

        match stored {
            Ok(local_path) => {
                debug!("Stored {} as {}", url, local_path);
                FetchOutcome {
                    url,
                    resource_type: resource.resource_type,
                    local_path: Some(local_path),
                    failure: None,
                }
            }
            Err(failure) => FetchOutcome {
                url,
                resource_type: resource.resource_type,
                local_path: None,
                failure: Some(failure),
            },
        }
    }
}
