pub mod cli;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod file_manager;
pub mod html_parser;
pub mod logging;
pub mod mirror;
pub mod naming;
pub mod rewriter;
pub mod types;

// Re-export main types for convenience
pub use config::MirrorOptions;
pub use error::{FetchFailure, MirrorError};
pub use fetcher::{build_http_client, fetch, fetch_page, FetchedPage};
pub use file_manager::{FileEntry, FileManager};
pub use html_parser::{discover, HtmlParser, ResourceLink, ResourceType};
pub use mirror::{mirror, mirror_with_options, validate_url, WebsiteMirror};
pub use naming::generate_name;
pub use rewriter::rewrite;
pub use types::{AssetEntry, AssetFailure, FetchOutcome, MirrorResult, UrlMap};
