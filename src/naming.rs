//! Local file names for downloaded assets.

use percent_encoding::percent_decode_str;
use sha2::{Digest, Sha256};
use url::Url;

use crate::html_parser::ResourceType;

/// Longest base name kept before an extension is appended.
pub const MAX_NAME_LEN: usize = 100;

const IMAGE_EXTENSIONS: [&str; 8] = [".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".bmp", ".ico"];

/// Derives a file name for `url` when stored as `resource_type`.
///
/// The name is the last path segment, percent-decoded and stripped of
/// characters that are illegal on common file systems. URLs without a usable
/// segment get `file_<hash>` where the hash is the first 8 hex digits of the
/// SHA-256 of the full URL.
pub fn generate_name(url: &Url, resource_type: ResourceType) -> String {
    let segment = url.path().rsplit('/').next().unwrap_or("");
    let decoded = percent_decode_str(segment).decode_utf8_lossy();

    let mut name = if decoded.is_empty() || decoded.chars().all(|c| c == '.') {
        format!("file_{}", short_hash(url.as_str()))
    } else {
        sanitize_file_name(&decoded)
    };

    if name.chars().count() > MAX_NAME_LEN {
        name = name.chars().take(MAX_NAME_LEN).collect();
    }

    if !has_expected_extension(&name, resource_type) {
        name.push_str(default_extension(resource_type));
    }

    name
}

/// Replaces control characters and `<>:"/\|?*` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Inserts `_n` before the extension: `photo.jpg` becomes `photo_1.jpg`.
pub fn disambiguate(name: &str, n: usize) -> String {
    let (stem, extension) = split_extension(name);
    format!("{}_{}{}", stem, n, extension)
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..8].to_string()
}

fn has_expected_extension(name: &str, resource_type: ResourceType) -> bool {
    let lower = name.to_ascii_lowercase();
    match resource_type {
        ResourceType::CSS => lower.ends_with(".css"),
        ResourceType::JavaScript => lower.ends_with(".js"),
        ResourceType::Image => IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)),
    }
}

fn default_extension(resource_type: ResourceType) -> &'static str {
    match resource_type {
        ResourceType::CSS => ".css",
        ResourceType::JavaScript => ".js",
        ResourceType::Image => ".jpg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_for(url: &str, resource_type: ResourceType) -> String {
        generate_name(&Url::parse(url).unwrap(), resource_type)
    }

    #[test]
    fn test_last_segment_is_used() {
        assert_eq!(name_for("https://example.com/static/site.css", ResourceType::CSS), "site.css");
        assert_eq!(name_for("https://example.com/a.png", ResourceType::Image), "a.png");
        assert_eq!(name_for("https://cdn.example.com/lib/app.min.js?v=3", ResourceType::JavaScript), "app.min.js");
    }

    #[test]
    fn test_default_extensions_are_appended() {
        assert_eq!(name_for("https://example.com/theme", ResourceType::CSS), "theme.css");
        assert_eq!(name_for("https://example.com/loader.php", ResourceType::JavaScript), "loader.php.js");
        assert_eq!(name_for("https://example.com/avatar", ResourceType::Image), "avatar.jpg");
        assert_eq!(name_for("https://example.com/logo.svg", ResourceType::Image), "logo.svg");
        assert_eq!(name_for("https://example.com/icon.ICO", ResourceType::Image), "icon.ICO");
    }

    #[test]
    fn test_hash_fallback_for_empty_segment() {
        let name = name_for("https://example.com/styles/", ResourceType::CSS);
        assert!(name.starts_with("file_"), "got {}", name);
        assert!(name.ends_with(".css"));
        assert_eq!(name.len(), "file_".len() + 8 + ".css".len());

        let root = name_for("https://example.com", ResourceType::Image);
        assert!(root.starts_with("file_") && root.ends_with(".jpg"));
    }

    #[test]
    fn test_hash_fallback_is_deterministic_and_distinct() {
        let a1 = name_for("https://example.com/a/", ResourceType::JavaScript);
        let a2 = name_for("https://example.com/a/", ResourceType::JavaScript);
        let b = name_for("https://example.com/b/", ResourceType::JavaScript);
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
    }

    #[test]
    fn test_illegal_characters_are_replaced() {
        assert_eq!(sanitize_file_name("a<b>c:d\"e|f?g*h\\i"), "a_b_c_d_e_f_g_h_i");
        assert_eq!(sanitize_file_name("tab\there"), "tab_here");
        assert_eq!(name_for("https://example.com/x%3Ay%2Fz.png", ResourceType::Image), "x_y_z.png");
    }

    #[test]
    fn test_percent_decoding() {
        assert_eq!(name_for("https://example.com/my%20photo.png", ResourceType::Image), "my photo.png");
    }

    #[test]
    fn test_dot_segments_fall_back_to_hash() {
        let name = name_for("https://example.com/%2E%2E", ResourceType::Image);
        assert!(name.starts_with("file_"), "got {}", name);
    }

    #[test]
    fn test_long_names_are_truncated() {
        let long = "x".repeat(150);
        let name = name_for(&format!("https://example.com/{}.css", long), ResourceType::CSS);
        assert_eq!(name, format!("{}.css", "x".repeat(100)));
    }

    #[test]
    fn test_disambiguate() {
        assert_eq!(disambiguate("photo.jpg", 1), "photo_1.jpg");
        assert_eq!(disambiguate("bundle.min.js", 2), "bundle.min_2.js");
        assert_eq!(disambiguate("noext", 3), "noext_3");
        assert_eq!(disambiguate(".hidden", 1), ".hidden_1");
    }
}
