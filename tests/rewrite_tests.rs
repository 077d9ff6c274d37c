use page_mirror::{discover, generate_name, rewrite, UrlMap};
use url::Url;

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <LINK REL="stylesheet" HREF="../css/main.css?v=2">
    <link rel='alternate stylesheet' href='//cdn.example.org/alt.css'>
    <link rel="preload" href="/fonts/a.woff2">
    <script src=/js/app.js defer></script>
    <script type="module" src="https://example.com/js/module.mjs"></script>
</head>
<body>
    <img src="photos/cat.jpg#frag" alt="cat">
    <img alt="dog" src="/photos/dog.png?size=large&amp;fmt=png">
    <img src="">
</body>
</html>"#;

fn base() -> Url {
    Url::parse("https://example.com/blog/post/").unwrap()
}

fn mapping_for(html: &str) -> UrlMap {
    discover(html, &base())
        .into_iter()
        .map(|r| {
            let name = generate_name(&r.url, r.resource_type);
            (r.url.to_string(), format!("{}/{}", r.resource_type.dir_name(), name))
        })
        .collect()
}

#[test]
fn test_every_discovered_reference_is_rewritten() {
    let mapping = mapping_for(PAGE);
    assert_eq!(mapping.len(), 6, "{:#?}", mapping);

    let rewritten = rewrite(PAGE, &base(), &mapping);
    for local in mapping.values() {
        assert!(rewritten.contains(local.as_str()), "{} missing from\n{}", local, rewritten);
    }

    // Nothing left that the discoverer would still resolve to a mapped URL.
    assert!(discover(&rewritten, &base()).iter().all(|r| !mapping.contains_key(r.url.as_str())));
}

#[test]
fn test_untouched_parts_survive() {
    let mapping = mapping_for(PAGE);
    let rewritten = rewrite(PAGE, &base(), &mapping);

    assert!(rewritten.starts_with("<!DOCTYPE html>\n<html>"));
    assert!(rewritten.contains(r#"<link rel="preload" href="/fonts/a.woff2">"#));
    assert!(rewritten.contains(r#"<img src="">"#));
    assert!(rewritten.contains(r#"alt="dog""#));
    assert!(rewritten.contains(" defer></script>"));
}

#[test]
fn test_rewriting_twice_changes_nothing() {
    let mapping = mapping_for(PAGE);
    let once = rewrite(PAGE, &base(), &mapping);
    assert_eq!(rewrite(&once, &base(), &mapping), once);
}

#[test]
fn test_empty_mapping_is_identity() {
    assert_eq!(rewrite(PAGE, &base(), &UrlMap::new()), PAGE);
}

#[test]
fn test_rewrite_follows_discovery_on_unusual_markup() {
    let asset = "https://example.com/blog/post/a.png";
    let mapping: UrlMap = [(asset.to_string(), "images/a.png".to_string())].into_iter().collect();

    let pages = [
        (r#"<!--><img src="a.png"><!-- x -->"#, true),
        (r#"<!---><img src="a.png">"#, true),
        (r#"<!-- x --!><img src="a.png">"#, true),
        (r#"<img-slider src="a.png"></img-slider>"#, false),
        (r#"<noscript><img src="a.png"></noscript>"#, false),
        (r#"<iframe><img src="a.png"></iframe>"#, false),
        (r#"<xmp><img src="a.png"></xmp>"#, false),
        (r#"<noembed><img src="a.png"></noembed>"#, false),
        (r#"<noframes><img src="a.png"></noframes>"#, false),
        (r#"<img src="a.png&#x3F;v=1">"#, false),
        (r#"<img src="a&period;png">"#, true),
    ];

    for (html, expected) in pages {
        let discovered = discover(html, &base()).iter().any(|r| r.url.as_str() == asset);
        assert_eq!(discovered, expected, "discovery of {}", html);

        let rewritten = rewrite(html, &base(), &mapping);
        assert_eq!(rewritten.contains("images/a.png"), discovered, "rewrite of {}", html);
    }
}
