use criterion::{criterion_group, criterion_main, Criterion};
use page_mirror::{discover, generate_name, rewrite, HtmlParser, ResourceType, UrlMap};
use std::hint::black_box;
use url::Url;

const PAGE: &str = r#"
    <html>
        <head>
            <link rel="stylesheet" href="/style.css">
            <script src="/script.js"></script>
            <link rel="stylesheet" href="/theme.css">
            <script src="/utils.js"></script>
        </head>
        <body>
            <img src="/logo.png" alt="Logo">
            <img src="/banner.jpg" alt="Banner">
            <a href="/about">About</a>
            <a href="/contact">Contact</a>
            <img src="https://cdn.example.org/photos/team%20photo.webp">
        </body>
    </html>
"#;

fn bench_discovery(c: &mut Criterion) {
    let parser = HtmlParser::new("https://example.com").unwrap();

    c.bench_function("extract_resources", |b| {
        b.iter(|| {
            let _resources = parser.extract_resources(black_box(PAGE));
        });
    });
}

fn bench_name_generation(c: &mut Criterion) {
    let urls: Vec<(Url, ResourceType)> = vec![
        ("https://example.com/style.css", ResourceType::CSS),
        ("https://example.com/assets/", ResourceType::CSS),
        ("https://example.com/bundle?v=3", ResourceType::JavaScript),
        ("https://example.com/path%20with%20spaces.png", ResourceType::Image),
        ("https://example.com/a:b|c*d.gif", ResourceType::Image),
    ]
    .into_iter()
    .map(|(u, t)| (Url::parse(u).unwrap(), t))
    .collect();

    c.bench_function("generate_name", |b| {
        b.iter(|| {
            for (url, resource_type) in &urls {
                let _name = generate_name(black_box(url), *resource_type);
            }
        });
    });
}

fn bench_rewrite(c: &mut Criterion) {
    let base = Url::parse("https://example.com/").unwrap();
    let mapping: UrlMap = discover(PAGE, &base)
        .into_iter()
        .map(|r| {
            let name = generate_name(&r.url, r.resource_type);
            (r.url.to_string(), format!("{}/{}", r.resource_type.dir_name(), name))
        })
        .collect();

    c.bench_function("rewrite", |b| {
        b.iter(|| {
            let _html = rewrite(black_box(PAGE), &base, &mapping);
        });
    });
}

criterion_group!(benches, bench_discovery, bench_name_generation, bench_rewrite);
criterion_main!(benches);
