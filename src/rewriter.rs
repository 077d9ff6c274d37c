//! Produces the offline copy of a page.
//!
//! The original text is never re-serialized. Start tags are located with a
//! lenient scanner and only the value span of a matching attribute is
//! substituted, so everything else in the output is byte-identical to the
//! input.

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

use crate::html_parser::{is_stylesheet_rel, resolve_reference};
use crate::types::UrlMap;

/// Elements whose content is text, not markup. `noscript` is included
/// because discovery parses with scripting enabled.
const RAW_TEXT_ELEMENTS: [&str; 9] = [
    "script", "style", "textarea", "title", "xmp", "iframe", "noembed", "noframes", "noscript",
];

/// Everything after a `plaintext` start tag is text.
const PLAINTEXT_ELEMENT: &str = "plaintext";

/// Comments (including the abrupt `<!-->` and `<!--->` forms), bogus
/// comments and end tags, or a start tag with its name and attribute text.
fn markup_token() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| {
        Regex::new(concat!(
            r#"(?s)<!--(?:-?>|.*?(?:--!?>|\z))"#,
            r#"|<[!?/][^>]*(?:>|\z)"#,
            r#"|<([A-Za-z][^\s/>]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#,
        ))
        .expect("markup token pattern is valid")
    })
}

fn attribute() -> &'static Regex {
    static ATTRIBUTE: OnceLock<Regex> = OnceLock::new();
    ATTRIBUTE.get_or_init(|| {
        Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"']\S*)))?"#)
            .expect("attribute pattern is valid")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quote {
    Double,
    Single,
    None,
}

#[derive(Debug)]
struct Attribute<'a> {
    name: String,
    value: &'a str,
    /// Byte range of the value including its quotes, relative to the page.
    span: (usize, usize),
    quote: Quote,
}

/// Replaces every stylesheet `href`, script `src` and image `src` whose
/// resolved URL is a key of `url_to_local` with the mapped local path.
///
/// References that are not in the map are left untouched, so running the
/// function again on its own output with the same map changes nothing.
pub fn rewrite(html: &str, base_url: &Url, url_to_local: &UrlMap) -> String {
    if url_to_local.is_empty() {
        return html.to_string();
    }

    let lower = html.to_ascii_lowercase();
    let mut output = String::with_capacity(html.len());
    let mut copied = 0;
    let mut pos = 0;

    while let Some(token) = markup_token().captures_at(html, pos) {
        let whole = match token.get(0) {
            Some(whole) => whole,
            None => break,
        };
        pos = whole.end();

        // Comments have no tag name.
        let tag = match token.get(1) {
            Some(name) => name.as_str().to_ascii_lowercase(),
            None => continue,
        };

        if let Some(body) = token.get(2) {
            let attributes = parse_attributes(body.as_str(), body.start());
            if let Some((span, replacement)) = substitution(&tag, &attributes, base_url, url_to_local) {
                output.push_str(&html[copied..span.0]);
                output.push_str(&replacement);
                copied = span.1;
            }
        }

        if tag == PLAINTEXT_ELEMENT {
            break;
        }
        if RAW_TEXT_ELEMENTS.contains(&tag.as_str()) {
            pos = closing_tag(&lower, pos, &tag);
        }
    }

    output.push_str(&html[copied..]);
    output
}

/// Offset of the `</tag` that ends a raw text element opened before `from`,
/// or the end of the page when it is never closed.
fn closing_tag(lower: &str, from: usize, tag: &str) -> usize {
    let closing = format!("</{}", tag);
    let mut search = from;
    while let Some(i) = lower[search..].find(&closing) {
        let start = search + i;
        let after = start + closing.len();
        match lower.as_bytes().get(after) {
            None | Some(b'>' | b'/' | b' ' | b'\t' | b'\n' | b'\r' | b'\x0c') => return start,
            Some(_) => search = after,
        }
    }
    lower.len()
}

fn parse_attributes(body: &str, offset: usize) -> Vec<Attribute<'_>> {
    let mut attributes: Vec<Attribute<'_>> = Vec::new();
    for caps in attribute().captures_iter(body) {
        let name = match caps.get(1) {
            Some(name) => name.as_str().to_ascii_lowercase(),
            None => continue,
        };
        // Duplicate attributes are ignored by browsers; the first one wins.
        if attributes.iter().any(|a| a.name == name) {
            continue;
        }
        let (value, span, quote) = if let Some(v) = caps.get(2) {
            (v.as_str(), (offset + v.start() - 1, offset + v.end() + 1), Quote::Double)
        } else if let Some(v) = caps.get(3) {
            (v.as_str(), (offset + v.start() - 1, offset + v.end() + 1), Quote::Single)
        } else if let Some(v) = caps.get(4) {
            (v.as_str(), (offset + v.start(), offset + v.end()), Quote::None)
        } else {
            continue;
        };
        attributes.push(Attribute { name, value, span, quote });
    }
    attributes
}

fn substitution(
    tag: &str,
    attributes: &[Attribute<'_>],
    base_url: &Url,
    url_to_local: &UrlMap,
) -> Option<((usize, usize), String)> {
    let find = |name: &str| attributes.iter().find(|a| a.name == name);

    let target = match tag {
        "link" => {
            let rel = find("rel")?;
            if !is_stylesheet_rel(&decode_entities(rel.value)) {
                return None;
            }
            find("href")?
        }
        "script" | "img" => find("src")?,
        _ => return None,
    };

    let resolved = resolve_reference(base_url, &decode_entities(target.value))?;
    let local = url_to_local.get(resolved.as_str())?;
    Some((target.span, quoted(local, target.quote)))
}

fn quoted(value: &str, quote: Quote) -> String {
    let escaped = value.replace('&', "&amp;");
    match quote {
        Quote::Single => format!("'{}'", escaped.replace('\'', "&#39;")),
        Quote::Double | Quote::None => format!("\"{}\"", escaped.replace('"', "&quot;")),
    }
}

/// Named references decoded inside attribute values. Only the ones that
/// show up in URLs are known; any other name is kept as literal text.
const NAMED_REFERENCES: [(&str, char); 22] = [
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
    ("copy", '\u{a9}'),
    ("reg", '\u{ae}'),
    ("colon", ':'),
    ("sol", '/'),
    ("quest", '?'),
    ("equals", '='),
    ("num", '#'),
    ("percnt", '%'),
    ("plus", '+'),
    ("comma", ','),
    ("period", '.'),
    ("semi", ';'),
    ("excl", '!'),
    ("lowbar", '_'),
    ("lpar", '('),
    ("rpar", ')'),
];

/// Names that are also recognised without the trailing `;`.
const LEGACY_REFERENCES: [&str; 7] = ["amp", "lt", "gt", "quot", "nbsp", "copy", "reg"];

/// Decodes numeric references and the named references in
/// [`NAMED_REFERENCES`], following the attribute-value rules for a missing
/// `;`.
fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }

    let mut decoded = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(idx) = rest.find('&') {
        decoded.push_str(&rest[..idx]);
        rest = &rest[idx + 1..];
        match character_reference(rest) {
            Some((c, consumed)) => {
                decoded.push(c);
                rest = &rest[consumed..];
            }
            None => decoded.push('&'),
        }
    }
    decoded.push_str(rest);
    decoded
}

/// Decodes the reference at the start of `after` (the text following `&`)
/// and returns the character with the number of bytes it used.
fn character_reference(after: &str) -> Option<(char, usize)> {
    if let Some(number) = after.strip_prefix('#') {
        let (digits, radix, prefix) = match number.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16, 2),
            None => (number, 10, 1),
        };
        let len = digits.bytes().take_while(|b| (*b as char).is_digit(radix)).count();
        if len == 0 {
            return None;
        }
        let c = u32::from_str_radix(&digits[..len], radix)
            .ok()
            .filter(|code| *code != 0)
            .and_then(char::from_u32)
            .unwrap_or('\u{fffd}');
        let terminated = digits[len..].starts_with(';');
        return Some((c, prefix + len + usize::from(terminated)));
    }

    let len = after.bytes().take_while(u8::is_ascii_alphanumeric).count();
    let name = &after[..len];
    let (_, c) = NAMED_REFERENCES.iter().find(|(known, _)| *known == name)?;
    match after.as_bytes().get(len) {
        Some(b';') => Some((*c, len + 1)),
        Some(b'=') => None,
        _ if LEGACY_REFERENCES.contains(&name) => Some((*c, len)),
        _ => None,
    }
}
