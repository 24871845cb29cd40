//! Per-page signal extraction.
//!
//! [`extract`] is a pure function of `(url, html)`. `scraper` never fails on
//! malformed markup, so every field degrades to an empty value instead of
//! failing the page.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Node, Selector};
use tracing::{debug, instrument};
use url::Url;

use sitescout_shared::{PageSignals, SocialPlatform};

use crate::text::{dedup, normalize_whitespace, truncate_chars};

/// Maximum headings kept per page (and per aggregate).
pub const MAX_HEADINGS: usize = 30;

/// Upper bound on `cleaned_text`, in characters.
pub const MAX_TEXT_CHARS: usize = 5_000;

/// Below this many characters `cleaned_text` is padded with title, description and headings.
pub const MIN_TEXT_CHARS: usize = 2_000;

/// Elements whose text never counts as visible page content.
const NON_CONTENT_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "footer", "header", "svg", "iframe",
    "frame", "frameset",
];

/// Email-looking strings ending in these are asset names like `logo@2x.png`.
const IMAGE_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg", ".svg", ".gif", ".webp"];

// ---------------------------------------------------------------------------
// Compiled selectors and patterns
// ---------------------------------------------------------------------------

static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("title selector"));

static META_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("meta").expect("meta selector"));

static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3").expect("heading selector"));

static BODY_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("body selector"));

static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email regex")
});

/// Requires a parenthesized area code or a separator after it, so bare digit runs never match.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+\d{1,3}[\s.-]?)?(?:\(\d{3}\)[\s.-]?|\b\d{3}[\s.-])\d{3}[\s.-]\d{4}\b")
        .expect("phone regex")
});

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Extract the fixed signal record from one HTML document.
#[instrument(skip(html), fields(html_len = html.len()))]
pub fn extract(url: &str, html: &str) -> PageSignals {
    let doc = Html::parse_document(html);

    let title = extract_title(&doc);
    let meta_description = extract_description(&doc);
    let headings = extract_headings(&doc);
    let visible = visible_text(&doc);
    let cleaned_text = build_cleaned_text(&visible, &title, &meta_description, &headings);
    let emails = extract_emails(html);
    let phones = extract_phones(&visible);
    let social_links = extract_social_links(&doc);

    debug!(
        title = %title,
        headings = headings.len(),
        text_chars = cleaned_text.chars().count(),
        emails = emails.len(),
        phones = phones.len(),
        social = social_links.len(),
        "page signals extracted"
    );

    PageSignals {
        url: url.to_string(),
        title,
        meta_description,
        headings,
        cleaned_text,
        emails,
        phones,
        social_links,
    }
}

fn extract_title(doc: &Html) -> String {
    doc.select(&TITLE_SEL)
        .next()
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default()
}

/// `<meta name="description">`, else `og:description`, else empty.
fn extract_description(doc: &Html) -> String {
    let mut og_description: Option<&str> = None;

    for meta in doc.select(&META_SEL) {
        let el = meta.value();
        let content = el.attr("content").map(str::trim).unwrap_or_default();
        if content.is_empty() {
            continue;
        }

        let name = el.attr("name").unwrap_or_default();
        if name.eq_ignore_ascii_case("description") {
            return normalize_whitespace(content);
        }

        let property = el.attr("property").unwrap_or_default();
        if og_description.is_none()
            && (property.eq_ignore_ascii_case("og:description")
                || name.eq_ignore_ascii_case("og:description"))
        {
            og_description = Some(content);
        }
    }

    og_description.map(normalize_whitespace).unwrap_or_default()
}

fn extract_headings(doc: &Html) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut headings = Vec::new();

    for el in doc.select(&HEADING_SEL) {
        if headings.len() >= MAX_HEADINGS {
            break;
        }
        let text = normalize_whitespace(&el.text().collect::<String>());
        if text.is_empty() || !seen.insert(text.clone()) {
            continue;
        }
        headings.push(text);
    }

    headings
}

/// Body text outside non-content elements, whitespace-collapsed.
fn visible_text(doc: &Html) -> String {
    let root = doc
        .select(&BODY_SEL)
        .next()
        .unwrap_or_else(|| doc.root_element());

    let mut raw = String::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| NON_CONTENT_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            raw.push_str(text);
            raw.push(' ');
        }
    }

    normalize_whitespace(&raw)
}

/// Truncate to [`MAX_TEXT_CHARS`]; pad short text with title, description, then headings.
fn build_cleaned_text(visible: &str, title: &str, description: &str, headings: &[String]) -> String {
    let mut text = truncate_chars(visible, MAX_TEXT_CHARS);
    let mut len = text.chars().count();

    if len >= MIN_TEXT_CHARS {
        return text;
    }

    let padding = [title, description]
        .into_iter()
        .chain(headings.iter().map(String::as_str));

    for piece in padding {
        if len >= MIN_TEXT_CHARS {
            break;
        }
        if piece.is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push(' ');
            len += 1;
        }
        text.push_str(piece);
        len += piece.chars().count();
    }

    truncate_chars(&text, MAX_TEXT_CHARS)
}

/// Emails found anywhere in the raw markup, including `mailto:` hrefs.
fn extract_emails(html: &str) -> Vec<String> {
    dedup(
        EMAIL_RE
            .find_iter(html)
            .map(|m| m.as_str())
            .filter(|candidate| !is_image_filename(candidate)),
    )
}

fn is_image_filename(candidate: &str) -> bool {
    let lower = candidate.to_ascii_lowercase();
    IMAGE_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
}

fn extract_phones(visible: &str) -> Vec<String> {
    dedup(PHONE_RE.find_iter(visible).map(|m| m.as_str().trim()))
}

/// First link per platform, in document order.
fn extract_social_links(doc: &Html) -> BTreeMap<SocialPlatform, String> {
    let mut links = BTreeMap::new();

    for anchor in doc.select(&ANCHOR_SEL) {
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        if let Some(platform) = social_platform(href) {
            links.entry(platform).or_insert_with(|| href.to_string());
        }
        if links.len() == SocialPlatform::ALL.len() {
            break;
        }
    }

    links
}

/// The social platform an absolute (or protocol-relative) link points at.
pub fn social_platform(href: &str) -> Option<SocialPlatform> {
    let url = match href.strip_prefix("//") {
        Some(rest) => Url::parse(&format!("https://{rest}")),
        None => Url::parse(href),
    }
    .ok()?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    let host = url.host_str()?.to_ascii_lowercase();
    SocialPlatform::ALL.into_iter().find(|platform| {
        platform
            .domains()
            .iter()
            .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
    })
}
