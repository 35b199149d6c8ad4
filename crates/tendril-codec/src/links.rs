//! Link classification for wiki markup.
//!
//! Recognizes the four span kinds the codec converts: wiki-links, bare URLs,
//! email addresses and image URLs. Spans are found by a single left-to-right
//! scan per line in fixed priority: wiki-links first, then URLs in the text
//! between them, then emails in whatever text remains. A URL or email can
//! never match inside a bracketed link target.

use std::sync::LazyLock;

use regex::Regex;

/// Raster image extensions rendered as embeds instead of hyperlinks.
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "apng", "avif", "jfif", "pjpeg", "pjp",
];

/// `[[target]]` or `[[alias|target]]`.
static WIKI_LINK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([\w\s?'’:|-]+)\]\]").expect("invalid wiki-link regex"));

/// Absolute URL, allowing balanced parenthesis groups inside.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:https?://|ftp://|www\.|ftp\.)(?:\([-a-z0-9+&@#/%=~_|$?!:,.]*\)|[-a-z0-9+&@#/%=~_|$?!:,.])*(?:\([-a-z0-9+&@#/%=~_|$?!:,.]*\)|[a-z0-9+&@#/%=~_|$])",
    )
    .expect("invalid URL regex")
});

/// `local@domain` with dot-separated domain labels.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9-]+(?:\.[a-zA-Z0-9-]+)*")
        .expect("invalid email regex")
});

/// A classified piece of one markup line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span<'a> {
    /// Text outside any recognized span.
    Text(&'a str),
    /// Internal link. `alias` is the visible text when it differs from the target.
    WikiLink {
        /// Visible text of an aliased link.
        alias: Option<&'a str>,
        /// Linked page title.
        target: &'a str,
    },
    /// Bare URL rendered as a hyperlink.
    Url(&'a str),
    /// URL pointing at a raster image, rendered as an embed.
    Image(&'a str),
    /// Email address rendered as a `mailto:` link.
    Email(&'a str),
}

/// Split one line into spans.
///
/// Matches never overlap and are collected by position, so identical span
/// text repeated within a line is converted at every occurrence.
///
/// # Examples
///
/// ```
/// use tendril_codec::{Span, scan_line};
///
/// let spans = scan_line("see [[Home]]");
/// assert_eq!(
///     spans,
///     vec![Span::Text("see "), Span::WikiLink { alias: None, target: "Home" }]
/// );
/// ```
pub fn scan_line(line: &str) -> Vec<Span<'_>> {
    let mut spans = Vec::new();
    let mut last = 0;

    for caps in WIKI_LINK_PATTERN.captures_iter(line) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        scan_urls(&line[last..whole.start()], &mut spans);
        spans.push(wiki_link_span(whole.as_str(), inner.as_str()));
        last = whole.end();
    }
    scan_urls(&line[last..], &mut spans);

    spans
}

/// Classify the inside of a `[[...]]` match.
///
/// The first `|` separates alias from target. An empty alias or target is
/// malformed and stays literal text.
fn wiki_link_span<'a>(whole: &'a str, inner: &'a str) -> Span<'a> {
    match inner.split_once('|') {
        Some((alias, target)) if !alias.is_empty() && !target.is_empty() => Span::WikiLink {
            alias: Some(alias),
            target,
        },
        Some(_) => Span::Text(whole),
        None => Span::WikiLink {
            alias: None,
            target: inner,
        },
    }
}

fn scan_urls<'a>(text: &'a str, spans: &mut Vec<Span<'a>>) {
    let mut last = 0;
    for m in URL_PATTERN.find_iter(text) {
        scan_emails(&text[last..m.start()], spans);
        let url = m.as_str();
        spans.push(if is_image_url(url) {
            Span::Image(url)
        } else {
            Span::Url(url)
        });
        last = m.end();
    }
    scan_emails(&text[last..], spans);
}

fn scan_emails<'a>(text: &'a str, spans: &mut Vec<Span<'a>>) {
    let mut last = 0;
    for m in EMAIL_PATTERN.find_iter(text) {
        push_text(&text[last..m.start()], spans);
        spans.push(Span::Email(m.as_str()));
        last = m.end();
    }
    push_text(&text[last..], spans);
}

fn push_text<'a>(text: &'a str, spans: &mut Vec<Span<'a>>) {
    if !text.is_empty() {
        spans.push(Span::Text(text));
    }
}

/// Check whether a URL points at a raster image.
///
/// Only the path is inspected: the host, query and fragment are ignored and
/// the extension comparison is case-insensitive.
///
/// # Examples
///
/// ```
/// use tendril_codec::is_image_url;
///
/// assert!(is_image_url("https://x.com/a.PNG?w=200"));
/// assert!(!is_image_url("https://x.com/a.html"));
/// ```
pub fn is_image_url(url: &str) -> bool {
    url_path(url)
        .rsplit_once('.')
        .is_some_and(|(_, ext)| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
}

/// Check whether the whole text is a single URL span.
pub fn is_url(text: &str) -> bool {
    URL_PATTERN
        .find(text)
        .is_some_and(|m| m.start() == 0 && m.end() == text.len())
}

/// Path portion of an absolute URL (`""` when the URL has no path).
///
/// Scheme-less forms such as `www.x.com/a` are treated as starting with
/// the authority.
pub(crate) fn url_path(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let rest = strip_query(rest);
    rest.find('/').map_or("", |index| &rest[index..])
}

/// Drop the query and fragment from a URL or path.
pub(crate) fn strip_query(url: &str) -> &str {
    url.find(['?', '#']).map_or(url, |index| &url[..index])
}
