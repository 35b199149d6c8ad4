//! Markup to presentation encoding.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::links::{Span, scan_line};

/// Line separator in presentation output.
pub const LINE_BREAK: &str = "<br />";

/// Characters left unescaped in link destinations (`encodeURIComponent` set).
const COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Email addresses keep their `@` readable in `mailto:` destinations.
const MAILTO_ENCODE_SET: &AsciiSet = &COMPONENT_ENCODE_SET.remove(b'@');

/// Encode plain wiki markup into linked presentation HTML.
///
/// Each line is scanned independently and lines are joined with
/// [`LINE_BREAK`]. Wiki-links become links to `/{target}`, bare URLs become
/// hyperlinks (or `<img>` embeds for image URLs) and email addresses become
/// `mailto:` links. All other text is HTML-escaped.
///
/// # Examples
///
/// ```
/// use tendril_codec::encode_to_presentation;
///
/// assert_eq!(
///     encode_to_presentation("[[Home|home]]"),
///     r#"<a href="/home">Home</a>"#
/// );
/// ```
pub fn encode_to_presentation(plain: &str) -> String {
    let mut out = String::with_capacity(plain.len() * 2);

    for (index, line) in plain.split('\n').enumerate() {
        if index > 0 {
            out.push_str(LINE_BREAK);
        }
        for span in scan_line(line) {
            write_span(&span, &mut out);
        }
    }

    out
}

fn write_span(span: &Span<'_>, out: &mut String) {
    match *span {
        Span::Text(text) => out.push_str(&escape_html(text)),
        Span::WikiLink { alias, target } => {
            let href = format!("/{}", utf8_percent_encode(target, COMPONENT_ENCODE_SET));
            write_link(&href, alias.unwrap_or(target), out);
        }
        Span::Url(url) => write_link(url, url, out),
        Span::Image(url) => {
            out.push_str(r#"<img src=""#);
            out.push_str(&escape_attr(url));
            out.push_str(r#"" />"#);
        }
        Span::Email(address) => {
            let href = format!(
                "mailto:{}",
                utf8_percent_encode(address, MAILTO_ENCODE_SET)
            );
            write_link(&href, address, out);
        }
    }
}

fn write_link(href: &str, text: &str, out: &mut String) {
    out.push_str(r#"<a href=""#);
    out.push_str(&escape_attr(href));
    out.push_str(r#"">"#);
    out.push_str(&escape_html(text));
    out.push_str("</a>");
}

/// Escape text content for HTML.
pub fn escape_html(text: &str) -> String {
    escape(text, false)
}

/// Escape an attribute value for HTML.
fn escape_attr(text: &str) -> String {
    escape(text, true)
}

fn escape(text: &str, escape_quotes: bool) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' if escape_quotes => result.push_str("&quot;"),
            _ => result.push(ch),
        }
    }
    result
}
