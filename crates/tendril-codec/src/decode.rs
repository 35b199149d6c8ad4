//! Presentation to markup decoding.

use percent_encoding::percent_decode_str;

use crate::error::CodecError;
use crate::links::{is_url, strip_query, url_path};
use crate::parser::parse_presentation;
use crate::tree::PresentationNode;

/// Decode a presentation tree back to plain wiki markup.
///
/// Hyperlinks become wiki-links (or stay bare URLs and emails), images
/// become their source URL and `<br>` becomes a newline. Block elements
/// (`div`, `p`) start a new line unless the output is empty or already ends
/// with one.
pub fn decode_from_presentation(tree: &PresentationNode) -> String {
    let mut out = String::new();
    decode_contents(tree, &mut out);
    out
}

/// Parse a presentation HTML fragment and decode it to markup.
///
/// # Examples
///
/// ```
/// use tendril_codec::decode_html;
///
/// let markup = decode_html(r#"go <a href="/home">Home</a>"#).unwrap();
/// assert_eq!(markup, "go [[Home|home]]");
/// ```
pub fn decode_html(html: &str) -> Result<String, CodecError> {
    let tree = parse_presentation(html)?;
    Ok(decode_from_presentation(&tree))
}

fn decode_contents(node: &PresentationNode, out: &mut String) {
    out.push_str(&node.text);
    for child in &node.children {
        decode_element(child, out);
        out.push_str(&child.tail);
    }
}

fn decode_element(node: &PresentationNode, out: &mut String) {
    match node.tag.as_str() {
        "a" => out.push_str(&decode_link(node.attr("href"), &node.text_content())),
        "img" => out.push_str(node.attr("src").unwrap_or_default()),
        "br" => out.push('\n'),
        "div" | "p" => {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            decode_contents(node, out);
        }
        _ => decode_contents(node, out),
    }
}

/// Markup for one hyperlink given its destination and visible text.
fn decode_link(href: Option<&str>, text: &str) -> String {
    let Some(href) = href else {
        return text.to_owned();
    };
    if href.starts_with("mailto:") {
        return text.to_owned();
    }
    if is_url(text) {
        tracing::debug!(href, text, "Link text is a URL, decoding as bare URL");
        return text.to_owned();
    }

    let path = link_path(href);
    if text.is_empty() {
        return if path.is_empty() {
            String::new()
        } else {
            format!("[[{path}]]")
        };
    }
    if path == text {
        format!("[[{text}]]")
    } else {
        format!("[[{text}|{path}]]")
    }
}

/// Percent-decoded path of a link destination without the leading `/`.
fn link_path(href: &str) -> String {
    let path = if href.starts_with('/') {
        strip_query(href)
    } else if href.contains("://") || is_url(href) {
        url_path(href)
    } else {
        strip_query(href)
    };
    let path = path.strip_prefix('/').unwrap_or(path);
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}
