//! Presentation fragment parser.
//!
//! Browsers return content-editable regions as HTML, not XML. Before handing
//! the fragment to the XML reader, named entities are mapped to Unicode and
//! void elements are self-closed. End tags without a matching open element
//! are dropped; open elements left at the end are closed implicitly.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::LazyLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;

use crate::entities::convert_html_entities;
use crate::error::CodecError;
use crate::tree::PresentationNode;

/// Tag of the synthetic element wrapping every parsed fragment.
pub(crate) const ROOT_TAG: &str = "root";

/// HTML void elements written without a closing slash.
static VOID_ELEMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(br|hr|img|input|wbr)\b([^>]*?)\s*/?>")
        .expect("invalid void element regex")
});

/// Parse a presentation HTML fragment into a tree.
///
/// The returned node is a synthetic `root` element whose children are
/// the fragment's top-level elements. Tag names and attribute keys are
/// lowercased.
///
/// # Errors
///
/// Returns an error if the fragment is not well-formed enough for the XML
/// reader, for example an unterminated tag.
pub fn parse_presentation(html: &str) -> Result<PresentationNode, CodecError> {
    let html = convert_html_entities(html);
    let html = VOID_ELEMENT_PATTERN.replace_all(&html, "<${1}${2} />");
    let wrapped = format!("<{ROOT_TAG}>{html}</{ROOT_TAG}>");

    let mut reader = Reader::from_str(&wrapped);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    // stack[0] is the synthetic root; it is never popped by an end tag
    let mut stack: Vec<PresentationNode> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let node = element(&reader, &e);
                stack.push(node);
            }
            Event::Empty(e) => {
                let node = element(&reader, &e);
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => stack.push(node),
                }
            }
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?;
                append_text(&mut stack, &text);
            }
            Event::GeneralRef(e) => {
                let entity = reader.decoder().decode(&e)?;
                append_text(&mut stack, &decode_entity(&entity));
            }
            Event::CData(e) => {
                append_text(&mut stack, &String::from_utf8_lossy(&e));
            }
            Event::End(e) => {
                let tag = decode_name(&reader, e.name().as_ref());
                close_element(&mut stack, &tag);
            }
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    while stack.len() > 1 {
        pop_into_parent(&mut stack);
    }
    Ok(stack.pop().unwrap_or_else(|| PresentationNode::new(ROOT_TAG)))
}

/// Close the innermost open element named `tag`, closing any elements
/// opened after it. Unmatched end tags are ignored.
fn close_element(stack: &mut Vec<PresentationNode>, tag: &str) {
    let Some(position) = stack.iter().skip(1).rposition(|node| node.tag == tag) else {
        return;
    };
    // rposition over the skipped iterator is relative to index 1
    let depth = position + 1;
    while stack.len() > depth {
        pop_into_parent(stack);
    }
}

fn pop_into_parent(stack: &mut Vec<PresentationNode>) {
    if let Some(node) = stack.pop() {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => stack.push(node),
        }
    }
}

/// Append text to the open element's text or its last child's tail.
fn append_text(stack: &mut [PresentationNode], text: &str) {
    let Some(node) = stack.last_mut() else {
        return;
    };
    if let Some(last_child) = node.children.last_mut() {
        last_child.tail.push_str(text);
    } else {
        node.text.push_str(text);
    }
}

fn element(reader: &Reader<&[u8]>, e: &BytesStart) -> PresentationNode {
    let mut node = PresentationNode::new(decode_name(reader, e.name().as_ref()));
    node.attrs = decode_attrs(reader, e);
    node
}

fn decode_name(reader: &Reader<&[u8]>, name: &[u8]) -> String {
    reader
        .decoder()
        .decode(name)
        .map_or_else(|_| String::from_utf8_lossy(name).into_owned(), Cow::into_owned)
        .to_ascii_lowercase()
}

fn decode_attrs(reader: &Reader<&[u8]>, e: &BytesStart) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    for attr in e.html_attributes().flatten() {
        let key = decode_name(reader, attr.key.as_ref());
        let value = attr.unescape_value().map_or_else(
            |_| String::from_utf8_lossy(&attr.value).into_owned(),
            Cow::into_owned,
        );
        attrs.insert(key, value);
    }
    attrs
}

/// Decode an XML entity reference to its character value.
fn decode_entity(entity: &str) -> String {
    match entity {
        "lt" => "<".to_owned(),
        "gt" => ">".to_owned(),
        "amp" => "&".to_owned(),
        "apos" => "'".to_owned(),
        "quot" => "\"".to_owned(),
        s if s.starts_with('#') => {
            let code = if let Some(hex) = s.strip_prefix("#x").or_else(|| s.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()
            } else {
                s[1..].parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{entity};"), |c| c.to_string())
        }
        _ => format!("&{entity};"),
    }
}
