//! Error types for the presentation parser.

use std::str::Utf8Error;

/// Error while parsing a presentation fragment into a tree.
///
/// Encoding never fails: malformed spans are passed through as text.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CodecError {
    /// XML parsing error.
    #[error("presentation parse error")]
    Parse(#[from] quick_xml::Error),

    /// UTF-8 decoding error.
    #[error("UTF-8 error")]
    Utf8(#[from] Utf8Error),

    /// Attribute parsing error.
    #[error("attribute error")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    /// Encoding error during parsing.
    #[error("encoding error")]
    Encoding(#[from] quick_xml::encoding::EncodingError),
}
