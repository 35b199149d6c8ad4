//! Wiki markup codec for Tendril.
//!
//! Documents are stored as plain markup and shown as linked HTML. This crate
//! converts in both directions:
//!
//! - [`encode_to_presentation`] turns wiki-links, bare URLs, image URLs and
//!   email addresses into `<a>`/`<img>` markup.
//! - [`parse_presentation`] reads an edited HTML fragment into a
//!   [`PresentationNode`] tree, and [`decode_from_presentation`] turns that
//!   tree back into markup.
//!
//! # Example
//!
//! ```
//! use tendril_codec::{decode_html, encode_to_presentation};
//!
//! let html = encode_to_presentation("see [[Target Page]]");
//! assert_eq!(html, r#"see <a href="/Target%20Page">Target Page</a>"#);
//! assert_eq!(decode_html(&html).unwrap(), "see [[Target Page]]");
//! ```

mod decode;
mod encode;
mod entities;
mod error;
mod links;
mod parser;
mod tree;

pub use decode::{decode_from_presentation, decode_html};
pub use encode::{LINE_BREAK, encode_to_presentation, escape_html};
pub use error::CodecError;
pub use links::{Span, is_image_url, is_url, scan_line};
pub use parser::parse_presentation;
pub use tree::PresentationNode;
