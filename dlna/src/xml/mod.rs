//! Structural XML parsing and path queries for UPnP description and SOAP documents.
//!
//! This is deliberately not a general XML library: it understands elements, attributes,
//! text, CDATA, comments and declarations, which is everything UPnP devices send.

pub mod error;
pub mod parser;
pub mod path;
pub mod types;

pub use error::{XmlError, XmlResult};
pub use parser::{parse, parse_with, ParseOptions};
pub use path::{evaluate, PathQuery, PathSegment};
pub use types::{XmlNode, XmlValue};

/// Replace escaped markup in a document so embedded XML (DIDL-Lite metadata) parses as structure
pub fn unescape(xml: &str) -> String {
    html_escape::decode_html_entities(xml).into_owned()
}
