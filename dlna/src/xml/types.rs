use std::fmt;

use super::error::XmlResult;
use super::path::PathQuery;

/// One entry of a tag's child sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlValue {
    /// Trimmed, non-empty text content
    Leaf(String),
    /// Content of an element that itself contains elements
    Node(XmlNode),
    /// Placeholder left by a self-closing tag such as `<CurrentURIMetaData/>`
    Empty,
}

impl XmlValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            XmlValue::Leaf(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&XmlNode> {
        match self {
            XmlValue::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn is_empty_marker(&self) -> bool {
        matches!(self, XmlValue::Empty)
    }
}

/// Parsed element content: tag name to the ordered sequence of its occurrences.
///
/// Repeated sibling tags append to the same key in document order. Tag names are
/// case-sensitive and keep their namespace prefix (`s:Envelope`). The attributes of
/// the element owning this content are kept alongside so path filters can match them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    attributes: Vec<(String, String)>,
    children: Vec<(String, Vec<XmlValue>)>,
}

impl XmlNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_attributes(attributes: Vec<(String, String)>) -> Self {
        Self {
            attributes,
            children: Vec::new(),
        }
    }

    /// Register `tag` and append `value` to its sequence, if any.
    ///
    /// An element with no content still creates the key with an empty sequence.
    pub(crate) fn push(&mut self, tag: &str, value: Option<XmlValue>) {
        let index = match self.children.iter().position(|(name, _)| name == tag) {
            Some(index) => index,
            None => {
                self.children.push((tag.to_string(), Vec::new()));
                self.children.len() - 1
            }
        };

        if let Some(value) = value {
            self.children[index].1.push(value);
        }
    }

    /// All occurrences of `tag`, in document order
    pub fn get(&self, tag: &str) -> Option<&[XmlValue]> {
        self.children
            .iter()
            .find(|(name, _)| name == tag)
            .map(|(_, values)| values.as_slice())
    }

    /// First occurrence of the tag whose local name (the part after any `prefix:`) matches
    pub fn find_local(&self, local_name: &str) -> Option<&XmlValue> {
        self.children
            .iter()
            .find(|(name, _)| local_part(name) == local_name)
            .and_then(|(_, values)| values.first())
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.attributes.is_empty()
    }

    /// Resolve a slash-delimited path such as `root/device/friendlyName`
    pub fn evaluate(&self, path: &str) -> XmlResult<&XmlValue> {
        path.parse::<PathQuery>()?.evaluate(self)
    }

    /// Resolve a path that must end on text
    pub fn text_at(&self, path: &str) -> XmlResult<&str> {
        self.evaluate(path)?
            .as_text()
            .ok_or_else(|| super::XmlError::NotFound(format!("{} (no text)", path)))
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        for (tag, values) in &self.children {
            if values.is_empty() {
                writeln!(f, "{}{}:", indent, tag)?;
            }
            for value in values {
                match value {
                    XmlValue::Leaf(text) => writeln!(f, "{}{}: {}", indent, tag, text)?,
                    XmlValue::Empty => writeln!(f, "{}{}: None", indent, tag)?,
                    XmlValue::Node(node) => {
                        writeln!(f, "{}{}", indent, tag)?;
                        node.write_indented(f, depth + 1)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for XmlNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

fn local_part(tag: &str) -> &str {
    tag.rsplit(':').next().unwrap_or(tag)
}
