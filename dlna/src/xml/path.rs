use std::str::FromStr;

use super::error::{XmlError, XmlResult};
use super::types::{XmlNode, XmlValue};

/// One step of a [`PathQuery`]: a tag with an optional `@attr=value` filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub tag: String,
    pub filter: Option<(String, String)>,
}

impl PathSegment {
    fn matches(&self, value: &XmlValue) -> bool {
        let Some((attr, expected)) = &self.filter else {
            return true;
        };
        let Some(node) = value.as_node() else {
            return false;
        };

        if node.attribute(attr) == Some(expected.as_str()) {
            return true;
        }
        matches!(node.get(attr), Some([XmlValue::Leaf(text)]) if text == expected)
    }
}

/// A slash-delimited query such as
/// `root/device/serviceList/service@serviceType=urn:schemas-upnp-org:service:AVTransport:1/controlURL`.
///
/// A filter matches either an attribute of the element or a child element holding
/// exactly that text. Evaluation takes the first matching entry at every step and
/// never backtracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathQuery {
    segments: Vec<PathSegment>,
}

impl PathQuery {
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn evaluate<'n>(&self, root: &'n XmlNode) -> XmlResult<&'n XmlValue> {
        let last = self.segments.len().saturating_sub(1);
        let mut node = root;

        for (i, segment) in self.segments.iter().enumerate() {
            let entry = node
                .get(&segment.tag)
                .and_then(|entries| entries.iter().find(|entry| segment.matches(entry)))
                .ok_or_else(|| self.not_found(i + 1))?;

            if i == last {
                return Ok(entry);
            }
            node = entry.as_node().ok_or_else(|| self.not_found(i + 2))?;
        }

        Err(XmlError::NotFound(String::new()))
    }

    fn not_found(&self, depth: usize) -> XmlError {
        let walked = self
            .segments
            .iter()
            .take(depth.max(1))
            .map(|segment| match &segment.filter {
                Some((attr, value)) => format!("{}@{}={}", segment.tag, attr, value),
                None => segment.tag.clone(),
            })
            .collect::<Vec<_>>()
            .join("/");
        XmlError::NotFound(walked)
    }
}

impl FromStr for PathQuery {
    type Err = XmlError;

    fn from_str(path: &str) -> XmlResult<Self> {
        let segments = path
            .split('/')
            .map(|raw| {
                if raw.is_empty() {
                    return Err(XmlError::Syntax(format!("empty segment in path `{}`", path)));
                }

                match raw.split_once('@') {
                    None => Ok(PathSegment {
                        tag: raw.to_string(),
                        filter: None,
                    }),
                    Some((tag, filter)) => {
                        let (attr, value) = filter.split_once('=').ok_or_else(|| {
                            XmlError::Syntax(format!("filter `{}` is not of the form attr=value", filter))
                        })?;
                        Ok(PathSegment {
                            tag: tag.to_string(),
                            filter: Some((attr.to_string(), value.to_string())),
                        })
                    }
                }
            })
            .collect::<XmlResult<Vec<_>>>()?;

        Ok(Self { segments })
    }
}

/// Resolve `path` against `root`
pub fn evaluate<'n>(root: &'n XmlNode, path: &str) -> XmlResult<&'n XmlValue> {
    path.parse::<PathQuery>()?.evaluate(root)
}
