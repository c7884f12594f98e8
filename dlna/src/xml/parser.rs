use super::error::{XmlError, XmlResult};
use super::types::{XmlNode, XmlValue};

/// Elements nested deeper than this are rejected instead of recursing further
const MAX_DEPTH: usize = 128;

/// Options controlling how much non-XML input the parser tolerates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Skip any text preceding the first `<` (log preamble, HTTP status lines)
    pub ignore_until_first_tag: bool,
}

impl ParseOptions {
    pub fn strict() -> Self {
        Self::default()
    }

    pub fn lenient() -> Self {
        Self {
            ignore_until_first_tag: true,
        }
    }
}

/// Parse a UPnP description or SOAP document into an [`XmlNode`]
pub fn parse(xml: &str) -> XmlResult<XmlNode> {
    parse_with(xml, ParseOptions::strict())
}

/// Parse with explicit options.
///
/// The returned node holds the top-level elements, so paths start with the root tag
/// (`root/device/...`, `s:Envelope/s:Body/...`). Declarations, comments and doctypes
/// are skipped.
pub fn parse_with(xml: &str, options: ParseOptions) -> XmlResult<XmlNode> {
    let input = if options.ignore_until_first_tag {
        xml.find('<').map_or("", |start| &xml[start..])
    } else {
        xml
    };

    let mut parser = Parser {
        tokens: Tokenizer::new(input),
        lenient: options.ignore_until_first_tag,
    };
    parser.parse_document()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Open {
        name: &'a str,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    Close(&'a str),
    Text(&'a str),
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn next_token(&mut self) -> XmlResult<Option<Token<'a>>> {
        loop {
            let rest = &self.input[self.pos..];
            if rest.is_empty() {
                return Ok(None);
            }

            if !rest.starts_with('<') {
                let end = rest.find('<').unwrap_or(rest.len());
                self.pos += end;
                return Ok(Some(Token::Text(&rest[..end])));
            }

            if rest.starts_with("<?") {
                self.skip_past(rest, "?>", "processing instruction")?;
            } else if rest.starts_with("<!--") {
                self.skip_past(rest, "-->", "comment")?;
            } else if let Some(cdata) = rest.strip_prefix("<![CDATA[") {
                let end = cdata
                    .find("]]>")
                    .ok_or_else(|| XmlError::UnexpectedEof("CDATA section".to_string()))?;
                self.pos += "<![CDATA[".len() + end + "]]>".len();
                return Ok(Some(Token::Text(&cdata[..end])));
            } else if rest.starts_with("<!") {
                self.skip_past(rest, ">", "doctype")?;
            } else if let Some(close) = rest.strip_prefix("</") {
                let end = close
                    .find('>')
                    .ok_or_else(|| XmlError::UnexpectedEof("closing tag".to_string()))?;
                self.pos += 2 + end + 1;
                let name = close[..end].trim();
                if name.is_empty() {
                    return Err(XmlError::Syntax("closing tag without a name".to_string()));
                }
                return Ok(Some(Token::Close(name)));
            } else {
                return self.open_tag(rest).map(Some);
            }
        }
    }

    fn skip_past(&mut self, rest: &str, terminator: &str, what: &str) -> XmlResult<()> {
        let end = rest
            .find(terminator)
            .ok_or_else(|| XmlError::UnexpectedEof(what.to_string()))?;
        self.pos += end + terminator.len();
        Ok(())
    }

    fn open_tag(&mut self, rest: &'a str) -> XmlResult<Token<'a>> {
        let end = find_tag_end(rest)
            .ok_or_else(|| XmlError::UnexpectedEof("opening tag".to_string()))?;
        self.pos += end + 1;

        let mut inner = &rest[1..end];
        let self_closing = inner.ends_with('/');
        if self_closing {
            inner = &inner[..inner.len() - 1];
        }

        let name_end = inner
            .find(|c: char| c.is_whitespace())
            .unwrap_or(inner.len());
        let name = &inner[..name_end];
        if name.is_empty() {
            return Err(XmlError::Syntax("opening tag without a name".to_string()));
        }

        Ok(Token::Open {
            name,
            attributes: parse_attributes(&inner[name_end..])?,
            self_closing,
        })
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = XmlResult<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

/// Index of the `>` closing an opening tag, ignoring any `>` inside quoted attribute values
fn find_tag_end(tag: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in tag.char_indices() {
        match (quote, c) {
            (None, '"') | (None, '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '>') => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_attributes(mut input: &str) -> XmlResult<Vec<(String, String)>> {
    let mut attributes = Vec::new();

    loop {
        input = input.trim_start();
        if input.is_empty() {
            return Ok(attributes);
        }

        let key_end = input
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(input.len());
        let key = &input[..key_end];
        input = input[key_end..].trim_start();

        let Some(after_eq) = input.strip_prefix('=') else {
            // valueless attribute
            attributes.push((key.to_string(), String::new()));
            continue;
        };
        let after_eq = after_eq.trim_start();

        let (value, remainder) = match after_eq.chars().next() {
            Some(q @ ('"' | '\'')) => {
                let body = &after_eq[1..];
                let close = body.find(q).ok_or_else(|| {
                    XmlError::Syntax(format!("unterminated value for attribute `{}`", key))
                })?;
                (&body[..close], &body[close + 1..])
            }
            Some(_) => {
                let end = after_eq
                    .find(char::is_whitespace)
                    .unwrap_or(after_eq.len());
                (&after_eq[..end], &after_eq[end..])
            }
            None => {
                return Err(XmlError::Syntax(format!(
                    "missing value for attribute `{}`",
                    key
                )))
            }
        };

        attributes.push((key.to_string(), value.to_string()));
        input = remainder;
    }
}

struct Parser<'a> {
    tokens: Tokenizer<'a>,
    lenient: bool,
}

impl<'a> Parser<'a> {
    fn parse_document(&mut self) -> XmlResult<XmlNode> {
        let mut document = XmlNode::new();

        while let Some(token) = self.tokens.next().transpose()? {
            match token {
                Token::Open {
                    name,
                    self_closing: true,
                    ..
                } => document.push(name, Some(XmlValue::Empty)),
                Token::Open {
                    name, attributes, ..
                } => {
                    let value = self.parse_element(name, attributes, 1)?;
                    document.push(name, value);
                }
                // left behind by a flattened same-name child
                Token::Close(_) => {}
                Token::Text(text) => {
                    if !self.lenient && !text.trim().is_empty() {
                        return Err(XmlError::Syntax(format!(
                            "text outside of any element: `{}`",
                            text.trim()
                        )));
                    }
                }
            }
        }

        Ok(document)
    }

    /// Parse the content of `name` up to its closing tag.
    ///
    /// The first `</name>` terminates the element: an opening tag with the same name
    /// directly inside it is flattened away, and the closing tag it leaves behind is
    /// skipped by the parent.
    fn parse_element(
        &mut self,
        name: &'a str,
        attributes: Vec<(String, String)>,
        depth: usize,
    ) -> XmlResult<Option<XmlValue>> {
        if depth > MAX_DEPTH {
            return Err(XmlError::Syntax(format!(
                "elements nested deeper than {} levels",
                MAX_DEPTH
            )));
        }

        let mut node = XmlNode::with_attributes(attributes);
        let mut text = String::new();
        let mut has_elements = false;

        loop {
            let token = self
                .tokens
                .next()
                .transpose()?
                .ok_or_else(|| XmlError::UnexpectedEof(name.to_string()))?;

            match token {
                Token::Text(chunk) => text.push_str(chunk),
                Token::Open {
                    name: child,
                    self_closing: true,
                    ..
                } => {
                    node.push(child, Some(XmlValue::Empty));
                    has_elements = true;
                }
                Token::Open { name: child, .. } if child == name => {}
                Token::Open {
                    name: child,
                    attributes,
                    ..
                } => {
                    let value = self.parse_element(child, attributes, depth + 1)?;
                    node.push(child, value);
                    has_elements = true;
                }
                Token::Close(close) if close == name => break,
                Token::Close(_) => {}
            }
        }

        if has_elements {
            return Ok(Some(XmlValue::Node(node)));
        }

        let text = text.trim();
        if !text.is_empty() {
            Ok(Some(XmlValue::Leaf(text.to_string())))
        } else if node.is_empty() {
            Ok(None)
        } else {
            // attributes only
            Ok(Some(XmlValue::Node(node)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = r#"<?xml version="1.0"?>
        <a any_tag="tag value">
            <b><bb>value1</bb></b>
            <b><bb>value2</bb> <v>value3</v></b>
            <c></c>
            <d>
                <e>value4</e>
            </d>
            <g>value</g>
        </a>"#;

    #[test]
    fn test_parse_nested_document() {
        let doc = parse(NESTED).unwrap();
        let a = doc.get("a").unwrap()[0].as_node().unwrap();

        assert_eq!(a.attribute("any_tag"), Some("tag value"));

        let bs = a.get("b").unwrap();
        assert_eq!(bs.len(), 2);
        assert_eq!(bs[0].as_node().unwrap().get("bb").unwrap()[0].as_text(), Some("value1"));
        assert_eq!(bs[1].as_node().unwrap().get("v").unwrap()[0].as_text(), Some("value3"));

        assert_eq!(a.get("c"), Some(&[][..]));
        assert_eq!(doc.text_at("a/d/e").unwrap(), "value4");
        assert_eq!(doc.text_at("a/g").unwrap(), "value");
    }

    #[test]
    fn test_self_closing_tag_yields_empty_marker() {
        let doc = parse("<r><meta/><meta /><x>1</x></r>").unwrap();
        let r = doc.get("r").unwrap()[0].as_node().unwrap();
        let metas = r.get("meta").unwrap();

        assert_eq!(metas.len(), 2);
        assert!(metas.iter().all(XmlValue::is_empty_marker));
    }

    #[test]
    fn test_leaf_text_is_trimmed() {
        let doc = parse("<r>\n   spaced out  \n</r>").unwrap();
        assert_eq!(doc.text_at("r").unwrap(), "spaced out");
    }

    #[test]
    fn test_strict_rejects_leading_text() {
        let result = parse("hello\nthis is a preamble\n<a>1</a>");
        assert!(matches!(result, Err(XmlError::Syntax(_))));
    }

    #[test]
    fn test_lenient_skips_leading_text() {
        let doc = parse_with(
            "HTTP/1.1 200 OK\r\nServer: x\r\n\r\n<a>1</a>",
            ParseOptions::lenient(),
        )
        .unwrap();
        assert_eq!(doc.text_at("a").unwrap(), "1");
    }

    #[test]
    fn test_skips_declaration_comment_and_doctype() {
        let doc = parse(
            "<?xml version=\"1.0\"?><!DOCTYPE root><!-- note --><root><x>1</x><!-- inner --></root>",
        )
        .unwrap();
        assert_eq!(doc.text_at("root/x").unwrap(), "1");
    }

    #[test]
    fn test_cdata_is_text() {
        let doc = parse("<r><![CDATA[a <b> & c]]></r>").unwrap();
        assert_eq!(doc.text_at("r").unwrap(), "a <b> & c");
    }

    #[test]
    fn test_quoted_gt_inside_attribute() {
        let doc = parse(r#"<r><x filter="a>b">1</x></r>"#).unwrap();
        assert_eq!(doc.text_at("r/x").unwrap(), "1");
    }

    #[test]
    fn test_single_quoted_and_bare_attributes() {
        let doc = parse("<r><s kind='av' flag id=3><u>/c</u></s></r>").unwrap();
        let s = doc.evaluate("r/s").unwrap().as_node().unwrap();
        assert_eq!(s.attribute("kind"), Some("av"));
        assert_eq!(s.attribute("flag"), Some(""));
        assert_eq!(s.attribute("id"), Some("3"));
    }

    #[test]
    fn test_unclosed_element_is_error() {
        let result = parse("<root><device><name>x</name></device>");
        assert_eq!(result, Err(XmlError::UnexpectedEof("root".to_string())));
    }

    #[test]
    fn test_unterminated_tag_is_error() {
        assert!(matches!(parse("<root"), Err(XmlError::UnexpectedEof(_))));
        assert!(matches!(parse("<root></root"), Err(XmlError::UnexpectedEof(_))));
    }

    #[test]
    fn test_namespaced_tags_keep_prefix() {
        let doc = parse(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><u:PlayResponse xmlns:u="urn:x"/></s:Body></s:Envelope>"#,
        )
        .unwrap();
        let body = doc.evaluate("s:Envelope/s:Body").unwrap().as_node().unwrap();
        assert!(body.get("u:PlayResponse").unwrap()[0].is_empty_marker());
    }

    #[test]
    fn test_excessive_nesting_is_rejected() {
        let depth = MAX_DEPTH + 5;
        let mut xml = String::new();
        for i in 0..depth {
            xml.push_str(&format!("<n{}>", i));
        }
        for i in (0..depth).rev() {
            xml.push_str(&format!("</n{}>", i));
        }
        assert!(matches!(parse(&xml), Err(XmlError::Syntax(_))));
    }

    #[test]
    fn test_same_name_nesting_is_flattened() {
        let doc = parse("<a><a>x</a></a>").unwrap();
        assert_eq!(doc.get("a").unwrap().len(), 1);
        assert_eq!(doc.text_at("a").unwrap(), "x");

        let doc = parse("<r><a><a>x</a></a><b>1</b></r>").unwrap();
        assert_eq!(doc.text_at("r/a").unwrap(), "x");
        assert_eq!(doc.text_at("r/b").unwrap(), "1");
    }

    #[test]
    fn test_stray_top_level_close_is_skipped() {
        let doc = parse("<a>x</a></a>").unwrap();
        assert_eq!(doc.text_at("a").unwrap(), "x");

        let doc = parse_with("<a>x</a></b>", ParseOptions::lenient()).unwrap();
        assert_eq!(doc.text_at("a").unwrap(), "x");
    }
}
