//! A minimal element tree built from quick-xml events.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::RoiError;

/// One element with its attributes, child elements and text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    /// Local name, without namespace prefix
    pub name: String,
    /// Attributes with their qualified names, in document order
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    /// Concatenated character data directly inside this element
    pub text: String,
}

impl XmlNode {
    /// Attribute by qualified name, falling back to the local part
    /// (`href` finds `xlink:href`).
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .or_else(|| {
                self.attributes
                    .iter()
                    .find(|(key, _)| key.rsplit(':').next() == Some(name))
            })
            .map(|(_, value)| value.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, RoiError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).to_string();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr.unescape_value()?.to_string();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            ..Default::default()
        })
    }
}

/// Parse a document and return its root element.
pub fn parse_document(text: &str) -> Result<XmlNode, RoiError> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) => stack.push(XmlNode::from_start(e)?),
            Event::Empty(ref e) => {
                let node = XmlNode::from_start(e)?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| RoiError::parse("unbalanced end tag"))?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(ref t) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(RoiError::parse(format!("unclosed element '{}'", open.name)));
    }
    root.ok_or_else(|| RoiError::parse("document has no root element"))
}

fn attach(
    stack: &mut [XmlNode],
    root: &mut Option<XmlNode>,
    node: XmlNode,
) -> Result<(), RoiError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(RoiError::parse("document has more than one root element")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_shape() {
        let doc = r#"<?xml version="1.0"?>
<a xmlns:xlink="http://www.w3.org/1999/xlink">
  <b key="1 &amp; 2"/>
  <c>hello <![CDATA[<world>]]></c>
  <b xlink:href="data:x"/>
</a>"#;
        let root = parse_document(doc).unwrap();
        assert_eq!(root.name, "a");
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.child("b").unwrap().attr("key"), Some("1 & 2"));
        assert_eq!(root.child("c").unwrap().text, "hello <world>");
        let linked = root.children_named("b").nth(1).unwrap();
        assert_eq!(linked.attr("href"), Some("data:x"));
        assert_eq!(linked.attr("xlink:href"), Some("data:x"));
    }

    #[test]
    fn test_malformed_documents() {
        assert!(parse_document("<a><b></a>").is_err());
        assert!(parse_document("<a>").is_err());
        assert!(parse_document("").is_err());
        assert!(parse_document("<a/><b/>").is_err());
    }
}
