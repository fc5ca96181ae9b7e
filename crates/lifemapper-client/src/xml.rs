//! XML response deserialization
//!
//! Lifemapper responses have no fixed schema, so they are mapped onto a
//! generic tree that mirrors the document: elements become objects keyed by
//! child tag name, repeated children become sequences, and childless
//! elements become their text.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;

use crate::error::{LmError, Result};

/// A node of a deserialized XML response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum XmlNode {
    /// Text of an element with no attributes and no child elements
    Leaf(String),
    /// An element with attributes or child elements
    Object(XmlObject),
    /// Sibling elements sharing one tag name, in document order
    Sequence(Vec<XmlNode>),
}

/// Fields of an object node: attributes and child elements by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct XmlObject {
    #[serde(flatten)]
    pub fields: BTreeMap<String, XmlNode>,
    /// Text directly inside the element, if any
    #[serde(rename = "#text", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl XmlObject {
    fn insert(&mut self, name: String, node: XmlNode) {
        match self.fields.remove(&name) {
            None => {
                self.fields.insert(name, node);
            }
            Some(XmlNode::Sequence(mut seq)) => {
                seq.push(node);
                self.fields.insert(name, XmlNode::Sequence(seq));
            }
            Some(existing) => {
                self.fields
                    .insert(name, XmlNode::Sequence(vec![existing, node]));
            }
        }
    }
}

impl XmlNode {
    /// Look up a named field of an object node
    pub fn get(&self, name: &str) -> Option<&XmlNode> {
        match self {
            Self::Object(obj) => obj.fields.get(name),
            _ => None,
        }
    }

    /// Look up a named field, failing with `FieldMissing` when absent
    pub fn field(&self, name: &str) -> Result<&XmlNode> {
        self.get(name)
            .ok_or_else(|| LmError::FieldMissing(name.to_string()))
    }

    /// Follow a chain of field names
    pub fn path(&self, names: &[&str]) -> Result<&XmlNode> {
        names.iter().try_fold(self, |node, name| node.field(name))
    }

    /// Text content of a leaf, or the direct text of an object
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Leaf(text) => Some(text),
            Self::Object(obj) => obj.text.as_deref(),
            Self::Sequence(_) => None,
        }
    }

    /// Members of a sequence, or this node alone
    pub fn items(&self) -> Vec<&XmlNode> {
        match self {
            Self::Sequence(seq) => seq.iter().collect(),
            other => vec![other],
        }
    }
}

/// Element being assembled while its content is read
struct PendingElement {
    name: String,
    object: XmlObject,
    text: String,
    has_attributes: bool,
    has_children: bool,
}

impl PendingElement {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let name = decode_name(start.name().as_ref())?;
        let mut object = XmlObject::default();
        let mut has_attributes = false;
        for attr in start.attributes() {
            let attr = attr?;
            let key = decode_name(attr.key.as_ref())?;
            let value = attr.unescape_value()?.into_owned();
            object.insert(key, XmlNode::Leaf(value));
            has_attributes = true;
        }
        Ok(Self {
            name,
            object,
            text: String::new(),
            has_attributes,
            has_children: false,
        })
    }

    fn add_child(&mut self, name: String, node: XmlNode) {
        self.has_children = true;
        self.object.insert(name, node);
    }

    /// Text segments are joined as read and trimmed once here
    fn finish(self) -> (String, XmlNode) {
        let text = self.text.trim().to_string();
        if !self.has_attributes && !self.has_children {
            return (self.name, XmlNode::Leaf(text));
        }
        let mut object = self.object;
        if !text.is_empty() {
            object.text = Some(text);
        }
        (self.name, XmlNode::Object(object))
    }
}

fn decode_name(raw: &[u8]) -> Result<String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| LmError::MalformedDocument(format!("invalid UTF-8 in name: {}", e)))
}

/// Parse an XML document into the node of its root element, so the root's
/// attributes and children are the fields of the result.
///
/// # Errors
/// `LmError::MalformedDocument` if the input is not a well-formed document.
pub fn deserialize(raw_xml: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_str(raw_xml);

    let mut stack: Vec<PendingElement> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(malformed(&reader, "more than one root element"));
                }
                stack.push(PendingElement::open(&start)?);
            }
            Event::Empty(start) => {
                if root.is_some() {
                    return Err(malformed(&reader, "more than one root element"));
                }
                let (name, node) = PendingElement::open(&start)?.finish();
                match stack.last_mut() {
                    Some(parent) => parent.add_child(name, node),
                    None => root = Some(node),
                }
            }
            Event::End(_) => {
                let Some(element) = stack.pop() else {
                    return Err(malformed(&reader, "unexpected closing tag"));
                };
                let (name, node) = element.finish();
                match stack.last_mut() {
                    Some(parent) => parent.add_child(name, node),
                    None => root = Some(node),
                }
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                match stack.last_mut() {
                    Some(element) => element.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err(malformed(&reader, "text outside the root element")),
                }
            }
            Event::CData(data) => {
                let data = data.into_inner();
                let text = String::from_utf8_lossy(&data);
                match stack.last_mut() {
                    Some(element) => element.text.push_str(&text),
                    None => return Err(malformed(&reader, "CDATA outside the root element")),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(LmError::MalformedDocument(format!(
            "unclosed element <{}>",
            open.name
        )));
    }

    root.ok_or_else(|| LmError::MalformedDocument("no root element".to_string()))
}

fn malformed(reader: &Reader<&[u8]>, msg: &str) -> LmError {
    LmError::MalformedDocument(format!("{} at position {}", msg, reader.buffer_position()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_text() {
        let doc = deserialize("<items><itemCount>42</itemCount></items>").unwrap();
        let count = doc.field("itemCount").unwrap();
        assert_eq!(count.as_text(), Some("42"));
    }

    #[test]
    fn test_fields_are_children_of_root() {
        let doc =
            deserialize("<response><items><itemCount>4</itemCount></items></response>").unwrap();
        assert_eq!(
            doc.path(&["items", "itemCount"]).unwrap().as_text(),
            Some("4")
        );
        assert!(doc.get("response").is_none());
    }

    #[test]
    fn test_repeated_children_become_sequence() {
        let doc = deserialize(
            "<items><item><id>1</id></item><item><id>2</id></item><item><id>3</id></item></items>",
        )
        .unwrap();
        let item = doc.field("item").unwrap();
        let ids: Vec<_> = item
            .items()
            .iter()
            .map(|i| i.field("id").unwrap().as_text().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_single_child_is_object_not_sequence() {
        let doc = deserialize("<items><item><id>7</id></item></items>").unwrap();
        let item = doc.field("item").unwrap();
        assert!(matches!(item, XmlNode::Object(_)));
        assert_eq!(item.items().len(), 1);
    }

    #[test]
    fn test_attributes_become_fields() {
        let doc =
            deserialize(r#"<layer id="12" epsg="4326"><name>bio1</name></layer>"#).unwrap();
        assert_eq!(doc.field("id").unwrap().as_text(), Some("12"));
        assert_eq!(doc.field("epsg").unwrap().as_text(), Some("4326"));
        assert_eq!(doc.field("name").unwrap().as_text(), Some("bio1"));
    }

    #[test]
    fn test_attribute_element_keeps_text() {
        let doc = deserialize(r#"<title lang="en">Occurrence set</title>"#).unwrap();
        assert_eq!(doc.as_text(), Some("Occurrence set"));
        assert_eq!(doc.field("lang").unwrap().as_text(), Some("en"));
    }

    #[test]
    fn test_empty_element_is_empty_leaf() {
        let doc = deserialize("<items><item/></items>").unwrap();
        assert_eq!(doc.field("item").unwrap().as_text(), Some(""));
    }

    #[test]
    fn test_entities_and_cdata_are_text() {
        let doc = deserialize("<r><a>x &amp; y</a><b><![CDATA[<raw>]]></b></r>").unwrap();
        assert_eq!(doc.field("a").unwrap().as_text(), Some("x & y"));
        assert_eq!(doc.field("b").unwrap().as_text(), Some("<raw>"));
    }

    #[test]
    fn test_text_segments_keep_inner_whitespace() {
        let doc = deserialize("<r><a>foo <![CDATA[bar]]> baz</a></r>").unwrap();
        assert_eq!(doc.field("a").unwrap().as_text(), Some("foo bar baz"));

        // The comment is dropped, both neighbouring spaces stay
        let doc = deserialize("<r><a>foo <!-- c --> bar</a></r>").unwrap();
        assert_eq!(doc.field("a").unwrap().as_text(), Some("foo  bar"));
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        let doc = deserialize("<r>\n  <a>  padded\n</a>\n  <b>\n</b>\n</r>\n").unwrap();
        assert_eq!(doc.field("a").unwrap().as_text(), Some("padded"));
        assert_eq!(doc.field("b").unwrap().as_text(), Some(""));
        assert_eq!(doc.as_text(), None);
    }

    #[test]
    fn test_namespaced_and_dotted_tag_names() {
        let doc = deserialize(
            r#"<lm:response xmlns:lm="http://lifemapper.org"><lm:my.field-1>v</lm:my.field-1></lm:response>"#,
        )
        .unwrap();
        assert_eq!(
            doc.field("lm:my.field-1").unwrap().as_text(),
            Some("v")
        );
    }

    #[test]
    fn test_declaration_and_comments_ignored() {
        let doc = deserialize("<?xml version=\"1.0\"?>\n<!-- c --><a>1</a>\n").unwrap();
        assert_eq!(doc.as_text(), Some("1"));
    }

    #[test]
    fn test_missing_field_is_typed_error() {
        let doc = deserialize("<items><item>1</item></items>").unwrap();
        let err = doc.field("itemCount").unwrap_err();
        assert!(matches!(err, LmError::FieldMissing(name) if name == "itemCount"));
    }

    #[test]
    fn test_mismatched_tag_is_malformed() {
        let err = deserialize("<items><item>1</items>").unwrap_err();
        assert!(matches!(err, LmError::MalformedDocument(_)));
    }

    #[test]
    fn test_unclosed_root_is_malformed() {
        let err = deserialize("<items><item>1</item>").unwrap_err();
        assert!(matches!(err, LmError::MalformedDocument(_)));
    }

    #[test]
    fn test_error_after_valid_content_is_malformed() {
        let mut body = String::from("<items>");
        for i in 0..500 {
            body.push_str(&format!("<item><id>{}</id></item>", i));
        }
        body.push_str("<item><id>broken</item></items>");
        assert!(matches!(
            deserialize(&body).unwrap_err(),
            LmError::MalformedDocument(_)
        ));
    }

    #[test]
    fn test_non_xml_is_malformed() {
        assert!(matches!(
            deserialize("not xml at all").unwrap_err(),
            LmError::MalformedDocument(_)
        ));
        assert!(matches!(
            deserialize("").unwrap_err(),
            LmError::MalformedDocument(_)
        ));
    }

    #[test]
    fn test_two_roots_is_malformed() {
        assert!(matches!(
            deserialize("<a/><b/>").unwrap_err(),
            LmError::MalformedDocument(_)
        ));
    }

    #[test]
    fn test_serializes_to_json() {
        let doc = deserialize(r#"<items count="2"><item>a</item><item>b</item></items>"#).unwrap();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "count": "2", "item": ["a", "b"] })
        );
    }
}
