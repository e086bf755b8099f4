//! A small ElementTree-style document model on top of quick-xml.
//!
//! Text placement follows ElementTree: `text` is the character data before an
//! element's first child and `tail` the data after its end tag, up to the next
//! sibling. Comments, processing instructions and the XML declaration are dropped.

mod convert;
mod encoding;
mod ops;
mod path;

use std::fmt::Write as _;

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};

pub use convert::{XmlToJsonOptions, local_name, xml_to_json};
pub use encoding::decode_document;
pub use ops::{
    count_elements, element_info, get_elements, is_empty_element, is_parent_element,
    remove_attributes_with_empty_value, remove_attributes_with_name, remove_attributes_with_value,
    remove_elements,
};
pub use path::ElementPath;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub tail: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First direct child with the given tag.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// This element and all of its descendants, in document order.
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }

    pub fn iter_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.iter().filter(move |e| e.tag == tag)
    }

    pub fn descendants(&self) -> impl Iterator<Item = &Element> {
        self.iter().skip(1)
    }

    fn push_text(&mut self, s: &str) {
        // character data after a child belongs to that child's tail
        let slot = match self.children.last_mut() {
            Some(last) => &mut last.tail,
            None => &mut self.text,
        };
        slot.get_or_insert_with(String::new).push_str(s);
    }
}

pub struct Iter<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let el = self.stack.pop()?;
        self.stack.extend(el.children.iter().rev());
        Some(el)
    }
}

/// True when `text` holds a single well-formed XML document.
pub fn contains_valid_xml(text: &str) -> bool {
    parse(text).is_ok()
}

fn start_element(e: &BytesStart<'_>) -> Result<Element> {
    let mut el = Element::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        el.attributes.push((key, value));
    }
    Ok(el)
}

fn close_element(el: Element, stack: &mut [Element], root: &mut Option<Element>) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(el);
        return Ok(());
    }
    if root.is_some() {
        return Err(Error::XmlStructure(format!(
            "junk after document element: <{}>",
            el.tag
        )));
    }
    *root = Some(el);
    Ok(())
}

fn push_text(stack: &mut [Element], s: &str, pos: u64) -> Result<()> {
    match stack.last_mut() {
        Some(cur) => {
            cur.push_text(s);
            Ok(())
        }
        None if s.trim().is_empty() => Ok(()),
        None => Err(Error::XmlStructure(format!(
            "text outside of the root element at byte {}",
            pos
        ))),
    }
}

/// Parses a complete document and returns its root element.
pub fn parse(text: &str) -> Result<Element> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    loop {
        let pos = reader.buffer_position() as u64;
        match reader.read_event()? {
            Event::Start(e) => {
                if stack.is_empty() && root.is_some() {
                    return Err(Error::XmlStructure("more than one root element".into()));
                }
                stack.push(start_element(&e)?);
            }
            Event::Empty(e) => {
                let el = start_element(&e)?;
                close_element(el, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| Error::XmlStructure("unexpected end tag".into()))?;
                close_element(el, &mut stack, &mut root)?;
            }
            Event::Text(t) => {
                let s = t.unescape()?;
                push_text(&mut stack, &s, pos)?;
            }
            Event::CData(c) => {
                let s = String::from_utf8_lossy(&c.into_inner()).into_owned();
                push_text(&mut stack, &s, pos)?;
            }
            Event::DocType(_) => tracing::warn!("DOCTYPE declaration ignored, entities it defines are not expanded"),
            Event::Eof => break,
            _ => {}
        }
    }
    if let Some(open) = stack.last() {
        return Err(Error::XmlStructure(format!("unclosed element <{}>", open.tag)));
    }
    let root = root.ok_or_else(|| Error::XmlStructure("no element found".into()))?;
    tracing::debug!(root = %root.tag, "parsed XML document");
    Ok(root)
}

/// Parses raw document bytes, honouring the declared encoding.
pub fn parse_bytes(data: &[u8]) -> Result<Element> {
    parse(&decode_document(data)?)
}

/// Serializes `el` and its subtree. The root's own tail is not written.
pub fn to_xml_string(el: &Element) -> String {
    let mut out = String::new();
    write_element(el, &mut out);
    out
}

fn write_element(el: &Element, out: &mut String) {
    write!(out, "<{}", el.tag).ok();
    for (k, v) in &el.attributes {
        write!(out, " {}=\"{}\"", k, escape(v.as_str())).ok();
    }
    let text = el.text.as_deref().unwrap_or("");
    if el.children.is_empty() && text.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    out.push_str(&escape(text));
    for child in &el.children {
        write_element(child, out);
        if let Some(tail) = &child.tail {
            out.push_str(&escape(tail.as_str()));
        }
    }
    write!(out, "</{}>", el.tag).ok();
}
