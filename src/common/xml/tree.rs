//! Owned XML node tree.
//!
//! Slide cloning needs to lift a subtree out of one part, patch it, and graft
//! it into another part. Streaming readers are a poor fit for that, so parts
//! that get rewritten are parsed into this small tree instead. The tree keeps
//! qualified names exactly as written (`p:sp`, `a:t`) and stores text and
//! attribute values in their escaped form, which lets untouched markup
//! round-trip without re-encoding.
use super::escape::{escape_attr, escape_text, unescape};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

/// Errors raised while building a tree from XML bytes.
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    #[error("unbalanced end tag </{0}>")]
    UnbalancedEnd(String),

    #[error("document ended inside <{0}>")]
    UnexpectedEof(String),

    #[error("document has no root element")]
    NoRoot,

    #[error("invalid UTF-8 in XML: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

pub type Result<T> = std::result::Result<T, XmlError>;

/// A node in the tree.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    /// Character data, escaped.
    Text(String),
    CData(String),
    Comment(String),
}

impl XmlNode {
    #[inline]
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Whether this node is an element with the given local name.
    #[inline]
    pub fn is_element(&self, local: &str) -> bool {
        self.as_element().is_some_and(|e| e.local_name() == local)
    }
}

impl From<XmlElement> for XmlNode {
    fn from(e: XmlElement) -> Self {
        XmlNode::Element(e)
    }
}

/// An element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    name: String,
    /// (qualified name, escaped value) in document order
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an empty element with a qualified name such as `a:r`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder form of [`set_attr`](Self::set_attr).
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder form of [`push`](Self::push).
    pub fn with_child(mut self, child: impl Into<XmlNode>) -> Self {
        self.children.push(child.into());
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without its namespace prefix.
    #[inline]
    pub fn local_name(&self) -> &str {
        split_prefix(&self.name).1
    }

    /// Unescaped value of an attribute, looked up by qualified name.
    pub fn attr(&self, name: &str) -> Option<String> {
        self.attr_raw(name).map(unescape)
    }

    /// Escaped value of an attribute, as stored.
    pub fn attr_raw(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set (or replace) an attribute. `value` is escaped.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        let escaped = escape_attr(value);
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = escaped,
            None => self.attributes.push((name.to_string(), escaped)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(k, _)| k == name)?;
        Some(unescape(&self.attributes.remove(pos).1))
    }

    /// Iterate attributes as (qualified name, escaped value).
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Mutable access to attribute values, keyed by qualified name.
    ///
    /// Values are escaped; callers writing arbitrary text must escape it.
    pub fn attributes_mut(&mut self) -> impl Iterator<Item = (&str, &mut String)> {
        self.attributes.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    #[inline]
    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    #[inline]
    pub fn children_mut(&mut self) -> &mut Vec<XmlNode> {
        &mut self.children
    }

    /// Child elements, skipping text and comments.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(XmlNode::as_element_mut)
    }

    /// First child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.local_name() == local)
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|e| e.local_name() == local)
    }

    /// Follow a chain of local names through first-match children.
    pub fn path(&self, locals: &[&str]) -> Option<&XmlElement> {
        locals.iter().try_fold(self, |el, local| el.child(local))
    }

    pub fn path_mut(&mut self, locals: &[&str]) -> Option<&mut XmlElement> {
        let mut el = self;
        for local in locals {
            el = el.child_mut(local)?;
        }
        Some(el)
    }

    /// First child element named `local`, inserting an empty element called
    /// `name` at child position `index` when there is none.
    pub fn child_or_insert(&mut self, local: &str, name: &str, index: usize) -> &mut XmlElement {
        let pos = match self.children.iter().position(|n| n.is_element(local)) {
            Some(pos) => pos,
            None => {
                let pos = index.min(self.children.len());
                self.children.insert(pos, XmlNode::Element(XmlElement::new(name)));
                pos
            },
        };
        match &mut self.children[pos] {
            XmlNode::Element(e) => e,
            _ => unreachable!("position was matched against an element"),
        }
    }

    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| e.local_name() == local)
    }

    #[inline]
    pub fn push(&mut self, child: impl Into<XmlNode>) {
        self.children.push(child.into());
    }

    /// Insert `node` before the first child element named `sentinel`, or
    /// append it when there is no such child. Returns the insertion index.
    ///
    /// Used to keep `p:extLst` as the last child of containers, which the
    /// PresentationML schema requires.
    pub fn insert_before(&mut self, sentinel: &str, node: impl Into<XmlNode>) -> usize {
        let pos = self
            .children
            .iter()
            .position(|n| n.is_element(sentinel))
            .unwrap_or(self.children.len());
        self.children.insert(pos, node.into());
        pos
    }

    /// Insert `node` after the last child whose local name is in `after`, or
    /// at the front when none of them is present.
    pub fn insert_after_any(&mut self, after: &[&str], node: impl Into<XmlNode>) -> usize {
        let pos = self
            .children
            .iter()
            .rposition(|n| n.as_element().is_some_and(|e| after.contains(&e.local_name())))
            .map_or(0, |p| p + 1);
        self.children.insert(pos, node.into());
        pos
    }

    pub fn retain_children(&mut self, f: impl FnMut(&XmlNode) -> bool) {
        self.children.retain(f);
    }

    /// Concatenated, unescaped character data of the direct children.
    pub fn text(&self) -> String {
        let mut raw = String::new();
        for child in &self.children {
            match child {
                XmlNode::Text(t) => raw.push_str(t),
                XmlNode::CData(t) => raw.push_str(&escape_text(t)),
                _ => {},
            }
        }
        unescape(&raw)
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: &str) {
        self.children.clear();
        if !text.is_empty() {
            self.children.push(XmlNode::Text(escape_text(text)));
        }
    }

    /// Pre-order walk over this element and all descendant elements.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a XmlElement)) {
        f(self);
        for child in self.elements() {
            child.walk(f);
        }
    }

    /// Mutable pre-order walk. `f` runs on a parent before its children, so
    /// changes it makes to the child list are what the walk descends into.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut XmlElement)) {
        f(self);
        for child in self.elements_mut() {
            child.walk_mut(f);
        }
    }

    /// All descendant elements (excluding `self`) with the given local name,
    /// in document order.
    pub fn descendants_named<'a>(&'a self, local: &str) -> Vec<&'a XmlElement> {
        let mut found = Vec::new();
        for child in self.elements() {
            child.walk(&mut |e: &'a XmlElement| {
                if e.local_name() == local {
                    found.push(e);
                }
            });
        }
        found
    }

    /// Serialize this element (and its subtree) onto `out`.
    pub fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attributes {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            // Values read from single-quoted attributes may carry a bare quote.
            if v.contains('"') {
                out.push_str(&v.replace('"', "&quot;"));
            } else {
                out.push_str(v);
            }
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                XmlNode::Element(e) => e.write_to(out),
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::CData(t) => {
                    out.push_str("<![CDATA[");
                    out.push_str(t);
                    out.push_str("]]>");
                },
                XmlNode::Comment(t) => {
                    out.push_str("<!--");
                    out.push_str(t);
                    out.push_str("-->");
                },
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    /// Serialize this element without an XML declaration.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(256);
        self.write_to(&mut out);
        out
    }
}

/// Split `p:sp` into (`Some("p")`, `"sp"`).
#[inline]
pub fn split_prefix(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

/// A parsed XML part.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    root: XmlElement,
}

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

impl XmlDocument {
    pub fn new(root: XmlElement) -> Self {
        Self { root }
    }

    /// Parse XML bytes into a tree.
    ///
    /// Whitespace is preserved. The declaration, processing instructions and
    /// doctype are dropped; [`to_bytes`](Self::to_bytes) writes the standard
    /// OOXML declaration back.
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;
        let mut buf = Vec::new();

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| XmlError::Syntax {
                position: reader.buffer_position(),
                message: e.to_string(),
            })?;
            match event {
                Event::Start(ref e) => stack.push(element_from_start(e)?),
                Event::Empty(ref e) => {
                    let el = element_from_start(e)?;
                    attach(&mut stack, &mut root, el);
                },
                Event::End(ref e) => {
                    let el = stack.pop().ok_or_else(|| {
                        XmlError::UnbalancedEnd(String::from_utf8_lossy(e.name().as_ref()).into_owned())
                    })?;
                    attach(&mut stack, &mut root, el);
                },
                Event::Text(ref e) => push_text(&mut stack, std::str::from_utf8(e.as_ref())?, false),
                Event::GeneralRef(ref e) => {
                    let name = std::str::from_utf8(&e[..])?;
                    push_text(&mut stack, &format!("&{};", name), true);
                },
                Event::CData(e) => {
                    if let Some(parent) = stack.last_mut() {
                        let data = e.into_inner();
                        parent.children.push(XmlNode::CData(std::str::from_utf8(&data)?.to_string()));
                    }
                },
                Event::Comment(ref e) => {
                    if let Some(parent) = stack.last_mut() {
                        parent
                            .children
                            .push(XmlNode::Comment(std::str::from_utf8(e.as_ref())?.to_string()));
                    }
                },
                Event::Eof => break,
                _ => {},
            }
            buf.clear();
        }

        if let Some(open) = stack.pop() {
            return Err(XmlError::UnexpectedEof(open.name));
        }
        root.map(Self::new).ok_or(XmlError::NoRoot)
    }

    #[inline]
    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    #[inline]
    pub fn root_mut(&mut self) -> &mut XmlElement {
        &mut self.root
    }

    /// Serialize with the standard declaration.
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(4096);
        out.push_str(XML_DECLARATION);
        out.push_str("\r\n");
        self.root.write_to(&mut out);
        out
    }

    #[inline]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_xml().into_bytes()
    }
}

fn element_from_start(e: &BytesStart<'_>) -> Result<XmlElement> {
    let name = std::str::from_utf8(e.name().as_ref())?.to_string();
    let mut el = XmlElement::new(name);
    for attr in e.attributes().with_checks(false).flatten() {
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = std::str::from_utf8(&attr.value)?.to_string();
        el.attributes.push((key, value));
    }
    Ok(el)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, el: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(el)),
        None => {
            if root.is_none() {
                *root = Some(el);
            }
        },
    }
}

// Text and entity references arrive as separate events; merge adjacent runs so
// one logical text node stays one node.
fn push_text(stack: &mut [XmlElement], raw: &str, is_ref: bool) {
    let Some(parent) = stack.last_mut() else {
        return;
    };
    if raw.is_empty() && !is_ref {
        return;
    }
    if let Some(XmlNode::Text(prev)) = parent.children.last_mut() {
        prev.push_str(raw);
    } else {
        parent.children.push(XmlNode::Text(raw.to_string()));
    }
}
