//! Lossless XML tree for MSBuild project files
//!
//! The tree is built from `quick-xml` events and keeps the raw text of every
//! start tag, text run, comment and declaration. Writing an unmodified tree
//! reproduces the input exactly; an element whose attributes were changed is
//! the only thing re-rendered.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::escape::{escape, partial_escape, unescape};
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use thiserror::Error;

const UTF8_BOM: &str = "\u{feff}";

/// Raised when a document cannot be read or written
#[derive(Error, Debug)]
#[error("{message}")]
pub struct XmlTreeError {
    pub message: String,
}

impl XmlTreeError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One node of the tree. Text-like variants hold the raw, still escaped, source text.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    Comment(String),
    CData(String),
    Declaration(String),
    ProcessingInstruction(String),
    DocType(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    /// Start tag content as read; dropped once attributes change
    raw_start: Option<String>,
    children: Vec<XmlNode>,
    self_closing: bool,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            raw_start: None,
            children: Vec::new(),
            self_closing: true,
        }
    }

    /// An open element whose closing tag sits on its own line, preceded by `closing`
    pub fn new_block(name: impl Into<String>, closing: &str) -> Self {
        let mut element = Self::new(name);
        element.children.push(XmlNode::Text(closing.to_string()));
        element.self_closing = false;
        element
    }

    /// `<name>text</name>`
    pub fn with_text(name: impl Into<String>, text: &str) -> Self {
        let mut element = Self::new(name);
        element.set_text(text);
        element
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without a namespace prefix
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attribute(&mut self, key: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attributes.push((key.to_string(), value.to_string())),
        }
        self.raw_start = None;
    }

    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// Direct child elements in document order
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    /// First direct child element with the given local name
    pub fn child(&self, local_name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.local_name() == local_name)
    }

    pub fn child_mut(&mut self, local_name: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|e| e.local_name() == local_name)
    }

    /// Unescaped text content of the direct text and CDATA children
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.children {
            match node {
                XmlNode::Text(raw) => match unescape(raw) {
                    Ok(value) => text.push_str(&value),
                    Err(_) => text.push_str(raw),
                },
                XmlNode::CData(raw) => text.push_str(raw),
                _ => {}
            }
        }
        text
    }

    /// Replace all children with a single escaped text node
    pub fn set_text(&mut self, value: &str) {
        self.children = vec![XmlNode::Text(partial_escape(value).into_owned())];
        self.open_up();
    }

    /// Append a child element, indented like its previous sibling.
    /// Returns the node index of the new element.
    pub fn append_element(&mut self, element: XmlElement) -> usize {
        self.open_up();
        let indent = self.child_indent();
        match self
            .children
            .iter()
            .rposition(|node| matches!(node, XmlNode::Element(_)))
        {
            Some(last) => {
                self.children.insert(last + 1, XmlNode::Text(indent));
                self.children.insert(last + 2, XmlNode::Element(element));
                last + 2
            }
            None => match self.children.last() {
                Some(XmlNode::Text(raw)) if is_blank(raw) => {
                    let at = self.children.len() - 1;
                    self.children.insert(at, XmlNode::Text(indent));
                    self.children.insert(at + 1, XmlNode::Element(element));
                    at + 1
                }
                _ => {
                    self.children.push(XmlNode::Text(indent));
                    self.children.push(XmlNode::Element(element));
                    self.children.push(XmlNode::Text("\n".to_string()));
                    self.children.len() - 2
                }
            },
        }
    }

    /// Insert a child element directly after the child node at `index`
    pub fn insert_element_after(&mut self, index: usize, element: XmlElement) -> usize {
        self.open_up();
        let indent = self.child_indent();
        let at = (index + 1).min(self.children.len());
        self.children.insert(at, XmlNode::Text(indent));
        self.children.insert(at + 1, XmlNode::Element(element));
        at + 1
    }

    /// Insert a child element directly before the child node at `index`
    pub fn insert_element_before(&mut self, index: usize, element: XmlElement) -> usize {
        self.open_up();
        let indent = self.child_indent();
        let at = index.min(self.children.len());
        self.children.insert(at, XmlNode::Element(element));
        self.children.insert(at + 1, XmlNode::Text(indent));
        at
    }

    /// Child element at node index `index`
    pub fn element_at_mut(&mut self, index: usize) -> Option<&mut XmlElement> {
        match self.children.get_mut(index) {
            Some(XmlNode::Element(element)) => Some(element),
            _ => None,
        }
    }

    /// Turn `<a />` into `<a>` before it receives children
    fn open_up(&mut self) {
        if self.self_closing {
            if let Some(raw) = &mut self.raw_start {
                raw.truncate(raw.trim_end().len());
            }
            self.self_closing = false;
        }
    }

    /// Whitespace that should precede a new child element
    pub fn child_indent(&self) -> String {
        let last_element = self
            .children
            .iter()
            .rposition(|node| matches!(node, XmlNode::Element(_)));

        if let Some(last) = last_element {
            if let Some(XmlNode::Text(raw)) = last.checked_sub(1).and_then(|i| self.children.get(i)) {
                if is_blank(raw) {
                    return raw.clone();
                }
            }
        }

        let closing = match self.children.last() {
            Some(XmlNode::Text(raw)) if is_blank(raw) => raw.clone(),
            _ => "\n".to_string(),
        };
        let unit = if closing.contains('\t') { "\t" } else { "  " };
        format!("{}{}", closing, unit)
    }

    /// Node index of the first child element matching `predicate`
    pub fn position_of(&self, predicate: impl Fn(&XmlElement) -> bool) -> Option<usize> {
        self.children.iter().position(|node| match node {
            XmlNode::Element(element) => predicate(element),
            _ => false,
        })
    }

    /// Remove the child node at `index` together with the whitespace run before it
    pub fn remove_node(&mut self, index: usize) -> Option<XmlNode> {
        if index >= self.children.len() {
            return None;
        }
        let removed = self.children.remove(index);
        if index > 0 {
            if let Some(XmlNode::Text(raw)) = self.children.get(index - 1) {
                if is_blank(raw) {
                    self.children.remove(index - 1);
                }
            }
        }
        Some(removed)
    }

    /// Remove the first child element matching `predicate`
    pub fn remove_element(&mut self, predicate: impl Fn(&XmlElement) -> bool) -> Option<XmlElement> {
        let index = self.position_of(predicate)?;
        match self.remove_node(index) {
            Some(XmlNode::Element(element)) => Some(element),
            _ => None,
        }
    }

    /// Start tag content for an element built or edited in memory. Empty
    /// elements get the ` />` spacing Visual Studio writes.
    fn render_start(&self, is_empty: bool) -> String {
        let mut content = self.name.clone();
        for (key, value) in &self.attributes {
            content.push_str(&format!(" {}=\"{}\"", key, escape(value.as_str())));
        }
        if is_empty {
            content.push(' ');
        }
        content
    }

    fn write<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<(), XmlTreeError> {
        let is_empty = self.self_closing && self.children.is_empty();
        let content = match &self.raw_start {
            Some(raw) => raw.clone(),
            None => self.render_start(is_empty),
        };
        let start = BytesStart::from_content(content, self.name.len());

        if is_empty {
            return write_event(writer, Event::Empty(start));
        }

        write_event(writer, Event::Start(start))?;
        for child in &self.children {
            write_node(writer, child)?;
        }
        write_event(writer, Event::End(BytesEnd::new(self.name.as_str())))
    }
}

/// A whole document: prolog nodes, the root element and any trailing nodes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlDocument {
    bom: bool,
    nodes: Vec<XmlNode>,
}

impl XmlDocument {
    /// Build a document from a declaration and a root element
    pub fn with_root(declaration: Option<&str>, root: XmlElement) -> Self {
        let mut nodes = Vec::new();
        if let Some(declaration) = declaration {
            nodes.push(XmlNode::Declaration(declaration.to_string()));
            nodes.push(XmlNode::Text("\n".to_string()));
        }
        nodes.push(XmlNode::Element(root));
        nodes.push(XmlNode::Text("\n".to_string()));
        Self { bom: false, nodes }
    }

    pub fn parse(content: &str) -> Result<Self, XmlTreeError> {
        let (bom, content) = match content.strip_prefix(UTF8_BOM) {
            Some(rest) => (true, rest),
            None => (false, content),
        };

        let mut reader = Reader::from_str(content);
        let mut builder = TreeBuilder::default();

        loop {
            let event = reader.read_event().map_err(|e| {
                XmlTreeError::new(format!(
                    "{} at position {}",
                    e,
                    reader.buffer_position()
                ))
            })?;

            match event {
                Event::Start(e) => {
                    let element = element_from_start(&e)?;
                    builder.open(element);
                }
                Event::Empty(e) => {
                    let element = element_from_start(&e)?;
                    builder.push(XmlNode::Element(element));
                }
                Event::End(_) => builder.close()?,
                Event::Text(e) => builder.push_text(&utf8(&e)?),
                Event::GeneralRef(e) => builder.push_text(&format!("&{};", utf8(&e)?)),
                Event::CData(e) => builder.push(XmlNode::CData(utf8(&e)?)),
                Event::Comment(e) => builder.push(XmlNode::Comment(utf8(&e)?)),
                Event::Decl(e) => builder.push(XmlNode::Declaration(utf8(&e)?)),
                Event::PI(e) => builder.push(XmlNode::ProcessingInstruction(utf8(&e)?)),
                Event::DocType(e) => builder.push(XmlNode::DocType(utf8(&e)?)),
                Event::Eof => break,
            }
        }

        let nodes = builder.finish()?;
        Ok(Self { bom, nodes })
    }

    pub fn to_xml(&self) -> Result<String, XmlTreeError> {
        let mut writer = Writer::new(Vec::new());
        for node in &self.nodes {
            write_node(&mut writer, node)?;
        }
        let body = String::from_utf8(writer.into_inner())
            .map_err(|e| XmlTreeError::new(format!("Generated XML is not UTF-8: {}", e)))?;
        if self.bom {
            Ok(format!("{}{}", UTF8_BOM, body))
        } else {
            Ok(body)
        }
    }

    pub fn root(&self) -> Option<&XmlElement> {
        self.nodes.iter().find_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn root_mut(&mut self) -> Option<&mut XmlElement> {
        self.nodes.iter_mut().find_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }
}

#[derive(Default)]
struct TreeBuilder {
    open: Vec<XmlElement>,
    top_level: Vec<XmlNode>,
}

impl TreeBuilder {
    fn siblings(&mut self) -> &mut Vec<XmlNode> {
        match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.top_level,
        }
    }

    fn push(&mut self, node: XmlNode) {
        self.siblings().push(node);
    }

    /// Text and entity references arrive as separate events; keep them in one node
    fn push_text(&mut self, raw: &str) {
        let siblings = self.siblings();
        if let Some(XmlNode::Text(existing)) = siblings.last_mut() {
            existing.push_str(raw);
        } else {
            siblings.push(XmlNode::Text(raw.to_string()));
        }
    }

    fn open(&mut self, mut element: XmlElement) {
        element.self_closing = false;
        self.open.push(element);
    }

    fn close(&mut self) -> Result<(), XmlTreeError> {
        let element = self
            .open
            .pop()
            .ok_or_else(|| XmlTreeError::new("Unexpected closing tag"))?;
        self.push(XmlNode::Element(element));
        Ok(())
    }

    fn finish(self) -> Result<Vec<XmlNode>, XmlTreeError> {
        if let Some(unclosed) = self.open.last() {
            return Err(XmlTreeError::new(format!(
                "Element <{}> is never closed",
                unclosed.name
            )));
        }
        Ok(self.top_level)
    }
}

fn element_from_start(start: &BytesStart) -> Result<XmlElement, XmlTreeError> {
    let name = utf8(start.name().as_ref())?;
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlTreeError::new(format!("Bad attribute in <{}>: {}", name, e)))?;
        let key = utf8(attr.key.as_ref())?;
        let raw_value = utf8(&attr.value)?;
        let value = match unescape(&raw_value) {
            Ok(value) => value.into_owned(),
            Err(_) => raw_value,
        };
        attributes.push((key, value));
    }

    Ok(XmlElement {
        name,
        attributes,
        raw_start: Some(utf8(start)?),
        children: Vec::new(),
        self_closing: true,
    })
}

fn write_node<W: std::io::Write>(writer: &mut Writer<W>, node: &XmlNode) -> Result<(), XmlTreeError> {
    match node {
        XmlNode::Element(element) => element.write(writer),
        XmlNode::Text(raw) => write_event(writer, Event::Text(BytesText::from_escaped(raw.as_str()))),
        XmlNode::Comment(raw) => write_event(writer, Event::Comment(BytesText::from_escaped(raw.as_str()))),
        XmlNode::CData(raw) => write_event(writer, Event::CData(BytesCData::new(raw.as_str()))),
        XmlNode::Declaration(raw) => write_event(
            writer,
            Event::Decl(BytesDecl::from_start(BytesStart::from_content(raw.as_str(), 3))),
        ),
        XmlNode::ProcessingInstruction(raw) => write_event(writer, Event::PI(BytesPI::new(raw.as_str()))),
        XmlNode::DocType(raw) => write_event(writer, Event::DocType(BytesText::from_escaped(raw.as_str()))),
    }
}

fn write_event<W: std::io::Write>(writer: &mut Writer<W>, event: Event) -> Result<(), XmlTreeError> {
    writer
        .write_event(event)
        .map_err(|e| XmlTreeError::new(format!("Failed to write XML: {}", e)))
}

fn utf8(bytes: &[u8]) -> Result<String, XmlTreeError> {
    std::str::from_utf8(bytes)
        .map(|s| s.to_string())
        .map_err(|e| XmlTreeError::new(format!("Invalid UTF-8 in document: {}", e)))
}

fn is_blank(raw: &str) -> bool {
    raw.chars().all(char::is_whitespace)
}

#[cfg(test)]
#[path = "xml_tree_tests.rs"]
mod tests;
