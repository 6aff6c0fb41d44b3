//! Span-tracking XML element tree
//!
//! Just enough structure to locate elements by name and know their exact
//! byte ranges in the source, so edits can be applied as text without
//! reformatting the rest of the document.

use std::ops::Range;

use quick_xml::Reader;
use quick_xml::events::Event;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("Malformed XML at byte {position}: {source}")]
    Syntax {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },

    #[error("Element <{0}> is never closed")]
    UnclosedTag(String),

    #[error("Document has no root element")]
    NoRootElement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlTag {
    /// Local name, without namespace prefix
    pub name: String,
    /// From `<` of the start tag to `>` of the end tag
    pub span: Range<usize>,
    /// Between the start and end tags; empty for `<tag/>`
    pub content: Range<usize>,
    pub self_closing: bool,
    pub children: Vec<XmlTag>,
}

impl XmlTag {
    fn open(name: String, span: Range<usize>) -> Self {
        Self {
            name,
            content: span.end..span.end,
            span,
            self_closing: false,
            children: Vec::new(),
        }
    }

    fn empty(name: String, span: Range<usize>) -> Self {
        Self {
            name,
            content: span.end..span.end,
            span,
            self_closing: true,
            children: Vec::new(),
        }
    }

    pub fn child(&self, name: &str) -> Option<&XmlTag> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlTag> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Descend through nested children, e.g. `["dependencyManagement", "dependencies"]`
    pub fn find(&self, path: &[&str]) -> Option<&XmlTag> {
        path.iter().try_fold(self, |tag, name| tag.child(name))
    }
}

#[derive(Debug, Clone)]
pub struct XmlDocument {
    source: String,
    root: XmlTag,
}

impl XmlDocument {
    pub fn parse(source: impl Into<String>) -> Result<Self, XmlError> {
        let source = source.into();
        let root = parse_tree(&source)?;
        Ok(Self { source, root })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &XmlTag {
        &self.root
    }

    /// Trimmed, unescaped text of an element without child elements
    pub fn text(&self, tag: &XmlTag) -> Option<String> {
        if !tag.children.is_empty() {
            return None;
        }
        let raw = self.source[tag.content.clone()].trim();
        let text = quick_xml::escape::unescape(raw)
            .map(|t| t.into_owned())
            .unwrap_or_else(|_| raw.to_string());
        Some(text)
    }

    pub fn child_value(&self, tag: &XmlTag, name: &str) -> Option<String> {
        self.text(tag.child(name)?)
    }

    /// Start of the line containing `offset`
    pub fn line_start(&self, offset: usize) -> usize {
        self.source[..offset].rfind('\n').map_or(0, |i| i + 1)
    }

    /// Whitespace before `offset` on its line, if nothing else precedes it
    pub fn indent_at(&self, offset: usize) -> Option<&str> {
        let prefix = &self.source[self.line_start(offset)..offset];
        prefix
            .chars()
            .all(|c| c == ' ' || c == '\t')
            .then_some(prefix)
    }
}

fn parse_tree(source: &str) -> Result<XmlTag, XmlError> {
    let mut reader = Reader::from_str(source);
    let mut stack: Vec<XmlTag> = Vec::new();
    let mut root: Option<XmlTag> = None;

    loop {
        let before = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(|source| XmlError::Syntax {
            position: before,
            source,
        })?;
        let end = reader.buffer_position() as usize;
        let start = || source[..end].rfind('<').unwrap_or(before);

        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                stack.push(XmlTag::open(name, start()..end));
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                attach(&mut stack, &mut root, XmlTag::empty(name, start()..end));
            }
            Event::End(_) => {
                // quick-xml has already checked that the end name matches
                if let Some(mut tag) = stack.pop() {
                    tag.content.end = start();
                    tag.span.end = end;
                    attach(&mut stack, &mut root, tag);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(unclosed) = stack.pop() {
        return Err(XmlError::UnclosedTag(unclosed.name));
    }
    root.ok_or(XmlError::NoRootElement)
}

fn attach(stack: &mut [XmlTag], root: &mut Option<XmlTag>, tag: XmlTag) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(tag),
        None => {
            if root.is_none() {
                *root = Some(tag);
            }
        }
    }
}
