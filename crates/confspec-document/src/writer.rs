//! Serialization with `quick-xml`
//!
//! The model stores expanded names only, so the writer owns prefix
//! bookkeeping: it re-emits the declarations an element carried, reuses
//! prefixes already in scope, and declares whatever else a name needs on the
//! element that needs it.

use crate::document::Document;
use crate::element::{Attribute, Content, Element};
use crate::error::DocumentError;
use crate::name::XML_NAMESPACE;
use quick_xml::events::{BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// Serialization settings
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WriteOptions {
    /// Indentation width; `None` writes text nodes verbatim
    pub indent: Option<usize>,
    /// Emit the `<?xml ...?>` declaration
    pub declaration: bool,
}

impl WriteOptions {
    /// Indented output; whitespace-only text is dropped
    #[inline]
    #[must_use]
    pub fn pretty() -> Self {
        Self {
            indent: Some(2),
            declaration: true,
        }
    }

    /// Verbatim output
    #[inline]
    #[must_use]
    pub fn compact() -> Self {
        Self {
            indent: None,
            declaration: true,
        }
    }

    /// Builder: toggle the XML declaration
    #[inline]
    #[must_use]
    pub fn with_declaration(mut self, declaration: bool) -> Self {
        self.declaration = declaration;
        self
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::pretty()
    }
}

pub(crate) fn write(document: &Document, options: &WriteOptions) -> Result<String, DocumentError> {
    let writer = match options.indent {
        Some(width) => Writer::new_with_indent(Vec::new(), b' ', width),
        None => Writer::new(Vec::new()),
    };
    let mut emitter = Emitter {
        writer,
        scope: NamespaceScope::default(),
        pretty: options.indent.is_some(),
        generated: 0,
    };

    if options.declaration {
        emitter.emit(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    }
    for content in document.prolog() {
        emitter.content(content)?;
    }
    emitter.element(document.root())?;
    for content in document.epilog() {
        emitter.content(content)?;
    }

    Ok(String::from_utf8(emitter.writer.into_inner())?)
}

#[derive(Debug, Default)]
struct NamespaceScope {
    frames: Vec<Vec<(Option<String>, String)>>,
}

impl NamespaceScope {
    fn push(&mut self) {
        self.frames.push(Vec::new());
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn bind(&mut self, prefix: Option<&str>, uri: &str) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push((prefix.map(str::to_string), uri.to_string()));
        }
    }

    fn bindings(&self) -> impl Iterator<Item = &(Option<String>, String)> {
        self.frames.iter().rev().flat_map(|frame| frame.iter().rev())
    }

    // empty URI means the default namespace was undeclared
    fn resolve(&self, prefix: Option<&str>) -> Option<&str> {
        self.bindings()
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    fn is_bound(&self, prefix: Option<&str>, uri: &str) -> bool {
        self.resolve(prefix) == Some(uri)
    }

    fn named_prefix_for(&self, uri: &str) -> Option<String> {
        self.bindings()
            .filter(|(_, u)| u == uri)
            .filter_map(|(p, _)| p.as_deref())
            .find(|p| self.is_bound(Some(p), uri))
            .map(str::to_string)
    }

    fn declared_here(&self, prefix: Option<&str>) -> bool {
        self.frames
            .last()
            .is_some_and(|frame| frame.iter().any(|(p, _)| p.as_deref() == prefix))
    }
}

struct Emitter {
    writer: Writer<Vec<u8>>,
    scope: NamespaceScope,
    pretty: bool,
    generated: usize,
}

impl Emitter {
    fn emit(&mut self, event: Event<'_>) -> Result<(), DocumentError> {
        self.writer.write_event(event).map_err(DocumentError::write)
    }

    fn element(&mut self, element: &Element) -> Result<(), DocumentError> {
        self.scope.push();
        let mut declarations = Vec::new();
        for declaration in element.namespaces() {
            if !self.scope.declared_here(declaration.prefix()) {
                self.declare(&mut declarations, declaration.prefix(), declaration.uri());
            }
        }

        let tag = self.element_name(element, &mut declarations);
        let attributes: Vec<(String, &str)> = element
            .attributes()
            .map(|a| (self.attribute_name(a, &mut declarations), a.value()))
            .collect();

        let mut start = BytesStart::new(tag.as_str());
        for (name, uri) in &declarations {
            start.push_attribute((name.as_str(), uri.as_str()));
        }
        for (name, value) in &attributes {
            start.push_attribute((name.as_str(), *value));
        }

        let content: Vec<&Content> = element
            .content()
            .iter()
            .filter(|c| !(self.pretty && c.is_blank_text()))
            .collect();

        if content.is_empty() {
            self.emit(Event::Empty(start))?;
        } else {
            self.emit(Event::Start(start))?;
            for child in content {
                self.content(child)?;
            }
            self.emit(Event::End(BytesEnd::new(tag.as_str())))?;
        }
        self.scope.pop();
        Ok(())
    }

    fn content(&mut self, content: &Content) -> Result<(), DocumentError> {
        match content {
            Content::Element(element) => self.element(element),
            Content::Text(text) => {
                let text = if self.pretty { text.trim() } else { text.as_str() };
                if text.is_empty() {
                    return Ok(());
                }
                self.emit(Event::Text(BytesText::new(text)))
            }
            Content::Comment(text) => self.emit(Event::Comment(BytesText::from_escaped(text.as_str()))),
            Content::ProcessingInstruction(pi) => {
                let body = match &pi.data {
                    Some(data) => format!("{} {data}", pi.target),
                    None => pi.target.clone(),
                };
                self.emit(Event::PI(BytesPI::new(body)))
            }
            Content::DocumentType(body) => self.emit(Event::DocType(BytesText::from_escaped(body.as_str()))),
        }
    }

    fn declare(&mut self, declarations: &mut Vec<(String, String)>, prefix: Option<&str>, uri: &str) {
        let attribute = match prefix {
            Some(p) => format!("xmlns:{p}"),
            None => "xmlns".to_string(),
        };
        declarations.push((attribute, uri.to_string()));
        self.scope.bind(prefix, uri);
    }

    fn fresh_prefix(&mut self) -> String {
        loop {
            let candidate = format!("ns{}", self.generated);
            self.generated += 1;
            if self.scope.resolve(Some(&candidate)).is_none() {
                return candidate;
            }
        }
    }

    fn element_name(&mut self, element: &Element, declarations: &mut Vec<(String, String)>) -> String {
        let local = element.name().local_name();
        let Some(uri) = element.name().namespace() else {
            if self.scope.resolve(None).is_some() {
                self.declare(declarations, None, "");
            }
            return local.to_string();
        };

        if let Some(hint) = element.prefix() {
            if self.scope.is_bound(Some(hint), uri) {
                return format!("{hint}:{local}");
            }
        }
        if self.scope.is_bound(None, uri) {
            return local.to_string();
        }
        if let Some(prefix) = self.scope.named_prefix_for(uri) {
            return format!("{prefix}:{local}");
        }

        match element.prefix() {
            Some(hint) if self.scope.resolve(Some(hint)).is_none() => {
                self.declare(declarations, Some(hint), uri);
                format!("{hint}:{local}")
            }
            None if !self.scope.declared_here(None) => {
                self.declare(declarations, None, uri);
                local.to_string()
            }
            _ => {
                let prefix = self.fresh_prefix();
                self.declare(declarations, Some(&prefix), uri);
                format!("{prefix}:{local}")
            }
        }
    }

    fn attribute_name(&mut self, attribute: &Attribute, declarations: &mut Vec<(String, String)>) -> String {
        let local = attribute.name().local_name();
        let uri = match attribute.name().namespace() {
            None => return local.to_string(),
            Some(XML_NAMESPACE) => return format!("xml:{local}"),
            Some(uri) => uri,
        };

        if let Some(hint) = attribute.prefix() {
            if self.scope.is_bound(Some(hint), uri) {
                return format!("{hint}:{local}");
            }
        }
        if let Some(prefix) = self.scope.named_prefix_for(uri) {
            return format!("{prefix}:{local}");
        }

        let prefix = match attribute.prefix() {
            Some(hint) if hint != "xml" && self.scope.resolve(Some(hint)).is_none() => hint.to_string(),
            _ => self.fresh_prefix(),
        };
        self.declare(declarations, Some(&prefix), uri);
        format!("{prefix}:{local}")
    }
}
