//! Element tree model
//!
//! [`Element`] is an owned, ordered XML element: expanded name, attributes
//! unique by expanded name, the namespace declarations it carried in its
//! source, and mixed [`Content`]. Both configuration and specification trees
//! are read into this model before anything else happens to them.

use crate::name::QualifiedName;
use indexmap::IndexMap;

/// Attribute of an element
///
/// Equality compares the expanded name and the value; the prefix is only a
/// hint for the writer.
#[derive(Debug, Clone, Eq)]
pub struct Attribute {
    name: QualifiedName,
    value: String,
    prefix: Option<String>,
}

impl Attribute {
    /// Create attribute
    #[inline]
    #[must_use]
    pub fn new(name: QualifiedName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
            prefix: None,
        }
    }

    /// Attach the prefix seen in the source document
    #[inline]
    #[must_use]
    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix;
        self
    }

    /// Expanded name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    /// Attribute value
    #[inline]
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Prefix hint
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Replace the value, returning the previous one
    #[inline]
    pub fn set_value(&mut self, value: impl Into<String>) -> String {
        std::mem::replace(&mut self.value, value.into())
    }

    /// Exchange values with another attribute
    #[inline]
    pub fn swap_value(&mut self, other: &mut Attribute) {
        std::mem::swap(&mut self.value, &mut other.value);
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value
    }
}

/// Namespace declaration (`xmlns` or `xmlns:prefix`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceDeclaration {
    prefix: Option<String>,
    uri: String,
}

impl NamespaceDeclaration {
    /// Declaration binding `prefix` (or the default namespace when `None`)
    #[inline]
    #[must_use]
    pub fn new(prefix: Option<impl Into<String>>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.map(Into::into),
            uri: uri.into(),
        }
    }

    /// Bound prefix, `None` for the default namespace
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Namespace URI
    #[inline]
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

/// Processing instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingInstruction {
    /// Target name
    pub target: String,
    /// Instruction data
    pub data: Option<String>,
}

/// Child node of an element or document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Nested element
    Element(Element),
    /// Character data
    Text(String),
    /// Comment text
    Comment(String),
    /// Processing instruction
    ProcessingInstruction(ProcessingInstruction),
    /// Body of a `<!DOCTYPE ...>` declaration; only found in a document prolog
    DocumentType(String),
}

impl Content {
    /// Borrow as element
    #[inline]
    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Mutably borrow as element
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Check for whitespace-only text
    #[inline]
    #[must_use]
    pub fn is_blank_text(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }
}

impl From<Element> for Content {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

/// XML element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: QualifiedName,
    prefix: Option<String>,
    namespaces: Vec<NamespaceDeclaration>,
    attributes: IndexMap<QualifiedName, Attribute>,
    content: Vec<Content>,
}

impl Element {
    /// Create empty element
    #[inline]
    #[must_use]
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            prefix: None,
            namespaces: Vec::new(),
            attributes: IndexMap::new(),
            content: Vec::new(),
        }
    }

    /// Builder: set prefix hint
    #[inline]
    #[must_use]
    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix;
        self
    }

    /// Builder: add attribute
    #[inline]
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<QualifiedName>, value: impl Into<String>) -> Self {
        self.set_attribute(Attribute::new(name.into(), value));
        self
    }

    /// Builder: append child element
    #[inline]
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.content.push(Content::Element(child));
        self
    }

    /// Expanded name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &QualifiedName {
        &self.name
    }

    /// Prefix hint
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Namespace declarations carried by this element
    #[inline]
    #[must_use]
    pub fn namespaces(&self) -> &[NamespaceDeclaration] {
        &self.namespaces
    }

    /// Declare a namespace, replacing any declaration of the same prefix
    pub fn declare_namespace(&mut self, declaration: NamespaceDeclaration) {
        match self
            .namespaces
            .iter_mut()
            .find(|d| d.prefix == declaration.prefix)
        {
            Some(existing) => *existing = declaration,
            None => self.namespaces.push(declaration),
        }
    }

    /// Drop every declaration binding `uri`
    pub fn undeclare_namespace(&mut self, uri: &str) {
        self.namespaces.retain(|d| d.uri != uri);
    }

    /// Attributes in document order
    #[inline]
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    /// Attribute names in document order
    #[inline]
    pub fn attribute_names(&self) -> impl Iterator<Item = &QualifiedName> {
        self.attributes.keys()
    }

    /// Number of attributes
    #[inline]
    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Look up attribute by expanded name
    #[inline]
    #[must_use]
    pub fn attribute(&self, name: &QualifiedName) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Look up attribute mutably
    #[inline]
    pub fn attribute_mut(&mut self, name: &QualifiedName) -> Option<&mut Attribute> {
        self.attributes.get_mut(name)
    }

    /// Attribute value by expanded name
    #[inline]
    #[must_use]
    pub fn attribute_value(&self, name: &QualifiedName) -> Option<&str> {
        self.attributes.get(name).map(Attribute::value)
    }

    /// Check for attribute presence
    #[inline]
    #[must_use]
    pub fn has_attribute(&self, name: &QualifiedName) -> bool {
        self.attributes.contains_key(name)
    }

    /// Insert or replace an attribute, keeping its position when replaced
    pub fn set_attribute(&mut self, attribute: Attribute) -> Option<Attribute> {
        self.attributes.insert(attribute.name.clone(), attribute)
    }

    /// Remove attribute, preserving the order of the others
    pub fn remove_attribute(&mut self, name: &QualifiedName) -> Option<Attribute> {
        self.attributes.shift_remove(name)
    }

    /// Keep only attributes matching `keep`
    pub fn retain_attributes(&mut self, mut keep: impl FnMut(&Attribute) -> bool) {
        self.attributes.retain(|_, attribute| keep(attribute));
    }

    /// Mixed content
    #[inline]
    #[must_use]
    pub fn content(&self) -> &[Content] {
        &self.content
    }

    /// Mixed content, mutable
    #[inline]
    pub fn content_mut(&mut self) -> &mut Vec<Content> {
        &mut self.content
    }

    /// Append content
    #[inline]
    pub fn push(&mut self, content: impl Into<Content>) {
        self.content.push(content.into());
    }

    /// Child elements in document order
    #[inline]
    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.content.iter().filter_map(Content::as_element)
    }

    /// Child elements, mutable
    #[inline]
    pub fn children_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.content.iter_mut().filter_map(Content::as_element_mut)
    }

    /// Check for element children
    #[inline]
    #[must_use]
    pub fn has_child_elements(&self) -> bool {
        self.children().next().is_some()
    }

    /// Number of element children
    #[inline]
    #[must_use]
    pub fn child_element_count(&self) -> usize {
        self.children().count()
    }

    /// Content indices holding elements
    #[must_use]
    pub fn element_indices(&self) -> Vec<usize> {
        self.content
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, Content::Element(_)))
            .map(|(i, _)| i)
            .collect()
    }

    /// Element stored at content index
    #[inline]
    #[must_use]
    pub fn element_at(&self, index: usize) -> Option<&Element> {
        self.content.get(index).and_then(Content::as_element)
    }

    /// Element stored at content index, mutable
    #[inline]
    pub fn element_at_mut(&mut self, index: usize) -> Option<&mut Element> {
        self.content.get_mut(index).and_then(Content::as_element_mut)
    }

    /// Content index of the first element after `index`
    #[must_use]
    pub fn next_element_index(&self, index: usize) -> Option<usize> {
        self.content
            .iter()
            .enumerate()
            .skip(index + 1)
            .find(|(_, c)| matches!(c, Content::Element(_)))
            .map(|(i, _)| i)
    }

    /// Positional predicate of the element at content `index`
    ///
    /// Counts every preceding element sibling, whatever its name; `None` when
    /// the element has no element siblings at all.
    #[must_use]
    pub fn element_position(&self, index: usize) -> Option<usize> {
        if self.child_element_count() < 2 {
            return None;
        }
        let preceding = self.content[..index.min(self.content.len())]
            .iter()
            .filter(|c| matches!(c, Content::Element(_)))
            .count();
        Some(preceding + 1)
    }

    /// Insert content at `index` (clamped to the end)
    pub fn insert_content(&mut self, index: usize, content: impl Into<Content>) {
        let index = index.min(self.content.len());
        self.content.insert(index, content.into());
    }

    /// Remove content at `index`
    pub fn remove_content(&mut self, index: usize) -> Option<Content> {
        (index < self.content.len()).then(|| self.content.remove(index))
    }

    /// Copy of name, prefix, declarations and attributes without content
    #[must_use]
    pub fn shallow_clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            prefix: self.prefix.clone(),
            namespaces: self.namespaces.clone(),
            attributes: self.attributes.clone(),
            content: Vec::new(),
        }
    }

    /// Structural equivalence
    ///
    /// Names, attribute sets (order-insensitive) and element children (in
    /// order) must match. Text, comments, processing instructions, prefixes
    /// and namespace declarations are ignored.
    #[must_use]
    pub fn is_equivalent_to(&self, other: &Self) -> bool {
        self.name == other.name
            && self.attributes.len() == other.attributes.len()
            && self
                .attributes
                .values()
                .all(|a| other.attribute_value(&a.name) == Some(a.value()))
            && self.child_element_count() == other.child_element_count()
            && self
                .children()
                .zip(other.children())
                .all(|(a, b)| a.is_equivalent_to(b))
    }
}
