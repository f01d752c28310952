//! Specification trees
//!
//! A [`Specification`] is read once from an annotated document into a tree of
//! [`SpecificationNode`]s. Annotation attributes are lifted out of the
//! attribute set into typed fields; everything else stays a plain attribute
//! describing the desired configuration element.

use crate::annotations::{
    annotation_name, assemble_name_list, attributes, is_annotation, parse_name_list,
    NamespaceContext, Operation, ANNOTATION_NAMESPACE, ANNOTATION_PREFIX,
};
use crate::error::{MatchError, SpecificationError};
use confspec_document::{
    Attribute, Document, DocumentError, Element, ElementPath, NamespaceDeclaration, QualifiedName,
    WriteOptions,
};
use tracing::warn;

/// Desired state of one configuration element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecificationNode {
    element: Element,
    operation: Operation,
    explicit_operation: bool,
    key_names: Option<Vec<QualifiedName>>,
    key_text: Option<String>,
    scrap_names: Vec<QualifiedName>,
    scrap_text: Option<String>,
    children: Vec<SpecificationNode>,
}

impl SpecificationNode {
    /// Create node with the default `upsert` operation
    #[inline]
    #[must_use]
    pub fn new(name: QualifiedName) -> Self {
        Self::from_element(Element::new(name))
    }

    fn from_element(element: Element) -> Self {
        Self {
            element,
            operation: Operation::Upsert,
            explicit_operation: false,
            key_names: None,
            key_text: None,
            scrap_names: Vec::new(),
            scrap_text: None,
            children: Vec::new(),
        }
    }

    /// Builder: add attribute
    #[inline]
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<QualifiedName>, value: impl Into<String>) -> Self {
        self.element.set_attribute(Attribute::new(name.into(), value));
        self
    }

    /// Builder: declare operation
    #[inline]
    #[must_use]
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.set_operation(operation);
        self
    }

    /// Builder: declare key attribute names
    #[inline]
    #[must_use]
    pub fn with_keys<N: Into<QualifiedName>>(mut self, names: impl IntoIterator<Item = N>) -> Self {
        self.set_key_names(Some(names.into_iter().map(Into::into).collect()));
        self
    }

    /// Builder: declare scrap attribute names
    #[inline]
    #[must_use]
    pub fn with_scrap<N: Into<QualifiedName>>(mut self, names: impl IntoIterator<Item = N>) -> Self {
        self.set_scrap_names(names.into_iter().map(Into::into).collect());
        self
    }

    /// Builder: append child
    #[inline]
    #[must_use]
    pub fn with_child(mut self, child: SpecificationNode) -> Self {
        self.children.push(child);
        self
    }

    /// Element name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &QualifiedName {
        self.element.name()
    }

    /// Name, prefix hint, namespace declarations and plain attributes
    #[inline]
    #[must_use]
    pub fn element(&self) -> &Element {
        &self.element
    }

    /// Plain (non-annotation) attributes, scrap ones included
    #[inline]
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.element.attributes()
    }

    /// Plain attribute by name
    #[inline]
    #[must_use]
    pub fn attribute(&self, name: &QualifiedName) -> Option<&Attribute> {
        self.element.attribute(name)
    }

    /// Attributes that are not declared as scrap
    pub fn content_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.element
            .attributes()
            .filter(|a| !self.scrap_names.contains(a.name()))
    }

    /// Requested operation
    #[inline]
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Whether the operation was declared rather than defaulted
    #[inline]
    #[must_use]
    pub fn is_operation_explicit(&self) -> bool {
        self.explicit_operation
    }

    /// Declare the operation
    #[inline]
    pub fn set_operation(&mut self, operation: Operation) {
        self.operation = operation;
        self.explicit_operation = true;
    }

    /// Declared key names; `None` when not declared
    #[inline]
    #[must_use]
    pub fn key_names(&self) -> Option<&[QualifiedName]> {
        self.key_names.as_deref()
    }

    /// Key names used for matching
    ///
    /// Undeclared keys default to every plain attribute, scrap ones included.
    #[must_use]
    pub fn effective_key_names(&self) -> Vec<QualifiedName> {
        match &self.key_names {
            Some(names) => names.clone(),
            None => self.element.attribute_names().cloned().collect(),
        }
    }

    /// Replace key declaration
    #[inline]
    pub fn set_key_names(&mut self, names: Option<Vec<QualifiedName>>) {
        self.key_names = names;
        self.key_text = None;
    }

    /// Declared scrap names
    #[inline]
    #[must_use]
    pub fn scrap_names(&self) -> &[QualifiedName] {
        &self.scrap_names
    }

    /// Replace scrap declaration
    #[inline]
    pub fn set_scrap_names(&mut self, names: Vec<QualifiedName>) {
        self.scrap_names = names;
        self.scrap_text = None;
    }

    /// Child nodes in declaration order
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[SpecificationNode] {
        &self.children
    }

    pub(crate) fn set_children(&mut self, children: Vec<SpecificationNode>) {
        self.children = children;
    }

    pub(crate) fn set_attribute(&mut self, attribute: Attribute) {
        self.element.set_attribute(attribute);
    }

    pub(crate) fn attribute_mut(&mut self, name: &QualifiedName) -> Option<&mut Attribute> {
        self.element.attribute_mut(name)
    }

    pub(crate) fn remove_attribute(&mut self, name: &QualifiedName) -> Option<Attribute> {
        self.element.remove_attribute(name)
    }

    /// Check whether `candidate` is the configuration element this node
    /// designates: same name and same values for every key attribute
    ///
    /// # Errors
    /// Returns `MatchError::UndeclaredKey` if a declared key is not one of
    /// this node's attributes
    pub fn satisfied_by(&self, candidate: &Element) -> Result<bool, MatchError> {
        if candidate.name() != self.name() {
            return Ok(false);
        }
        for name in self.effective_key_names() {
            let expected = self
                .element
                .attribute_value(&name)
                .ok_or_else(|| MatchError::UndeclaredKey(name.clone()))?;
            if candidate.attribute_value(&name) != Some(expected) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Check whether `candidate` carries exactly this node's non-scrap
    /// attributes with the same values
    #[must_use]
    pub fn equated_by(&self, candidate: &Element) -> bool {
        let mut expected = 0;
        for attribute in self.content_attributes() {
            if candidate.attribute_value(attribute.name()) != Some(attribute.value()) {
                return false;
            }
            expected += 1;
        }
        candidate.attribute_count() == expected
    }

    /// Copy of this node without children, used as the seed of its inverse
    pub(crate) fn detached(&self) -> Self {
        Self {
            children: Vec::new(),
            ..self.clone()
        }
    }

    /// Plain node replicating a configuration element and its subtree
    #[must_use]
    pub fn graft(element: &Element) -> Self {
        let mut node = Self::from_element(element.shallow_clone());
        node.children = element.children().map(Self::graft).collect();
        node
    }

    /// `none` node replicating a configuration element without its subtree
    #[must_use]
    pub fn anchor(element: &Element) -> Self {
        Self::from_element(element.shallow_clone()).with_operation(Operation::None)
    }

    /// Configuration element created for this node: name and non-scrap attributes
    #[must_use]
    pub fn to_configuration_element(&self) -> Element {
        let mut element = Element::new(self.name().clone())
            .with_prefix(self.element.prefix().map(str::to_string));
        for attribute in self.content_attributes() {
            element.set_attribute(attribute.clone());
        }
        element
    }

    fn to_annotated_element(&self) -> Element {
        let mut element = self.element.shallow_clone();
        let annotate = |element: &mut Element, local: &str, value: String| {
            element.set_attribute(
                Attribute::new(annotation_name(local), value)
                    .with_prefix(Some(ANNOTATION_PREFIX.to_string())),
            );
        };

        if let Some(names) = &self.key_names {
            let value = self
                .key_text
                .clone()
                .unwrap_or_else(|| assemble_name_list(names));
            annotate(&mut element, attributes::KEY, value);
        }
        if !self.scrap_names.is_empty() {
            let value = self
                .scrap_text
                .clone()
                .unwrap_or_else(|| assemble_name_list(&self.scrap_names));
            annotate(&mut element, attributes::SCRAP, value);
        }
        if self.explicit_operation {
            annotate(&mut element, attributes::OPERATION, self.operation.to_string());
        }

        for child in &self.children {
            element.push(child.to_annotated_element());
        }
        element
    }
}

/// Annotated specification document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specification {
    root: SpecificationNode,
    target_monikers: Vec<String>,
    backup_file: Option<String>,
}

impl Specification {
    /// Create specification around a root node
    ///
    /// The root defaults to `update` unless an operation was declared on it.
    #[must_use]
    pub fn new(mut root: SpecificationNode) -> Self {
        if !root.explicit_operation {
            root.operation = Operation::Update;
        }
        Self {
            root,
            target_monikers: Vec::new(),
            backup_file: None,
        }
    }

    /// Builder: set target configuration file monikers
    #[inline]
    #[must_use]
    pub fn with_target_monikers(mut self, monikers: Vec<String>) -> Self {
        self.target_monikers = monikers;
        self
    }

    /// Builder: set backup file path
    #[inline]
    #[must_use]
    pub fn with_backup_file(mut self, path: Option<String>) -> Self {
        self.backup_file = path;
        self
    }

    /// Parse specification text
    ///
    /// # Errors
    /// - `SpecificationError::Document` if the text is not well-formed XML
    /// - `SpecificationError::InvalidOperation` on an unknown operation value
    /// - `SpecificationError::UnknownPrefix` / `InvalidName` on bad name lists
    pub fn parse(text: &str) -> Result<Self, SpecificationError> {
        Self::from_document(&Document::parse(text)?)
    }

    /// Read specification from a parsed document
    ///
    /// # Errors
    /// See [`Specification::parse`]
    pub fn from_document(document: &Document) -> Result<Self, SpecificationError> {
        let mut reader = Reader::default();
        let root_element = document.root();
        let path = ElementPath::root().child(root_element.name().clone(), None);
        let root = reader.read(root_element, &NamespaceContext::default(), &path)?;

        Ok(Self::new(root)
            .with_target_monikers(reader.targets.map(|t| split_monikers(&t)).unwrap_or_default())
            .with_backup_file(reader.backup.filter(|b| !b.trim().is_empty())))
    }

    /// Root node
    #[inline]
    #[must_use]
    pub fn root(&self) -> &SpecificationNode {
        &self.root
    }

    /// Target configuration file monikers
    #[inline]
    #[must_use]
    pub fn target_monikers(&self) -> &[String] {
        &self.target_monikers
    }

    /// Backup file path
    #[inline]
    #[must_use]
    pub fn backup_file(&self) -> Option<&str> {
        self.backup_file.as_deref()
    }

    pub(crate) fn with_root(&self, root: SpecificationNode) -> Self {
        Self {
            root,
            target_monikers: self.target_monikers.clone(),
            backup_file: self.backup_file.clone(),
        }
    }

    /// Annotated document form
    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut root = self.root.to_annotated_element();
        if !root.namespaces().iter().any(|d| d.uri() == ANNOTATION_NAMESPACE)
            && !root.namespaces().iter().any(|d| d.prefix() == Some(ANNOTATION_PREFIX))
        {
            root.declare_namespace(NamespaceDeclaration::new(Some(ANNOTATION_PREFIX), ANNOTATION_NAMESPACE));
        }
        if !self.target_monikers.is_empty() {
            root.set_attribute(
                Attribute::new(
                    annotation_name(attributes::TARGET_CONFIGURATION_FILES),
                    self.target_monikers.join("|"),
                )
                .with_prefix(Some(ANNOTATION_PREFIX.to_string())),
            );
        }
        if let Some(backup) = &self.backup_file {
            root.set_attribute(
                Attribute::new(annotation_name(attributes::BACKUP_CONFIGURATION_FILE), backup.clone())
                    .with_prefix(Some(ANNOTATION_PREFIX.to_string())),
            );
        }
        Document::new(root)
    }

    /// Serialize as indented XML
    ///
    /// # Errors
    /// Returns `DocumentError::Write` if the writer fails
    pub fn to_xml(&self) -> Result<String, DocumentError> {
        self.to_document().to_xml(&WriteOptions::pretty())
    }
}

impl std::str::FromStr for Specification {
    type Err = SpecificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn split_monikers(value: &str) -> Vec<String> {
    value
        .split('|')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Default)]
struct Reader {
    targets: Option<String>,
    backup: Option<String>,
}

impl Reader {
    fn read(
        &mut self,
        element: &Element,
        outer: &NamespaceContext,
        path: &ElementPath,
    ) -> Result<SpecificationNode, SpecificationError> {
        let context = outer.enter(element);
        let is_root = path.len() == 1;

        let mut plain = element.shallow_clone();
        plain.retain_attributes(|a| !is_annotation(a.name()));
        plain.undeclare_namespace(ANNOTATION_NAMESPACE);
        let mut node = SpecificationNode::from_element(plain);

        let mut key = None;
        let mut discriminant = None;
        for attribute in element.attributes().filter(|a| is_annotation(a.name())) {
            match attribute.name().local_name() {
                attributes::OPERATION => {
                    let operation = attribute.value().parse::<Operation>().map_err(|value| {
                        SpecificationError::InvalidOperation {
                            path: path.clone(),
                            value,
                        }
                    })?;
                    node.set_operation(operation);
                }
                attributes::KEY => key = Some(attribute.value()),
                attributes::DISCRIMINANT => discriminant = Some(attribute.value()),
                attributes::SCRAP => {
                    node.scrap_names = parse_name_list(attribute.value(), &context, path)?;
                    node.scrap_text = Some(attribute.value().to_string());
                }
                attributes::TARGET_CONFIGURATION_FILES if is_root => {
                    self.targets = Some(attribute.value().to_string());
                }
                attributes::BACKUP_CONFIGURATION_FILE if is_root => {
                    self.backup = Some(attribute.value().to_string());
                }
                other => warn!(path = %path, annotation = other, "ignoring unsupported annotation"),
            }
        }
        if let Some(value) = key.or(discriminant) {
            node.key_names = Some(parse_name_list(value, &context, path)?);
            node.key_text = Some(value.to_string());
        }

        let count = element.child_element_count();
        for (i, child) in element.children().enumerate() {
            let position = (count > 1).then_some(i + 1);
            let child_path = path.child(child.name().clone(), position);
            node.children.push(self.read(child, &context, &child_path)?);
        }
        Ok(node)
    }
}
