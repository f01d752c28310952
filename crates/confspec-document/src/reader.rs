//! Parsing with `roxmltree`

use crate::document::Document;
use crate::element::{Attribute, Content, Element, NamespaceDeclaration, ProcessingInstruction};
use crate::error::DocumentError;
use crate::name::{QualifiedName, XML_NAMESPACE};
use roxmltree::{Node, NodeType};

pub(crate) fn parse(text: &str) -> Result<Document, DocumentError> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let doc = roxmltree::Document::parse_with_options(text, options)?;

    let mut doctype = document_type(&text[..doc.root_element().range().start]);
    let mut prolog = Vec::new();
    let mut epilog = Vec::new();
    let mut root = None;
    for node in doc.root().children() {
        if doctype.as_ref().is_some_and(|(at, _)| *at < node.range().start) {
            prolog.extend(doctype.take().map(|(_, body)| Content::DocumentType(body)));
        }
        if node.is_element() {
            root = Some(convert_element(node));
            continue;
        }
        let target = if root.is_some() { &mut epilog } else { &mut prolog };
        match node.node_type() {
            NodeType::Comment | NodeType::PI => target.extend(convert_leaf(node)),
            _ => {}
        }
    }

    let root = root.ok_or(DocumentError::MissingRoot)?;
    Ok(Document::from_parts(prolog, root, epilog))
}

// offset and body of the `<!DOCTYPE ...>` declaration, which roxmltree checks but does not keep
fn document_type(prolog: &str) -> Option<(usize, String)> {
    const OPEN: &str = "<!DOCTYPE";
    let mut start = 0;
    // comments and PIs may precede the declaration and mention it
    loop {
        let rest = &prolog[start..];
        let skip = if rest.starts_with("<!--") {
            rest.find("-->").map(|end| end + 3)
        } else if rest.starts_with("<?") {
            rest.find("?>").map(|end| end + 2)
        } else if rest.starts_with(OPEN) {
            break;
        } else {
            rest.chars().next().map(char::len_utf8)
        };
        start += skip?;
    }
    let body = &prolog[start + OPEN.len()..];
    let mut depth = 0usize;
    let mut quote = None;
    for (offset, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '>') if depth == 0 => return Some((start, body[..offset].trim().to_string())),
            (None, _) => {}
        }
    }
    None
}

fn convert_element(node: Node<'_, '_>) -> Element {
    let tag = node.tag_name();
    let name = QualifiedName::new(tag.namespace(), tag.name());
    let prefix = tag.namespace().and_then(|uri| element_prefix(node, uri));

    let mut element = Element::new(name).with_prefix(prefix);
    for declaration in declared_namespaces(node) {
        element.declare_namespace(declaration);
    }

    for attr in node.attributes() {
        let prefix = attr.namespace().and_then(|uri| attribute_prefix(node, uri));
        element.set_attribute(
            Attribute::new(QualifiedName::new(attr.namespace(), attr.name()), attr.value())
                .with_prefix(prefix),
        );
    }

    for child in node.children() {
        if child.is_element() {
            element.push(convert_element(child));
        } else if let Some(content) = convert_leaf(child) {
            element.push(content);
        }
    }
    element
}

fn convert_leaf(node: Node<'_, '_>) -> Option<Content> {
    match node.node_type() {
        NodeType::Text => node.text().map(|t| Content::Text(t.to_string())),
        NodeType::Comment => node.text().map(|t| Content::Comment(t.to_string())),
        NodeType::PI => node.pi().map(|pi| {
            Content::ProcessingInstruction(ProcessingInstruction {
                target: pi.target.to_string(),
                data: pi.value.map(str::to_string),
            })
        }),
        NodeType::Root | NodeType::Element => None,
    }
}

// in-scope namespaces of `node` that its parent element does not already bind
fn declared_namespaces(node: Node<'_, '_>) -> Vec<NamespaceDeclaration> {
    let parent_scope: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|p| p.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();

    node.namespaces()
        .filter(|ns| ns.uri() != XML_NAMESPACE)
        .filter(|ns| !parent_scope.contains(&(ns.name(), ns.uri())))
        .map(|ns| NamespaceDeclaration::new(ns.name(), ns.uri()))
        .collect()
}

fn element_prefix(node: Node<'_, '_>, uri: &str) -> Option<String> {
    if node
        .namespaces()
        .any(|ns| ns.uri() == uri && ns.name().is_none())
    {
        return None;
    }
    node.namespaces()
        .filter(|ns| ns.uri() == uri)
        .find_map(|ns| ns.name())
        .map(str::to_string)
}

fn attribute_prefix(node: Node<'_, '_>, uri: &str) -> Option<String> {
    if uri == XML_NAMESPACE {
        return Some("xml".to_string());
    }
    node.namespaces()
        .filter(|ns| ns.uri() == uri)
        .find_map(|ns| ns.name())
        .map(str::to_string)
}
