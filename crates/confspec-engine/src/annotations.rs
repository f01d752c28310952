//! Specification annotation vocabulary
//!
//! Specifications are plain XML documents whose elements carry a few extra
//! attributes in the annotation namespace:
//!
//! | attribute | meaning |
//! |---|---|
//! | `operation` | `insert`, `update`, `upsert`, `delete` or `none` |
//! | `key` (alias `discriminant`) | attribute names used to locate the configuration element |
//! | `scrap` | attribute names only used for matching, removed from the configuration |
//! | `targetConfigurationFiles` | root only: `\|`-separated configuration file monikers |
//! | `backupConfigurationFile` | root only: backup file path |
//!
//! Name lists are separated by spaces, `|`, `,` or `;`. Items are written in
//! Clark notation (`{uri}local`), as `prefix:local` resolved against the
//! namespaces in scope, or as plain local names.

use crate::error::SpecificationError;
use confspec_document::{Element, ElementPath, NamespaceDeclaration, QualifiedName, XML_NAMESPACE};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Annotation namespace URI
pub const ANNOTATION_NAMESPACE: &str = "urn:schemas.stateless.be:dsl:configuration:annotations:2020";

/// Prefix used when writing annotations
pub const ANNOTATION_PREFIX: &str = "config";

/// Local names of the annotation attributes
pub mod attributes {
    /// Operation annotation
    pub const OPERATION: &str = "operation";
    /// Key annotation
    pub const KEY: &str = "key";
    /// Alias of [`KEY`]
    pub const DISCRIMINANT: &str = "discriminant";
    /// Scrap annotation
    pub const SCRAP: &str = "scrap";
    /// Target configuration file monikers (root only)
    pub const TARGET_CONFIGURATION_FILES: &str = "targetConfigurationFiles";
    /// Backup configuration file (root only)
    pub const BACKUP_CONFIGURATION_FILE: &str = "backupConfigurationFile";
}

/// Expanded name of an annotation attribute
#[inline]
#[must_use]
pub fn annotation_name(local: &str) -> QualifiedName {
    QualifiedName::namespaced(ANNOTATION_NAMESPACE, local)
}

/// Check whether `name` is in the annotation namespace
#[inline]
#[must_use]
pub fn is_annotation(name: &QualifiedName) -> bool {
    name.is_in(ANNOTATION_NAMESPACE)
}

/// Operation requested by a specification element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Create the element; conflicting existing element is an error
    Insert,
    /// Change an existing element; missing element is an error
    Update,
    /// Update when present, insert otherwise
    Upsert,
    /// Remove the element when present
    Delete,
    /// Leave the element alone, only descend into it
    None,
}

impl Operation {
    /// Every legal operation
    pub const ALL: [Self; 5] = [Self::Insert, Self::Update, Self::Upsert, Self::Delete, Self::None];

    /// Annotation value
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Upsert => "upsert",
            Self::Delete => "delete",
            Self::None => "none",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == lowered)
            .ok_or_else(|| s.to_string())
    }
}

/// Namespace bindings in scope while reading a specification
#[derive(Debug, Clone, Default)]
pub struct NamespaceContext {
    bindings: Vec<NamespaceDeclaration>,
}

impl NamespaceContext {
    /// Context inside `element`
    #[must_use]
    pub fn enter(&self, element: &Element) -> Self {
        let mut bindings = self.bindings.clone();
        bindings.extend(element.namespaces().iter().cloned());
        Self { bindings }
    }

    /// Namespace bound to `prefix`
    #[must_use]
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.bindings
            .iter()
            .rev()
            .find(|d| d.prefix() == Some(prefix))
            .map(NamespaceDeclaration::uri)
            .filter(|uri| !uri.is_empty())
    }
}

/// Split an annotation name list into expanded names
///
/// # Errors
/// - `SpecificationError::UnknownPrefix` if a prefix is not in scope
/// - `SpecificationError::InvalidName` if an item is not a valid name
pub fn parse_name_list(
    value: &str,
    context: &NamespaceContext,
    path: &ElementPath,
) -> Result<Vec<QualifiedName>, SpecificationError> {
    let mut names: Vec<QualifiedName> = Vec::new();
    for token in value
        .split([' ', '|', ',', ';'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        let name = match token.split_once(':') {
            Some((prefix, local)) if !token.starts_with('{') => {
                let uri = context
                    .resolve(prefix)
                    .ok_or_else(|| SpecificationError::UnknownPrefix {
                        path: path.clone(),
                        prefix: prefix.to_string(),
                    })?;
                parse_token(&format!("{{{uri}}}{local}"), path)?
            }
            _ => parse_token(token, path)?,
        };
        if !names.contains(&name) {
            names.push(name);
        }
    }
    Ok(names)
}

fn parse_token(token: &str, path: &ElementPath) -> Result<QualifiedName, SpecificationError> {
    token
        .parse()
        .map_err(|source| SpecificationError::InvalidName {
            path: path.clone(),
            source,
        })
}

/// Join names into an annotation value (Clark notation, space separated)
#[must_use]
pub fn assemble_name_list(names: &[QualifiedName]) -> String {
    names
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> NamespaceContext {
        let mut element = Element::new("root".into());
        element.declare_namespace(NamespaceDeclaration::new(Some("s0"), "urn:0"));
        NamespaceContext::default().enter(&element)
    }

    #[test]
    fn operation_from_str_case_insensitive() {
        assert_eq!("Insert".parse::<Operation>(), Ok(Operation::Insert));
        assert_eq!("DELETE".parse::<Operation>(), Ok(Operation::Delete));
        assert_eq!("none".parse::<Operation>(), Ok(Operation::None));
        assert_eq!("merge".parse::<Operation>(), Err("merge".to_string()));
    }

    #[test]
    fn operation_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Operation::Upsert).unwrap(), "\"upsert\"");
    }

    #[test]
    fn name_list_separators() {
        let names = parse_name_list("name type|a,b;c", &context(), &ElementPath::root()).unwrap();
        let shown: Vec<_> = names.iter().map(ToString::to_string).collect();
        assert_eq!(shown, ["name", "type", "a", "b", "c"]);
    }

    #[test]
    fn name_list_empty_value_is_empty_list() {
        assert!(parse_name_list("", &context(), &ElementPath::root()).unwrap().is_empty());
        assert!(parse_name_list("  ", &context(), &ElementPath::root()).unwrap().is_empty());
    }

    #[test]
    fn name_list_resolves_prefixes_and_clark_names() {
        let names = parse_name_list("s0:name {urn:1}type xml:lang", &context(), &ElementPath::root()).unwrap();
        assert_eq!(names[0], QualifiedName::namespaced("urn:0", "name"));
        assert_eq!(names[1], QualifiedName::namespaced("urn:1", "type"));
        assert_eq!(names[2], QualifiedName::namespaced(XML_NAMESPACE, "lang"));
    }

    #[test]
    fn name_list_unknown_prefix() {
        let err = parse_name_list("p:name", &context(), &ElementPath::root()).unwrap_err();
        assert!(matches!(err, SpecificationError::UnknownPrefix { ref prefix, .. } if prefix == "p"));
    }

    #[test]
    fn name_list_assemble_clark() {
        let names = vec![QualifiedName::local("name"), QualifiedName::namespaced("urn:0", "type")];
        assert_eq!(assemble_name_list(&names), "name {urn:0}type");
    }

    #[test]
    fn annotation_names() {
        assert!(is_annotation(&annotation_name(attributes::OPERATION)));
        assert!(!is_annotation(&QualifiedName::local("operation")));
    }
}
