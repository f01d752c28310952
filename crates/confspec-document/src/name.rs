//! Expanded XML names
//!
//! Provides [`QualifiedName`], the namespace-URI plus local-name pair every
//! comparison in the workspace is made on. Prefixes never take part in
//! equality; they only survive as writing hints on elements and attributes.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Namespace bound to the reserved `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace of `xmlns` declarations
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Expanded XML name
///
/// Displayed and parsed in Clark notation:
/// - `{urn:0}name` → namespace `urn:0`, local name `name`
/// - `name` → no namespace, local name `name`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualifiedName {
    namespace: Option<String>,
    local: String,
}

impl QualifiedName {
    /// Create name from optional namespace and local part
    #[inline]
    #[must_use]
    pub fn new(namespace: Option<impl Into<String>>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(Into::into).filter(|ns: &String| !ns.is_empty()),
            local: local.into(),
        }
    }

    /// Create name without namespace
    #[inline]
    #[must_use]
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }

    /// Create namespaced name
    #[inline]
    #[must_use]
    pub fn namespaced(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self::new(Some(namespace), local)
    }

    /// Namespace URI, if any
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Local part of the name
    #[inline]
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local
    }

    /// Check whether the name lives in `namespace`
    #[inline]
    #[must_use]
    pub fn is_in(&self, namespace: &str) -> bool {
        self.namespace.as_deref() == Some(namespace)
    }
}

impl Display for QualifiedName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

impl FromStr for QualifiedName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, local) = match s.strip_prefix('{') {
            Some(rest) => {
                let (ns, local) = rest
                    .split_once('}')
                    .ok_or_else(|| NameError::UnclosedNamespace(s.to_string()))?;
                (Some(ns), local)
            }
            None => (None, s),
        };

        if local.is_empty() {
            return Err(NameError::EmptyLocalName(s.to_string()));
        }
        if local.contains(|c: char| c.is_whitespace() || matches!(c, '{' | '}' | ':' | '/')) {
            return Err(NameError::InvalidLocalName(local.to_string()));
        }

        Ok(Self::new(namespace, local))
    }
}

impl From<&str> for QualifiedName {
    fn from(local: &str) -> Self {
        Self::local(local)
    }
}

impl serde::Serialize for QualifiedName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for QualifiedName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors raised while parsing Clark-notation names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    /// `{` without matching `}`
    #[error("unclosed namespace in name: '{0}'")]
    UnclosedNamespace(String),

    /// Nothing after the namespace part
    #[error("empty local name in: '{0}'")]
    EmptyLocalName(String),

    /// Local name contains forbidden characters
    #[error("invalid local name: '{0}'")]
    InvalidLocalName(String),
}
