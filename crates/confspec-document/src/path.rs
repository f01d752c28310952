//! Element paths for diagnostics
//!
//! Provides [`ElementPath`], the absolute XPath-like address used to name
//! elements in error messages and logs.

use crate::element::Element;
use crate::name::{NameError, QualifiedName};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// One location step of an [`ElementPath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegment {
    /// Expanded element name
    pub name: QualifiedName,
    /// 1-based position among element siblings, when there are siblings
    pub position: Option<usize>,
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(position) => write!(f, "{}[{position}]", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Absolute path of an element within its document
///
/// # Examples
/// - `/configuration/configSections/sectionGroup[2]`
/// - `/{urn:0}root/{urn:0}item`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ElementPath(Vec<PathSegment>);

impl ElementPath {
    /// Empty path (above the document element)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Append a segment, returning new path
    #[inline]
    #[must_use]
    pub fn child(&self, name: QualifiedName, position: Option<usize>) -> Self {
        let mut new = self.clone();
        new.0.push(PathSegment { name, position });
        new
    }

    /// Path of the element stored at content `index` of `parent`
    ///
    /// `self` must be the path of `parent`.
    #[must_use]
    pub fn child_at(&self, parent: &Element, index: usize) -> Option<Self> {
        let element = parent.element_at(index)?;
        Some(self.child(element.name().clone(), parent.element_position(index)))
    }
}

impl Display for ElementPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for ElementPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix('/')
            .ok_or_else(|| PathError::NotAbsolute(s.to_string()))?;
        if rest.is_empty() {
            return Ok(Self::root());
        }

        split_steps(rest)
            .into_iter()
            .map(parse_step)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

// '/' may appear inside a Clark namespace, so only split outside braces
fn split_steps(s: &str) -> Vec<&str> {
    let mut steps = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                steps.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    steps.push(&s[start..]);
    steps
}

fn parse_step(step: &str) -> Result<PathSegment, PathError> {
    if step.is_empty() {
        return Err(PathError::EmptySegment);
    }
    let (name, position) = match step.strip_suffix(']').and_then(|s| s.rsplit_once('[')) {
        Some((name, position)) => {
            let position = position
                .parse::<usize>()
                .ok()
                .filter(|p| *p > 0)
                .ok_or_else(|| PathError::InvalidPosition(step.to_string()))?;
            (name, Some(position))
        }
        None => (step, None),
    };
    Ok(PathSegment {
        name: name.parse()?,
        position,
    })
}

/// Errors related to element paths
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Path does not start with '/'
    #[error("path is not absolute: '{0}'")]
    NotAbsolute(String),

    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Positional predicate is not a positive integer
    #[error("invalid position in segment: '{0}'")]
    InvalidPosition(String),

    /// Invalid element name
    #[error("invalid name: {0}")]
    Name(#[from] NameError),
}
