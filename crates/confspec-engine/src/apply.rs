//! Specification application
//!
//! Walks specification children in reverse declaration order against the
//! children of a configuration element. A pivot (content index of the last
//! resolved configuration child, or the end of the content) tells where newly
//! created elements go, so that after a pass every element sits in the order
//! the specification declared.
//!
//! The inverse specification is built as a separate tree while the
//! configuration is mutated; nothing of the input specification is touched.

use crate::annotations::Operation;
use crate::error::ApplyError;
use crate::specification::SpecificationNode;
use confspec_document::{Element, ElementPath, QualifiedName};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Per-operation counts of one application pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSummary {
    /// Configuration elements created
    pub inserted: usize,
    /// Configuration elements whose attributes changed
    pub updated: usize,
    /// Configuration elements removed (with their subtree)
    pub deleted: usize,
    /// Specification elements that required no change
    pub unchanged: usize,
}

impl ApplicationSummary {
    /// Number of elements touched
    #[inline]
    #[must_use]
    pub fn changes(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }

    fn record(&mut self, inverse: Operation) {
        match inverse {
            Operation::Delete => self.inserted += 1,
            Operation::Update => self.updated += 1,
            Operation::Insert => self.deleted += 1,
            Operation::None | Operation::Upsert => self.unchanged += 1,
        }
    }
}

/// State of one application pass
#[derive(Debug, Default)]
pub(crate) struct Pass {
    dirty: bool,
    summary: ApplicationSummary,
}

impl Pass {
    #[inline]
    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub(crate) fn summary(&self) -> ApplicationSummary {
        self.summary
    }

    /// Apply specification `specs` to the children of `config`
    ///
    /// # Arguments
    /// * `config` - Configuration element whose children are reconciled
    /// * `config_path` - Path of `config`
    /// * `specs` - Specification children, in declaration order
    /// * `spec_path` - Path of the specification element owning `specs`
    ///
    /// # Returns
    /// The inverse of `specs`, including any reinsertion anchors
    ///
    /// # Errors
    /// Any [`ApplyError`]; `config` is left partially modified
    pub(crate) fn apply_children(
        &mut self,
        config: &mut Element,
        config_path: &ElementPath,
        specs: &[SpecificationNode],
        spec_path: &ElementPath,
    ) -> Result<Vec<SpecificationNode>, ApplyError> {
        let mut inverse = VecDeque::with_capacity(specs.len());
        let mut anchors = Vec::new();
        let mut pivot: Option<usize> = None;

        for (i, spec) in specs.iter().enumerate().rev() {
            let position = (specs.len() > 1).then_some(i + 1);
            let s_path = spec_path.child(spec.name().clone(), position);
            validate(spec, &s_path)?;

            let found = locate(config, config_path, spec, &s_path)?;
            let mut inv = spec.detached();
            let mut anchor = None;
            let resolved = match (spec.operation(), found) {
                (Operation::Insert | Operation::Upsert, None) => {
                    let idx = pivot.unwrap_or(config.content().len());
                    config.insert_content(idx, spec.to_configuration_element());
                    strip_scrap(&mut inv);
                    inv.set_operation(Operation::Delete);
                    self.dirty = true;
                    Some(idx)
                }
                (Operation::Update, None) => {
                    return Err(ApplyError::MissingUpdateTarget { specification: s_path });
                }
                (Operation::Delete | Operation::None, None) => {
                    inv.set_operation(Operation::None);
                    inv.set_children(spec.children().to_vec());
                    None
                }
                (Operation::None, Some(idx)) => {
                    inv.set_operation(Operation::None);
                    Some(idx)
                }
                (Operation::Insert, Some(idx)) => {
                    if !config.element_at(idx).is_some_and(|live| spec.equated_by(live)) {
                        return Err(ApplyError::InsertConflict {
                            configuration: config_path.child_at(config, idx).unwrap_or_default(),
                            specification: s_path,
                        });
                    }
                    inv.set_operation(Operation::None);
                    Some(idx)
                }
                (Operation::Update | Operation::Upsert, Some(idx)) => {
                    let c_path = config_path.child_at(config, idx).unwrap_or_default();
                    let changed = match config.element_at_mut(idx) {
                        Some(live) => merge(spec, &mut inv, live, &c_path, &s_path)?,
                        None => false,
                    };
                    inv.set_operation(if changed { Operation::Update } else { Operation::None });
                    self.dirty |= changed;
                    Some(idx)
                }
                (Operation::Delete, Some(idx)) => {
                    let Some(live) = config.element_at(idx).filter(|live| spec.equated_by(live)) else {
                        return Err(ApplyError::DeleteConflict {
                            configuration: config_path.child_at(config, idx).unwrap_or_default(),
                            specification: s_path,
                        });
                    };
                    let c_path = config_path.child_at(config, idx).unwrap_or_default();
                    if let Some(duplicate) = indistinguishable_child(live, &c_path) {
                        return Err(ApplyError::IndistinguishableChildren {
                            configuration: duplicate,
                            specification: s_path,
                        });
                    }
                    inv.set_children(live.children().map(SpecificationNode::graft).collect());
                    let next = config.next_element_index(idx).filter(|next| Some(*next) != pivot);
                    anchor = next
                        .and_then(|next| config.element_at(next))
                        .map(SpecificationNode::anchor);
                    strip_scrap(&mut inv);
                    inv.set_operation(Operation::Insert);

                    config.remove_content(idx);
                    // the anchored sibling stands in for the removed element
                    pivot = match (next, pivot) {
                        (Some(next), _) => Some(next - 1),
                        (None, Some(p)) if p > idx => Some(p - 1),
                        (None, p) => p,
                    };
                    self.dirty = true;
                    None
                }
            };

            debug!(
                specification = %s_path,
                operation = %spec.operation(),
                inverse = %inv.operation(),
                "applied specification element"
            );
            self.summary.record(inv.operation());

            if let Some(idx) = resolved {
                let c_path = config_path.child_at(config, idx).unwrap_or_default();
                if let Some(live) = config.element_at_mut(idx) {
                    let children = self.apply_children(live, &c_path, spec.children(), &s_path)?;
                    inv.set_children(children);
                }
                pivot = Some(idx);
            }

            if let Some(anchor) = anchor {
                anchors.push((anchor.clone(), s_path));
                inverse.push_front(anchor);
            }
            inverse.push_front(inv);
        }

        // the inverse locates each anchor among the children left by this pass
        for (anchor, s_path) in anchors {
            let matches = config
                .children()
                .filter(|child| matches!(anchor.satisfied_by(child), Ok(true)))
                .count();
            if matches != 1 {
                return Err(ApplyError::AmbiguousAnchor {
                    configuration: config_path.clone(),
                    specification: s_path,
                });
            }
        }

        Ok(inverse.into())
    }
}

fn validate(spec: &SpecificationNode, s_path: &ElementPath) -> Result<(), ApplyError> {
    let missing = |name: &QualifiedName| spec.attribute(name).is_none();
    if let Some(name) = spec.key_names().unwrap_or_default().iter().find(|n| missing(n)) {
        return Err(ApplyError::UndeclaredKey {
            specification: s_path.clone(),
            name: name.clone(),
        });
    }
    if let Some(name) = spec.scrap_names().iter().find(|n| missing(n)) {
        return Err(ApplyError::UndeclaredScrap {
            specification: s_path.clone(),
            name: name.clone(),
        });
    }
    Ok(())
}

/// Path of the first element under `element` that a grafted copy would
/// confuse with one of its following siblings
///
/// Restoring a grafted subtree applies siblings last to first, so an earlier
/// sibling satisfied by a later one would be merged into it.
fn indistinguishable_child(element: &Element, path: &ElementPath) -> Option<ElementPath> {
    let indices = element.element_indices();
    for (i, &idx) in indices.iter().enumerate() {
        let child = element.element_at(idx)?;
        let copy = SpecificationNode::anchor(child);
        let confused = indices[i + 1..]
            .iter()
            .filter_map(|&later| element.element_at(later))
            .any(|later| matches!(copy.satisfied_by(later), Ok(true)));
        let child_path = path.child_at(element, idx)?;
        if confused {
            return Some(child_path);
        }
        if let Some(nested) = indistinguishable_child(child, &child_path) {
            return Some(nested);
        }
    }
    None
}

/// Content index of the only child of `config` satisfying `spec`
fn locate(
    config: &Element,
    config_path: &ElementPath,
    spec: &SpecificationNode,
    s_path: &ElementPath,
) -> Result<Option<usize>, ApplyError> {
    let mut found = None;
    for idx in config.element_indices() {
        let Some(candidate) = config.element_at(idx) else {
            continue;
        };
        if spec
            .satisfied_by(candidate)
            .map_err(|e| ApplyError::from_match(e, s_path))?
        {
            if found.is_some() {
                return Err(ApplyError::AmbiguousMatch {
                    configuration: config_path.clone(),
                    specification: s_path.clone(),
                });
            }
            found = Some(idx);
        }
    }
    Ok(found)
}

/// Bring `live` in line with `spec`, recording the prior state in `inv`
///
/// Returns whether `live` changed.
fn merge(
    spec: &SpecificationNode,
    inv: &mut SpecificationNode,
    live: &mut Element,
    c_path: &ElementPath,
    s_path: &ElementPath,
) -> Result<bool, ApplyError> {
    let mut added = Vec::new();
    let mut swapped = false;

    for attribute in spec.content_attributes() {
        match live.attribute_mut(attribute.name()) {
            None => {
                live.set_attribute(attribute.clone());
                added.push(attribute.name().clone());
            }
            Some(current) if current.value() != attribute.value() => {
                if let Some(prior) = inv.attribute_mut(attribute.name()) {
                    current.swap_value(prior);
                    swapped = true;
                }
            }
            Some(_) => {}
        }
    }

    let removed = reconcile_scrap(spec, inv, live, c_path, s_path)?;

    let keys = spec.effective_key_names();
    if removed.iter().any(|name| keys.contains(name)) {
        inv.set_key_names(Some(keys.into_iter().filter(|k| !removed.contains(k)).collect()));
    }
    if !added.is_empty() || !inv.scrap_names().is_empty() {
        inv.set_scrap_names(added.clone());
    }

    Ok(!added.is_empty() || swapped || !removed.is_empty())
}

/// Remove scrap attributes from `live`; the inverse keeps those it removed
fn reconcile_scrap(
    spec: &SpecificationNode,
    inv: &mut SpecificationNode,
    live: &mut Element,
    c_path: &ElementPath,
    s_path: &ElementPath,
) -> Result<Vec<QualifiedName>, ApplyError> {
    let mut removed = Vec::new();
    for name in spec.scrap_names() {
        let expected = spec
            .attribute(name)
            .map(|a| a.value())
            .ok_or_else(|| ApplyError::UndeclaredScrap {
                specification: s_path.clone(),
                name: name.clone(),
            })?;
        match live.attribute_value(name) {
            Some(value) if value != expected => {
                return Err(ApplyError::ScrapConflict {
                    configuration: c_path.clone(),
                    specification: s_path.clone(),
                });
            }
            Some(_) => {
                live.remove_attribute(name);
                removed.push(name.clone());
            }
            None => {
                inv.remove_attribute(name);
            }
        }
    }
    Ok(removed)
}

/// Drop scrap attributes from an inverse node, and from its declared keys
fn strip_scrap(inv: &mut SpecificationNode) {
    let scrap = inv.scrap_names().to_vec();
    if scrap.is_empty() {
        return;
    }
    for name in &scrap {
        inv.remove_attribute(name);
    }
    if let Some(keys) = inv.key_names() {
        if keys.iter().any(|k| scrap.contains(k)) {
            let kept = keys.iter().filter(|k| !scrap.contains(k)).cloned().collect();
            inv.set_key_names(Some(kept));
        }
    }
    inv.set_scrap_names(Vec::new());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_path() -> ElementPath {
        "/configuration/add".parse().unwrap()
    }

    fn add(value: &str) -> Element {
        Element::new("add".into())
            .with_attribute("key", "k")
            .with_attribute("value", value)
    }

    #[test]
    fn summary_records_by_inverse_operation() {
        let mut summary = ApplicationSummary::default();
        for op in [Operation::Delete, Operation::Delete, Operation::Update, Operation::Insert, Operation::None] {
            summary.record(op);
        }
        assert_eq!(
            summary,
            ApplicationSummary {
                inserted: 2,
                updated: 1,
                deleted: 1,
                unchanged: 1
            }
        );
        assert_eq!(summary.changes(), 4);
    }

    #[test]
    fn merge_swaps_values_into_inverse() {
        let spec = SpecificationNode::new("add".into())
            .with_attribute("key", "k")
            .with_attribute("value", "new")
            .with_keys(["key"]);
        let mut inv = spec.detached();
        let mut live = add("old");

        assert!(merge(&spec, &mut inv, &mut live, &spec_path(), &spec_path()).unwrap());
        assert_eq!(live.attribute_value(&"value".into()), Some("new"));
        assert_eq!(inv.attribute(&"value".into()).map(|a| a.value()), Some("old"));
        assert!(inv.scrap_names().is_empty());
    }

    #[test]
    fn merge_of_equal_element_changes_nothing() {
        let spec = SpecificationNode::new("add".into())
            .with_attribute("key", "k")
            .with_attribute("value", "v");
        let mut inv = spec.detached();
        let mut live = add("v");
        assert!(!merge(&spec, &mut inv, &mut live, &spec_path(), &spec_path()).unwrap());
        assert_eq!(inv, spec.detached());
    }

    #[test]
    fn merge_records_added_attributes_as_inverse_scrap() {
        let spec = SpecificationNode::new("add".into())
            .with_attribute("key", "k")
            .with_attribute("extra", "x")
            .with_keys(["key"]);
        let mut inv = spec.detached();
        let mut live = Element::new("add".into()).with_attribute("key", "k");

        assert!(merge(&spec, &mut inv, &mut live, &spec_path(), &spec_path()).unwrap());
        assert_eq!(live.attribute_value(&"extra".into()), Some("x"));
        assert_eq!(inv.scrap_names(), &[QualifiedName::local("extra")]);
    }

    #[test]
    fn reconcile_drops_scrap_missing_from_live() {
        let spec = SpecificationNode::new("add".into())
            .with_attribute("key", "k")
            .with_attribute("gone", "g")
            .with_keys(["key"])
            .with_scrap(["gone"]);
        let mut inv = spec.detached();
        let mut live = Element::new("add".into()).with_attribute("key", "k");

        let removed = reconcile_scrap(&spec, &mut inv, &mut live, &spec_path(), &spec_path()).unwrap();
        assert!(removed.is_empty());
        assert!(inv.attribute(&"gone".into()).is_none());
    }

    #[test]
    fn reconcile_rejects_conflicting_scrap() {
        let spec = SpecificationNode::new("add".into())
            .with_attribute("key", "k")
            .with_attribute("value", "expected")
            .with_keys(["key"])
            .with_scrap(["value"]);
        let mut inv = spec.detached();
        let mut live = add("actual");
        let err = reconcile_scrap(&spec, &mut inv, &mut live, &spec_path(), &spec_path()).unwrap_err();
        assert!(matches!(err, ApplyError::ScrapConflict { .. }));
        assert_eq!(live.attribute_value(&"value".into()), Some("actual"));
    }

    #[test]
    fn strip_scrap_removes_attributes_and_keys() {
        let mut node = SpecificationNode::new("add".into())
            .with_attribute("key", "k")
            .with_attribute("hint", "h")
            .with_keys(["key", "hint"])
            .with_scrap(["hint"]);
        strip_scrap(&mut node);
        assert!(node.attribute(&"hint".into()).is_none());
        assert!(node.scrap_names().is_empty());
        assert_eq!(node.key_names(), Some(&[QualifiedName::local("key")][..]));
    }

    #[test]
    fn pivot_places_inserts_before_resolved_sibling() {
        let mut config = Element::new("configuration".into()).with_child(add("v"));
        let specs = vec![
            SpecificationNode::new("clear".into()),
            SpecificationNode::new("add".into())
                .with_attribute("key", "k")
                .with_attribute("value", "v")
                .with_operation(Operation::None),
        ];
        let mut pass = Pass::default();
        let inverse = pass
            .apply_children(&mut config, &"/configuration".parse().unwrap(), &specs, &"/configuration".parse().unwrap())
            .unwrap();

        let names: Vec<_> = config.children().map(|e| e.name().to_string()).collect();
        assert_eq!(names, ["clear", "add"]);
        assert_eq!(inverse[0].operation(), Operation::Delete);
        assert_eq!(inverse[1].operation(), Operation::None);
        assert!(pass.is_dirty());
        assert_eq!(pass.summary().inserted, 1);
    }
}
