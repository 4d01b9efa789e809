//! Parameter schema trees.
//!
//! A schema tree describes which parameters exist and what shape they have.
//! It is built from a dash-delimited definition string in which every
//! segment except the last is followed by an index specification:
//!
//! * `a:b` — an integer subrange, expanding into `b - a + 1` children keyed
//!   by their index, in ascending order;
//! * `x;y;z` — a list of literal sub-tags, one child per entry, in list
//!   order.
//!
//! The definition `"kq-1:4-leaf;stem"` of type [`ParamKind::Real`] therefore
//! produces a `kq` group with four numbered children, each of which holds
//! the scalar leaves `leaf` and `stem` (eight addressable values in total,
//! `kq-1-leaf` through `kq-4-stem`).
//!
//! Schema trees are immutable after construction apart from the per-leaf
//! defined flags, which track whether a value has ever been assigned.
//! Sibling segment names must be unique; duplicates are rejected when the
//! definition is parsed.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ParamError, Result};
use crate::tag::tokenize;

/// Value type of a scalar parameter leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamKind {
    /// Double-precision floating point.
    Real,
    /// Signed integer.
    Integer,
    /// Boolean.
    Boolean,
    /// Free text.
    Text,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamKind::Real => "real",
            ParamKind::Integer => "integer",
            ParamKind::Boolean => "boolean",
            ParamKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// Snapshot of one schema node, detached from the owning tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamInfo {
    /// Full dash-joined path of the node. Group names end with a dash.
    pub full_name: String,
    /// Declared value type of the subtree.
    pub kind: ParamKind,
    /// Whether the node is a scalar leaf.
    pub scalar: bool,
    /// Whether the value is defined (for groups, whether every leaf below
    /// is defined).
    pub defined: bool,
    /// Number of scalar leaves in the subtree.
    pub param_count: usize,
}

/// One segment of the parameter naming tree.
///
/// A node with no children is a scalar leaf; any other node is a composite
/// group whose children were expanded from an index specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDef {
    full_name: String,
    part_name: String,
    kind: ParamKind,
    items: Vec<ParamDef>,
    param_count: usize,
    defined: bool,
}

impl ParamDef {
    /// Parses a definition string into a schema tree.
    ///
    /// # Errors
    ///
    /// Fails when the string is empty, contains an empty segment, uses a
    /// malformed or descending index range, or produces duplicate sibling
    /// names.
    pub fn parse(definition: &str, kind: ParamKind) -> Result<ParamDef> {
        let segments = tokenize(definition);
        if segments.is_empty() {
            return Err(ParamError::InvalidDefinition {
                definition: definition.to_string(),
                reason: "empty definition string".to_string(),
            });
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ParamError::InvalidDefinition {
                definition: definition.to_string(),
                reason: "empty path segment".to_string(),
            });
        }
        Self::build(&segments, kind, 0)
    }

    /// Builds the node for `segments[offset]`, expanding the following
    /// index specification into children when one exists.
    fn build(segments: &[String], kind: ParamKind, offset: usize) -> Result<ParamDef> {
        let last = offset == segments.len() - 1;
        let mut full_name = segments[..=offset].join("-");
        if !last {
            // group names carry a trailing dash
            full_name.push('-');
        }
        let part_name = segments[offset].clone();

        let mut items = Vec::new();
        if !last {
            let index_spec = &segments[offset + 1];
            let mut sub = segments.to_vec();
            if let Some(colon) = index_spec.find(':') {
                let start: i64 = index_spec[..colon]
                    .trim()
                    .parse()
                    .map_err(|_| ParamError::InvalidRange {
                        spec: index_spec.clone(),
                    })?;
                let end: i64 = index_spec[colon + 1..]
                    .trim()
                    .parse()
                    .map_err(|_| ParamError::InvalidRange {
                        spec: index_spec.clone(),
                    })?;
                if end < start {
                    return Err(ParamError::InvalidRange {
                        spec: index_spec.clone(),
                    });
                }
                for index in start..=end {
                    sub[offset + 1] = index.to_string();
                    items.push(Self::build(&sub, kind, offset + 1)?);
                }
            } else {
                for literal in index_spec.split(';') {
                    let literal = literal.trim();
                    if literal.is_empty() {
                        return Err(ParamError::InvalidDefinition {
                            definition: segments.join("-"),
                            reason: "empty entry in index list".to_string(),
                        });
                    }
                    sub[offset + 1] = literal.to_string();
                    items.push(Self::build(&sub, kind, offset + 1)?);
                }
            }
            for (idx, item) in items.iter().enumerate() {
                if items[..idx].iter().any(|other| other.part_name == item.part_name) {
                    return Err(ParamError::DuplicateSegment {
                        segment: item.part_name.clone(),
                        parent: full_name.clone(),
                    });
                }
            }
        }

        let param_count = if items.is_empty() {
            1
        } else {
            items.iter().map(|item| item.param_count).sum()
        };

        Ok(ParamDef {
            full_name,
            part_name,
            kind,
            items,
            param_count,
            defined: false,
        })
    }

    /// Full dash-joined path of the node. Group names end with a dash.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// This node's own path segment.
    pub fn part_name(&self) -> &str {
        &self.part_name
    }

    /// Declared value type of the subtree.
    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    /// Whether the node is a scalar leaf.
    pub fn is_scalar(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of index levels below this node (0 for a scalar).
    pub fn dimension(&self) -> usize {
        match self.items.first() {
            Some(item) => 1 + item.dimension(),
            None => 0,
        }
    }

    /// Number of direct children.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Direct child by position.
    pub fn item(&self, index: usize) -> Option<&ParamDef> {
        self.items.get(index)
    }

    /// All direct children, in expansion order.
    pub fn items(&self) -> &[ParamDef] {
        &self.items
    }

    /// Number of scalar leaves in the subtree.
    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// Whether the value is defined. For a group this is true only when
    /// every leaf below it is defined.
    pub fn value_defined(&self) -> bool {
        if self.is_scalar() {
            self.defined
        } else {
            self.items.iter().all(ParamDef::value_defined)
        }
    }

    /// Marks a scalar leaf defined or undefined. No effect on groups.
    pub(crate) fn set_defined(&mut self, value: bool) {
        if self.is_scalar() {
            self.defined = value;
        }
    }

    /// Finds the node addressed by `tags` starting at `offset`, matching
    /// this node's own segment first. Sibling names are unique, so the
    /// first match is the only match.
    pub fn find(&self, tags: &[String], offset: usize) -> Option<&ParamDef> {
        if offset >= tags.len() || self.part_name != tags[offset] {
            return None;
        }
        if offset == tags.len() - 1 {
            return Some(self);
        }
        self.items.iter().find_map(|item| item.find(tags, offset + 1))
    }

    /// Sets the defined flag of the leaf addressed by `tags`. Returns
    /// whether a node was found under this subtree.
    pub(crate) fn set_defined_by_tags(&mut self, tags: &[String], offset: usize, value: bool) -> bool {
        if offset >= tags.len() || self.part_name != tags[offset] {
            return false;
        }
        if offset == tags.len() - 1 {
            self.set_defined(value);
            return true;
        }
        for item in &mut self.items {
            if item.set_defined_by_tags(tags, offset + 1, value) {
                return true;
            }
        }
        false
    }

    /// Scalar leaf by flat index, in depth-first expansion order.
    pub fn param_at(&self, index: usize) -> Option<&ParamDef> {
        if self.is_scalar() {
            return if index == 0 { Some(self) } else { None };
        }
        let mut remaining = index;
        for item in &self.items {
            if remaining < item.param_count {
                return item.param_at(remaining);
            }
            remaining -= item.param_count;
        }
        None
    }

    /// Detached snapshot of this node.
    pub fn info(&self) -> ParamInfo {
        ParamInfo {
            full_name: self.full_name.clone(),
            kind: self.kind,
            scalar: self.is_scalar(),
            defined: self.value_defined(),
            param_count: self.param_count,
        }
    }
}

/// Ordered collection of root schema trees for one configuration node.
///
/// Concrete models register their definition strings here through the
/// schema-registration hook; the resulting trees define the canonical
/// enumeration order of all scalar leaves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaRegistry {
    defs: Vec<ParamDef>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and registers one definition string.
    ///
    /// # Errors
    ///
    /// Fails on a malformed definition, or when the definition's root
    /// segment collides with an already registered one.
    pub fn define(&mut self, definition: &str, kind: ParamKind) -> Result<()> {
        let def = ParamDef::parse(definition, kind)?;
        if self.defs.iter().any(|d| d.part_name() == def.part_name()) {
            return Err(ParamError::DuplicateSegment {
                segment: def.part_name().to_string(),
                parent: "schema root".to_string(),
            });
        }
        self.defs.push(def);
        Ok(())
    }

    /// Number of registered root definitions.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Registered root definitions, in registration order.
    pub fn defs(&self) -> &[ParamDef] {
        &self.defs
    }

    pub(crate) fn into_defs(self) -> Vec<ParamDef> {
        self.defs
    }
}

/// Finds a node across a forest of root definitions.
pub(crate) fn find_in<'a>(defs: &'a [ParamDef], tags: &[String]) -> Option<&'a ParamDef> {
    defs.iter().find_map(|def| def.find(tags, 0))
}

/// Resolves a request tag against a forest, honoring the trailing-dash
/// convention: a plain tag must name a scalar, a dash-terminated tag must
/// name a group.
pub(crate) fn resolve<'a>(defs: &'a [ParamDef], tag: &str) -> Result<&'a ParamDef> {
    let (body, want_group) = match tag.strip_suffix('-') {
        Some(body) => (body, true),
        None => (tag, false),
    };
    let tags = tokenize(body);
    if tags.is_empty() {
        return Err(ParamError::UnknownParam {
            tag: tag.to_string(),
        });
    }
    let def = find_in(defs, &tags).ok_or_else(|| ParamError::UnknownParam {
        tag: tag.to_string(),
    })?;
    if def.is_scalar() == want_group {
        return Err(ParamError::NotScalar {
            tag: tag.to_string(),
            expected: if want_group { "group" } else { "scalar value" },
        });
    }
    Ok(def)
}

/// Sets the defined flag of the leaf addressed by `tags`, wherever it lives
/// in the forest.
pub(crate) fn set_defined_in(defs: &mut [ParamDef], tags: &[String], value: bool) {
    for def in defs.iter_mut() {
        if def.set_defined_by_tags(tags, 0, value) {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kq() -> ParamDef {
        ParamDef::parse("kq-1:2-leaf;stem", ParamKind::Real).unwrap()
    }

    #[test]
    fn range_expands_in_ascending_order() {
        let def = ParamDef::parse("kq-1:4-leaf;stem", ParamKind::Real).unwrap();
        assert_eq!(def.item_count(), 4);
        let keys: Vec<&str> = def.items().iter().map(ParamDef::part_name).collect();
        assert_eq!(keys, ["1", "2", "3", "4"]);
        assert_eq!(def.param_count(), 8);
        assert_eq!(
            def.param_count(),
            def.items().iter().map(ParamDef::param_count).sum::<usize>()
        );
    }

    #[test]
    fn list_expands_in_list_order() {
        let def = kq();
        let leaves: Vec<&str> = def.item(0).unwrap().items().iter().map(ParamDef::part_name).collect();
        assert_eq!(leaves, ["leaf", "stem"]);
    }

    #[test]
    fn four_scalar_leaves_in_schema_order() {
        let def = kq();
        assert_eq!(def.param_count(), 4);
        let names: Vec<String> = (0..4)
            .map(|i| def.param_at(i).unwrap().full_name().to_string())
            .collect();
        assert_eq!(names, ["kq-1-leaf", "kq-1-stem", "kq-2-leaf", "kq-2-stem"]);
        assert!(def.param_at(4).is_none());
    }

    #[test]
    fn group_names_end_with_a_dash() {
        let def = kq();
        assert_eq!(def.full_name(), "kq-");
        assert_eq!(def.item(0).unwrap().full_name(), "kq-1-");
        assert!(def.item(0).unwrap().item(0).unwrap().is_scalar());
    }

    #[test]
    fn single_segment_definition_is_a_scalar() {
        let def = ParamDef::parse("maxrootdepth", ParamKind::Real).unwrap();
        assert!(def.is_scalar());
        assert_eq!(def.param_count(), 1);
        assert_eq!(def.dimension(), 0);
    }

    #[test]
    fn dimension_counts_index_levels() {
        assert_eq!(kq().dimension(), 2);
    }

    #[test]
    fn find_matches_case_insensitively_via_tokenizer() {
        let def = kq();
        let tags = tokenize("KQ-2-STEM");
        let found = def.find(&tags, 0).unwrap();
        assert_eq!(found.full_name(), "kq-2-stem");
    }

    #[test]
    fn identical_definitions_build_identical_trees() {
        assert_eq!(kq(), kq());
    }

    #[test]
    fn duplicate_siblings_are_rejected() {
        let err = ParamDef::parse("kq-1:2-leaf;leaf", ParamKind::Real).unwrap_err();
        assert!(matches!(err, ParamError::DuplicateSegment { .. }));
    }

    #[test]
    fn descending_and_malformed_ranges_are_rejected() {
        assert!(matches!(
            ParamDef::parse("kq-4:1-leaf", ParamKind::Real).unwrap_err(),
            ParamError::InvalidRange { .. }
        ));
        assert!(matches!(
            ParamDef::parse("kq-a:b-leaf", ParamKind::Real).unwrap_err(),
            ParamError::InvalidRange { .. }
        ));
    }

    #[test]
    fn empty_definitions_are_rejected() {
        assert!(matches!(
            ParamDef::parse("", ParamKind::Real).unwrap_err(),
            ParamError::InvalidDefinition { .. }
        ));
        assert!(matches!(
            ParamDef::parse("kq--leaf", ParamKind::Real).unwrap_err(),
            ParamError::InvalidDefinition { .. }
        ));
    }

    #[test]
    fn defined_flags_aggregate_over_groups() {
        let mut def = kq();
        assert!(!def.value_defined());
        for tag in ["kq-1-leaf", "kq-1-stem", "kq-2-leaf"] {
            def.set_defined_by_tags(&tokenize(tag), 0, true);
        }
        assert!(!def.value_defined());
        def.set_defined_by_tags(&tokenize("kq-2-stem"), 0, true);
        assert!(def.value_defined());
        assert!(def.find(&tokenize("kq-1-leaf"), 0).unwrap().value_defined());
    }

    #[test]
    fn registry_rejects_duplicate_root_segments() {
        let mut registry = SchemaRegistry::new();
        registry.define("kq-1:2-leaf;stem", ParamKind::Real).unwrap();
        let err = registry.define("kq-3:4-leaf", ParamKind::Real).unwrap_err();
        assert!(matches!(err, ParamError::DuplicateSegment { .. }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn resolve_honors_the_trailing_dash_convention() {
        let mut registry = SchemaRegistry::new();
        registry.define("kq-1:2-leaf;stem", ParamKind::Real).unwrap();
        let defs = registry.defs();

        assert_eq!(resolve(defs, "kq-1-leaf").unwrap().full_name(), "kq-1-leaf");
        assert_eq!(resolve(defs, "kq-1-").unwrap().full_name(), "kq-1-");
        assert!(matches!(
            resolve(defs, "kq-1").unwrap_err(),
            ParamError::NotScalar { .. }
        ));
        assert!(matches!(
            resolve(defs, "kq-1-leaf-").unwrap_err(),
            ParamError::NotScalar { .. }
        ));
        assert!(matches!(
            resolve(defs, "kq-9-leaf").unwrap_err(),
            ParamError::UnknownParam { .. }
        ));
        assert!(matches!(
            resolve(defs, "").unwrap_err(),
            ParamError::UnknownParam { .. }
        ));
    }

    #[test]
    fn schema_trees_serialize() {
        let def = kq();
        let json = serde_json::to_string(&def).unwrap();
        let back: ParamDef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, def);
    }
}
