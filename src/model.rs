//! The capability interface concrete models implement.
//!
//! A configuration tree never stores scalar values itself; it validates
//! every access and then delegates to the [`ParamModel`] installed at node
//! construction. The model supplies the schema (which tags exist, of which
//! type), the typed storage hooks the accessors delegate to, and the
//! factory used to grow the tree with correctly typed children.
//!
//! Storage hooks are only ever invoked after the owning node has fully
//! validated the access (the tag resolves, names a scalar of the right
//! type, and is defined for reads), so they are trusted not to fail. They
//! must not call back into the owning node.

use std::any::Any;
use std::collections::HashMap;

use crate::error::Result;
use crate::schema::{ParamKind, SchemaRegistry};
use crate::tag::join_tags;

/// Storage and schema provider for one configuration node.
pub trait ParamModel {
    /// Registers this model's parameter definitions. Invoked once per node
    /// when its schema is built.
    fn define_entries(&self, schema: &mut SchemaRegistry) -> Result<()>;

    /// Returns a fresh, empty model of the same concrete type, used as the
    /// backing store of a newly added child node.
    fn make_child(&self) -> Box<dyn ParamModel>;

    /// The model as [`Any`], so owners can downcast to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// The model as mutable [`Any`].
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Reads a real value at a resolved segment path.
    fn real_value(&self, tags: &[String]) -> f64 {
        let _ = tags;
        0.0
    }

    /// Reads an integer value at a resolved segment path.
    fn int_value(&self, tags: &[String]) -> i64 {
        let _ = tags;
        0
    }

    /// Reads a boolean value at a resolved segment path.
    fn bool_value(&self, tags: &[String]) -> bool {
        let _ = tags;
        false
    }

    /// Reads a text value at a resolved segment path.
    fn text_value(&self, tags: &[String]) -> String {
        let _ = tags;
        String::new()
    }

    /// Stores a real value at a resolved segment path.
    fn set_real_value(&mut self, tags: &[String], value: f64) {
        let _ = (tags, value);
    }

    /// Stores an integer value at a resolved segment path.
    fn set_int_value(&mut self, tags: &[String], value: i64) {
        let _ = (tags, value);
    }

    /// Stores a boolean value at a resolved segment path.
    fn set_bool_value(&mut self, tags: &[String], value: bool) {
        let _ = (tags, value);
    }

    /// Stores a text value at a resolved segment path.
    fn set_text_value(&mut self, tags: &[String], value: &str) {
        let _ = (tags, value);
    }

    /// Recomputes derived quantities after a bulk value copy.
    fn derive_params(&mut self) {}
}

/// Map-backed [`ParamModel`] storing scalars per kind, keyed by the joined
/// tag path.
///
/// Useful for callers that have no dedicated backing arrays, and as a
/// ready-made store in tests. The definition entries are configurable, so
/// one type covers arbitrary schemas.
#[derive(Debug, Clone, Default)]
pub struct MemoryModel {
    entries: Vec<(String, ParamKind)>,
    reals: HashMap<String, f64>,
    ints: HashMap<String, i64>,
    bools: HashMap<String, bool>,
    texts: HashMap<String, String>,
}

impl MemoryModel {
    /// Creates a model that registers the given definition strings.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, ParamKind)>,
        S: Into<String>,
    {
        MemoryModel {
            entries: entries
                .into_iter()
                .map(|(definition, kind)| (definition.into(), kind))
                .collect(),
            ..MemoryModel::default()
        }
    }
}

impl ParamModel for MemoryModel {
    fn define_entries(&self, schema: &mut SchemaRegistry) -> Result<()> {
        for (definition, kind) in &self.entries {
            schema.define(definition, *kind)?;
        }
        Ok(())
    }

    fn make_child(&self) -> Box<dyn ParamModel> {
        Box::new(MemoryModel::new(self.entries.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn real_value(&self, tags: &[String]) -> f64 {
        self.reals.get(&join_tags(tags)).copied().unwrap_or_default()
    }

    fn int_value(&self, tags: &[String]) -> i64 {
        self.ints.get(&join_tags(tags)).copied().unwrap_or_default()
    }

    fn bool_value(&self, tags: &[String]) -> bool {
        self.bools.get(&join_tags(tags)).copied().unwrap_or_default()
    }

    fn text_value(&self, tags: &[String]) -> String {
        self.texts.get(&join_tags(tags)).cloned().unwrap_or_default()
    }

    fn set_real_value(&mut self, tags: &[String], value: f64) {
        self.reals.insert(join_tags(tags), value);
    }

    fn set_int_value(&mut self, tags: &[String], value: i64) {
        self.ints.insert(join_tags(tags), value);
    }

    fn set_bool_value(&mut self, tags: &[String], value: bool) {
        self.bools.insert(join_tags(tags), value);
    }

    fn set_text_value(&mut self, tags: &[String], value: &str) {
        self.texts.insert(join_tags(tags), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::tokenize;

    #[test]
    fn memory_model_registers_its_entries() {
        let model = MemoryModel::new([("kq-1:2-leaf;stem", ParamKind::Real)]);
        let mut registry = SchemaRegistry::new();
        model.define_entries(&mut registry).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.defs()[0].param_count(), 4);
    }

    #[test]
    fn memory_model_stores_per_kind() {
        let mut model = MemoryModel::new([("x", ParamKind::Real)]);
        let tags = tokenize("x");
        model.set_real_value(&tags, 1.5);
        model.set_int_value(&tags, 7);
        assert_eq!(model.real_value(&tags), 1.5);
        assert_eq!(model.int_value(&tags), 7);
        assert_eq!(model.text_value(&tags), "");
    }

    #[test]
    fn children_share_the_schema_but_not_the_values() {
        let mut model = MemoryModel::new([("kq-1:2-leaf;stem", ParamKind::Real)]);
        let tags = tokenize("kq-1-leaf");
        model.set_real_value(&tags, 0.8);

        let child = model.make_child();
        let mut registry = SchemaRegistry::new();
        child.define_entries(&mut registry).unwrap();
        assert_eq!(registry.defs()[0].param_count(), 4);
        assert_eq!(child.real_value(&tags), 0.0);
    }
}
