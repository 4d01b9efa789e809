//! Configuration nodes and the override hierarchy.
//!
//! A [`ParamSet`] is one node of a configuration tree: a named record (a
//! species, a genotype, a cultivar) that owns a private schema instance
//! with per-leaf defined flags, a concrete storage model, and its child
//! records. Values are read and written through the typed accessors, which
//! validate the tag fully before delegating to the model's storage hooks.
//!
//! Nothing is inherited implicitly. A child starts with every leaf
//! undefined; calling [`ParamSet::initialize`] with the parent as source
//! copies every value the parent has defined, after which the child can
//! override leaves selectively. [`ParamSet::copy_all`] clones a whole
//! subtree, resizing the target's children to mirror the source.
//!
//! Handles are cheap: `ParamSet` clones share the underlying node. The
//! parent link is a weak reference used only for upward traversal; a tree
//! must only be mutated from one thread at a time.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{ParamError, Result};
use crate::locale::{join_locale_list, parse_locale_list, Translation, ALL_LOCALES};
use crate::model::ParamModel;
use crate::schema::{find_in, resolve, set_defined_in, ParamDef, ParamInfo, ParamKind, SchemaRegistry};
use crate::tag::tokenize;

struct NodeInner {
    version: String,
    name: String,
    english_name: String,
    file_source: String,
    locales: Vec<String>,
    translations: Vec<Translation>,
    curr_locale: String,
    ui_lang: Option<String>,
    parent: Weak<RefCell<NodeInner>>,
    children: Vec<ParamSet>,
    definitions: Vec<ParamDef>,
    model: Box<dyn ParamModel>,
}

/// One node of a configuration hierarchy.
///
/// Cloning a `ParamSet` clones the handle, not the node; use
/// [`ParamSet::copy_all`] to duplicate a subtree into another tree.
#[derive(Clone)]
pub struct ParamSet {
    node: Rc<RefCell<NodeInner>>,
}

impl ParamSet {
    /// Creates the root of a new configuration tree and builds its schema
    /// through the model's registration hook.
    ///
    /// Every leaf starts undefined and the current locale starts as
    /// [`ALL_LOCALES`].
    ///
    /// # Errors
    ///
    /// Fails when the model registers a malformed definition string.
    pub fn new_root(model: Box<dyn ParamModel>) -> Result<ParamSet> {
        let set = ParamSet::bare(model, Weak::new());
        set.rebuild_schema()?;
        Ok(set)
    }

    fn bare(model: Box<dyn ParamModel>, parent: Weak<RefCell<NodeInner>>) -> ParamSet {
        ParamSet {
            node: Rc::new(RefCell::new(NodeInner {
                version: String::new(),
                name: String::new(),
                english_name: String::new(),
                file_source: String::new(),
                locales: Vec::new(),
                translations: Vec::new(),
                curr_locale: ALL_LOCALES.to_string(),
                ui_lang: None,
                parent,
                children: Vec::new(),
                definitions: Vec::new(),
                model,
            })),
        }
    }

    fn rebuild_schema(&self) -> Result<()> {
        let mut registry = SchemaRegistry::new();
        self.node.borrow().model.define_entries(&mut registry)?;
        self.node.borrow_mut().definitions = registry.into_defs();
        Ok(())
    }

    fn same_node(&self, other: &ParamSet) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    // ----- metadata ---------------------------------------------------

    /// Version string of this record.
    pub fn version(&self) -> String {
        self.node.borrow().version.clone()
    }

    /// Sets the version string.
    pub fn set_version(&self, version: &str) {
        self.node.borrow_mut().version = version.to_string();
    }

    /// Display name of this record.
    pub fn name(&self) -> String {
        self.node.borrow().name.clone()
    }

    /// Sets the display name.
    pub fn set_name(&self, name: &str) {
        self.node.borrow_mut().name = name.to_string();
    }

    /// English reference name, the fallback used by [`ParamSet::localise_names`].
    pub fn english_name(&self) -> String {
        self.node.borrow().english_name.clone()
    }

    /// Sets the English reference name.
    pub fn set_english_name(&self, name: &str) {
        self.node.borrow_mut().english_name = name.to_string();
    }

    /// Where this record was loaded from, if an external reader recorded it.
    pub fn file_source(&self) -> String {
        self.node.borrow().file_source.clone()
    }

    /// Records where this record was loaded from.
    pub fn set_file_source(&self, source: &str) {
        self.node.borrow_mut().file_source = source.to_string();
    }

    // ----- schema access ----------------------------------------------

    /// Number of registered root definitions.
    pub fn definition_count(&self) -> usize {
        self.node.borrow().definitions.len()
    }

    /// Resolves a request tag to a schema snapshot, honoring the
    /// trailing-dash convention: a plain tag must name a scalar, a
    /// dash-terminated tag must name a group.
    pub fn definition(&self, tag: &str) -> Option<ParamInfo> {
        let node = self.node.borrow();
        resolve(&node.definitions, tag).ok().map(ParamDef::info)
    }

    /// Whether the tag resolves to a scalar leaf of this node's schema.
    pub fn param_exists(&self, tag: &str) -> bool {
        let node = self.node.borrow();
        let tags = tokenize(tag);
        find_in(&node.definitions, &tags).map_or(false, ParamDef::is_scalar)
    }

    /// Total number of scalar leaves across all root definitions.
    pub fn param_count(&self) -> usize {
        let node = self.node.borrow();
        node.definitions.iter().map(ParamDef::param_count).sum()
    }

    /// Scalar leaf by flat index, walking root definitions in registration
    /// order. This enumeration is stable and independent of tag strings.
    pub fn param_at(&self, index: usize) -> Option<ParamInfo> {
        let node = self.node.borrow();
        let mut remaining = index;
        for def in &node.definitions {
            if remaining < def.param_count() {
                return def.param_at(remaining).map(ParamDef::info);
            }
            remaining -= def.param_count();
        }
        None
    }

    // ----- typed accessors --------------------------------------------

    /// Validates that `tags` resolves to a scalar leaf, optionally of a
    /// required kind and with a defined value. Returns the declared kind.
    fn check_scalar(
        &self,
        tags: &[String],
        tag: &str,
        requested: Option<ParamKind>,
        need_defined: bool,
    ) -> Result<ParamKind> {
        let node = self.node.borrow();
        let def = find_in(&node.definitions, tags).ok_or_else(|| ParamError::UnknownParam {
            tag: tag.to_string(),
        })?;
        if !def.is_scalar() {
            return Err(ParamError::NotScalar {
                tag: tag.to_string(),
                expected: "scalar value",
            });
        }
        if let Some(requested) = requested {
            if def.kind() != requested {
                return Err(ParamError::TypeMismatch {
                    tag: tag.to_string(),
                    declared: def.kind(),
                    requested,
                });
            }
        }
        if need_defined && !def.value_defined() {
            return Err(ParamError::Undefined {
                tag: tag.to_string(),
            });
        }
        Ok(def.kind())
    }

    /// Reads a real parameter.
    ///
    /// # Errors
    ///
    /// Fails when the tag is unknown, names a group, is declared as a
    /// different type, or has no defined value.
    pub fn real(&self, tag: &str) -> Result<f64> {
        let tags = tokenize(tag);
        self.check_scalar(&tags, tag, Some(ParamKind::Real), true)?;
        let value = self.node.borrow().model.real_value(&tags);
        Ok(value)
    }

    /// Reads an integer parameter.
    ///
    /// # Errors
    ///
    /// Same conditions as [`ParamSet::real`].
    pub fn integer(&self, tag: &str) -> Result<i64> {
        let tags = tokenize(tag);
        self.check_scalar(&tags, tag, Some(ParamKind::Integer), true)?;
        let value = self.node.borrow().model.int_value(&tags);
        Ok(value)
    }

    /// Reads a boolean parameter.
    ///
    /// # Errors
    ///
    /// Same conditions as [`ParamSet::real`].
    pub fn boolean(&self, tag: &str) -> Result<bool> {
        let tags = tokenize(tag);
        self.check_scalar(&tags, tag, Some(ParamKind::Boolean), true)?;
        let value = self.node.borrow().model.bool_value(&tags);
        Ok(value)
    }

    /// Reads a text parameter.
    ///
    /// # Errors
    ///
    /// Same conditions as [`ParamSet::real`].
    pub fn text(&self, tag: &str) -> Result<String> {
        let tags = tokenize(tag);
        self.check_scalar(&tags, tag, Some(ParamKind::Text), true)?;
        let value = self.node.borrow().model.text_value(&tags);
        Ok(value)
    }

    /// Reads any scalar parameter as text. Real values use the shortest
    /// round-trip form, integers are decimal, booleans are `"true"` or
    /// `"false"`.
    ///
    /// # Errors
    ///
    /// Fails when the tag is unknown, names a group, or has no defined
    /// value.
    pub fn value_text(&self, tag: &str) -> Result<String> {
        let tags = tokenize(tag);
        let kind = self.check_scalar(&tags, tag, None, true)?;
        let node = self.node.borrow();
        let text = match kind {
            ParamKind::Text => node.model.text_value(&tags),
            ParamKind::Real => format!("{}", node.model.real_value(&tags)),
            ParamKind::Integer => node.model.int_value(&tags).to_string(),
            ParamKind::Boolean => {
                if node.model.bool_value(&tags) {
                    "true".to_string()
                } else {
                    "false".to_string()
                }
            }
        };
        Ok(text)
    }

    /// Writes a real parameter and marks it defined.
    ///
    /// # Errors
    ///
    /// Fails when the tag is unknown, names a group, or is declared as a
    /// different type. Writing never requires the value to be defined
    /// beforehand.
    pub fn set_real(&self, tag: &str, value: f64) -> Result<()> {
        let tags = tokenize(tag);
        self.check_scalar(&tags, tag, Some(ParamKind::Real), false)?;
        let mut guard = self.node.borrow_mut();
        let node = &mut *guard;
        node.model.set_real_value(&tags, value);
        set_defined_in(&mut node.definitions, &tags, true);
        Ok(())
    }

    /// Writes an integer parameter and marks it defined.
    ///
    /// # Errors
    ///
    /// Same conditions as [`ParamSet::set_real`].
    pub fn set_integer(&self, tag: &str, value: i64) -> Result<()> {
        let tags = tokenize(tag);
        self.check_scalar(&tags, tag, Some(ParamKind::Integer), false)?;
        let mut guard = self.node.borrow_mut();
        let node = &mut *guard;
        node.model.set_int_value(&tags, value);
        set_defined_in(&mut node.definitions, &tags, true);
        Ok(())
    }

    /// Writes a boolean parameter and marks it defined.
    ///
    /// # Errors
    ///
    /// Same conditions as [`ParamSet::set_real`].
    pub fn set_boolean(&self, tag: &str, value: bool) -> Result<()> {
        let tags = tokenize(tag);
        self.check_scalar(&tags, tag, Some(ParamKind::Boolean), false)?;
        let mut guard = self.node.borrow_mut();
        let node = &mut *guard;
        node.model.set_bool_value(&tags, value);
        set_defined_in(&mut node.definitions, &tags, true);
        Ok(())
    }

    /// Writes a text parameter and marks it defined.
    ///
    /// # Errors
    ///
    /// Same conditions as [`ParamSet::set_real`].
    pub fn set_text(&self, tag: &str, value: &str) -> Result<()> {
        let tags = tokenize(tag);
        self.check_scalar(&tags, tag, Some(ParamKind::Text), false)?;
        let mut guard = self.node.borrow_mut();
        let node = &mut *guard;
        node.model.set_text_value(&tags, value);
        set_defined_in(&mut node.definitions, &tags, true);
        Ok(())
    }

    /// Parses `value` into the leaf's declared type, writes it and marks
    /// the leaf defined. Numeric parsing is culture-invariant; booleans
    /// accept `true` and `false` in any case.
    ///
    /// # Errors
    ///
    /// Fails when the tag is unknown or names a group, or with
    /// [`ParamError::Parse`] when the text does not convert; a failed
    /// parse leaves the defined flag untouched.
    pub fn set_from_text(&self, tag: &str, value: &str) -> Result<()> {
        let tags = tokenize(tag);
        let kind = self.check_scalar(&tags, tag, None, false)?;
        let mut guard = self.node.borrow_mut();
        let node = &mut *guard;
        match kind {
            ParamKind::Text => node.model.set_text_value(&tags, value),
            ParamKind::Real => {
                let parsed: f64 = value.trim().parse().map_err(|_| ParamError::Parse {
                    tag: tag.to_string(),
                    value: value.to_string(),
                    kind,
                })?;
                node.model.set_real_value(&tags, parsed);
            }
            ParamKind::Integer => {
                let parsed: i64 = value.trim().parse().map_err(|_| ParamError::Parse {
                    tag: tag.to_string(),
                    value: value.to_string(),
                    kind,
                })?;
                node.model.set_int_value(&tags, parsed);
            }
            ParamKind::Boolean => {
                let parsed = match value.trim().to_lowercase().as_str() {
                    "true" => true,
                    "false" => false,
                    _ => {
                        return Err(ParamError::Parse {
                            tag: tag.to_string(),
                            value: value.to_string(),
                            kind,
                        });
                    }
                };
                node.model.set_bool_value(&tags, parsed);
            }
        }
        set_defined_in(&mut node.definitions, &tags, true);
        Ok(())
    }

    // ----- definedness -------------------------------------------------

    /// Whether the tag has a defined value. A dash-terminated group tag is
    /// defined only when every leaf below it is. Unknown tags are simply
    /// not defined.
    pub fn is_defined(&self, tag: &str) -> bool {
        let node = self.node.borrow();
        match resolve(&node.definitions, tag) {
            Ok(def) => def.value_defined(),
            Err(_) => false,
        }
    }

    /// Marks a scalar leaf undefined again.
    ///
    /// # Errors
    ///
    /// Fails when the tag is unknown or does not name a scalar.
    pub fn set_undefined(&self, tag: &str) -> Result<()> {
        {
            let node = self.node.borrow();
            let def = resolve(&node.definitions, tag)?;
            if !def.is_scalar() {
                return Err(ParamError::NotScalar {
                    tag: tag.to_string(),
                    expected: "scalar value",
                });
            }
        }
        let tags = tokenize(tag);
        let mut node = self.node.borrow_mut();
        set_defined_in(&mut node.definitions, &tags, false);
        Ok(())
    }

    /// Whether every scalar leaf of every root definition is defined.
    pub fn is_complete(&self) -> bool {
        let node = self.node.borrow();
        node.definitions.iter().all(ParamDef::value_defined)
    }

    // ----- copy engine -------------------------------------------------

    /// Rebuilds this node's schema, then copies every value the source has
    /// defined and explicitly reverts the rest; without a source every leaf
    /// ends up undefined. With a parent, the version is inherited from it,
    /// otherwise from the source.
    ///
    /// # Errors
    ///
    /// Fails when the model registers a malformed definition, or when
    /// source values cannot be read back (diverging schemas).
    pub fn initialize(&self, source: Option<&ParamSet>) -> Result<()> {
        self.rebuild_schema()?;
        self.copy_params(source, true)?;
        if let Some(parent) = self.parent() {
            let version = parent.version();
            self.node.borrow_mut().version = version;
        } else if let Some(source) = source {
            let version = source.version();
            self.node.borrow_mut().version = version;
        }
        Ok(())
    }

    /// Copies node metadata and, when `copy_values` is set, every defined
    /// value from `source`, then lets the model recompute derived
    /// quantities.
    fn copy_params(&self, source: Option<&ParamSet>, copy_values: bool) -> Result<()> {
        if let Some(source) = source {
            if !self.same_node(source) {
                let (version, name, english_name, locales, curr_locale, translations) = {
                    let src = source.node.borrow();
                    (
                        src.version.clone(),
                        src.name.clone(),
                        src.english_name.clone(),
                        src.locales.clone(),
                        src.curr_locale.clone(),
                        src.translations.clone(),
                    )
                };
                let mut node = self.node.borrow_mut();
                node.version = version;
                node.name = name;
                node.english_name = english_name;
                node.locales = locales;
                node.curr_locale = curr_locale;
                node.translations = translations;
            }
        }

        if copy_values {
            let defs = self.node.borrow().definitions.clone();
            for def in &defs {
                self.copy_definition(source, def)?;
            }
            self.node.borrow_mut().model.derive_params();
        }
        Ok(())
    }

    /// Per-leaf selective copy: a leaf the source has defined is copied
    /// (value and defined flag); any other leaf is explicitly marked
    /// undefined. Groups recurse into every child.
    fn copy_definition(&self, source: Option<&ParamSet>, def: &ParamDef) -> Result<()> {
        if def.is_scalar() {
            let tag = def.full_name();
            match source {
                Some(src) if src.is_defined(tag) => match def.kind() {
                    ParamKind::Real => self.set_real(tag, src.real(tag)?)?,
                    ParamKind::Integer => self.set_integer(tag, src.integer(tag)?)?,
                    ParamKind::Boolean => self.set_boolean(tag, src.boolean(tag)?)?,
                    ParamKind::Text => self.set_text(tag, &src.text(tag)?)?,
                },
                _ => self.set_undefined(tag)?,
            }
        } else {
            for item in def.items() {
                self.copy_definition(source, item)?;
            }
        }
        Ok(())
    }

    /// Clones an entire subtree: metadata and values of this node, then
    /// the children, resizing to mirror `source` and recursing pairwise.
    ///
    /// # Errors
    ///
    /// Fails when a child's model registers a malformed definition or the
    /// trees' schemas diverge.
    pub fn copy_all(&self, source: &ParamSet) -> Result<()> {
        if self.same_node(source) {
            return Ok(());
        }
        debug!("copy_all: '{}' <- '{}'", self.name(), source.name());
        self.copy_params(Some(source), true)?;

        if self.child_count() != source.child_count() {
            debug!(
                "copy_all: resizing children {} -> {}",
                self.child_count(),
                source.child_count()
            );
        }
        while self.child_count() > source.child_count() {
            let last = self.child_count() - 1;
            self.remove_child(last);
        }
        while self.child_count() < source.child_count() {
            self.add_child()?;
        }
        for index in 0..self.child_count() {
            if let (Some(target), Some(src)) = (self.child(index), source.child(index)) {
                target.copy_all(&src)?;
            }
        }
        Ok(())
    }

    /// Lets the model recompute derived quantities from the current
    /// values.
    pub fn derive_params(&self) {
        self.node.borrow_mut().model.derive_params();
    }

    // ----- children and tree navigation -------------------------------

    /// The parent node, if this is not the root.
    pub fn parent(&self) -> Option<ParamSet> {
        self.node.borrow().parent.upgrade().map(|node| ParamSet { node })
    }

    /// The ultimate root of the tree this node belongs to.
    pub fn root(&self) -> ParamSet {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Whether this node has no parent.
    pub fn is_root(&self) -> bool {
        self.node.borrow().parent.upgrade().is_none()
    }

    /// Whether this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.node.borrow().children.is_empty()
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.node.borrow().children.len()
    }

    /// Direct child by position.
    pub fn child(&self, index: usize) -> Option<ParamSet> {
        self.node.borrow().children.get(index).cloned()
    }

    /// Direct child by display name, case-insensitively, ignoring
    /// surrounding whitespace in the query.
    pub fn child_by_name(&self, name: &str) -> Option<ParamSet> {
        let want = name.trim().to_lowercase();
        self.children()
            .into_iter()
            .find(|child| child.name().to_lowercase() == want)
    }

    /// Handles to all direct children, in order.
    pub fn children(&self) -> Vec<ParamSet> {
        self.node.borrow().children.clone()
    }

    /// Appends a new child built by the model's factory. The child gets
    /// its own schema with every leaf undefined, and inherits this node's
    /// version and current locale.
    ///
    /// # Errors
    ///
    /// Fails when the child model registers a malformed definition.
    pub fn add_child(&self) -> Result<ParamSet> {
        let model = self.node.borrow().model.make_child();
        let child = ParamSet::bare(model, Rc::downgrade(&self.node));
        child.rebuild_schema()?;
        {
            let this = self.node.borrow();
            let mut inner = child.node.borrow_mut();
            inner.version = this.version.clone();
            inner.curr_locale = this.curr_locale.clone();
        }
        self.node.borrow_mut().children.push(child.clone());
        Ok(child)
    }

    /// Removes the child at `index` together with its subtree. Indices
    /// past the end are ignored.
    pub fn remove_child(&self, index: usize) {
        let mut node = self.node.borrow_mut();
        if index < node.children.len() {
            node.children.remove(index);
        }
    }

    /// Total number of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .iter()
            .map(ParamSet::node_count)
            .sum::<usize>()
    }

    /// Node by depth-first ordinal. Ordinal 0 is this node; the first
    /// child of node `n` is node `n + 1`.
    pub fn node_at(&self, index: usize) -> Option<ParamSet> {
        if index == 0 {
            return Some(self.clone());
        }
        let mut offset = 1;
        for child in self.children() {
            let count = child.node_count();
            if index < offset + count {
                return child.node_at(index - offset);
            }
            offset += count;
        }
        None
    }

    /// First node in this subtree (depth-first) whose display name matches
    /// `name`, case-insensitively, ignoring surrounding whitespace in the
    /// query.
    pub fn node_by_name(&self, name: &str) -> Option<ParamSet> {
        let want = name.trim().to_lowercase();
        if self.name().to_lowercase() == want {
            return Some(self.clone());
        }
        for child in self.children() {
            if let Some(found) = child.node_by_name(name) {
                return Some(found);
            }
        }
        None
    }

    // ----- locales ----------------------------------------------------

    /// Number of locale codes attached to this node.
    pub fn locale_count(&self) -> usize {
        self.node.borrow().locales.len()
    }

    /// Locale code by position.
    pub fn locale(&self, index: usize) -> Option<String> {
        self.node.borrow().locales.get(index).cloned()
    }

    /// Appends a locale code to this node's set.
    pub fn add_locale(&self, locale: &str) {
        self.node.borrow_mut().locales.push(locale.to_string());
    }

    /// Semicolon-joined text form of this node's locale set.
    pub fn locale_text(&self) -> String {
        join_locale_list(&self.node.borrow().locales)
    }

    /// Replaces this node's locale set from its semicolon-joined text
    /// form.
    pub fn set_locale_text(&self, text: &str) {
        self.node.borrow_mut().locales = parse_locale_list(text);
    }

    /// Whether this node applies under the given locale. The
    /// [`ALL_LOCALES`] sentinel matches from either side.
    pub fn in_locale(&self, locale: &str) -> bool {
        if locale == ALL_LOCALES {
            return true;
        }
        let node = self.node.borrow();
        if node.locales.iter().any(|l| l == ALL_LOCALES) {
            return true;
        }
        let want = locale.to_lowercase();
        node.locales.iter().any(|l| l.to_lowercase() == want)
    }

    /// The current locale of the tree this node belongs to.
    pub fn current_locale(&self) -> String {
        self.node.borrow().curr_locale.clone()
    }

    /// Sets the current locale for the whole tree. The value is walked up
    /// to the root and written to every node, so it reads the same from
    /// anywhere in the tree.
    pub fn set_current_locale(&self, locale: &str) {
        trace!("set_current_locale: '{locale}'");
        let mut nodes = Vec::new();
        self.root().collect_nodes(&mut nodes);
        for node in nodes {
            node.node.borrow_mut().curr_locale = locale.to_string();
        }
    }

    fn collect_nodes(&self, out: &mut Vec<ParamSet>) {
        out.push(self.clone());
        for child in self.children() {
            child.collect_nodes(out);
        }
    }

    /// Number of childless nodes in this subtree. With `use_locale` set,
    /// only nodes applying under the current locale are counted.
    pub fn leaf_count(&self, use_locale: bool) -> usize {
        if self.is_leaf() {
            if !use_locale || self.in_locale(&self.current_locale()) {
                1
            } else {
                0
            }
        } else {
            self.children()
                .iter()
                .map(|child| child.leaf_count(use_locale))
                .sum()
        }
    }

    /// Childless node by position among those counted by
    /// [`ParamSet::leaf_count`], in depth-first order.
    pub fn leaf_at(&self, index: usize, use_locale: bool) -> Option<ParamSet> {
        fn walk(node: &ParamSet, use_locale: bool, remaining: &mut usize) -> Option<ParamSet> {
            if node.is_leaf() {
                if !use_locale || node.in_locale(&node.current_locale()) {
                    if *remaining == 0 {
                        return Some(node.clone());
                    }
                    *remaining -= 1;
                }
                return None;
            }
            for child in node.children() {
                if let Some(found) = walk(&child, use_locale, remaining) {
                    return Some(found);
                }
            }
            None
        }
        let mut remaining = index;
        walk(self, use_locale, &mut remaining)
    }

    // ----- translations and name localization -------------------------

    /// Number of display-name translations on this node.
    pub fn translation_count(&self) -> usize {
        self.node.borrow().translations.len()
    }

    /// Translation by position.
    pub fn translation(&self, index: usize) -> Option<Translation> {
        self.node.borrow().translations.get(index).cloned()
    }

    /// Adds a translation, replacing an existing entry with the same
    /// language code (case-insensitively). An English translation, or any
    /// translation when the display name is still empty, also becomes the
    /// display name.
    pub fn add_translation(&self, lang: &str, text: &str) {
        let mut guard = self.node.borrow_mut();
        let inner = &mut *guard;
        match inner
            .translations
            .iter_mut()
            .find(|t| t.lang.eq_ignore_ascii_case(lang))
        {
            Some(existing) => existing.text = text.to_string(),
            None => inner.translations.push(Translation {
                lang: lang.to_string(),
                text: text.to_string(),
            }),
        }
        if lang.eq_ignore_ascii_case("en") || inner.name.is_empty() {
            inner.name = text.to_string();
        }
    }

    /// Removes the translation at `index`. Indices past the end are
    /// ignored.
    pub fn remove_translation(&self, index: usize) {
        let mut node = self.node.borrow_mut();
        if index < node.translations.len() {
            node.translations.remove(index);
        }
    }

    /// The language used by [`ParamSet::localise_names`]: this node's own
    /// setting, else the root's, else `"en"`.
    pub fn ui_language(&self) -> String {
        if let Some(lang) = self.node.borrow().ui_lang.clone() {
            return lang;
        }
        let root = self.root();
        if !self.same_node(&root) {
            if let Some(lang) = root.node.borrow().ui_lang.clone() {
                return lang;
            }
        }
        "en".to_string()
    }

    /// Sets the language used by [`ParamSet::localise_names`]. Setting it
    /// on the root covers the whole tree.
    pub fn set_ui_language(&self, lang: &str) {
        self.node.borrow_mut().ui_lang = Some(lang.to_string());
    }

    /// Rewrites every display name in the tree: back to the English name
    /// first, then to the translation matching the UI language where one
    /// exists.
    pub fn localise_names(&self) {
        let lang = self.ui_language();
        debug!("localise_names: language '{lang}'");
        let mut nodes = Vec::new();
        self.root().collect_nodes(&mut nodes);
        for node in nodes {
            let mut guard = node.node.borrow_mut();
            let inner = &mut *guard;
            let mut name = inner.english_name.clone();
            for translation in &inner.translations {
                if translation.lang.eq_ignore_ascii_case(&lang) {
                    name = translation.text.clone();
                }
            }
            inner.name = name;
        }
    }

    // ----- model access -----------------------------------------------

    /// Runs `f` with shared access to the concrete model. Use
    /// [`ParamModel::as_any`] to downcast to the concrete type.
    pub fn with_model<R>(&self, f: impl FnOnce(&dyn ParamModel) -> R) -> R {
        let node = self.node.borrow();
        f(node.model.as_ref())
    }

    /// Runs `f` with exclusive access to the concrete model. Writing
    /// through the model directly bypasses definedness tracking; prefer
    /// the typed setters.
    pub fn with_model_mut<R>(&self, f: impl FnOnce(&mut dyn ParamModel) -> R) -> R {
        let mut guard = self.node.borrow_mut();
        let node = &mut *guard;
        f(node.model.as_mut())
    }
}

impl fmt::Debug for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.node.borrow();
        f.debug_struct("ParamSet")
            .field("name", &node.name)
            .field("version", &node.version)
            .field("children", &node.children.len())
            .field("definitions", &node.definitions.len())
            .finish()
    }
}
