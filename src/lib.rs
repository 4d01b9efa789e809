//! # paramtree
//!
//! Hierarchical, locale-aware, typed parameter trees for biological model
//! configuration.
//!
//! Biological models carry large families of physiological constants that
//! vary per species, genotype and cultivar. `paramtree` defines those
//! families once, as compact dash-delimited definition strings, and manages
//! the records as a configuration tree in which every node can selectively
//! override the values it inherits from its source.
//!
//! ## Features
//!
//! - Schema trees built from definition strings with integer-range
//!   (`1:4`) and literal-list (`leaf;stem`) expansion
//! - Case-insensitive tag path resolution (`kq-1-leaf`) with a
//!   trailing-dash convention for naming composite groups
//! - Typed accessors for real, integer, boolean and text parameters with
//!   full validation before any storage access
//! - Per-leaf definedness tracking, independent of the stored value
//! - Selective override: values are copied explicitly from a source node,
//!   never inherited implicitly
//! - Whole-subtree cloning that mirrors child structure
//! - Locale-scoped record enumeration and display-name translations
//! - Storage is pluggable: concrete models keep their own backing arrays
//!   and register themselves through the [`ParamModel`] hooks
//!
//! ## Quick Start
//!
//! ```rust
//! use paramtree::{MemoryModel, ParamKind, ParamSet};
//!
//! let model = MemoryModel::new([
//!     ("kq-1:4-leaf;stem", ParamKind::Real),
//!     ("maxrootdepth", ParamKind::Real),
//! ]);
//! let genotype = ParamSet::new_root(Box::new(model)).unwrap();
//!
//! genotype.set_real("kq-1-leaf", 0.8).unwrap();
//! assert!(genotype.is_defined("kq-1-leaf"));
//! assert_eq!(genotype.real("KQ-1-Leaf").unwrap(), 0.8);
//! assert!(!genotype.is_complete());
//!
//! // a cultivar starts from its parent's values and overrides selectively
//! let cultivar = genotype.add_child().unwrap();
//! cultivar.initialize(Some(&genotype)).unwrap();
//! cultivar.set_real("kq-1-leaf", 0.75).unwrap();
//! assert_eq!(genotype.real("kq-1-leaf").unwrap(), 0.8);
//! ```
//!
//! ## Modules
//!
//! - [`tag`] - Tag path tokenizing
//! - [`schema`] - Schema trees, definition parsing and resolution
//! - [`model`] - The storage capability interface and a map-backed store
//! - [`set`] - Configuration nodes, accessors and the override hierarchy
//! - [`locale`] - Locale sets and display-name translations
//! - [`error`] - Error types

#[macro_use]
extern crate log;

/// Error types for schema building, tag resolution and value access.
pub mod error;

/// Locale membership and display-name translations.
pub mod locale;

/// The capability interface concrete models implement.
pub mod model;

/// Parameter schema trees.
pub mod schema;

/// Configuration nodes and the override hierarchy.
pub mod set;

/// Tag path tokenizing.
pub mod tag;

pub use error::{ParamError, Result};
pub use locale::{Translation, ALL_LOCALES, DEFAULT_LOCALE};
pub use model::{MemoryModel, ParamModel};
pub use schema::{ParamDef, ParamInfo, ParamKind, SchemaRegistry};
pub use set::ParamSet;
