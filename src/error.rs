//! Error types for schema building, tag resolution and value access.
//!
//! Every fallible operation in this crate reports a [`ParamError`]. Accessor
//! errors carry the offending tag so callers can surface them directly as
//! configuration errors; schema-build errors carry the definition string or
//! segment that failed.

use thiserror::Error;

use crate::schema::ParamKind;

/// A specialized `Result` type for parameter tree operations.
pub type Result<T> = std::result::Result<T, ParamError>;

/// Errors raised by parameter tree operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    /// The tag does not resolve to any schema node.
    #[error("unknown parameter name: {tag}")]
    UnknownParam {
        /// The tag path as requested by the caller.
        tag: String,
    },

    /// The tag resolved to the wrong shape: a group where a scalar was
    /// required, or a scalar where a group was required.
    #[error("parameter {tag} does not name a {expected}")]
    NotScalar {
        /// The tag path as requested by the caller.
        tag: String,
        /// Either `"scalar value"` or `"group"`.
        expected: &'static str,
    },

    /// A typed accessor was used on a leaf of a different declared type.
    #[error("parameter {tag} is declared as {declared}, not {requested}")]
    TypeMismatch {
        /// The tag path as requested by the caller.
        tag: String,
        /// The type the schema declares for this leaf.
        declared: ParamKind,
        /// The type the accessor asked for.
        requested: ParamKind,
    },

    /// A getter ran before any value was assigned to the leaf.
    #[error("parameter value undefined: {tag}")]
    Undefined {
        /// The tag path as requested by the caller.
        tag: String,
    },

    /// The text form of a value cannot be converted to the declared type.
    #[error("error parsing parameter {tag} = {value:?} as {kind}")]
    Parse {
        /// The tag path as requested by the caller.
        tag: String,
        /// The rejected input text.
        value: String,
        /// The type the leaf is declared as.
        kind: ParamKind,
    },

    /// A definition string cannot be parsed into a schema tree.
    #[error("invalid parameter definition {definition:?}: {reason}")]
    InvalidDefinition {
        /// The definition string as registered.
        definition: String,
        /// What was wrong with it.
        reason: String,
    },

    /// An integer index range `a:b` is malformed or descending.
    #[error("invalid index range {spec:?} in parameter definition")]
    InvalidRange {
        /// The offending index specification.
        spec: String,
    },

    /// Two siblings in a schema tree share a segment name.
    #[error("duplicate segment {segment:?} under {parent}")]
    DuplicateSegment {
        /// The repeated segment name.
        segment: String,
        /// Full name of the parent node, or `"schema root"`.
        parent: String,
    },
}
