//! Column type mapping and schema reconciliation.
//!
//! [`TypeRegistry`] maps entity fields onto column types. [`Reconciler`] diffs
//! entity descriptors against a [`LiveSchema`] snapshot and plans the [`DdlOp`]s
//! that add missing tables, columns, constraints and indexes. Existing column
//! types are never altered.

pub mod constraint;
pub mod introspect;
pub mod reconcile;
pub mod types;

pub use constraint::{Constraint, unique_constraint_name};
pub use introspect::{LiveSchema, LiveTable};
pub use reconcile::{DdlOp, Reconciler};
pub use types::{ArrayType, ColumnType, ExternalColumn, ScalarType, TypeRegistry};

/// Longest identifier the server keeps; longer names are truncated on creation.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// `name` cut to [`MAX_IDENTIFIER_LEN`] bytes on a char boundary.
pub(crate) fn truncate_identifier(name: &str) -> &str {
    if name.len() <= MAX_IDENTIFIER_LEN {
        return name;
    }
    let mut end = MAX_IDENTIFIER_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
