//! Entity metadata: descriptors, field sets and model access.
//!
//! Descriptors are plain data owned by the caller. [`prepare`] is the only place
//! they are mutated, filling in defaulted physical names once before use.

pub mod entity;
pub mod fieldset;
pub mod prepare;
pub mod record;

pub use entity::{
    EntityDescriptor, FieldDescriptor, FieldKind, FieldType, ForeignRef, IndexDescriptor,
    IndexMethod, TimeRole,
};
pub use fieldset::FieldSet;
pub use prepare::prepare;
pub use record::{Model, Record};

#[cfg(test)]
mod tests;
