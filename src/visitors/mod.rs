//! Reusable node-level visitors
//!
//! Each visitor implements one security or normalization concern and runs
//! identically over filters, sort, fields, populate, and raw entities.

pub mod field_lists;
pub mod remove;
pub mod restricted_relations;

pub use field_lists::{AllowedFields, RestrictedFields};
pub use remove::{
    RemoveMorphRelations, RemoveNonPopulatable, RemoveNonWritable, RemovePassword, RemovePrivate,
    RemoveUnknownAttributes,
};
pub use restricted_relations::RemoveRestrictedRelations;
