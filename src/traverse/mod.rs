//! Schema-driven traversal of query fragments and entities
//!
//! - [`factory`]: the configurable recursive engine
//! - [`query`]: one adapter per query shape (filters, sort, fields, populate)
//! - [`entity`]: the simpler walker over concrete data records
//! - [`parsers`]: container parsers shared by the adapters

pub mod entity;
pub mod factory;
pub mod parsers;
pub mod path;
pub mod query;

pub use entity::traverse_entity;
pub use factory::{
    ContainerParser, Interceptor, NodeAccess, NodeHandler, NoopVisitor, Runner, Traverse, Visitor,
    VisitorContext,
};
pub use path::TraversalPath;

/// Keys that act as logical or comparison operators in filter fragments
pub fn is_operator(key: &str) -> bool {
    key.starts_with('$')
}
