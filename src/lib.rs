//! # Sift
//!
//! A schema-driven traversal and sanitization engine for REST query
//! fragments and entity records.
//!
//! ## Features
//!
//! - **One engine, four query shapes**: filters, sort, fields, and
//!   populate each get a purpose-built adapter over the same traversal
//!   factory
//! - **Schema-scoped recursion**: relations, components, dynamic zones,
//!   and media re-scope the walk to their target type
//! - **Composable visitors**: passwords, private fields, unknown keys,
//!   morph relations, and unauthorized relations each removed by one
//!   small reusable visitor
//! - **Sanitize or validate**: the same traversals either silently drop
//!   offending nodes or fail fast with the offending path
//! - **Pluggable authorization**: relation visibility is delegated to an
//!   [`AccessVerifier`](auth::AccessVerifier) you provide
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sift::prelude::*;
//! use std::sync::Arc;
//!
//! let mut registry = InMemoryRegistry::new();
//! registry.register(
//!     Schema::builder("api::article")
//!         .attribute("title", Attribute::scalar())
//!         .attribute("secret", Attribute::scalar().private())
//!         .attribute("author", Attribute::relation(RelationKind::ManyToOne, "api::author"))
//!         .build(),
//! );
//!
//! let sanitizer = Sanitizer::new(Arc::new(registry));
//! let clean = sanitizer
//!     .sanitize_filters(
//!         &AuthContext::Anonymous,
//!         schema,
//!         json!({"$and": [{"title": {"$eq": "x"}}, {"secret": {"$eq": "y"}}]}),
//!     )
//!     .await?;
//! // => {"$and": [{"title": {"$eq": "x"}}]}
//! ```

pub mod auth;
pub mod error;
pub mod sanitize;
pub mod schema;
pub mod traverse;
pub mod validate;
pub mod visitors;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Schemas ===
    pub use crate::schema::{
        Attribute, AttributeKind, FILE_UID, InMemoryRegistry, RelationKind, Schema, SchemaBuilder,
        SchemaKind, SchemaRegistry,
    };

    // === Traversal ===
    pub use crate::traverse::{
        ContainerParser, Interceptor, NodeAccess, NodeHandler, NoopVisitor, Runner, Traverse,
        TraversalPath, Visitor, VisitorContext, traverse_entity,
    };

    // === Visitors ===
    pub use crate::visitors::{
        AllowedFields, RemoveMorphRelations, RemoveNonPopulatable, RemoveNonWritable,
        RemovePassword, RemovePrivate, RemoveRestrictedRelations, RemoveUnknownAttributes,
        RestrictedFields,
    };

    // === Sanitization ===
    pub use crate::sanitize::{Query, Sanitizer, SanitizerExtension};

    // === Validation ===
    pub use crate::validate::{
        FailOnRestrictedFields, FailOnUnknownAttributes, validate_fields, validate_filters,
        validate_populate, validate_query, validate_sort,
    };

    // === Auth ===
    pub use crate::auth::{AccessVerifier, AllowAllVerifier, AuthContext, TokenScopeVerifier};

    // === Errors ===
    pub use crate::error::SiftError;

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};
    pub use uuid::Uuid;
}
