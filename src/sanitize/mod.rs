//! Sanitization pipelines
//!
//! A [`Sanitizer`] bundles the schema registry, an optional access
//! verifier, and user-supplied extensions, and exposes one entry point per
//! surface: entity output, entity input, and the four query fragments.
//! Each pipeline is a fixed sequence of visitor passes over the matching
//! traversal; every pass consumes the previous pass's result, so the
//! pipelines are idempotent by construction.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::auth::{AccessVerifier, AuthContext};
use crate::error::SiftError;
use crate::schema::{Schema, SchemaRegistry};
use crate::traverse::query::{fields, filters, populate, sort};
use crate::traverse::{Visitor, traverse_entity};
use crate::visitors::{
    RemoveMorphRelations, RemoveNonPopulatable, RemoveNonWritable, RemovePassword, RemovePrivate,
    RemoveRestrictedRelations, RemoveUnknownAttributes,
};

// ============================================================================
// Query
// ============================================================================

/// The four sanitizable fragments of a parsed request query.
///
/// Absent fragments stay absent; sanitization never invents one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Query {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub populate: Option<Value>,
}

// ============================================================================
// Extensions
// ============================================================================

/// Custom pass appended to the input or output entity pipeline
#[async_trait]
pub trait SanitizerExtension: Send + Sync {
    async fn sanitize(&self, schema: Arc<Schema>, data: Value) -> Result<Value, SiftError>;
}

// ============================================================================
// Sanitizer
// ============================================================================

/// Schema-driven sanitizer for entities and query fragments.
///
/// Without a verifier the relation-visibility pass is skipped entirely;
/// every other pass always runs.
pub struct Sanitizer {
    registry: Arc<dyn SchemaRegistry>,
    verifier: Option<Arc<dyn AccessVerifier>>,
    input_extensions: Vec<Arc<dyn SanitizerExtension>>,
    output_extensions: Vec<Arc<dyn SanitizerExtension>>,
}

impl Sanitizer {
    pub fn new(registry: Arc<dyn SchemaRegistry>) -> Self {
        Sanitizer {
            registry,
            verifier: None,
            input_extensions: Vec::new(),
            output_extensions: Vec::new(),
        }
    }

    /// Enable relation-visibility checks through `verifier`
    pub fn with_verifier(mut self, verifier: Arc<dyn AccessVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Append a pass to the entity input pipeline
    pub fn with_input_extension(mut self, extension: Arc<dyn SanitizerExtension>) -> Self {
        self.input_extensions.push(extension);
        self
    }

    /// Append a pass to the entity output pipeline
    pub fn with_output_extension(mut self, extension: Arc<dyn SanitizerExtension>) -> Self {
        self.output_extensions.push(extension);
        self
    }

    fn restricted_relations(&self, auth: &AuthContext) -> Option<RemoveRestrictedRelations> {
        self.verifier
            .as_ref()
            .map(|verifier| RemoveRestrictedRelations::new(auth.clone(), Arc::clone(verifier)))
    }

    // ------------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------------

    /// Sanitize an entity (or list of entities) before returning it to a
    /// caller: passwords out, private fields out, unauthorized relations
    /// out, then any output extensions.
    pub async fn sanitize_output(
        &self,
        auth: &AuthContext,
        schema: Arc<Schema>,
        data: Value,
    ) -> Result<Value, SiftError> {
        debug!(schema = %schema.uid, "sanitizing output entity");
        let mut data = self
            .entity_pass(&RemovePassword, Arc::clone(&schema), data)
            .await?;
        data = self
            .entity_pass(&RemovePrivate, Arc::clone(&schema), data)
            .await?;
        if let Some(restricted) = self.restricted_relations(auth) {
            data = self
                .entity_pass(&restricted, Arc::clone(&schema), data)
                .await?;
        }
        for extension in &self.output_extensions {
            data = extension.sanitize(Arc::clone(&schema), data).await?;
        }
        Ok(data)
    }

    /// Sanitize an entity payload before writing it: unknown keys out,
    /// read-only fields out, then any input extensions.
    pub async fn sanitize_input(
        &self,
        schema: Arc<Schema>,
        data: Value,
    ) -> Result<Value, SiftError> {
        debug!(schema = %schema.uid, "sanitizing input entity");
        let mut data = self
            .entity_pass(
                &RemoveUnknownAttributes::strict(),
                Arc::clone(&schema),
                data,
            )
            .await?;
        data = self
            .entity_pass(&RemoveNonWritable, Arc::clone(&schema), data)
            .await?;
        for extension in &self.input_extensions {
            data = extension.sanitize(Arc::clone(&schema), data).await?;
        }
        Ok(data)
    }

    async fn entity_pass(
        &self,
        visitor: &dyn Visitor,
        schema: Arc<Schema>,
        data: Value,
    ) -> Result<Value, SiftError> {
        traverse_entity(visitor, self.registry.as_ref(), schema, data).await
    }

    // ------------------------------------------------------------------------
    // Query fragments
    // ------------------------------------------------------------------------

    /// Sanitize a filters fragment
    pub async fn sanitize_filters(
        &self,
        auth: &AuthContext,
        schema: Arc<Schema>,
        data: Value,
    ) -> Result<Value, SiftError> {
        let registry = self.registry.as_ref();
        let mut data = filters::traverse(
            &RemoveUnknownAttributes::keeping_operators(),
            registry,
            Arc::clone(&schema),
            data,
        )
        .await?;
        data = filters::traverse(&RemovePassword, registry, Arc::clone(&schema), data).await?;
        data = filters::traverse(&RemovePrivate, registry, Arc::clone(&schema), data).await?;
        data =
            filters::traverse(&RemoveMorphRelations, registry, Arc::clone(&schema), data).await?;
        if let Some(restricted) = self.restricted_relations(auth) {
            data = filters::traverse(&restricted, registry, schema, data).await?;
        }
        Ok(data)
    }

    /// Sanitize a sort fragment
    pub async fn sanitize_sort(
        &self,
        auth: &AuthContext,
        schema: Arc<Schema>,
        data: Value,
    ) -> Result<Value, SiftError> {
        let registry = self.registry.as_ref();
        let mut data = sort::traverse(
            &RemoveUnknownAttributes::strict(),
            registry,
            Arc::clone(&schema),
            data,
        )
        .await?;
        data = sort::traverse(&RemovePassword, registry, Arc::clone(&schema), data).await?;
        data = sort::traverse(&RemovePrivate, registry, Arc::clone(&schema), data).await?;
        data = sort::traverse(&RemoveMorphRelations, registry, Arc::clone(&schema), data).await?;
        if let Some(restricted) = self.restricted_relations(auth) {
            data = sort::traverse(&restricted, registry, schema, data).await?;
        }
        Ok(data)
    }

    /// Sanitize a fields fragment; the adapter itself keeps the selection
    /// scalar-only and reinstates `id`.
    pub async fn sanitize_fields(
        &self,
        schema: Arc<Schema>,
        data: Value,
    ) -> Result<Value, SiftError> {
        fields::traverse(&RemovePrivate, self.registry.as_ref(), schema, data).await
    }

    /// Sanitize a populate fragment
    pub async fn sanitize_populate(
        &self,
        auth: &AuthContext,
        schema: Arc<Schema>,
        data: Value,
    ) -> Result<Value, SiftError> {
        let registry = self.registry.as_ref();
        let mut data = populate::traverse(
            &RemoveUnknownAttributes::for_populate(),
            registry,
            Arc::clone(&schema),
            data,
        )
        .await?;
        data = populate::traverse(&RemoveNonPopulatable, registry, Arc::clone(&schema), data)
            .await?;
        data = populate::traverse(&RemovePrivate, registry, Arc::clone(&schema), data).await?;
        if let Some(restricted) = self.restricted_relations(auth) {
            data = populate::traverse(&restricted, registry, schema, data).await?;
        }
        Ok(data)
    }

    /// Sanitize every fragment present on `query`
    pub async fn sanitize_query(
        &self,
        auth: &AuthContext,
        schema: Arc<Schema>,
        query: Query,
    ) -> Result<Query, SiftError> {
        let filters = match query.filters {
            Some(filters) => Some(
                self.sanitize_filters(auth, Arc::clone(&schema), filters)
                    .await?,
            ),
            None => None,
        };
        let sort = match query.sort {
            Some(sort) => Some(self.sanitize_sort(auth, Arc::clone(&schema), sort).await?),
            None => None,
        };
        let fields = match query.fields {
            Some(fields) => Some(self.sanitize_fields(Arc::clone(&schema), fields).await?),
            None => None,
        };
        let populate = match query.populate {
            Some(populate) => Some(self.sanitize_populate(auth, schema, populate).await?),
            None => None,
        };
        Ok(Query {
            filters,
            sort,
            fields,
            populate,
        })
    }
}
