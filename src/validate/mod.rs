//! Strict query validation
//!
//! The sanitizers drop offending nodes silently; these entry points run
//! the same traversals with failing visitors instead, so the first
//! unknown or restricted path aborts the call with a typed error naming
//! it. The traversal output is discarded, only the verdict matters.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SiftError;
use crate::sanitize::Query;
use crate::schema::{AttributeKind, Schema, SchemaRegistry};
use crate::traverse::entity::{COMPONENT_FIELD, TYPE_FIELD};
use crate::traverse::factory::{NodeAccess, Visitor, VisitorContext};
use crate::traverse::is_operator;
use crate::traverse::query::populate::{ON_KEY, OPTION_KEYS};
use crate::traverse::query::{fields, filters, populate, sort};

/// Fails on any key that resolves to no attribute descriptor.
///
/// Mirrors the keep rules of the sanitizing counterpart: `id` always
/// passes, and the constructors decide which structural keys do.
pub struct FailOnUnknownAttributes {
    keep_operators: bool,
    keep_keys: Vec<&'static str>,
}

impl FailOnUnknownAttributes {
    pub fn strict() -> Self {
        FailOnUnknownAttributes {
            keep_operators: false,
            keep_keys: Vec::new(),
        }
    }

    pub fn keeping_operators() -> Self {
        FailOnUnknownAttributes {
            keep_operators: true,
            keep_keys: Vec::new(),
        }
    }

    pub fn for_populate() -> Self {
        let mut keep_keys: Vec<&'static str> = OPTION_KEYS.to_vec();
        keep_keys.push(ON_KEY);
        FailOnUnknownAttributes {
            keep_operators: true,
            keep_keys,
        }
    }
}

#[async_trait]
impl Visitor for FailOnUnknownAttributes {
    async fn visit(
        &self,
        ctx: &VisitorContext,
        _node: &mut NodeAccess<'_>,
    ) -> Result<(), SiftError> {
        if ctx.attribute.is_some() || ctx.key == "id" {
            return Ok(());
        }
        if ctx.key == TYPE_FIELD || ctx.key == COMPONENT_FIELD {
            return Ok(());
        }
        if self.keep_operators && is_operator(&ctx.key) {
            return Ok(());
        }
        if self.keep_keys.contains(&ctx.key.as_str()) {
            return Ok(());
        }
        Err(SiftError::UnrecognizedField {
            path: ctx.path.display().to_string(),
        })
    }
}

/// Fails on password and private fields instead of dropping them
pub struct FailOnRestrictedFields;

#[async_trait]
impl Visitor for FailOnRestrictedFields {
    async fn visit(
        &self,
        ctx: &VisitorContext,
        _node: &mut NodeAccess<'_>,
    ) -> Result<(), SiftError> {
        let Some(attribute) = &ctx.attribute else {
            return Ok(());
        };
        let restricted = matches!(attribute.kind, AttributeKind::Password)
            || ctx.schema.is_private(&ctx.key, attribute);
        if restricted {
            return Err(SiftError::RestrictedField {
                path: ctx.path.display().to_string(),
            });
        }
        Ok(())
    }
}

/// Validate a filters fragment against `schema`
pub async fn validate_filters(
    registry: &dyn SchemaRegistry,
    schema: Arc<Schema>,
    data: &serde_json::Value,
) -> Result<(), SiftError> {
    filters::traverse(
        &FailOnUnknownAttributes::keeping_operators(),
        registry,
        Arc::clone(&schema),
        data.clone(),
    )
    .await?;
    filters::traverse(&FailOnRestrictedFields, registry, schema, data.clone()).await?;
    Ok(())
}

/// Validate a sort fragment against `schema`
pub async fn validate_sort(
    registry: &dyn SchemaRegistry,
    schema: Arc<Schema>,
    data: &serde_json::Value,
) -> Result<(), SiftError> {
    sort::traverse(
        &FailOnUnknownAttributes::strict(),
        registry,
        Arc::clone(&schema),
        data.clone(),
    )
    .await?;
    sort::traverse(&FailOnRestrictedFields, registry, schema, data.clone()).await?;
    Ok(())
}

/// Validate a fields fragment against `schema`
pub async fn validate_fields(
    registry: &dyn SchemaRegistry,
    schema: Arc<Schema>,
    data: &serde_json::Value,
) -> Result<(), SiftError> {
    fields::traverse(
        &FailOnUnknownAttributes::strict(),
        registry,
        Arc::clone(&schema),
        data.clone(),
    )
    .await?;
    fields::traverse(&FailOnRestrictedFields, registry, schema, data.clone()).await?;
    Ok(())
}

/// Validate a populate fragment against `schema`
pub async fn validate_populate(
    registry: &dyn SchemaRegistry,
    schema: Arc<Schema>,
    data: &serde_json::Value,
) -> Result<(), SiftError> {
    populate::traverse(
        &FailOnUnknownAttributes::for_populate(),
        registry,
        Arc::clone(&schema),
        data.clone(),
    )
    .await?;
    populate::traverse(&FailOnRestrictedFields, registry, schema, data.clone()).await?;
    Ok(())
}

/// Validate every fragment present on `query`
pub async fn validate_query(
    registry: &dyn SchemaRegistry,
    schema: Arc<Schema>,
    query: &Query,
) -> Result<(), SiftError> {
    if let Some(filters) = &query.filters {
        validate_filters(registry, Arc::clone(&schema), filters).await?;
    }
    if let Some(sort) = &query.sort {
        validate_sort(registry, Arc::clone(&schema), sort).await?;
    }
    if let Some(fields) = &query.fields {
        validate_fields(registry, Arc::clone(&schema), fields).await?;
    }
    if let Some(populate) = &query.populate {
        validate_populate(registry, schema, populate).await?;
    }
    Ok(())
}
