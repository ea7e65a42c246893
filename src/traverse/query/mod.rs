//! Query-shape adapters
//!
//! Four instantiations of the traversal factory, one per query syntax
//! family. Each is built once (`LazyLock`) and shares the interceptors
//! and handlers defined here where the shapes overlap.

pub mod fields;
pub mod filters;
pub mod populate;
pub mod sort;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::Value;
use tracing::debug;

use crate::error::SiftError;
use crate::schema::{AttributeKind, FILE_UID, Schema};
use crate::traverse::factory::{Interceptor, NodeAccess, NodeHandler, Runner, VisitorContext};
use crate::traverse::path::TraversalPath;

/// A fragment that no longer carries information: an empty object or an
/// empty string (a fully collapsed dotted path).
pub(crate) fn is_empty_fragment(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Recurse into each array element independently; the raw path gets an
/// index suffix. Elements that collapse to empty fragments are dropped
/// when `drop_empty` is set.
pub(crate) struct ArrayInterceptor {
    pub drop_empty: bool,
}

#[async_trait]
impl Interceptor for ArrayInterceptor {
    fn matches(&self, data: &Value) -> bool {
        data.is_array()
    }

    async fn intercept(
        &self,
        runner: &Runner<'_>,
        schema: &Arc<Schema>,
        path: &TraversalPath,
        data: Value,
    ) -> Result<Value, SiftError> {
        let Value::Array(items) = data else {
            return Ok(data);
        };
        let walks = items.into_iter().enumerate().map(|(index, item)| {
            runner.traverse(Arc::clone(schema), path.index(index), item)
        });
        let mut results = try_join_all(walks).await?;
        if self.drop_empty {
            results.retain(|value| !is_empty_fragment(value));
        }
        Ok(Value::Array(results))
    }
}

/// Split a comma-joined string, recurse per entry, and rejoin, so the
/// output keeps the comma-joined shape. Entries that collapse to empty
/// are dropped.
pub(crate) struct CommaListInterceptor;

#[async_trait]
impl Interceptor for CommaListInterceptor {
    fn matches(&self, data: &Value) -> bool {
        data.as_str().is_some_and(|s| s.contains(','))
    }

    async fn intercept(
        &self,
        runner: &Runner<'_>,
        schema: &Arc<Schema>,
        path: &TraversalPath,
        data: Value,
    ) -> Result<Value, SiftError> {
        let Value::String(joined) = data else {
            return Ok(data);
        };
        let walks = joined.split(',').map(|entry| {
            runner.traverse(
                Arc::clone(schema),
                path.clone(),
                Value::String(entry.trim().to_string()),
            )
        });
        let results = try_join_all(walks).await?;
        let kept: Vec<&str> = results
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .collect();
        Ok(Value::String(kept.join(",")))
    }
}

/// Leave values that are neither objects nor arrays untouched
pub(crate) struct PassthroughInterceptor;

#[async_trait]
impl Interceptor for PassthroughInterceptor {
    fn matches(&self, data: &Value) -> bool {
        !data.is_object() && !data.is_array()
    }

    async fn intercept(
        &self,
        _runner: &Runner<'_>,
        _schema: &Arc<Schema>,
        _path: &TraversalPath,
        data: Value,
    ) -> Result<Value, SiftError> {
        Ok(data)
    }
}

/// Target uid a query traversal may recurse into for an attribute kind.
/// Morph relations have none: they cannot be type-resolved generically
/// and are left to visitors.
pub(crate) fn recursion_target(kind: &AttributeKind) -> Option<&str> {
    match kind {
        AttributeKind::Relation { relation, target } if !relation.is_morph() => target.as_deref(),
        AttributeKind::Component { component, .. } => Some(component),
        AttributeKind::Media { .. } => Some(FILE_UID),
        AttributeKind::Scalar
        | AttributeKind::Password
        | AttributeKind::Relation { .. }
        | AttributeKind::DynamicZone { .. } => None,
    }
}

/// Resolve the target schema of a relation/component/media attribute and
/// recurse into it. With `drop_empty`, a key whose recursed value
/// collapsed to nothing is removed entirely.
pub(crate) struct ScopedRecurseHandler {
    pub drop_empty: bool,
}

#[async_trait]
impl NodeHandler for ScopedRecurseHandler {
    fn matches(&self, ctx: &VisitorContext) -> bool {
        ctx.attribute
            .as_ref()
            .and_then(|attr| recursion_target(&attr.kind))
            .is_some()
    }

    async fn handle(
        &self,
        runner: &Runner<'_>,
        ctx: &VisitorContext,
        node: &mut NodeAccess<'_>,
    ) -> Result<(), SiftError> {
        let Some(uid) = ctx
            .attribute
            .as_ref()
            .and_then(|attr| recursion_target(&attr.kind))
        else {
            return Ok(());
        };
        // Unresolvable schema: stop recursion, keep the value as-is
        let Some(nested) = runner.registry.get_model(uid) else {
            return Ok(());
        };

        let result = runner
            .traverse(nested, ctx.path.clone(), ctx.value.clone())
            .await?;

        if self.drop_empty && is_empty_fragment(&result) {
            debug!(key = %ctx.key, path = %ctx.path.display(), "dropping collapsed fragment");
            node.remove(&ctx.key);
        } else {
            node.set(&ctx.key, result);
        }
        Ok(())
    }
}
