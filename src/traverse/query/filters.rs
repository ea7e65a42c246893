//! Filters adapter
//!
//! Arrays are recursed per element (dropping clauses that collapse to
//! empty objects), non-object leaves pass through unchanged, and keys
//! with no attribute descriptor are treated as logical/comparison
//! operators whose values are themselves filter fragments against the
//! same schema scope.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SiftError;
use crate::schema::{AttributeKind, Schema, SchemaRegistry};
use crate::traverse::factory::{NodeAccess, NodeHandler, Runner, Traverse, Visitor, VisitorContext};
use crate::traverse::parsers::ObjectParser;
use crate::traverse::path::TraversalPath;

use super::{ArrayInterceptor, PassthroughInterceptor, ScopedRecurseHandler};

/// Keys with no attribute descriptor are operators; their values are
/// filter fragments recursed against the same schema.
struct OperatorHandler;

#[async_trait]
impl NodeHandler for OperatorHandler {
    fn matches(&self, ctx: &VisitorContext) -> bool {
        ctx.attribute.is_none()
    }

    async fn handle(
        &self,
        runner: &Runner<'_>,
        ctx: &VisitorContext,
        node: &mut NodeAccess<'_>,
    ) -> Result<(), SiftError> {
        let result = runner
            .traverse(Arc::clone(&ctx.schema), ctx.path.clone(), ctx.value.clone())
            .await?;
        node.set(&ctx.key, result);
        Ok(())
    }
}

static ENGINE: LazyLock<Traverse> = LazyLock::new(|| {
    Traverse::new()
        .intercept(ArrayInterceptor { drop_empty: true })
        .intercept(PassthroughInterceptor)
        .parse(ObjectParser)
        .ignore(|ctx| {
            matches!(
                ctx.attribute.as_ref().map(|attr| &attr.kind),
                Some(AttributeKind::Password)
            )
        })
        .on(OperatorHandler)
        .on(ScopedRecurseHandler { drop_empty: true })
});

/// Traverse a filters fragment with `visitor`.
///
/// Unsupported shapes (numbers, booleans) pass through unchanged; the
/// defensive default for filters is to ignore rather than reject.
pub async fn traverse(
    visitor: &dyn Visitor,
    registry: &dyn SchemaRegistry,
    schema: Arc<Schema>,
    filters: Value,
) -> Result<Value, SiftError> {
    ENGINE
        .runner(visitor, registry)
        .traverse(schema, TraversalPath::default(), filters)
        .await
}
