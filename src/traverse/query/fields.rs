//! Fields adapter
//!
//! Field selection is purely flat: nothing recurses into related types,
//! and any key whose attribute is missing or not a plain scalar is
//! stripped (passwords, relations, components, dynamic zones, and media
//! are never selectable). The literal `id` is always retained and is
//! reinstated on the way out so a selection can never lose the row
//! identity.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::SiftError;
use crate::schema::{AttributeKind, Schema, SchemaRegistry};
use crate::traverse::factory::{
    Interceptor, NodeAccess, NodeHandler, Runner, Traverse, Visitor, VisitorContext,
};
use crate::traverse::parsers::PathParser;
use crate::traverse::path::TraversalPath;

use super::{ArrayInterceptor, CommaListInterceptor};

/// `"*"` selects every scalar; it passes through untouched
struct StarInterceptor;

#[async_trait]
impl Interceptor for StarInterceptor {
    fn matches(&self, data: &Value) -> bool {
        data.as_str().is_some_and(|s| s.trim() == "*")
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

/// Strip keys that are not selectable scalars
struct ScalarOnlyHandler;

#[async_trait]
impl NodeHandler for ScalarOnlyHandler {
    fn matches(&self, _ctx: &VisitorContext) -> bool {
        true
    }

    async fn handle(
        &self,
        _runner: &Runner<'_>,
        ctx: &VisitorContext,
        node: &mut NodeAccess<'_>,
    ) -> Result<(), SiftError> {
        if ctx.key == "id" {
            return Ok(());
        }
        let selectable = matches!(
            ctx.attribute.as_ref().map(|attr| &attr.kind),
            Some(AttributeKind::Scalar)
        );
        if !selectable {
            debug!(key = %ctx.key, "stripping non-selectable field");
            node.remove(&ctx.key);
        }
        Ok(())
    }
}

static ENGINE: LazyLock<Traverse> = LazyLock::new(|| {
    Traverse::new()
        .intercept(StarInterceptor)
        .intercept(CommaListInterceptor)
        .intercept(ArrayInterceptor { drop_empty: true })
        .parse(PathParser)
        .on(ScalarOnlyHandler)
});

fn is_string_array(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|items| items.iter().all(Value::is_string))
}

/// Make sure `id` is part of the selection, preserving the input shape
fn ensure_id(fields: Value) -> Value {
    match fields {
        Value::Array(mut items) => {
            if !items.iter().any(|v| v.as_str() == Some("id")) {
                items.insert(0, Value::String("id".to_string()));
            }
            Value::Array(items)
        }
        Value::String(s) if s != "*" => {
            if s.is_empty() {
                Value::String("id".to_string())
            } else if s.split(',').any(|token| token.trim() == "id") {
                Value::String(s)
            } else {
                Value::String(format!("id,{s}"))
            }
        }
        other => other,
    }
}

/// Traverse a fields fragment with `visitor`.
///
/// Only strings and arrays of strings are valid field selections.
pub async fn traverse(
    visitor: &dyn Visitor,
    registry: &dyn SchemaRegistry,
    schema: Arc<Schema>,
    fields: Value,
) -> Result<Value, SiftError> {
    if !matches!(fields, Value::String(_)) && !is_string_array(&fields) {
        return Err(SiftError::InvalidFields);
    }
    let out = ENGINE
        .runner(visitor, registry)
        .traverse(schema, TraversalPath::default(), fields)
        .await?;
    Ok(ensure_id(out))
}
