//! Populate adapter
//!
//! The most involved of the four shapes. A root `"*"` never populates
//! blindly: it expands into the explicit set of populatable attribute
//! names first, so field-level restriction still applies per target type.
//! Object form recognizes the deep-populate options `sort`, `filters`,
//! `fields`, `populate`, and `count` under non-attribute keys and
//! dispatches each to the matching adapter. Dynamic zones recurse once
//! per allowed component type (merging the key union) and understand the
//! per-type `on` fragment.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::SiftError;
use crate::schema::{AttributeKind, Schema, SchemaRegistry};
use crate::traverse::factory::{
    Interceptor, NoopVisitor, NodeAccess, NodeHandler, Runner, Traverse, Visitor, VisitorContext,
};
use crate::traverse::parsers::{ObjectParser, PathParser};
use crate::traverse::path::TraversalPath;

use super::{fields, filters, sort, ArrayInterceptor, CommaListInterceptor, ScopedRecurseHandler};

/// Option keys recognized under a non-attribute populate key
pub const OPTION_KEYS: [&str; 5] = ["sort", "filters", "fields", "populate", "count"];

/// Per-type populate fragment key inside dynamic zone values
pub const ON_KEY: &str = "on";

/// Expand a root `"*"` into the schema's own populatable attributes,
/// then recurse as if that explicit object had been supplied.
struct WildcardInterceptor;

#[async_trait]
impl Interceptor for WildcardInterceptor {
    fn matches(&self, data: &Value) -> bool {
        data.as_str().is_some_and(|s| s.trim() == "*")
    }

    async fn intercept(
        &self,
        runner: &Runner<'_>,
        schema: &Arc<Schema>,
        path: &TraversalPath,
        _data: Value,
    ) -> Result<Value, SiftError> {
        let mut expanded = Map::new();
        for (name, attribute) in schema.populatable_attributes() {
            if attribute.visible {
                expanded.insert(name.to_string(), Value::Object(Map::new()));
            }
        }
        debug!(schema = %schema.uid, count = expanded.len(), "expanded populate wildcard");
        runner
            .traverse(Arc::clone(schema), path.clone(), Value::Object(expanded))
            .await
    }
}

/// Dispatch deep-populate options to their own adapters against the
/// current schema scope; `count` passes through untouched.
struct OptionsHandler;

#[async_trait]
impl NodeHandler for OptionsHandler {
    fn matches(&self, ctx: &VisitorContext) -> bool {
        ctx.attribute.is_none()
            && matches!(ctx.key.as_str(), "sort" | "filters" | "fields" | "populate")
    }

    async fn handle(
        &self,
        runner: &Runner<'_>,
        ctx: &VisitorContext,
        node: &mut NodeAccess<'_>,
    ) -> Result<(), SiftError> {
        let schema = Arc::clone(&ctx.schema);
        let value = ctx.value.clone();
        // Populate-only visitors stay out of the other fragment shapes
        let visitor: &dyn Visitor = if runner.visitor.applies_to_option_fragments() {
            runner.visitor
        } else {
            &NoopVisitor
        };
        let result = match ctx.key.as_str() {
            "sort" => sort::traverse(visitor, runner.registry, schema, value).await?,
            "filters" => filters::traverse(visitor, runner.registry, schema, value).await?,
            "fields" => fields::traverse(visitor, runner.registry, schema, value).await?,
            "populate" => traverse(runner.visitor, runner.registry, schema, value).await?,
            _ => return Ok(()),
        };
        node.set(&ctx.key, result);
        Ok(())
    }
}

/// Dynamic zone populate: either a per-type `on` fragment, or a generic
/// fragment recursed once per allowed component type with the results
/// merged (union of keys).
struct DynamicZoneHandler;

#[async_trait]
impl NodeHandler for DynamicZoneHandler {
    fn matches(&self, ctx: &VisitorContext) -> bool {
        ctx.attribute
            .as_ref()
            .is_some_and(|attr| attr.kind.is_dynamic_zone())
    }

    async fn handle(
        &self,
        runner: &Runner<'_>,
        ctx: &VisitorContext,
        node: &mut NodeAccess<'_>,
    ) -> Result<(), SiftError> {
        let Some(AttributeKind::DynamicZone { components }) =
            ctx.attribute.as_ref().map(|attr| &attr.kind)
        else {
            return Ok(());
        };

        // Per-type fragment: {"on": {"blocks.quote": {...}, ...}}
        if let Some(on_fragments) = ctx.value.as_object().and_then(|map| map.get(ON_KEY)) {
            let mut sanitized = Map::new();
            if let Some(fragments) = on_fragments.as_object() {
                for (uid, fragment) in fragments {
                    if !components.iter().any(|allowed| allowed == uid) {
                        debug!(uid = %uid, key = %ctx.key, "dropping fragment for unallowed type");
                        continue;
                    }
                    let Some(nested) = runner.registry.get_model(uid) else {
                        continue;
                    };
                    let fragment_path = ctx.path.descend(ON_KEY, false).descend(uid, false);
                    let result = runner
                        .traverse(nested, fragment_path, fragment.clone())
                        .await?;
                    sanitized.insert(uid.clone(), result);
                }
            }
            let mut wrapper = Map::new();
            wrapper.insert(ON_KEY.to_string(), Value::Object(sanitized));
            node.set(&ctx.key, Value::Object(wrapper));
            return Ok(());
        }

        // Generic fragment: recurse per allowed type, merge the key union
        let mut merged = Map::new();
        let mut fallback = None;
        for uid in components {
            let Some(nested) = runner.registry.get_model(uid) else {
                continue;
            };
            let result = runner
                .traverse(nested, ctx.path.clone(), ctx.value.clone())
                .await?;
            match result {
                Value::Object(map) => merge_union(&mut merged, map),
                other => {
                    fallback.get_or_insert(other);
                }
            }
        }
        if !merged.is_empty() {
            node.set(&ctx.key, Value::Object(merged));
        } else if let Some(other) = fallback {
            node.set(&ctx.key, other);
        }
        Ok(())
    }
}

/// Key union of two fragments; nested objects merge recursively, other
/// collisions keep the later type's value (allowed-types order, so the
/// result is deterministic).
fn merge_union(into: &mut Map<String, Value>, from: Map<String, Value>) {
    for (key, value) in from {
        match (into.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_union(existing, incoming);
            }
            (_, value) => {
                into.insert(key, value);
            }
        }
    }
}

static ENGINE: LazyLock<Traverse> = LazyLock::new(|| {
    Traverse::new()
        .intercept(WildcardInterceptor)
        .intercept(CommaListInterceptor)
        .intercept(ArrayInterceptor { drop_empty: true })
        .parse(PathParser)
        .parse(ObjectParser)
        .ignore(|ctx| ctx.value.is_boolean())
        .on(OptionsHandler)
        .on(DynamicZoneHandler)
        .on(ScopedRecurseHandler { drop_empty: false })
});

/// Traverse a populate fragment with `visitor`.
///
/// Strings, arrays, objects, and booleans are valid populate values;
/// anything else is a shape error.
pub async fn traverse(
    visitor: &dyn Visitor,
    registry: &dyn SchemaRegistry,
    schema: Arc<Schema>,
    populate: Value,
) -> Result<Value, SiftError> {
    if !matches!(
        populate,
        Value::String(_) | Value::Array(_) | Value::Object(_) | Value::Bool(_)
    ) {
        return Err(SiftError::InvalidPopulate);
    }
    ENGINE
        .runner(visitor, registry)
        .traverse(schema, TraversalPath::default(), populate)
        .await
}
