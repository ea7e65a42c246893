//! Recursive walker over concrete data records
//!
//! Unlike the query adapters this walker is not pluggable: it understands
//! plain nested records and arrays only. Every key is visited; for keys
//! that resolve to a schema attribute, recursion then follows the
//! attribute kind into a fresh schema scope, including true per-entry
//! polymorphic resolution for morph relations (`__type`) and dynamic
//! zones (`__component`).

use std::sync::Arc;

use futures::future::{BoxFuture, try_join_all};
use serde_json::Value;
use tracing::trace;

use crate::error::SiftError;
use crate::schema::{AttributeKind, FILE_UID, Schema, SchemaRegistry};

use super::factory::{ContainerParser, NodeAccess, Visitor, VisitorContext, resolve_attribute};
use super::parsers::ObjectParser;
use super::path::TraversalPath;

/// Discriminator field naming the concrete type of a morph relation entry
pub const TYPE_FIELD: &str = "__type";

/// Discriminator field naming the component type of a dynamic zone entry
pub const COMPONENT_FIELD: &str = "__component";

/// Walk an entity (or list of entities) conforming to `schema`, applying
/// `visitor` at every attribute node.
pub async fn traverse_entity(
    visitor: &dyn Visitor,
    registry: &dyn SchemaRegistry,
    schema: Arc<Schema>,
    data: Value,
) -> Result<Value, SiftError> {
    walk(visitor, registry, schema, TraversalPath::default(), data).await
}

fn walk<'a>(
    visitor: &'a dyn Visitor,
    registry: &'a dyn SchemaRegistry,
    schema: Arc<Schema>,
    path: TraversalPath,
    data: Value,
) -> BoxFuture<'a, Result<Value, SiftError>> {
    Box::pin(async move {
        match data {
            Value::Array(items) => {
                let walks = items.into_iter().enumerate().map(|(index, item)| {
                    walk(visitor, registry, Arc::clone(&schema), path.index(index), item)
                });
                Ok(Value::Array(try_join_all(walks).await?))
            }
            Value::Object(_) => walk_record(visitor, registry, schema, path, data).await,
            other => Ok(other),
        }
    })
}

async fn walk_record(
    visitor: &dyn Visitor,
    registry: &dyn SchemaRegistry,
    schema: Arc<Schema>,
    path: TraversalPath,
    data: Value,
) -> Result<Value, SiftError> {
    let parser = ObjectParser;
    let mut out = data;

    let keys: Vec<String> = out
        .as_object()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default();

    for key in keys {
        let attribute = resolve_attribute(registry, &schema, &key);
        let node_path = path.descend(&key, attribute.is_some());
        trace!(key = %key, path = %node_path.display(), "visiting entity node");

        let Some(value) = parser.get(&key, &out) else {
            continue;
        };
        let ctx = VisitorContext {
            key: key.clone(),
            value,
            attribute: attribute.clone(),
            schema: Arc::clone(&schema),
            path: node_path.clone(),
        };

        {
            let mut node = NodeAccess::new(&parser, &mut out);
            visitor.visit(&ctx, &mut node).await?;
        }

        // Recursion needs an attribute descriptor; unknown keys are the
        // visitor's call and are otherwise left untouched
        let Some(attribute) = attribute else {
            continue;
        };

        // Removed during visitation: never recurse
        let Some(value) = parser.get(&key, &out) else {
            continue;
        };

        let recursed = match &attribute.kind {
            AttributeKind::Scalar | AttributeKind::Password => None,
            AttributeKind::Relation { relation, target } => {
                if relation.is_morph() {
                    Some(walk_morph(visitor, registry, node_path.clone(), value).await?)
                } else {
                    match target.as_deref().and_then(|uid| registry.get_model(uid)) {
                        Some(nested) => {
                            Some(walk(visitor, registry, nested, node_path.clone(), value).await?)
                        }
                        // Unresolvable target: stop recursion, keep value
                        None => None,
                    }
                }
            }
            AttributeKind::Component { component, .. } => match registry.get_model(component) {
                Some(nested) => {
                    Some(walk(visitor, registry, nested, node_path.clone(), value).await?)
                }
                None => None,
            },
            AttributeKind::DynamicZone { components } => Some(
                walk_dynamic_zone(visitor, registry, components, node_path.clone(), value).await?,
            ),
            AttributeKind::Media { .. } => match registry.get_model(FILE_UID) {
                Some(nested) => {
                    Some(walk(visitor, registry, nested, node_path.clone(), value).await?)
                }
                None => None,
            },
        };

        if let Some(recursed) = recursed {
            let mut node = NodeAccess::new(&parser, &mut out);
            node.set(&key, recursed);
        }
    }

    Ok(out)
}

/// Per-entry type resolution through the `__type` discriminator; entries
/// with no resolvable type are kept un-recursed.
fn walk_morph<'a>(
    visitor: &'a dyn Visitor,
    registry: &'a dyn SchemaRegistry,
    path: TraversalPath,
    value: Value,
) -> BoxFuture<'a, Result<Value, SiftError>> {
    Box::pin(async move {
        match value {
            Value::Array(items) => {
                let walks = items
                    .into_iter()
                    .enumerate()
                    .map(|(index, item)| walk_morph(visitor, registry, path.index(index), item));
                Ok(Value::Array(try_join_all(walks).await?))
            }
            Value::Object(ref map) => {
                let nested = map
                    .get(TYPE_FIELD)
                    .and_then(Value::as_str)
                    .and_then(|uid| registry.get_model(uid));
                match nested {
                    Some(nested) => walk(visitor, registry, nested, path, value).await,
                    None => Ok(value),
                }
            }
            other => Ok(other),
        }
    })
}

/// Per-entry component resolution through the `__component` discriminator;
/// entries of unknown or unallowed type are kept un-recursed.
async fn walk_dynamic_zone(
    visitor: &dyn Visitor,
    registry: &dyn SchemaRegistry,
    allowed: &[String],
    path: TraversalPath,
    value: Value,
) -> Result<Value, SiftError> {
    let Value::Array(items) = value else {
        return Ok(value);
    };

    let walks = items.into_iter().enumerate().map(|(index, item)| {
        let entry_path = path.index(index);
        async move {
            let nested = item
                .as_object()
                .and_then(|map| map.get(COMPONENT_FIELD))
                .and_then(Value::as_str)
                .filter(|uid| allowed.iter().any(|allowed_uid| allowed_uid == uid))
                .and_then(|uid| registry.get_model(uid));
            match nested {
                Some(nested) => walk(visitor, registry, nested, entry_path, item).await,
                None => Ok(item),
            }
        }
    });

    Ok(Value::Array(try_join_all(walks).await?))
}
