//! Generic recursive traversal engine
//!
//! A [`Traverse`] is assembled once per query shape from ordered lists of
//! interceptors, container parsers, ignore rules, and node handlers, then
//! reused for every call. Running it pairs the engine with the per-call
//! state (visitor, schema registry) in a [`Runner`].
//!
//! Mutation goes through an explicit accumulator: the walk owns a cloned
//! `Value` and hands visitors a [`NodeAccess`] capability scoped to it, so
//! a key removed during visitation is simply absent when the recursion
//! phase re-reads it.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::trace;

use crate::error::SiftError;
use crate::schema::{Attribute, Schema, SchemaRegistry};

use super::path::TraversalPath;

/// Per-node record handed to visitors and handlers.
///
/// Constructed fresh for every key; `value` is re-read from the
/// accumulator after each mutation phase.
pub struct VisitorContext {
    pub key: String,
    pub value: Value,
    pub attribute: Option<Attribute>,
    pub schema: Arc<Schema>,
    pub path: TraversalPath,
}

/// The only sanctioned way to alter the node being visited
pub struct NodeAccess<'a> {
    parser: &'a dyn ContainerParser,
    data: &'a mut Value,
}

impl<'a> NodeAccess<'a> {
    pub(crate) fn new(parser: &'a dyn ContainerParser, data: &'a mut Value) -> Self {
        NodeAccess { parser, data }
    }

    /// Remove a key; it becomes invisible to the recursion phase
    pub fn remove(&mut self, key: &str) {
        self.parser.remove(key, self.data);
    }

    /// Replace the value under a key
    pub fn set(&mut self, key: &str, value: Value) {
        self.parser.set(key, value, self.data);
    }

    /// Read the current value under a key
    pub fn get(&self, key: &str) -> Option<Value> {
        self.parser.get(key, self.data)
    }
}

/// Node-level function applied at every traversed node
#[async_trait]
pub trait Visitor: Send + Sync {
    async fn visit(
        &self,
        ctx: &VisitorContext,
        node: &mut NodeAccess<'_>,
    ) -> Result<(), SiftError>;

    /// Whether this visitor also runs inside `sort`, `filters`, and
    /// `fields` fragments dispatched out of a populate traversal.
    /// Populate-only rules override this to `false`.
    fn applies_to_option_fragments(&self) -> bool {
        true
    }
}

/// Visitor that touches nothing
pub struct NoopVisitor;

#[async_trait]
impl Visitor for NoopVisitor {
    async fn visit(
        &self,
        _ctx: &VisitorContext,
        _node: &mut NodeAccess<'_>,
    ) -> Result<(), SiftError> {
        Ok(())
    }
}

/// Takes over processing of a whole value before the per-key loop.
///
/// First registered match wins; the interceptor may call back into the
/// runner to recurse.
#[async_trait]
pub trait Interceptor: Send + Sync {
    fn matches(&self, data: &Value) -> bool;

    async fn intercept(
        &self,
        runner: &Runner<'_>,
        schema: &Arc<Schema>,
        path: &TraversalPath,
        data: Value,
    ) -> Result<Value, SiftError>;
}

/// Structural operations that let one runtime shape (object, dotted
/// string) be walked as a keyed container.
pub trait ContainerParser: Send + Sync {
    fn matches(&self, data: &Value) -> bool;

    /// Defensive normalization before the key loop
    fn transform(&self, data: Value) -> Value {
        data
    }

    fn keys(&self, data: &Value) -> Vec<String>;
    fn get(&self, key: &str, data: &Value) -> Option<Value>;
    fn set(&self, key: &str, value: Value, data: &mut Value);
    fn remove(&self, key: &str, data: &mut Value);
}

/// Post-visit handler, usually keyed on the attribute kind; may recurse
/// into a nested schema scope through the runner and `set` the result.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    fn matches(&self, ctx: &VisitorContext) -> bool;

    async fn handle(
        &self,
        runner: &Runner<'_>,
        ctx: &VisitorContext,
        node: &mut NodeAccess<'_>,
    ) -> Result<(), SiftError>;
}

type IgnoreFn = Box<dyn Fn(&VisitorContext) -> bool + Send + Sync>;

/// A configured traversal engine; build once, run many times
#[derive(Default)]
pub struct Traverse {
    interceptors: Vec<Box<dyn Interceptor>>,
    parsers: Vec<Box<dyn ContainerParser>>,
    ignores: Vec<IgnoreFn>,
    handlers: Vec<Box<dyn NodeHandler>>,
}

impl Traverse {
    pub fn new() -> Self {
        Traverse::default()
    }

    /// Register an interceptor; checked in registration order
    pub fn intercept(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Box::new(interceptor));
        self
    }

    /// Register a container parser; first matching parser is used
    pub fn parse(mut self, parser: impl ContainerParser + 'static) -> Self {
        self.parsers.push(Box::new(parser));
        self
    }

    /// Register a post-visit rule that suppresses recursion for a node
    pub fn ignore(
        mut self,
        predicate: impl Fn(&VisitorContext) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.ignores.push(Box::new(predicate));
        self
    }

    /// Register a post-visit handler; evaluated in registration order
    pub fn on(mut self, handler: impl NodeHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Pair the engine with per-call state
    pub fn runner<'a>(
        &'a self,
        visitor: &'a dyn Visitor,
        registry: &'a dyn SchemaRegistry,
    ) -> Runner<'a> {
        Runner {
            engine: self,
            visitor,
            registry,
        }
    }
}

/// One logical traversal: engine plus the visitor and registry it runs
/// against. Cheap to construct per call.
pub struct Runner<'a> {
    pub(crate) engine: &'a Traverse,
    pub(crate) visitor: &'a dyn Visitor,
    pub(crate) registry: &'a dyn SchemaRegistry,
}

impl Runner<'_> {
    /// Walk `data` under `schema`, returning the mutated accumulator.
    ///
    /// Sibling keys and handlers run strictly sequentially so mutation
    /// ordering stays deterministic.
    pub fn traverse(
        &self,
        schema: Arc<Schema>,
        path: TraversalPath,
        data: Value,
    ) -> BoxFuture<'_, Result<Value, SiftError>> {
        Box::pin(async move {
            for interceptor in &self.engine.interceptors {
                if interceptor.matches(&data) {
                    return interceptor.intercept(self, &schema, &path, data).await;
                }
            }

            // Terminal case: scalars, null, anything no parser understands
            let Some(parser) = self
                .engine
                .parsers
                .iter()
                .find(|p| p.matches(&data))
                .map(|p| p.as_ref())
            else {
                return Ok(data);
            };

            let mut out = parser.transform(data);

            for key in parser.keys(&out) {
                let attribute = resolve_attribute(self.registry, &schema, &key);
                let node_path = path.descend(&key, attribute.is_some());
                trace!(key = %key, path = %node_path.display(), "visiting node");

                let Some(value) = parser.get(&key, &out) else {
                    continue;
                };
                let mut ctx = VisitorContext {
                    key: key.clone(),
                    value,
                    attribute,
                    schema: Arc::clone(&schema),
                    path: node_path,
                };

                {
                    let mut node = NodeAccess::new(parser, &mut out);
                    self.visitor.visit(&ctx, &mut node).await?;
                }

                // Removed during visitation: never recurse
                let Some(value) = parser.get(&key, &out) else {
                    continue;
                };
                ctx.value = value;

                if self.engine.ignores.iter().any(|ignored| ignored(&ctx)) {
                    continue;
                }

                for handler in &self.engine.handlers {
                    // Earlier handlers may have mutated or removed the key
                    let Some(value) = parser.get(&key, &out) else {
                        break;
                    };
                    ctx.value = value;

                    if handler.matches(&ctx) {
                        let mut node = NodeAccess::new(parser, &mut out);
                        handler.handle(self, &ctx, &mut node).await?;
                    }
                }
            }

            Ok(out)
        })
    }
}

/// Attribute lookup with the injected column-alias fallback
pub(crate) fn resolve_attribute(
    registry: &dyn SchemaRegistry,
    schema: &Schema,
    key: &str,
) -> Option<Attribute> {
    if let Some(attribute) = schema.attribute(key) {
        return Some(attribute.clone());
    }
    registry
        .resolve_column_alias(schema, key)
        .and_then(|name| schema.attribute(&name).cloned())
}
