//! Schema registry seam
//!
//! Traversals resolve nested types at every recursion boundary through a
//! [`SchemaRegistry`]. Resolution is synchronous and read-only; a failed
//! lookup stops recursion for that branch and keeps the value as-is.

use std::collections::HashMap;
use std::sync::Arc;

use super::Schema;

/// Resolves type identifiers to schemas.
pub trait SchemaRegistry: Send + Sync {
    /// Resolve a type uid; `None` stops recursion for the branch
    fn get_model(&self, uid: &str) -> Option<Arc<Schema>>;

    /// Injected column-name → attribute-name lookup for storage backends
    /// that persist snake_case column names. The default resolves nothing.
    fn resolve_column_alias(&self, _schema: &Schema, _column: &str) -> Option<String> {
        None
    }
}

/// Registry backed by a plain map, for tests, demos, and embedders that
/// assemble their schema graph up front.
///
/// The built-in file schema is registered automatically so media
/// attributes always resolve.
#[derive(Default)]
pub struct InMemoryRegistry {
    models: HashMap<String, Arc<Schema>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        let mut registry = InMemoryRegistry {
            models: HashMap::new(),
        };
        registry.register(Schema::file());
        registry
    }

    /// Register a schema under its own uid
    pub fn register(&mut self, schema: Schema) -> &mut Self {
        self.models.insert(schema.uid.clone(), Arc::new(schema));
        self
    }
}

impl SchemaRegistry for InMemoryRegistry {
    fn get_model(&self, uid: &str) -> Option<Arc<Schema>> {
        self.models.get(uid).cloned()
    }
}
