//! Sort adapter
//!
//! Three encodings are semantically equivalent and each keeps its shape
//! through sanitization: a dotted string with an optional `:asc`/`:desc`
//! suffix, a comma-joined list of such strings, and a nested object form.
//! Entries that collapse to nothing (their whole sort key was dropped)
//! are filtered out.

use std::sync::{Arc, LazyLock};

use serde_json::Value;

use crate::error::SiftError;
use crate::schema::{Schema, SchemaRegistry};
use crate::traverse::factory::{Traverse, Visitor};
use crate::traverse::parsers::{ObjectParser, SortPathParser};
use crate::traverse::path::TraversalPath;

use super::{ArrayInterceptor, CommaListInterceptor, ScopedRecurseHandler};

static ENGINE: LazyLock<Traverse> = LazyLock::new(|| {
    Traverse::new()
        .intercept(CommaListInterceptor)
        .intercept(ArrayInterceptor { drop_empty: true })
        .parse(SortPathParser)
        .parse(ObjectParser)
        .on(ScopedRecurseHandler { drop_empty: true })
});

/// Traverse a sort fragment with `visitor`.
///
/// Anything other than a string, array, or object is a shape error.
pub async fn traverse(
    visitor: &dyn Visitor,
    registry: &dyn SchemaRegistry,
    schema: Arc<Schema>,
    sort: Value,
) -> Result<Value, SiftError> {
    if !matches!(sort, Value::String(_) | Value::Array(_) | Value::Object(_)) {
        return Err(SiftError::InvalidSort);
    }
    ENGINE
        .runner(visitor, registry)
        .traverse(schema, TraversalPath::default(), sort)
        .await
}
