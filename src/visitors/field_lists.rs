//! Path-based allow-list / deny-list filtering
//!
//! Matching works on the attribute path, so query operators never break a
//! rule. Under an allow-list a field survives when it is listed, when a
//! listed entry is an ancestor of it (listing an ancestor keeps the whole
//! subtree), or when it is an ancestor of a listed entry (descent towards
//! a listed leaf must stay possible).

use async_trait::async_trait;
use tracing::debug;

use crate::error::SiftError;
use crate::traverse::factory::{NodeAccess, Visitor, VisitorContext};

fn is_ancestor(ancestor: &str, path: &str) -> bool {
    path.strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with('.'))
}

/// Keeps only fields reachable through an allow-list; `None` allows all
pub struct AllowedFields {
    fields: Option<Vec<String>>,
}

impl AllowedFields {
    pub fn new(fields: Option<Vec<String>>) -> Self {
        AllowedFields { fields }
    }
}

#[async_trait]
impl Visitor for AllowedFields {
    async fn visit(
        &self,
        ctx: &VisitorContext,
        node: &mut NodeAccess<'_>,
    ) -> Result<(), SiftError> {
        let Some(allowed) = &self.fields else {
            return Ok(());
        };
        // Operator keys carry no attribute path and are untouched
        if ctx.attribute.is_none() {
            return Ok(());
        }
        let Some(path) = ctx.path.attribute.as_deref() else {
            return Ok(());
        };

        let reachable = allowed.iter().any(|entry| {
            entry == path || is_ancestor(entry, path) || is_ancestor(path, entry)
        });
        if !reachable {
            debug!(path = %path, "field not in allow-list");
            node.remove(&ctx.key);
        }
        Ok(())
    }
}

/// Removes fields listed on a deny-list, including their subtrees;
/// `None` denies nothing
pub struct RestrictedFields {
    fields: Option<Vec<String>>,
}

impl RestrictedFields {
    pub fn new(fields: Option<Vec<String>>) -> Self {
        RestrictedFields { fields }
    }
}

#[async_trait]
impl Visitor for RestrictedFields {
    async fn visit(
        &self,
        ctx: &VisitorContext,
        node: &mut NodeAccess<'_>,
    ) -> Result<(), SiftError> {
        let Some(restricted) = &self.fields else {
            return Ok(());
        };
        if ctx.attribute.is_none() {
            return Ok(());
        }
        let Some(path) = ctx.path.attribute.as_deref() else {
            return Ok(());
        };

        let denied = restricted
            .iter()
            .any(|entry| entry == path || is_ancestor(entry, path));
        if denied {
            debug!(path = %path, "field in deny-list");
            node.remove(&ctx.key);
        }
        Ok(())
    }
}
