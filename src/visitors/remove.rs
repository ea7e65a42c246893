//! Removal visitors
//!
//! Small stateless visitors that drop a node when its attribute matches a
//! security or correctness rule. Removal is always local to the node; the
//! rest of the traversal continues.

use async_trait::async_trait;
use tracing::debug;

use crate::error::SiftError;
use crate::schema::AttributeKind;
use crate::traverse::factory::{NodeAccess, Visitor, VisitorContext};
use crate::traverse::entity::{COMPONENT_FIELD, TYPE_FIELD};
use crate::traverse::is_operator;
use crate::traverse::query::populate::{ON_KEY, OPTION_KEYS};

/// Removes any key whose attribute kind is password
pub struct RemovePassword;

#[async_trait]
impl Visitor for RemovePassword {
    async fn visit(
        &self,
        ctx: &VisitorContext,
        node: &mut NodeAccess<'_>,
    ) -> Result<(), SiftError> {
        if matches!(
            ctx.attribute.as_ref().map(|attr| &attr.kind),
            Some(AttributeKind::Password)
        ) {
            debug!(key = %ctx.key, path = %ctx.path.display(), "removing password field");
            node.remove(&ctx.key);
        }
        Ok(())
    }
}

/// Removes any key whose attribute is private, either by its own flag or
/// through a schema-level override
pub struct RemovePrivate;

#[async_trait]
impl Visitor for RemovePrivate {
    async fn visit(
        &self,
        ctx: &VisitorContext,
        node: &mut NodeAccess<'_>,
    ) -> Result<(), SiftError> {
        if let Some(attribute) = &ctx.attribute {
            if ctx.schema.is_private(&ctx.key, attribute) {
                debug!(key = %ctx.key, path = %ctx.path.display(), "removing private field");
                node.remove(&ctx.key);
            }
        }
        Ok(())
    }
}

/// Removes polymorphic relation keys from query fragments; their target
/// type cannot be resolved generically, so querying through them is
/// never allowed.
pub struct RemoveMorphRelations;

#[async_trait]
impl Visitor for RemoveMorphRelations {
    async fn visit(
        &self,
        ctx: &VisitorContext,
        node: &mut NodeAccess<'_>,
    ) -> Result<(), SiftError> {
        if ctx
            .attribute
            .as_ref()
            .is_some_and(|attr| attr.kind.is_morph_relation())
        {
            debug!(key = %ctx.key, "removing morph relation from query");
            node.remove(&ctx.key);
        }
        Ok(())
    }
}

/// Removes keys that resolve to no attribute descriptor.
///
/// The literal `id` and the polymorphic discriminators always survive,
/// and the constructors decide which non-attribute keys are structural
/// and must be kept (query operators, deep-populate option keys).
pub struct RemoveUnknownAttributes {
    keep_operators: bool,
    keep_keys: Vec<&'static str>,
}

impl RemoveUnknownAttributes {
    /// Keep only attributes and `id`
    pub fn strict() -> Self {
        RemoveUnknownAttributes {
            keep_operators: false,
            keep_keys: Vec::new(),
        }
    }

    /// Additionally keep `$`-prefixed operator keys (filters)
    pub fn keeping_operators() -> Self {
        RemoveUnknownAttributes {
            keep_operators: true,
            keep_keys: Vec::new(),
        }
    }

    /// Additionally keep operators and deep-populate option keys
    pub fn for_populate() -> Self {
        let mut keep_keys: Vec<&'static str> = OPTION_KEYS.to_vec();
        keep_keys.push(ON_KEY);
        RemoveUnknownAttributes {
            keep_operators: true,
            keep_keys,
        }
    }
}

#[async_trait]
impl Visitor for RemoveUnknownAttributes {
    async fn visit(
        &self,
        ctx: &VisitorContext,
        node: &mut NodeAccess<'_>,
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
        debug!(key = %ctx.key, path = %ctx.path.display(), "removing unknown attribute");
        node.remove(&ctx.key);
        Ok(())
    }
}

/// Input-side visitor removing attributes not accepted on write
pub struct RemoveNonWritable;

#[async_trait]
impl Visitor for RemoveNonWritable {
    async fn visit(
        &self,
        ctx: &VisitorContext,
        node: &mut NodeAccess<'_>,
    ) -> Result<(), SiftError> {
        if ctx.attribute.as_ref().is_some_and(|attr| !attr.writable) {
            debug!(key = %ctx.key, "removing read-only field from input");
            node.remove(&ctx.key);
        }
        Ok(())
    }
}

/// Removes attributes that cannot appear in a populate clause (scalars,
/// passwords)
pub struct RemoveNonPopulatable;

#[async_trait]
impl Visitor for RemoveNonPopulatable {
    async fn visit(
        &self,
        ctx: &VisitorContext,
        node: &mut NodeAccess<'_>,
    ) -> Result<(), SiftError> {
        if ctx
            .attribute
            .as_ref()
            .is_some_and(|attr| !attr.kind.is_populatable())
        {
            debug!(key = %ctx.key, "removing non-populatable attribute");
            node.remove(&ctx.key);
        }
        Ok(())
    }

    // Scalars are legitimate inside dispatched sort/filters/fields
    fn applies_to_option_fragments(&self) -> bool {
        false
    }
}
