//! Relation visibility enforcement
//!
//! Removes relation keys the caller is not authorized to see. The scope
//! to verify is derived from the relation's target type and cardinality;
//! the first verified candidate short-circuits the check, and a verifier
//! rejection is a denial, never an error.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::auth::{AccessVerifier, AuthContext};
use crate::error::SiftError;
use crate::schema::AttributeKind;
use crate::traverse::factory::{NodeAccess, Visitor, VisitorContext};

/// Removes relation keys whose target the auth context may not read
pub struct RemoveRestrictedRelations {
    auth: AuthContext,
    verifier: Arc<dyn AccessVerifier>,
}

impl RemoveRestrictedRelations {
    pub fn new(auth: AuthContext, verifier: Arc<dyn AccessVerifier>) -> Self {
        RemoveRestrictedRelations { auth, verifier }
    }

    /// Candidate scopes for a relation attribute; empty for anything that
    /// is not a fixed-target relation (morph relations are a visitor
    /// concern elsewhere, they carry no scopes to check).
    fn candidate_scopes(kind: &AttributeKind) -> Vec<String> {
        match kind {
            AttributeKind::Relation {
                relation,
                target: Some(target),
            } if !relation.is_morph() => {
                if relation.is_to_many() {
                    vec![format!("{target}.find")]
                } else {
                    vec![format!("{target}.findOne")]
                }
            }
            _ => Vec::new(),
        }
    }
}

#[async_trait]
impl Visitor for RemoveRestrictedRelations {
    async fn visit(
        &self,
        ctx: &VisitorContext,
        node: &mut NodeAccess<'_>,
    ) -> Result<(), SiftError> {
        let Some(attribute) = &ctx.attribute else {
            return Ok(());
        };
        let scopes = Self::candidate_scopes(&attribute.kind);
        if scopes.is_empty() {
            return Ok(());
        }

        for scope in &scopes {
            // First verified scope wins
            if self.verifier.verify(&self.auth, scope).await.is_ok() {
                return Ok(());
            }
        }

        debug!(key = %ctx.key, path = %ctx.path.display(), "removing restricted relation");
        node.remove(&ctx.key);
        Ok(())
    }
}
