//! Authorization context and the relation-visibility seam
//!
//! The engine never decides authorization itself: visitors derive a scope
//! string (e.g. `"api::author.findOne"`) and ask an [`AccessVerifier`]
//! whether the current [`AuthContext`] may use it. A rejection means "not
//! authorized" and results in the field being dropped, never in an error
//! propagating out of a traversal.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Authorization context a request was made under.
#[derive(Debug, Clone)]
pub enum AuthContext {
    /// Authenticated end user
    User { user_id: Uuid, roles: Vec<String> },

    /// API token with an explicit scope list
    ApiToken { name: String, scopes: Vec<String> },

    /// No authentication (public access)
    Anonymous,
}

impl AuthContext {
    /// Check if the context carries any credentials
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, AuthContext::Anonymous)
    }

    /// Get user_id if the context is a user
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            AuthContext::User { user_id, .. } => Some(*user_id),
            _ => None,
        }
    }
}

/// Trait for the external collaborator deciding relation visibility.
///
/// `Err` signals "not authorized"; callers must treat it as a denial and
/// must not bubble it up.
#[async_trait]
pub trait AccessVerifier: Send + Sync {
    /// Check whether `auth` may act under `scope`
    async fn verify(&self, auth: &AuthContext, scope: &str) -> Result<()>;
}

/// Verifier that grants every scope (for development and tests)
pub struct AllowAllVerifier;

#[async_trait]
impl AccessVerifier for AllowAllVerifier {
    async fn verify(&self, _auth: &AuthContext, _scope: &str) -> Result<()> {
        Ok(())
    }
}

/// Verifier that grants exactly the scopes listed on an API token.
///
/// Users and anonymous callers are denied everything; wire a real policy
/// engine behind [`AccessVerifier`] for those.
pub struct TokenScopeVerifier;

#[async_trait]
impl AccessVerifier for TokenScopeVerifier {
    async fn verify(&self, auth: &AuthContext, scope: &str) -> Result<()> {
        match auth {
            AuthContext::ApiToken { scopes, .. } if scopes.iter().any(|s| s == scope) => Ok(()),
            AuthContext::ApiToken { name, .. } => {
                anyhow::bail!("token '{}' lacks scope '{}'", name, scope)
            }
            _ => anyhow::bail!("no token credentials for scope '{}'", scope),
        }
    }
}
