// Identity-provider seam
// The core never verifies identity tokens itself; it trusts this contract.

use async_trait::async_trait;
use std::collections::HashMap;

/// Claims returned by the external identity provider for a verified
/// assertion.
#[derive(Debug, Clone)]
pub struct IdentityClaims {
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Verification failures from the identity provider
#[derive(Debug, Clone)]
pub enum IdentityError {
    /// The assertion is malformed, has a bad signature, or is expired
    InvalidAssertion(String),
    /// The provider could not be reached or answered unexpectedly
    Unavailable(String),
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityError::InvalidAssertion(msg) => write!(f, "Invalid assertion: {}", msg),
            IdentityError::Unavailable(msg) => write!(f, "Identity provider unavailable: {}", msg),
        }
    }
}

impl std::error::Error for IdentityError {}

/// External identity provider contract
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify an identity assertion and return its claims.
    async fn verify(&self, assertion: &str) -> Result<IdentityClaims, IdentityError>;
}

/// Table-backed identity provider for tests and local development.
///
/// Knows a fixed set of assertions; everything else fails verification.
pub struct StaticIdentityProvider {
    assertions: HashMap<String, IdentityClaims>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self {
            assertions: HashMap::new(),
        }
    }

    /// Register an assertion the provider will accept.
    pub fn with_assertion(mut self, assertion: &str, claims: IdentityClaims) -> Self {
        self.assertions.insert(assertion.to_string(), claims);
        self
    }
}

impl Default for StaticIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn verify(&self, assertion: &str) -> Result<IdentityClaims, IdentityError> {
        self.assertions
            .get(assertion)
            .cloned()
            .ok_or_else(|| IdentityError::InvalidAssertion("unknown assertion".to_string()))
    }
}
