// Service-level error taxonomy

use crate::store::StoreError;

/// Errors surfaced by the session service.
///
/// "Not logged in" and "profile not found" are not errors; the first is a
/// tagged validation result and the second is an absent `Option`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The identity assertion was missing, malformed, expired, or lacked a
    /// required claim
    Unauthorized(String),
    /// A profile-store or registry-store operation failed, or a batch reply
    /// came back in an unexpected shape
    Internal(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AuthError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
