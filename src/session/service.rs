// Session service
// Orchestrates the login / logout / validate transitions between the
// anonymous and authenticated states.

use crate::config::SessionConfig;
use crate::error::AuthError;
use crate::identity::IdentityProvider;
use crate::models::{User, UserProfile};
use crate::session::registry::SessionRegistry;
use crate::session::token;
use crate::transport::{self, SessionTransport, SESSION_TOKEN_CARRIER, USER_ID_CARRIER};
use crate::users::UserStore;
use std::sync::Arc;
use tracing::info;

/// Outcome of a session-token validation.
///
/// `Invalid` is an expected state ("not logged in"), never an error; errors
/// are reserved for store and infrastructure faults.
#[derive(Debug, Clone)]
pub enum SessionValidation {
    Valid {
        /// The current profile; `None` if it was deleted out-of-band while
        /// the session stayed live
        user: Option<User>,
        token: String,
    },
    Invalid,
}

/// Session service over constructor-injected collaborators
pub struct SessionService {
    identity: Arc<dyn IdentityProvider>,
    users: Arc<dyn UserStore>,
    registry: SessionRegistry,
    session_ttl_secs: i64,
}

impl SessionService {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        users: Arc<dyn UserStore>,
        registry: SessionRegistry,
        config: &SessionConfig,
    ) -> Self {
        Self {
            identity,
            users,
            registry,
            session_ttl_secs: config.session_ttl_secs,
        }
    }

    /// Log a user in from a verified identity assertion.
    ///
    /// Verifies the assertion, upserts the profile, mints and registers a
    /// session token, and emits both session carriers with the session's
    /// expiry. Identity faults surface as `Unauthorized`; store and
    /// registry faults as `Internal`.
    pub async fn login(
        &self,
        assertion: &str,
        transport: &dyn SessionTransport,
    ) -> Result<User, AuthError> {
        let claims = self
            .identity
            .verify(assertion)
            .await
            .map_err(|e| AuthError::Unauthorized(e.to_string()))?;

        let email = claims
            .email
            .filter(|email| !email.is_empty())
            .ok_or_else(|| {
                AuthError::Unauthorized("identity assertion carries no email claim".to_string())
            })?;

        let user = self
            .users
            .upsert(UserProfile {
                email,
                name: claims.name,
                picture: claims.picture,
            })
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or_else(|| {
                AuthError::Internal("profile store returned no record on upsert".to_string())
            })?;

        let session_token = token::generate(&user.id);
        self.registry
            .add(&user.id, &session_token, self.session_ttl_secs)
            .await?;

        let ttl = self.session_ttl_secs as u64;
        transport.set_carrier(SESSION_TOKEN_CARRIER, &session_token, ttl);
        transport.set_carrier(USER_ID_CARRIER, &user.id, ttl);

        info!("User {} logged in", user.id);
        Ok(user)
    }

    /// Log a session out and clear its carriers.
    ///
    /// Idempotent with respect to session state: a second logout, or one
    /// with a token that was never registered, succeeds. Store
    /// infrastructure faults still surface as `Internal`.
    pub async fn logout(
        &self,
        user_id: &str,
        session_token: &str,
        transport: &dyn SessionTransport,
    ) -> Result<(), AuthError> {
        self.registry.remove(user_id, session_token).await?;

        transport.clear_carrier(SESSION_TOKEN_CARRIER);
        transport.clear_carrier(USER_ID_CARRIER);

        info!("User {} logged out", user_id);
        Ok(())
    }

    /// Log a user out of every session (all devices) and clear the
    /// carriers on this request.
    pub async fn logout_all(
        &self,
        user_id: &str,
        transport: &dyn SessionTransport,
    ) -> Result<(), AuthError> {
        self.registry.remove_all(user_id).await?;

        transport.clear_carrier(SESSION_TOKEN_CARRIER);
        transport.clear_carrier(USER_ID_CARRIER);

        info!("User {} logged out everywhere", user_id);
        Ok(())
    }

    /// Validate a session token as received from its carrier.
    ///
    /// Checks token liveness against the registry on every call; nothing is
    /// cached. A dead or undecodable token yields `Invalid` so callers can
    /// treat the request as anonymous without error handling.
    pub async fn validate_session_token(
        &self,
        encoded_token: &str,
        user_id: &str,
    ) -> Result<SessionValidation, AuthError> {
        let session_token = match transport::decode_carrier(encoded_token) {
            Some(token) => token,
            None => return Ok(SessionValidation::Invalid),
        };

        if !self.registry.check_valid(user_id, &session_token).await? {
            return Ok(SessionValidation::Invalid);
        }

        // The profile can disappear out-of-band while sessions stay live;
        // the caller decides what a profileless session means.
        let user = self
            .users
            .get_by_id(user_id)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        Ok(SessionValidation::Valid {
            user,
            token: session_token,
        })
    }
}
