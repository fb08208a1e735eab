// User profile store seam
// The core only needs upsert-by-identity and fetch-by-id; everything else
// about profiles belongs to the owning service.

use crate::models::{User, UserProfile};
use crate::store::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// External user profile store contract
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create the profile on first sight of the email; on repeat, refresh
    /// the mutable fields (name, picture) and preserve identity. Returns
    /// the stored record, or `None` if the store produced nothing.
    async fn upsert(&self, profile: UserProfile) -> Result<Option<User>, StoreError>;

    /// Fetch a profile by id. Absence is `None`, not an error.
    async fn get_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;
}

/// In-memory user store
/// Thread-safe storage using a primary map plus an email index
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, User>>,
    email_index: Mutex<HashMap<String, String>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            email_index: Mutex::new(HashMap::new()),
        }
    }

    /// Delete a profile, e.g. to simulate out-of-band removal in tests.
    pub fn delete(&self, id: &str) {
        let mut users = match self.users.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        if let Some(user) = users.remove(id) {
            if let Ok(mut index) = self.email_index.lock() {
                index.remove(&user.email);
            }
        }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned(e: impl std::fmt::Display) -> StoreError {
    StoreError::ConnectionError(format!("Lock poisoned: {}", e))
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn upsert(&self, profile: UserProfile) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().map_err(poisoned)?;
        let mut index = self.email_index.lock().map_err(poisoned)?;

        let now = Utc::now();

        if let Some(id) = index.get(&profile.email).cloned() {
            let user = users.get_mut(&id).ok_or_else(|| {
                StoreError::InvalidReply(format!("email index points at missing user {}", id))
            })?;
            // Refresh mutable fields, keep identity
            if profile.name.is_some() {
                user.name = profile.name;
            }
            if profile.picture.is_some() {
                user.picture = profile.picture;
            }
            user.updated_at = now;
            return Ok(Some(user.clone()));
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            email: profile.email.clone(),
            name: profile.name,
            picture: profile.picture,
            created_at: now,
            updated_at: now,
        };

        info!("Created user {} for {}", user.id, user.email);
        index.insert(profile.email, user.id.clone());
        users.insert(user.id.clone(), user.clone());
        Ok(Some(user))
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().map_err(poisoned)?;
        Ok(users.get(id).cloned())
    }
}
