use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User profile record, owned by the external profile store.
///
/// The session core treats this as immutable input/output; every mutation
/// goes through the store's upsert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields captured from a verified identity assertion, used as
/// upsert input: all fields on first sight, mutable fields on repeat.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}
