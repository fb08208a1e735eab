// Expiring ordered-set store abstraction
// The registry issues its multi-step updates through execute_atomic so a
// backing store can be swapped without touching registry logic.

pub mod memory;
pub mod redis;

use async_trait::async_trait;

/// A single operation inside an atomic batch
#[derive(Debug, Clone)]
pub enum StoreOp {
    /// Insert the member under the key, or update its score if present
    AddWithScore {
        key: String,
        member: String,
        score: i64,
    },
    /// Read the number of members under the key
    Cardinality { key: String },
    /// Reset the key's own time-to-live
    ExpireKey { key: String, ttl_secs: i64 },
}

/// Reply to one batch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreReply {
    /// Member count (Cardinality) or number of newly inserted members
    /// (AddWithScore)
    Count(i64),
    /// Acknowledged without a meaningful count (ExpireKey)
    Ok,
}

/// Storage errors
#[derive(Debug, Clone)]
pub enum StoreError {
    ConnectionError(String),
    /// A batch produced the wrong number of replies, or a reply of the
    /// wrong shape for its operation
    InvalidReply(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            StoreError::InvalidReply(msg) => write!(f, "Invalid reply: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Expiring ordered-set store contract.
///
/// Keys map to ordered sets whose members are sorted by an i64 score; here
/// the score is always an absolute expiry instant in epoch seconds. Keys
/// themselves may carry a TTL independent of member scores.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Execute the operations as one non-interleavable batch against the
    /// backing store. Returns one reply per operation, in order. A failed
    /// sub-operation fails the whole batch.
    async fn execute_atomic(&self, ops: Vec<StoreOp>) -> Result<Vec<StoreReply>, StoreError>;

    /// Current score of the member, if present.
    async fn member_score(&self, key: &str, member: &str) -> Result<Option<i64>, StoreError>;

    /// Remove the member; no error if absent.
    async fn remove_member(&self, key: &str, member: &str) -> Result<(), StoreError>;

    /// Remove the members at ranks `start..=stop` (0-based, ascending
    /// score; negative ranks count from the end).
    async fn remove_range_by_rank(&self, key: &str, start: i64, stop: i64)
        -> Result<(), StoreError>;

    /// Drop the key and every member under it; no error if absent.
    async fn remove_key(&self, key: &str) -> Result<(), StoreError>;

    /// Count members whose score is strictly greater than `min_score`.
    async fn count_greater_than(&self, key: &str, min_score: i64) -> Result<i64, StoreError>;
}
