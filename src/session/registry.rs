// Per-user session registry
// A bounded, expiring ordered set of live tokens per user. The score of
// each member is its absolute expiry instant in epoch seconds, which serves
// as both sort key and liveness check.

use crate::store::{SessionStore, StoreError, StoreOp, StoreReply};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// Registry of active session tokens, one ordered set per user
pub struct SessionRegistry {
    store: Arc<dyn SessionStore>,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn SessionStore>, max_sessions: usize) -> Self {
        Self {
            store,
            max_sessions,
        }
    }

    fn registry_key(&self, user_id: &str) -> String {
        format!("sessions:{}", user_id)
    }

    /// Register a session token for the user.
    ///
    /// Insert, cardinality read, and key re-TTL go to the store as one
    /// atomic batch, so a concurrent login never observes a half-applied
    /// update. If the post-insert cardinality exceeds the cap, the
    /// oldest-by-expiry members are pruned in a follow-up batch; two
    /// overlapping logins can transiently leave cap+1 members until the
    /// next add runs.
    pub async fn add(&self, user_id: &str, token: &str, ttl_secs: i64) -> Result<(), StoreError> {
        let key = self.registry_key(user_id);
        let score = Utc::now().timestamp() + ttl_secs;

        let replies = self
            .store
            .execute_atomic(vec![
                StoreOp::AddWithScore {
                    key: key.clone(),
                    member: token.to_string(),
                    score,
                },
                StoreOp::Cardinality { key: key.clone() },
                StoreOp::ExpireKey {
                    key: key.clone(),
                    ttl_secs,
                },
            ])
            .await?;

        let cardinality = match replies.get(1) {
            Some(StoreReply::Count(count)) => *count,
            other => {
                return Err(StoreError::InvalidReply(format!(
                    "cardinality reply missing or malformed: {:?}",
                    other
                )))
            }
        };

        let cap = self.max_sessions as i64;
        if cardinality > cap {
            warn!(
                "User {} has {} sessions (cap {}), pruning oldest",
                user_id, cardinality, cap
            );
            self.store
                .remove_range_by_rank(&key, 0, cardinality - cap - 1)
                .await?;
        }

        debug!("Registered session for user {}", user_id);
        Ok(())
    }

    /// Remove a session token. No error if the token was never registered.
    pub async fn remove(&self, user_id: &str, token: &str) -> Result<(), StoreError> {
        self.store
            .remove_member(&self.registry_key(user_id), token)
            .await
    }

    /// Remove every session the user has (logout everywhere).
    pub async fn remove_all(&self, user_id: &str) -> Result<(), StoreError> {
        self.store.remove_key(&self.registry_key(user_id)).await
    }

    /// Check whether the token is a live session for the user.
    ///
    /// Validity is re-read from the store on every call, never cached. A
    /// present-but-expired member is swept eagerly before returning false.
    pub async fn check_valid(&self, user_id: &str, token: &str) -> Result<bool, StoreError> {
        let key = self.registry_key(user_id);

        match self.store.member_score(&key, token).await? {
            None => Ok(false),
            Some(expires_at) => {
                if expires_at > Utc::now().timestamp() {
                    Ok(true)
                } else {
                    debug!("Sweeping expired session for user {}", user_id);
                    self.store.remove_member(&key, token).await?;
                    Ok(false)
                }
            }
        }
    }

    /// Number of live (unexpired) sessions for the user.
    pub async fn active_count(&self, user_id: &str) -> Result<i64, StoreError> {
        self.store
            .count_greater_than(&self.registry_key(user_id), Utc::now().timestamp())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemorySessionStore;

    fn registry_over(store: Arc<MemorySessionStore>, cap: usize) -> SessionRegistry {
        SessionRegistry::new(store, cap)
    }

    #[tokio::test]
    async fn test_add_then_check_valid() {
        let store = Arc::new(MemorySessionStore::new());
        let registry = registry_over(store, 8);

        registry.add("u1", "tok-1", 3600).await.unwrap();

        assert!(registry.check_valid("u1", "tok-1").await.unwrap());
        assert_eq!(registry.active_count("u1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_token_is_invalid() {
        let store = Arc::new(MemorySessionStore::new());
        let registry = registry_over(store, 8);

        assert!(!registry.check_valid("u1", "never-issued").await.unwrap());
    }

    #[tokio::test]
    async fn test_cap_evicts_earliest_expiring() {
        let store = Arc::new(MemorySessionStore::new());
        let registry = registry_over(store.clone(), 8);

        // Nine adds with strictly increasing windows; tok-0 expires first
        for i in 0..9 {
            let token = format!("tok-{}", i);
            registry.add("u1", &token, 3600 + i * 60).await.unwrap();
        }

        assert_eq!(registry.active_count("u1").await.unwrap(), 8);
        assert!(!registry.check_valid("u1", "tok-0").await.unwrap());
        for i in 1..9 {
            let token = format!("tok-{}", i);
            assert!(registry.check_valid("u1", &token).await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = Arc::new(MemorySessionStore::new());
        let registry = registry_over(store, 8);

        registry.add("u1", "tok-1", 3600).await.unwrap();

        registry.remove("u1", "tok-1").await.unwrap();
        registry.remove("u1", "tok-1").await.unwrap();
        registry.remove("u2", "never-existed").await.unwrap();

        assert!(!registry.check_valid("u1", "tok-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_member_is_swept_on_check() {
        let store = Arc::new(MemorySessionStore::new());
        let registry = registry_over(store.clone(), 8);

        // Plant a member whose expiry instant is already in the past
        store
            .execute_atomic(vec![StoreOp::AddWithScore {
                key: "sessions:u1".to_string(),
                member: "stale-tok".to_string(),
                score: Utc::now().timestamp() - 5,
            }])
            .await
            .unwrap();

        assert!(!registry.check_valid("u1", "stale-tok").await.unwrap());
        // The sweep removed it, not just reported it invalid
        assert_eq!(
            store.member_score("sessions:u1", "stale-tok").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_expiry_scenario_with_absolute_scores() {
        let store = Arc::new(MemorySessionStore::new());
        let registry = registry_over(store.clone(), 8);

        // Sessions registered at t=0 and t=10 with a 432000s window carry
        // scores 432000 and 432010. Both instants are long past by now, so
        // checking the first one behaves exactly like a check at t=432001:
        // invalid, swept, one member left.
        store
            .execute_atomic(vec![
                StoreOp::AddWithScore {
                    key: "sessions:u1".to_string(),
                    member: "tok-1".to_string(),
                    score: 432_000,
                },
                StoreOp::AddWithScore {
                    key: "sessions:u1".to_string(),
                    member: "tok-2".to_string(),
                    score: 432_010,
                },
            ])
            .await
            .unwrap();

        assert_eq!(
            store.member_score("sessions:u1", "tok-1").await.unwrap(),
            Some(432_000)
        );
        assert_eq!(
            store.member_score("sessions:u1", "tok-2").await.unwrap(),
            Some(432_010)
        );

        assert!(!registry.check_valid("u1", "tok-1").await.unwrap());

        let replies = store
            .execute_atomic(vec![StoreOp::Cardinality {
                key: "sessions:u1".to_string(),
            }])
            .await
            .unwrap();
        assert_eq!(replies, vec![StoreReply::Count(1)]);
    }

    #[tokio::test]
    async fn test_remove_all_empties_registry() {
        let store = Arc::new(MemorySessionStore::new());
        let registry = registry_over(store, 8);

        for i in 0..3 {
            let token = format!("tok-{}", i);
            registry.add("u1", &token, 3600).await.unwrap();
        }

        registry.remove_all("u1").await.unwrap();

        assert_eq!(registry.active_count("u1").await.unwrap(), 0);
        assert!(!registry.check_valid("u1", "tok-0").await.unwrap());
    }

    #[tokio::test]
    async fn test_relogin_refreshes_existing_token_score() {
        let store = Arc::new(MemorySessionStore::new());
        let registry = registry_over(store.clone(), 8);

        registry.add("u1", "tok-1", 100).await.unwrap();
        let first = store
            .member_score("sessions:u1", "tok-1")
            .await
            .unwrap()
            .unwrap();

        registry.add("u1", "tok-1", 5_000).await.unwrap();
        let second = store
            .member_score("sessions:u1", "tok-1")
            .await
            .unwrap()
            .unwrap();

        // Re-adding replaces the score rather than duplicating the member
        assert!(second > first);
        assert_eq!(registry.active_count("u1").await.unwrap(), 1);
    }
}
