// In-memory session store
// Batches hold the table lock for their whole run; nothing interleaves
// mid-batch. Key TTLs are enforced lazily on access, as Redis does.

use super::{SessionStore, StoreError, StoreOp, StoreReply};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// One ordered set: members with scores, plus an optional key expiry
#[derive(Debug, Default)]
struct KeyState {
    members: HashMap<String, i64>,
    expires_at: Option<i64>,
}

/// In-memory session store
///
/// Suitable for tests and single-node deployments.
pub struct MemorySessionStore {
    keys: Mutex<HashMap<String, KeyState>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, KeyState>>, StoreError> {
        self.keys
            .lock()
            .map_err(|e| StoreError::ConnectionError(format!("Lock poisoned: {}", e)))
    }

    /// Drop the key if its own TTL has passed.
    fn purge_if_expired(keys: &mut HashMap<String, KeyState>, key: &str) {
        let expired = keys
            .get(key)
            .and_then(|state| state.expires_at)
            .map(|at| at <= Utc::now().timestamp())
            .unwrap_or(false);

        if expired {
            debug!("Registry key {} reached its TTL, dropping", key);
            keys.remove(key);
        }
    }

    /// Members sorted by (score, member), Redis rank order.
    fn ranked(state: &KeyState) -> Vec<(String, i64)> {
        let mut ranked: Vec<(String, i64)> = state
            .members
            .iter()
            .map(|(m, s)| (m.clone(), *s))
            .collect();
        ranked.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn execute_atomic(&self, ops: Vec<StoreOp>) -> Result<Vec<StoreReply>, StoreError> {
        let mut keys = self.lock()?;
        let mut replies = Vec::with_capacity(ops.len());

        for op in &ops {
            match op {
                StoreOp::AddWithScore { key, member, score } => {
                    Self::purge_if_expired(&mut keys, key);
                    let state = keys.entry(key.clone()).or_default();
                    let inserted = state.members.insert(member.clone(), *score).is_none();
                    replies.push(StoreReply::Count(if inserted { 1 } else { 0 }));
                }
                StoreOp::Cardinality { key } => {
                    Self::purge_if_expired(&mut keys, key);
                    let count = keys.get(key).map(|s| s.members.len()).unwrap_or(0);
                    replies.push(StoreReply::Count(count as i64));
                }
                StoreOp::ExpireKey { key, ttl_secs } => {
                    Self::purge_if_expired(&mut keys, key);
                    if let Some(state) = keys.get_mut(key) {
                        state.expires_at = Some(Utc::now().timestamp() + ttl_secs);
                    }
                    replies.push(StoreReply::Ok);
                }
            }
        }

        Ok(replies)
    }

    async fn member_score(&self, key: &str, member: &str) -> Result<Option<i64>, StoreError> {
        let mut keys = self.lock()?;
        Self::purge_if_expired(&mut keys, key);
        Ok(keys.get(key).and_then(|s| s.members.get(member).copied()))
    }

    async fn remove_member(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut keys = self.lock()?;
        Self::purge_if_expired(&mut keys, key);
        let now_empty = match keys.get_mut(key) {
            Some(state) => {
                state.members.remove(member);
                state.members.is_empty()
            }
            None => false,
        };
        // Redis drops an ordered set once its last member goes
        if now_empty {
            keys.remove(key);
        }
        Ok(())
    }

    async fn remove_range_by_rank(
        &self,
        key: &str,
        start: i64,
        stop: i64,
    ) -> Result<(), StoreError> {
        let mut keys = self.lock()?;
        Self::purge_if_expired(&mut keys, key);

        let now_empty = match keys.get_mut(key) {
            Some(state) => {
                let ranked = Self::ranked(state);
                let len = ranked.len() as i64;

                // Redis index semantics: negative ranks count from the end
                let from = if start < 0 { len + start } else { start }.max(0);
                let to = if stop < 0 { len + stop } else { stop }.min(len - 1);

                for (member, _) in ranked
                    .iter()
                    .skip(from as usize)
                    .take((to - from + 1).max(0) as usize)
                {
                    state.members.remove(member);
                }
                state.members.is_empty()
            }
            None => false,
        };
        if now_empty {
            keys.remove(key);
        }
        Ok(())
    }

    async fn remove_key(&self, key: &str) -> Result<(), StoreError> {
        let mut keys = self.lock()?;
        keys.remove(key);
        Ok(())
    }

    async fn count_greater_than(&self, key: &str, min_score: i64) -> Result<i64, StoreError> {
        let mut keys = self.lock()?;
        Self::purge_if_expired(&mut keys, key);
        Ok(keys
            .get(key)
            .map(|s| s.members.values().filter(|score| **score > min_score).count())
            .unwrap_or(0) as i64)
    }
}
