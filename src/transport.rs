// Session-carrier adapter seam
// The HTTP cookie layer lives outside this crate; the core only sets and
// clears named carriers and decodes incoming carrier values.

use std::collections::HashMap;
use std::sync::Mutex;

/// Carrier holding the opaque session token
pub const SESSION_TOKEN_CARRIER: &str = "session_token";

/// Carrier holding the user id that owns the session
pub const USER_ID_CARRIER: &str = "session_user";

/// Transport adapter contract for per-request session carriers
pub trait SessionTransport: Send + Sync {
    /// Emit a carrier with the given value and lifetime.
    fn set_carrier(&self, name: &str, value: &str, ttl_secs: u64);

    /// Clear a carrier on the outgoing response.
    fn clear_carrier(&self, name: &str);
}

/// Decode an inbound carrier value.
///
/// Session tokens are lowercase hex and user ids are uuid-shaped, so no
/// unescaping is needed; a blank or whitespace-only value decodes to `None`.
pub fn decode_carrier(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Recording transport adapter for tests.
///
/// Remembers the last value and TTL set per carrier and which carriers were
/// cleared.
pub struct MemoryTransport {
    carriers: Mutex<HashMap<String, (String, u64)>>,
    cleared: Mutex<Vec<String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            carriers: Mutex::new(HashMap::new()),
            cleared: Mutex::new(Vec::new()),
        }
    }

    /// Last value set for the carrier, if any.
    pub fn carrier(&self, name: &str) -> Option<(String, u64)> {
        self.carriers
            .lock()
            .ok()
            .and_then(|c| c.get(name).cloned())
    }

    /// Whether the carrier has been cleared.
    pub fn was_cleared(&self, name: &str) -> bool {
        self.cleared
            .lock()
            .map(|c| c.iter().any(|n| n == name))
            .unwrap_or(false)
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTransport for MemoryTransport {
    fn set_carrier(&self, name: &str, value: &str, ttl_secs: u64) {
        if let Ok(mut carriers) = self.carriers.lock() {
            carriers.insert(name.to_string(), (value.to_string(), ttl_secs));
        }
    }

    fn clear_carrier(&self, name: &str) {
        if let Ok(mut carriers) = self.carriers.lock() {
            carriers.remove(name);
        }
        if let Ok(mut cleared) = self.cleared.lock() {
            cleared.push(name.to_string());
        }
    }
}
