// Session token minting

use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::time::{SystemTime, UNIX_EPOCH};

/// Mint an opaque session token for a user.
///
/// The token is a SHA-256 digest over the user id, a nanosecond timestamp,
/// and 32 bytes of CSPRNG entropy, rendered as lowercase hex. The digest is
/// one-way: the stored value cannot be inverted to recover its inputs.
/// Never blocks on I/O and has no failure path.
pub fn generate(user_id: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    let mut entropy = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut entropy);

    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update(nanos.to_be_bytes());
    hasher.update(entropy);
    let digest = hasher.finalize();

    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
