//! Queue sessions and session-hash generation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

/// Length of the hex session hash sent to backends.
const SESSION_HASH_LEN: usize = 12;

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Correlates one queue join with its data stream.
///
/// Created by a successful submit and consumed by the poll that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSession {
    pub session_hash: String,
    pub event_id: String,
    pub base_url: String,
}

/// Generate an opaque session hash.
///
/// Mixes wall-clock nanoseconds, the process id, and a process-wide counter,
/// so two calls never collide within a process even for identical prompts.
pub fn new_session_hash() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let count = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut hasher = Sha256::new();
    hasher.update(nanos.to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    hasher.update(count.to_le_bytes());
    let digest = hex::encode(hasher.finalize());

    digest[..SESSION_HASH_LEN].to_string()
}
