//! Token authority
//!
//! Bearer tokens bound to a user identity, backed by an expiring in-memory
//! key/value store. A token is `open_id` + `'_'` + a random nonce; only the
//! nonce is cached, keyed by open_id, so a user has at most one live token.
//! Successful validation refreshes the TTL (sliding expiration).

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, info};

/// Default token lifetime: 6 hours.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 6 * 3600;

/// Separator between open_id and nonce. Not expected inside open_ids.
const TOKEN_SEPARATOR: char = '_';

struct TokenEntry {
    nonce: String,
    expires_at: Instant,
}

/// Expiring nonce cache keyed by open_id.
pub struct TokenStore {
    entries: DashMap<String, TokenEntry>,
    ttl: Duration,
}

impl TokenStore {
    pub fn new(ttl_seconds: u64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    /// Issue a token for the user, invalidating any previous one.
    pub fn create_token(&self, open_id: &str) -> String {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let token = format!("{}{}{}", open_id, TOKEN_SEPARATOR, nonce);

        self.entries.insert(
            open_id.to_string(),
            TokenEntry {
                nonce,
                expires_at: Instant::now() + self.ttl,
            },
        );

        debug!("Issued token for {}", open_id);
        token
    }

    /// Validate a token. On success the TTL is refreshed.
    pub fn auth_token(&self, token: &str) -> bool {
        let Some((open_id, nonce)) = parse_token(token) else {
            return false;
        };

        let Some(mut entry) = self.entries.get_mut(open_id) else {
            return false;
        };

        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove(open_id);
            return false;
        }

        if entry.nonce != nonce {
            return false;
        }

        // Valid access slides the expiration window forward.
        entry.expires_at = Instant::now() + self.ttl;
        true
    }

    /// Extract the open_id a token claims to belong to.
    ///
    /// Purely syntactic: callers must pair this with [`auth_token`].
    pub fn open_id_of(token: &str) -> Option<&str> {
        parse_token(token).map(|(open_id, _)| open_id)
    }

    /// Revoke the user's live token, if any.
    pub fn deauth_token(&self, open_id: &str) {
        if self.entries.remove(open_id).is_some() {
            debug!("Revoked token for {}", open_id);
        }
    }

    /// Drop expired entries. Called from the periodic cleanup task.
    pub fn cleanup(&self) {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let removed = before - self.entries.len();
        if removed > 0 {
            info!("Cleaned up {} expired tokens", removed);
        }
    }

    /// Number of live entries (expired-but-unswept included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_TTL_SECS)
    }
}

/// Split a token into (open_id, nonce). Both halves must be non-empty and
/// the nonce must not itself contain the separator.
fn parse_token(token: &str) -> Option<(&str, &str)> {
    let (open_id, nonce) = token.rsplit_once(TOKEN_SEPARATOR)?;
    if open_id.is_empty() || nonce.is_empty() {
        return None;
    }
    Some((open_id, nonce))
}

/// Spawn the periodic sweep of expired token entries.
pub fn spawn_cleanup_task(store: Arc<TokenStore>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            store.cleanup();
        }
    });
}
