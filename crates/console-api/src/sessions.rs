//! In-memory session, OTP and OAuth-state stores.
//!
//! Entries carry an absolute expiry. Readers never observe an expired entry
//! (it is removed on the read that finds it), and a background sweep removes
//! the ones nobody reads again.

use crate::clock::SharedClock;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

pub const SESSION_TTL_HOURS: i64 = 24;
pub const OTP_TTL_MINUTES: i64 = 10;
pub const OAUTH_STATE_TTL_MINUTES: i64 = 10;
pub const OTP_MAX_ATTEMPTS: u32 = 5;

const TOKEN_LENGTH: usize = 48;

#[derive(Debug, Clone)]
struct Expiring<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// Keyed store with a per-entry expiry.
pub struct ExpiringStore<V> {
    name: &'static str,
    entries: DashMap<String, Expiring<V>>,
    clock: SharedClock,
}

impl<V: Clone> ExpiringStore<V> {
    pub fn new(name: &'static str, clock: SharedClock) -> Self {
        Self {
            name,
            entries: DashMap::new(),
            clock,
        }
    }

    /// Insert or overwrite `key`, expiring `ttl` from now.
    pub fn insert(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let expires_at = self.clock.now() + ttl;
        self.entries.insert(key.into(), Expiring { value, expires_at });
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
            debug!(store = self.name, "Dropped expired entry on read");
        }
        None
    }

    /// Remove and return a live entry.
    pub fn take(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        self.entries
            .remove(key)
            .and_then(|(_, entry)| (entry.expires_at > now).then_some(entry.value))
    }

    /// Mutate a live entry in place, keeping its expiry.
    pub fn update<R>(&self, key: &str, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let now = self.clock.now();
        let mut entry = self.entries.get_mut(key)?;
        if entry.expires_at <= now {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(f(&mut entry.value))
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            debug!(
                store = self.name,
                evicted = evicted,
                remaining = self.entries.len(),
                "Swept expired entries"
            );
        }
        evicted
    }

    /// Stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How a session was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginMethod {
    Otp,
    Oauth,
    Token,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: String,
    pub method: LoginMethod,
    pub created_at: DateTime<Utc>,
    /// Databricks access token obtained through OAuth or PAT login
    #[serde(skip)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OtpRecord {
    pub code: String,
    pub attempts: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OAuthState {
    pub redirect_to: Option<String>,
}

pub struct SessionStores {
    pub sessions: ExpiringStore<Session>,
    pub otps: ExpiringStore<OtpRecord>,
    pub oauth_states: ExpiringStore<OAuthState>,
    clock: SharedClock,
}

impl SessionStores {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            sessions: ExpiringStore::new("sessions", clock.clone()),
            otps: ExpiringStore::new("otps", clock.clone()),
            oauth_states: ExpiringStore::new("oauth_states", clock.clone()),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Start a 24 hour session and return its bearer token.
    pub fn create_session(
        &self,
        user: impl Into<String>,
        method: LoginMethod,
        access_token: Option<String>,
    ) -> String {
        let token = random_token();
        let session = Session {
            user: user.into(),
            method,
            created_at: self.clock.now(),
            access_token,
        };
        self.sessions
            .insert(token.clone(), session, Duration::hours(SESSION_TTL_HOURS));
        token
    }

    pub fn sweep(&self) -> usize {
        self.sessions.sweep() + self.otps.sweep() + self.oauth_states.sweep()
    }
}

/// Random URL-safe token for sessions and OAuth state.
pub fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Six digit one-time code.
pub fn otp_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}

/// Periodically sweep every store until the runtime shuts down.
pub fn spawn_sweeper(
    stores: Arc<SessionStores>,
    interval: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = stores.sweep();
            if evicted > 0 {
                tracing::info!(evicted = evicted, "Expired session entries removed");
            }
        }
    })
}
