//! In-memory session registry
//!
//! Each session sits behind its own mutex so participants never contend with
//! one another; the registry lock is held only for insert, lookup and sweep.
//! Sessions idle for longer than the configured TTL are evicted the next
//! time a session is created.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

use dmx_common::time::Clock;
use dmx_common::Result;

use crate::models::SessionState;

/// Idle lifetime applied when none is configured
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Shared handle to one participant's state
pub type SessionHandle = Arc<Mutex<SessionState>>;

struct Entry {
    handle: SessionHandle,
    last_active: DateTime<Utc>,
}

/// Registry of live sessions keyed by session id
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Entry>>,
    rng: Mutex<StdRng>,
    sample_size: usize,
    ttl: Duration,
}

impl SessionRegistry {
    /// Registry drawing session randomness from `seed`, or from entropy
    pub fn new(sample_size: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            sessions: RwLock::new(HashMap::new()),
            rng: Mutex::new(rng),
            sample_size,
            ttl: DEFAULT_SESSION_TTL,
        }
    }

    /// Replace the idle lifetime after which a session is evicted
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Create and register a new session, evicting idle ones first
    pub async fn create(&self, catalog_len: usize, clock: &dyn Clock) -> Result<(Uuid, SessionHandle)> {
        let now = clock.now();
        let state = {
            let mut rng = self.rng.lock().await;
            SessionState::new(catalog_len, self.sample_size, &mut *rng, now)?
        };

        let session_id = state.session_id();
        info!(
            session_id = %session_id,
            group = %state.group(),
            artworks = state.total(),
            "Session created"
        );

        let handle = Arc::new(Mutex::new(state));
        let mut sessions = self.sessions.write().await;
        self.evict_idle(&mut sessions, now);
        sessions.insert(
            session_id,
            Entry {
                handle: handle.clone(),
                last_active: now,
            },
        );
        Ok((session_id, handle))
    }

    /// Look up a live session and mark it active
    pub async fn get(&self, session_id: &Uuid, clock: &dyn Clock) -> Option<SessionHandle> {
        let now = clock.now();
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(session_id)?;
        if self.is_idle(entry.last_active, now) {
            sessions.remove(session_id);
            info!(session_id = %session_id, "Session expired");
            return None;
        }
        entry.last_active = now;
        Some(entry.handle.clone())
    }

    pub async fn remove(&self, session_id: &Uuid) -> Option<SessionHandle> {
        self.sessions
            .write()
            .await
            .remove(session_id)
            .map(|entry| entry.handle)
    }

    /// Drop every session idle past the TTL; returns how many were removed
    pub async fn sweep(&self, clock: &dyn Clock) -> usize {
        let mut sessions = self.sessions.write().await;
        self.evict_idle(&mut sessions, clock.now())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    fn evict_idle(&self, sessions: &mut HashMap<Uuid, Entry>, now: DateTime<Utc>) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| !self.is_idle(entry.last_active, now));
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }

    fn is_idle(&self, last_active: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        (now - last_active)
            .to_std()
            .map(|idle| idle > self.ttl)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmx_common::time::ManualClock;

    #[tokio::test]
    async fn test_create_and_lookup() {
        let registry = SessionRegistry::new(20, Some(1));
        let clock = ManualClock::new(Utc::now());

        let (id, handle) = registry.create(25, &clock).await.unwrap();
        assert_eq!(registry.len().await, 1);

        let found = registry.get(&id, &clock).await.unwrap();
        assert!(Arc::ptr_eq(&handle, &found));
        assert_eq!(found.lock().await.total(), 20);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let registry = SessionRegistry::new(5, Some(9));
        let clock = ManualClock::new(Utc::now());

        let (a, _) = registry.create(10, &clock).await.unwrap();
        let (b, _) = registry.create(10, &clock).await.unwrap();
        assert_ne!(a, b);

        registry.remove(&a).await;
        assert!(registry.get(&a, &clock).await.is_none());
        assert!(registry.get(&b, &clock).await.is_some());
    }

    #[tokio::test]
    async fn test_small_catalog_fails_without_registering() {
        let registry = SessionRegistry::new(20, None);
        let clock = ManualClock::new(Utc::now());

        assert!(registry.create(10, &clock).await.is_err());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_seeded_registries_agree() {
        let clock = ManualClock::new(Utc::now());
        let r1 = SessionRegistry::new(5, Some(77));
        let r2 = SessionRegistry::new(5, Some(77));

        let (_, h1) = r1.create(30, &clock).await.unwrap();
        let (_, h2) = r2.create(30, &clock).await.unwrap();
        assert_eq!(h1.lock().await.sequence(), h2.lock().await.sequence());
    }

    #[tokio::test]
    async fn test_idle_sessions_evicted_on_create() {
        let registry = SessionRegistry::new(3, Some(4)).with_ttl(Duration::from_secs(3600));
        let clock = ManualClock::new(Utc::now());

        let mut stale = Vec::new();
        for _ in 0..50 {
            stale.push(registry.create(10, &clock).await.unwrap().0);
        }
        clock.advance(Duration::from_secs(30 * 24 * 3600));

        let (fresh, _) = registry.create(10, &clock).await.unwrap();
        assert_eq!(registry.len().await, 1);
        assert!(registry.get(&stale[0], &clock).await.is_none());
        assert!(registry.get(&fresh, &clock).await.is_some());
    }

    #[tokio::test]
    async fn test_activity_keeps_session_alive() {
        let registry = SessionRegistry::new(3, Some(4)).with_ttl(Duration::from_secs(60));
        let clock = ManualClock::new(Utc::now());
        let (id, _) = registry.create(10, &clock).await.unwrap();

        for _ in 0..5 {
            clock.advance(Duration::from_secs(45));
            assert!(registry.get(&id, &clock).await.is_some());
        }
        assert_eq!(registry.sweep(&clock).await, 0);

        clock.advance(Duration::from_secs(61));
        assert_eq!(registry.sweep(&clock).await, 1);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_lookup_is_removed() {
        let registry = SessionRegistry::new(3, Some(4)).with_ttl(Duration::from_secs(60));
        let clock = ManualClock::new(Utc::now());
        let (id, _) = registry.create(10, &clock).await.unwrap();

        clock.advance(Duration::from_secs(90));
        assert!(registry.get(&id, &clock).await.is_none());
        assert!(registry.is_empty().await);
    }
}
