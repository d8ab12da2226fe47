//! # Session Registry
//!
//! Hand-off point between the login and service listeners. A BUCP connection
//! publishes its context here once login succeeds; the first BOS connection
//! that presents the matching cookie claims it.
//!
//! ## Guarantees
//! - **Atomic publish**: an inserted context is visible to every later claim
//! - **One-shot claim**: lookup and removal happen under one lock, so two
//!   connections racing on the same cookie see exactly one winner
//! - **Bounded**: entries expire after a TTL and the oldest entry is evicted
//!   when the registry is full
//!
//! ## Usage
//! ```ignore
//! let registry = SessionRegistry::new(10_000, Duration::from_secs(600));
//!
//! registry.publish(context).await?;
//!
//! if let Some(context) = registry.claim(cookie_bytes).await {
//!     // adopt context for the BOS connection
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use crate::config::RegistryConfig;
use crate::error::{ProtocolError, Result};
use crate::session::context::SessionContext;

#[derive(Debug)]
struct PendingEntry {
    context: SessionContext,
    published_at: Instant,
}

impl PendingEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.published_at.elapsed() > ttl
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    /// Cookie bytes -> authenticated context
    pending: HashMap<Vec<u8>, PendingEntry>,
    total_published: u64,
    total_claimed: u64,
    total_evicted: u64,
}

/// Shared registry of authenticated contexts awaiting a BOS connection.
///
/// Cloning is cheap; all clones share the same table.
#[derive(Clone, Debug)]
pub struct SessionRegistry {
    max_pending: usize,
    ttl: Duration,
    inner: Arc<Mutex<RegistryInner>>,
}

impl SessionRegistry {
    pub fn new(max_pending: usize, ttl: Duration) -> Self {
        Self {
            max_pending,
            ttl,
            inner: Arc::new(Mutex::new(RegistryInner::default())),
        }
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(config.max_pending, config.pending_ttl)
    }

    /// Publish an authenticated context under its cookie.
    ///
    /// Fails if the context has no cookie or the cookie is already pending.
    pub async fn publish(&self, context: SessionContext) -> Result<()> {
        let key = context
            .bos_cookie()
            .ok_or(ProtocolError::NotAuthenticated)?
            .as_bytes()
            .to_vec();

        let mut inner = self.inner.lock().await;
        self.evict_expired(&mut inner);

        if inner.pending.contains_key(&key) {
            warn!("Refusing to publish duplicate BOS cookie");
            return Err(ProtocolError::DuplicateCookie);
        }

        inner.pending.insert(
            key,
            PendingEntry {
                context,
                published_at: Instant::now(),
            },
        );
        inner.total_published += 1;

        if inner.pending.len() > self.max_pending {
            self.evict_oldest(&mut inner);
        }

        trace!(pending = inner.pending.len(), "Session published");
        Ok(())
    }

    /// Remove and return the context whose cookie equals `cookie` byte for byte.
    ///
    /// Expired entries are removed and reported as a miss.
    pub async fn claim(&self, cookie: &[u8]) -> Option<SessionContext> {
        let mut inner = self.inner.lock().await;

        let entry = inner.pending.remove(cookie)?;
        if entry.is_expired(self.ttl) {
            inner.total_evicted += 1;
            debug!("Presented cookie had expired");
            return None;
        }

        inner.total_claimed += 1;
        trace!(pending = inner.pending.len(), "Session claimed");
        Some(entry.context)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.pending.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every pending session.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        let count = inner.pending.len();
        inner.pending.clear();
        debug!(cleared_count = count, "Session registry cleared");
    }

    pub async fn stats(&self) -> RegistryStats {
        let inner = self.inner.lock().await;
        RegistryStats {
            pending: inner.pending.len(),
            max_pending: self.max_pending,
            total_published: inner.total_published,
            total_claimed: inner.total_claimed,
            total_evicted: inner.total_evicted,
        }
    }

    fn evict_expired(&self, inner: &mut RegistryInner) {
        let before = inner.pending.len();
        let ttl = self.ttl;
        inner.pending.retain(|_, entry| !entry.is_expired(ttl));
        let removed = before - inner.pending.len();

        if removed > 0 {
            inner.total_evicted += removed as u64;
            debug!(
                removed_count = removed,
                remaining_count = inner.pending.len(),
                "Expired sessions evicted"
            );
        }
    }

    fn evict_oldest(&self, inner: &mut RegistryInner) {
        if let Some(oldest) = inner
            .pending
            .iter()
            .min_by_key(|(_, entry)| entry.published_at)
            .map(|(key, _)| key.clone())
        {
            inner.pending.remove(&oldest);
            inner.total_evicted += 1;
            warn!("Registry full, oldest pending session evicted");
        }
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::from_config(&RegistryConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub pending: usize,
    pub max_pending: usize,
    pub total_published: u64,
    pub total_claimed: u64,
    pub total_evicted: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::account::AccountIdentity;
    use crate::session::context::BosCookie;

    fn authenticated(cookie: Vec<u8>, sequence: u16) -> SessionContext {
        let mut ctx = SessionContext::with_sequence(sequence);
        ctx.authenticate(
            AccountIdentity {
                uin: 1,
                display_name: "alice".into(),
                email: String::new(),
                password: String::new(),
            },
            BosCookie::from(cookie),
        );
        ctx
    }

    #[tokio::test]
    async fn test_publish_and_claim_once() {
        let registry = SessionRegistry::new(10, Duration::from_secs(60));
        registry.publish(authenticated(vec![1, 2, 3], 77)).await.unwrap();

        let claimed = registry.claim(&[1, 2, 3]).await.unwrap();
        assert_eq!(claimed.server_sequence(), 77);
        assert!(registry.claim(&[1, 2, 3]).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_claim_requires_exact_bytes() {
        let registry = SessionRegistry::new(10, Duration::from_secs(60));
        registry.publish(authenticated(vec![1, 2, 3], 0)).await.unwrap();

        assert!(registry.claim(&[1, 2]).await.is_none());
        assert!(registry.claim(&[1, 2, 3, 4]).await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_unauthenticated_context_rejected() {
        let registry = SessionRegistry::new(10, Duration::from_secs(60));
        let result = registry.publish(SessionContext::with_sequence(0)).await;
        assert!(matches!(result, Err(ProtocolError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_duplicate_cookie_rejected() {
        let registry = SessionRegistry::new(10, Duration::from_secs(60));
        registry.publish(authenticated(vec![9], 0)).await.unwrap();
        let result = registry.publish(authenticated(vec![9], 1)).await;
        assert!(matches!(result, Err(ProtocolError::DuplicateCookie)));
    }

    #[tokio::test]
    async fn test_capacity_eviction() {
        let registry = SessionRegistry::new(3, Duration::from_secs(60));
        for i in 0..5u8 {
            registry.publish(authenticated(vec![i], 0)).await.unwrap();
        }

        let stats = registry.stats().await;
        assert_eq!(stats.pending, 3);
        assert_eq!(stats.total_published, 5);
        assert_eq!(stats.total_evicted, 2);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let registry = SessionRegistry::new(10, Duration::from_millis(10));
        registry.publish(authenticated(vec![5], 0)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(registry.claim(&[5]).await.is_none());
        assert_eq!(registry.stats().await.total_evicted, 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let registry = SessionRegistry::new(10, Duration::from_secs(60));
        registry.publish(authenticated(vec![1], 0)).await.unwrap();
        registry.clear().await;
        assert!(registry.claim(&[1]).await.is_none());
    }
}
