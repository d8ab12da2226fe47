//! Observability and Metrics
//!
//! Atomic counters for the login and hand-off flow. One [`Metrics`] instance is
//! shared by both listeners through [`Services`](crate::protocol::Services).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

#[derive(Debug)]
pub struct Metrics {
    /// Total connections accepted on either listener
    pub connections_total: AtomicU64,
    /// Currently open connections
    pub connections_active: AtomicU64,
    /// Challenges handed out
    pub challenges_issued: AtomicU64,
    /// Logins that produced a cookie
    pub logins_accepted: AtomicU64,
    /// Logins answered with an error code
    pub logins_rejected: AtomicU64,
    /// BOS connections that claimed a pending session
    pub sessions_claimed: AtomicU64,
    /// BOS sign-ons whose cookie matched nothing
    pub registry_misses: AtomicU64,
    /// Frames received
    pub frames_received: AtomicU64,
    /// Frames sent
    pub frames_sent: AtomicU64,
    /// Messages dropped as malformed or unhandled
    pub messages_dropped: AtomicU64,
    /// Connections closed because of framing errors
    pub framing_errors: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            connections_total: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            challenges_issued: AtomicU64::new(0),
            logins_accepted: AtomicU64::new(0),
            logins_rejected: AtomicU64::new(0),
            sessions_claimed: AtomicU64::new(0),
            registry_misses: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            framing_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn connection_established(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn challenge_issued(&self) {
        self.challenges_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn login_accepted(&self) {
        self.logins_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn login_rejected(&self) {
        self.logins_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_claimed(&self) {
        self.sessions_claimed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn registry_miss(&self) {
        self.registry_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_dropped(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn framing_error(&self) {
        self.framing_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            challenges_issued: self.challenges_issued.load(Ordering::Relaxed),
            logins_accepted: self.logins_accepted.load(Ordering::Relaxed),
            logins_rejected: self.logins_rejected.load(Ordering::Relaxed),
            sessions_claimed: self.sessions_claimed.load(Ordering::Relaxed),
            registry_misses: self.registry_misses.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            framing_errors: self.framing_errors.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            connections_total = snapshot.connections_total,
            connections_active = snapshot.connections_active,
            challenges_issued = snapshot.challenges_issued,
            logins_accepted = snapshot.logins_accepted,
            logins_rejected = snapshot.logins_rejected,
            sessions_claimed = snapshot.sessions_claimed,
            registry_misses = snapshot.registry_misses,
            frames_received = snapshot.frames_received,
            frames_sent = snapshot.frames_sent,
            messages_dropped = snapshot.messages_dropped,
            framing_errors = snapshot.framing_errors,
            uptime_seconds = snapshot.uptime_seconds,
            "OSCAR metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub connections_total: u64,
    pub connections_active: u64,
    pub challenges_issued: u64,
    pub logins_accepted: u64,
    pub logins_rejected: u64,
    pub sessions_claimed: u64,
    pub registry_misses: u64,
    pub frames_received: u64,
    pub frames_sent: u64,
    pub messages_dropped: u64,
    pub framing_errors: u64,
    pub uptime_seconds: u64,
}
