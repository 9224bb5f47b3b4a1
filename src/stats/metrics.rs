//! Relay-wide counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free counters shared by every session
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    connections_accepted: AtomicU64,
    connections_active: AtomicU64,
    connections_rejected: AtomicU64,
    joins: AtomicU64,
    duplicate_joins: AtomicU64,
    messages_relayed: AtomicU64,
    deliveries: AtomicU64,
    evictions: AtomicU64,
    malformed_dropped: AtomicU64,
    unjoined_dropped: AtomicU64,
}

impl RelayStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            connections_accepted: AtomicU64::new(0),
            connections_active: AtomicU64::new(0),
            connections_rejected: AtomicU64::new(0),
            joins: AtomicU64::new(0),
            duplicate_joins: AtomicU64::new(0),
            messages_relayed: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            malformed_dropped: AtomicU64::new(0),
            unjoined_dropped: AtomicU64::new(0),
        }
    }

    pub(crate) fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_rejected(&self) {
        self.connections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn joined(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn duplicate_join(&self) {
        self.duplicate_joins.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one relayed message and its fan-out result
    pub(crate) fn relayed(&self, delivered: usize, evicted: usize) {
        self.messages_relayed.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
        self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
    }

    pub(crate) fn malformed(&self) {
        self.malformed_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn unjoined(&self) {
        self.unjoined_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime: self.started_at.elapsed(),
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
            duplicate_joins: self.duplicate_joins.load(Ordering::Relaxed),
            messages_relayed: self.messages_relayed.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            malformed_dropped: self.malformed_dropped.load(Ordering::Relaxed),
            unjoined_dropped: self.unjoined_dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Server-wide statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Uptime
    pub uptime: Duration,
    /// Total connections ever accepted
    pub connections_accepted: u64,
    /// Current open connections
    pub connections_active: u64,
    /// Connections refused by the connection limit
    pub connections_rejected: u64,
    /// Successful joins
    pub joins: u64,
    /// Join requests ignored because the session had already joined
    pub duplicate_joins: u64,
    /// Messages handed to a room for fan-out
    pub messages_relayed: u64,
    /// Individual deliveries to room members
    pub deliveries: u64,
    /// Members removed because delivery failed
    pub evictions: u64,
    /// Frames dropped because they were not JSON
    pub malformed_dropped: u64,
    /// Frames dropped because the sender had not joined a room
    pub unjoined_dropped: u64,
}
