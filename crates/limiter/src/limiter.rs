use std::fmt;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{LimiterConfig, WindowConfig};
use crate::window::{FixedWindow, WindowKind};

/// Opaque key a client is counted under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClientIdentity {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for ClientIdentity {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<IpAddr> for ClientIdentity {
    fn from(addr: IpAddr) -> Self {
        Self(addr.to_string())
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A request was admitted and consumed one unit from every window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Smallest remaining budget across all windows after this request.
    pub remaining: u32,
}

/// A request was denied; nothing was consumed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("rate limit exceeded: {limit} requests per {window} window; retry in {}s", ceil_secs(.retry_after))]
pub struct RateLimitExceeded {
    /// The exhausted window. When several are exhausted, the one that
    /// reopens last.
    pub window: WindowKind,
    pub limit: u32,
    /// Time until the reported window resets.
    pub retry_after: Duration,
}

impl RateLimitExceeded {
    /// Retry-after rounded up to whole seconds, never below one.
    pub fn retry_after_secs(&self) -> u64 {
        ceil_secs(&self.retry_after)
    }
}

fn ceil_secs(duration: &Duration) -> u64 {
    let secs = duration.as_secs();
    let rounded = if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    };
    rounded.max(1)
}

#[derive(Debug)]
struct ClientWindows {
    windows: Vec<FixedWindow>,
}

impl ClientWindows {
    fn new(cfg: &LimiterConfig, now: Instant) -> Self {
        let mut windows = vec![
            window(WindowKind::Short, cfg.short, now),
            window(WindowKind::Long, cfg.long, now),
        ];
        if let Some(burst) = cfg.burst {
            windows.push(window(WindowKind::Burst, burst, now));
        }
        Self { windows }
    }
}

fn window(kind: WindowKind, cfg: WindowConfig, now: Instant) -> FixedWindow {
    FixedWindow::new(kind, cfg.limit, cfg.period(), now)
}

/// Admission-control gate keyed by [`ClientIdentity`].
///
/// Each client has a short and a long fixed window (plus an optional burst
/// window). A request is admitted only if every window has capacity, and
/// then consumes one unit from each. The check and the update happen while
/// holding the client's map entry, so concurrent requests from one client
/// serialize and can never be over-admitted. Different clients only contend
/// when they hash to the same shard.
///
/// Counters live for the process lifetime; call [`purge_expired`](Self::purge_expired)
/// periodically to drop clients whose windows have all ended.
#[derive(Debug)]
pub struct RateLimiter {
    cfg: LimiterConfig,
    clients: DashMap<ClientIdentity, ClientWindows>,
    total_admitted: AtomicU64,
    total_rejected: AtomicU64,
}

impl RateLimiter {
    pub fn new(cfg: LimiterConfig) -> Self {
        Self {
            cfg,
            clients: DashMap::new(),
            total_admitted: AtomicU64::new(0),
            total_rejected: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.cfg
    }

    /// Checks and consumes budget for `identity` at the current time.
    pub fn try_admit(&self, identity: &ClientIdentity) -> Result<Admission, RateLimitExceeded> {
        self.try_admit_at(identity, Instant::now())
    }

    /// Like [`try_admit`](Self::try_admit) with an explicit clock reading.
    pub fn try_admit_at(
        &self,
        identity: &ClientIdentity,
        now: Instant,
    ) -> Result<Admission, RateLimitExceeded> {
        let mut entry = self
            .clients
            .entry(identity.clone())
            .or_insert_with(|| ClientWindows::new(&self.cfg, now));
        let client = entry.value_mut();

        for window in client.windows.iter_mut() {
            window.refresh(now);
        }

        let denied = client
            .windows
            .iter()
            .filter(|w| !w.has_capacity())
            .max_by_key(|w| w.resets_in(now))
            .map(|w| RateLimitExceeded {
                window: w.kind(),
                limit: w.limit(),
                retry_after: w.resets_in(now),
            });

        if let Some(denied) = denied {
            drop(entry);
            self.total_rejected.fetch_add(1, Ordering::Relaxed);
            warn!(
                client = %identity,
                window = %denied.window,
                retry_after_secs = denied.retry_after_secs(),
                "rate_limit_denied"
            );
            return Err(denied);
        }

        for window in client.windows.iter_mut() {
            window.consume();
        }
        let remaining = client
            .windows
            .iter()
            .map(FixedWindow::remaining)
            .min()
            .unwrap_or(0);
        drop(entry);

        self.total_admitted.fetch_add(1, Ordering::Relaxed);
        debug!(client = %identity, remaining, "rate_limit_admitted");
        Ok(Admission { remaining })
    }

    /// Drops clients whose windows have all ended. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    pub fn purge_expired_at(&self, now: Instant) -> usize {
        let before = self.clients.len();
        self.clients
            .retain(|_, client| !client.windows.iter().all(|w| w.is_expired(now)));
        let removed = before.saturating_sub(self.clients.len());
        if removed > 0 {
            debug!(removed, remaining = self.clients.len(), "rate_limit_purged");
        }
        removed
    }

    /// Requests counted against `identity` in its current windows, or `None`
    /// if the client is not tracked.
    pub fn usage(&self, identity: &ClientIdentity) -> Option<Vec<(WindowKind, u32)>> {
        self.clients.get(identity).map(|client| {
            client
                .windows
                .iter()
                .map(|w| (w.kind(), w.count()))
                .collect()
        })
    }

    pub fn stats(&self) -> LimiterStats {
        LimiterStats {
            tracked_clients: self.clients.len(),
            total_admitted: self.total_admitted.load(Ordering::Relaxed),
            total_rejected: self.total_rejected.load(Ordering::Relaxed),
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(LimiterConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LimiterStats {
    pub tracked_clients: usize,
    pub total_admitted: u64,
    pub total_rejected: u64,
}

impl LimiterStats {
    /// Rejection rate (0.0 to 1.0).
    pub fn rejection_rate(&self) -> f64 {
        let total = self.total_admitted + self.total_rejected;
        if total == 0 {
            0.0
        } else {
            self.total_rejected as f64 / total as f64
        }
    }
}
