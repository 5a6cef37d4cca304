//! Fixed-window counters.
//!
//! A window covers `[start, start + period)`. When a request arrives at or
//! after the end, the start advances by a whole number of periods so the
//! boundaries stay on the grid laid down by the first request, and the count
//! drops to zero.
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Which budget a counter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Short,
    Long,
    Burst,
}

impl WindowKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WindowKind::Short => "short",
            WindowKind::Long => "long",
            WindowKind::Burst => "burst",
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FixedWindow {
    kind: WindowKind,
    limit: u32,
    period: Duration,
    start: Instant,
    count: u32,
}

impl FixedWindow {
    pub(crate) fn new(kind: WindowKind, limit: u32, period: Duration, now: Instant) -> Self {
        Self {
            kind,
            limit,
            period,
            start: now,
            count: 0,
        }
    }

    pub(crate) fn kind(&self) -> WindowKind {
        self.kind
    }

    pub(crate) fn limit(&self) -> u32 {
        self.limit
    }

    pub(crate) fn count(&self) -> u32 {
        self.count
    }

    /// Rolls the window forward if `now` is past its end.
    pub(crate) fn refresh(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.start);
        if elapsed < self.period {
            return;
        }
        let periods = elapsed.as_nanos() / self.period.as_nanos().max(1);
        // Saturate rather than overflow for absurd gaps; the window is fresh either way.
        let skip = u32::try_from(periods).unwrap_or(u32::MAX);
        self.start = self
            .start
            .checked_add(self.period.saturating_mul(skip))
            .unwrap_or(now);
        self.count = 0;
    }

    pub(crate) fn has_capacity(&self) -> bool {
        self.count < self.limit
    }

    pub(crate) fn consume(&mut self) {
        self.count += 1;
    }

    pub(crate) fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.count)
    }

    /// Time until the current window ends.
    pub(crate) fn resets_in(&self, now: Instant) -> Duration {
        (self.start + self.period).saturating_duration_since(now)
    }

    /// True once the window has ended with nothing counted since.
    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.start) >= self.period
    }
}
