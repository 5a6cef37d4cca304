use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Budget and length of one fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Requests admitted per window.
    pub limit: u32,
    /// Window length in seconds.
    pub period_secs: u64,
}

impl WindowConfig {
    pub const fn new(limit: u32, period_secs: u64) -> Self {
        Self { limit, period_secs }
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

/// Configuration for [`RateLimiter`](crate::RateLimiter).
///
/// The defaults are 50 requests per hour and 200 per day per client. The
/// optional burst window (10 per minute when enabled) is off unless set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    pub short: WindowConfig,
    pub long: WindowConfig,
    pub burst: Option<WindowConfig>,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            short: WindowConfig::new(50, 60 * 60),
            long: WindowConfig::new(200, 24 * 60 * 60),
            burst: None,
        }
    }
}

/// The burst window used by [`LimiterConfig::with_default_burst`].
pub const DEFAULT_BURST: WindowConfig = WindowConfig::new(10, 60);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LimiterConfigError {
    #[error("{0} window limit must be at least 1")]
    ZeroLimit(&'static str),
    #[error("{0} window period must be at least 1 second")]
    ZeroPeriod(&'static str),
}

impl LimiterConfig {
    pub fn with_short(mut self, limit: u32, period: Duration) -> Self {
        self.short = WindowConfig::new(limit, period.as_secs());
        self
    }

    pub fn with_long(mut self, limit: u32, period: Duration) -> Self {
        self.long = WindowConfig::new(limit, period.as_secs());
        self
    }

    pub fn with_burst(mut self, limit: u32, period: Duration) -> Self {
        self.burst = Some(WindowConfig::new(limit, period.as_secs()));
        self
    }

    pub fn with_default_burst(mut self) -> Self {
        self.burst = Some(DEFAULT_BURST);
        self
    }

    pub fn validate(&self) -> Result<(), LimiterConfigError> {
        let windows = [("short", Some(self.short)), ("long", Some(self.long)), ("burst", self.burst)];
        for (name, window) in windows {
            let Some(window) = window else { continue };
            if window.limit == 0 {
                return Err(LimiterConfigError::ZeroLimit(name));
            }
            if window.period_secs == 0 {
                return Err(LimiterConfigError::ZeroPeriod(name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_hourly_and_daily_budgets() {
        let cfg = LimiterConfig::default();
        assert_eq!(cfg.short, WindowConfig::new(50, 3600));
        assert_eq!(cfg.long, WindowConfig::new(200, 86_400));
        assert!(cfg.burst.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn builders_override_windows() {
        let cfg = LimiterConfig::default()
            .with_short(5, Duration::from_secs(10))
            .with_default_burst();
        assert_eq!(cfg.short.period(), Duration::from_secs(10));
        assert_eq!(cfg.burst, Some(DEFAULT_BURST));
    }

    #[test]
    fn validate_rejects_zero_values() {
        let cfg = LimiterConfig::default().with_long(0, Duration::from_secs(60));
        assert_eq!(cfg.validate(), Err(LimiterConfigError::ZeroLimit("long")));

        let cfg = LimiterConfig::default().with_burst(3, Duration::ZERO);
        assert_eq!(cfg.validate(), Err(LimiterConfigError::ZeroPeriod("burst")));
    }

    #[test]
    fn missing_windows_fall_back_to_defaults() {
        let cfg: LimiterConfig =
            serde_json::from_str(r#"{"short": {"limit": 3, "period_secs": 60}}"#).unwrap();
        assert_eq!(cfg.short.limit, 3);
        assert_eq!(cfg.long, LimiterConfig::default().long);
    }
}
