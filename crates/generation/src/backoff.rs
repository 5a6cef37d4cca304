use std::time::Duration;

use crate::config::RetryConfig;

/// Delay before retry number `retry` (0 for the first retry).
///
/// `base * 2^retry`, capped at `max_delay`. A backend hint such as
/// `Retry-After` raises the delay up to the same cap. With jitter enabled a
/// further 0-50% is added on top.
pub fn backoff_delay(cfg: &RetryConfig, retry: u32, hint: Option<Duration>) -> Duration {
    let max = cfg.max_delay_ms;
    let exponential = 2u64
        .checked_pow(retry)
        .and_then(|factor| cfg.base_delay_ms.checked_mul(factor))
        .unwrap_or(u64::MAX)
        .min(max);

    let hinted = hint
        .map(|h| u64::try_from(h.as_millis()).unwrap_or(u64::MAX).min(max))
        .unwrap_or(0);
    let delay = exponential.max(hinted);

    if cfg.jitter {
        let jitter = fastrand::u64(0..=delay / 2);
        Duration::from_millis(delay.saturating_add(jitter))
    } else {
        Duration::from_millis(delay)
    }
}
