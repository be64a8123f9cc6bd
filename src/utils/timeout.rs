//! Timeout validation for configured browser steps

use std::time::Duration;
use tracing::warn;

/// Maximum timeout for browser navigation (5 minutes)
pub const MAX_NAVIGATION_TIMEOUT_MS: u64 = 300_000;

/// Maximum timeout for a single readiness step (30 seconds)
pub const MAX_STEP_TIMEOUT_MS: u64 = 30_000;

/// Turn a configured navigation timeout into a `Duration`, clamping values
/// above [`MAX_NAVIGATION_TIMEOUT_MS`].
///
/// A zero value falls back to `default_ms`.
pub fn validate_navigation_timeout(timeout_ms: u64, default_ms: u64) -> Duration {
    clamp_timeout(timeout_ms, default_ms, MAX_NAVIGATION_TIMEOUT_MS, "navigation")
}

/// Same as [`validate_navigation_timeout`] for per-step waits.
pub fn validate_step_timeout(timeout_ms: u64, default_ms: u64) -> Duration {
    clamp_timeout(timeout_ms, default_ms, MAX_STEP_TIMEOUT_MS, "step")
}

fn clamp_timeout(timeout_ms: u64, default_ms: u64, max_ms: u64, label: &str) -> Duration {
    let ms = if timeout_ms == 0 { default_ms } else { timeout_ms };

    if ms > max_ms {
        warn!(
            "Configured {} timeout of {}ms exceeds {}ms, clamping",
            label, ms, max_ms
        );
        return Duration::from_millis(max_ms);
    }

    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_uses_default() {
        assert_eq!(validate_navigation_timeout(0, 30_000), Duration::from_secs(30));
    }

    #[test]
    fn oversized_values_are_clamped() {
        assert_eq!(
            validate_navigation_timeout(900_000, 30_000),
            Duration::from_millis(MAX_NAVIGATION_TIMEOUT_MS)
        );
        assert_eq!(
            validate_step_timeout(60_000, 2_000),
            Duration::from_millis(MAX_STEP_TIMEOUT_MS)
        );
    }

    #[test]
    fn in_range_values_pass_through() {
        assert_eq!(validate_step_timeout(2_500, 2_000), Duration::from_millis(2_500));
    }
}
