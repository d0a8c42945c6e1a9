//! Reconnect backoff schedule.

use std::time::Duration;

/// Exponential backoff parameters for reconnect attempts.
///
/// The delay before the `attempt`-th reconnect (1-based) is
/// `base * factor^attempt`, clamped to `cap`. Attempts are unlimited;
/// once the cap is reached every further attempt waits `cap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub factor: u32,
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            factor: 2,
            cap: Duration::from_secs(30),
        }
    }
}

impl BackoffPolicy {
    /// Delay to wait before the given reconnect attempt (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.min(63);
        let scale = (self.factor as u64).saturating_pow(exp);
        let millis = (self.base.as_millis() as u64).saturating_mul(scale);
        Duration::from_millis(millis).min(self.cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_until_cap() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(2), Duration::from_secs(2));
        assert_eq!(policy.delay(3), Duration::from_secs(4));
        assert_eq!(policy.delay(4), Duration::from_secs(8));
        assert_eq!(policy.delay(5), Duration::from_secs(16));
    }

    #[test]
    fn sixth_attempt_hits_the_cap() {
        let policy = BackoffPolicy::default();
        // 500ms * 2^6 = 32s, clamped to the 30s cap.
        assert_eq!(policy.delay(6), Duration::from_secs(30));
    }

    #[test]
    fn cap_holds_for_all_later_attempts() {
        let policy = BackoffPolicy::default();
        for attempt in 7..100 {
            assert_eq!(policy.delay(attempt), Duration::from_secs(30));
        }
    }

    #[test]
    fn huge_attempt_numbers_do_not_overflow() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(30));
    }
}
