use std::time::Duration;

/// Exponential delay between failed restart cycles.
///
/// The delay for the (i+1)-th consecutive failure is `min(base * 2^i, max)`.
#[derive(Debug, Clone)]
pub struct RestartScheduler {
    failures: u32,
    base: Duration,
    max: Duration,
}

impl RestartScheduler {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            failures: 0,
            base,
            max,
        }
    }

    /// Delay to sleep before the next attempt.
    pub fn next_delay(&self) -> Duration {
        let factor = 1u32 << self.failures.min(31);
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Record a failed cycle.
    pub fn fail(&mut self) {
        self.failures = self.failures.saturating_add(1);
    }

    /// Back to `base` once a session produced output.
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> RestartScheduler {
        RestartScheduler::new(Duration::from_secs(3), Duration::from_secs(30))
    }

    #[test]
    fn doubles_up_to_cap() {
        let mut s = scheduler();
        let mut delays = Vec::new();
        for _ in 0..6 {
            delays.push(s.next_delay().as_secs());
            s.fail();
        }
        assert_eq!(delays, vec![3, 6, 12, 24, 30, 30]);
    }

    #[test]
    fn reset_returns_to_base() {
        let mut s = scheduler();
        s.fail();
        s.fail();
        assert_eq!(s.next_delay(), Duration::from_secs(12));
        s.reset();
        assert_eq!(s.failures(), 0);
        assert_eq!(s.next_delay(), Duration::from_secs(3));
    }

    #[test]
    fn many_failures_do_not_overflow() {
        let mut s = scheduler();
        for _ in 0..200 {
            s.fail();
        }
        assert_eq!(s.next_delay(), Duration::from_secs(30));
    }
}
