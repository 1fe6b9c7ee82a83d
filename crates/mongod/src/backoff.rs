use std::time::Duration;

const INITIAL_DELAY: Duration = Duration::from_millis(100);
const MAX_DELAY: Duration = Duration::from_secs(2);

/// Exponential delays between readiness probes: 100ms doubling up to 2s.
#[derive(Debug)]
pub(crate) struct Backoff {
    next: Duration,
}

impl Backoff {
    pub(crate) const fn new() -> Self {
        Self {
            next: INITIAL_DELAY,
        }
    }

    /// Next delay, shortened so it never runs past `remaining`.
    pub(crate) fn next_delay(&mut self, remaining: Duration) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(MAX_DELAY);

        delay.min(remaining)
    }
}
