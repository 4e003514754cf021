// Keyed GCRA rate limiter for the credential endpoints.
use governor::clock::{Clock, DefaultClock};
use governor::middleware::StateInformationMiddleware;
use governor::state::keyed::DashMapStateStore;
use governor::Quota;
use std::num::NonZeroU32;
use std::time::Duration;

/// Table size above which fully replenished keys are dropped before a check.
const PRUNE_THRESHOLD: usize = 10_000;

type KeyedLimiter<C> =
    governor::RateLimiter<String, DashMapStateStore<String>, C, StateInformationMiddleware>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// `max_requests` per `window` for each key. A key may burst the whole budget
/// at once, then regains one request every `window / max_requests`.
pub struct RateLimiter<C: Clock = DefaultClock> {
    inner: KeyedLimiter<C>,
    clock: C,
}

/// Zero budgets are raised to one request.
fn quota(max_requests: u32, window: Duration) -> Quota {
    let burst = NonZeroU32::new(max_requests).unwrap_or(NonZeroU32::MIN);
    Quota::with_period(window / burst.get())
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

impl RateLimiter<DefaultClock> {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self::with_clock(max_requests, window, DefaultClock::default())
    }
}

impl<C: Clock + Clone> RateLimiter<C> {
    pub fn with_clock(max_requests: u32, window: Duration, clock: C) -> Self {
        let inner = governor::RateLimiter::<_, _, _, governor::middleware::NoOpMiddleware<C::Instant>>::new(
            quota(max_requests, window),
            DashMapStateStore::default(),
            clock.clone(),
        )
        .with_middleware::<StateInformationMiddleware>();

        Self { inner, clock }
    }

    pub fn check(&self, key: &str) -> RateDecision {
        if self.inner.len() > PRUNE_THRESHOLD {
            self.inner.retain_recent();
        }

        match self.inner.check_key(&key.to_string()) {
            Ok(snapshot) => RateDecision::Allowed {
                remaining: snapshot.remaining_burst_capacity(),
            },
            Err(not_until) => RateDecision::Limited {
                retry_after: not_until.wait_time_from(self.clock.now()),
            },
        }
    }

    pub fn tracked_clients(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use governor::clock::FakeRelativeClock;

    fn limiter(max_requests: u32, window: Duration) -> (RateLimiter<FakeRelativeClock>, FakeRelativeClock) {
        let clock = FakeRelativeClock::default();
        (RateLimiter::with_clock(max_requests, window, clock.clone()), clock)
    }

    #[test]
    fn test_limits_after_max_requests() {
        let (limiter, _clock) = limiter(3, Duration::from_secs(60));

        assert_eq!(limiter.check("1.2.3.4"), RateDecision::Allowed { remaining: 2 });
        assert_eq!(limiter.check("1.2.3.4"), RateDecision::Allowed { remaining: 1 });
        assert_eq!(limiter.check("1.2.3.4"), RateDecision::Allowed { remaining: 0 });
        assert!(matches!(limiter.check("1.2.3.4"), RateDecision::Limited { .. }));
    }

    #[test]
    fn test_keys_are_independent() {
        let (limiter, _clock) = limiter(1, Duration::from_secs(60));

        assert!(matches!(limiter.check("a"), RateDecision::Allowed { .. }));
        assert!(matches!(limiter.check("b"), RateDecision::Allowed { .. }));
        assert!(matches!(limiter.check("a"), RateDecision::Limited { .. }));
    }

    #[test]
    fn test_retry_after_counts_down() {
        let (limiter, clock) = limiter(1, Duration::from_secs(10));

        assert!(matches!(limiter.check("ip"), RateDecision::Allowed { .. }));
        clock.advance(Duration::from_secs(4));
        match limiter.check("ip") {
            RateDecision::Limited { retry_after } => assert_eq!(retry_after, Duration::from_secs(6)),
            other => panic!("expected limit, got {:?}", other),
        }
        clock.advance(Duration::from_secs(6));
        assert!(matches!(limiter.check("ip"), RateDecision::Allowed { .. }));
    }

    #[test]
    fn test_zero_budget_still_allows_one_request() {
        let (limiter, _clock) = limiter(0, Duration::from_secs(60));

        assert_eq!(limiter.check("ip"), RateDecision::Allowed { remaining: 0 });
        assert!(matches!(limiter.check("ip"), RateDecision::Limited { .. }));
    }

    #[test]
    fn test_replenished_keys_are_pruned() {
        let (limiter, clock) = limiter(5, Duration::from_secs(1));

        for i in 0..=PRUNE_THRESHOLD {
            limiter.check(&format!("client-{}", i));
        }
        assert_eq!(limiter.tracked_clients(), PRUNE_THRESHOLD + 1);

        clock.advance(Duration::from_secs(5));
        limiter.check("late-client");
        assert_eq!(limiter.tracked_clients(), 1);
    }
}
