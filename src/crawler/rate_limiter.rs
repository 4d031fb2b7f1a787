//! Request pacing
//!
//! Every outbound request, search page or listing, first or retry, goes
//! through [`RateLimiter::wait`]. The limiter remembers when the previous
//! request was let through and sleeps until a freshly drawn delay has
//! elapsed since then.
//!
//! The drawn delay is scaled by an adaptive slowdown factor. A blocked
//! response or a streak of failures doubles it; a streak of successes eases
//! it back toward the configured pace, never below it.

use crate::config::CrawlerConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::time::Instant;

/// Consecutive failures that double the slowdown
const FAILURE_STREAK: u32 = 3;

/// Consecutive successes that ease the slowdown once
const SUCCESS_STREAK: u32 = 5;

const EASE_FACTOR: f64 = 0.8;

/// Largest multiple of the configured delay the limiter will keep
pub const MAX_SLOWDOWN: f64 = 8.0;

/// How long to keep between two requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayPolicy {
    /// Always the same delay
    Fixed(Duration),
    /// Uniformly drawn from `[min, max]` for every request
    Uniform { min: Duration, max: Duration },
}

impl DelayPolicy {
    /// Builds the policy from the crawler's delay bounds
    ///
    /// Equal bounds give a fixed delay; otherwise the delay is drawn from
    /// the range on every call.
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self::from_bounds(
            Duration::from_millis(config.min_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Builds the policy from explicit bounds, swapping them if inverted
    pub fn from_bounds(min: Duration, max: Duration) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        if min == max {
            Self::Fixed(min)
        } else {
            Self::Uniform { min, max }
        }
    }

    /// Draws the next delay
    fn draw<R: Rng>(&self, rng: &mut R) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Uniform { min, max } => {
                let millis = rng.gen_range(min.as_millis()..=max.as_millis());
                Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
            }
        }
    }

    /// Smallest delay the policy can produce
    pub fn min(&self) -> Duration {
        match *self {
            Self::Fixed(delay) => delay,
            Self::Uniform { min, .. } => min,
        }
    }
}

/// Sequential request pacer
///
/// # Example
///
/// ```no_run
/// use listing_harvest::crawler::{DelayPolicy, RateLimiter};
/// use std::time::Duration;
///
/// # async fn example() {
/// let mut limiter = RateLimiter::new(DelayPolicy::Fixed(Duration::from_secs(2)));
/// limiter.wait().await; // first request goes out immediately
/// limiter.wait().await; // second one two seconds later
/// # }
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    policy: DelayPolicy,
    /// Lower bound applied on top of the policy (robots.txt Crawl-delay)
    floor: Duration,
    /// Earliest instant the next request may leave, set after a block
    cooldown_until: Option<Instant>,
    /// Multiplier on the drawn delay, in `[1, MAX_SLOWDOWN]`
    slowdown: f64,
    consecutive_successes: u32,
    consecutive_failures: u32,
    last_request: Option<Instant>,
    rng: StdRng,
}

impl RateLimiter {
    /// Creates a limiter seeded from the OS
    pub fn new(policy: DelayPolicy) -> Self {
        Self::with_rng(policy, StdRng::from_entropy())
    }

    /// Creates a limiter with a deterministic random sequence
    pub fn with_seed(policy: DelayPolicy, seed: u64) -> Self {
        Self::with_rng(policy, StdRng::seed_from_u64(seed))
    }

    fn with_rng(policy: DelayPolicy, rng: StdRng) -> Self {
        Self {
            policy,
            floor: Duration::ZERO,
            cooldown_until: None,
            slowdown: 1.0,
            consecutive_successes: 0,
            consecutive_failures: 0,
            last_request: None,
            rng,
        }
    }

    /// Active delay policy
    pub fn policy(&self) -> DelayPolicy {
        self.policy
    }

    /// Draws the delay the next request will keep from the previous one
    pub fn next_delay(&mut self) -> Duration {
        let drawn = self.policy.draw(&mut self.rng);
        let scaled = Duration::try_from_secs_f64(drawn.as_secs_f64() * self.slowdown)
            .unwrap_or(Duration::MAX);
        scaled.max(self.floor)
    }

    /// Suspends until the next request is permitted, then records it
    ///
    /// The first call returns immediately unless a cooldown is pending.
    pub async fn wait(&mut self) {
        let mut target = match self.last_request {
            Some(last) => Some(last + self.next_delay()),
            None => None,
        };

        if let Some(cooldown) = self.cooldown_until.take() {
            target = Some(target.map_or(cooldown, |t| t.max(cooldown)));
        }

        if let Some(target) = target {
            let now = Instant::now();
            if target > now {
                tracing::trace!("Rate limiter sleeping {:?}", target - now);
                tokio::time::sleep_until(target).await;
            }
        }

        self.last_request = Some(Instant::now());
    }

    /// Records a request that produced a page
    ///
    /// Every [`SUCCESS_STREAK`] successes in a row ease the slowdown by 20%.
    pub fn on_success(&mut self) {
        self.consecutive_failures = 0;
        self.consecutive_successes += 1;

        if self.consecutive_successes >= SUCCESS_STREAK && self.slowdown > 1.0 {
            self.consecutive_successes = 0;
            self.slowdown = (self.slowdown * EASE_FACTOR).max(1.0);
            tracing::debug!("Pacing eased, delay now x{:.2}", self.slowdown);
        }
    }

    /// Records a request that failed without being blocked
    ///
    /// Every [`FAILURE_STREAK`] failures in a row double the slowdown.
    pub fn on_failure(&mut self) {
        self.consecutive_successes = 0;
        self.consecutive_failures += 1;

        if self.consecutive_failures >= FAILURE_STREAK {
            self.consecutive_failures = 0;
            self.slow_down();
        }
    }

    /// Pushes the next request back by at least `cooldown` from now and
    /// doubles the slowdown for the requests after it
    pub fn on_blocked(&mut self, cooldown: Duration) {
        let until = Instant::now() + cooldown;
        self.cooldown_until = Some(match self.cooldown_until {
            Some(existing) => existing.max(until),
            None => until,
        });
        self.consecutive_successes = 0;
        self.consecutive_failures = 0;
        tracing::debug!("Blocked response, next request deferred by {:?}", cooldown);
        self.slow_down();
    }

    fn slow_down(&mut self) {
        let next = (self.slowdown * 2.0).min(MAX_SLOWDOWN);
        if next > self.slowdown {
            self.slowdown = next;
            tracing::warn!("Slowing down, delay between requests now x{:.2}", self.slowdown);
        }
    }

    /// Current multiplier on the configured delay
    pub fn slowdown(&self) -> f64 {
        self.slowdown
    }

    /// Raises the minimum delay between requests
    ///
    /// Used for a robots.txt Crawl-delay; never lowers an existing floor.
    pub fn raise_floor(&mut self, floor: Duration) {
        if floor > self.floor {
            tracing::info!("Minimum delay between requests raised to {:?}", floor);
            self.floor = floor;
        }
    }

    /// Current minimum delay between requests
    pub fn floor(&self) -> Duration {
        self.floor.max(self.policy.min())
    }
}
