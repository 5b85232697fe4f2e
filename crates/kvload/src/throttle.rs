//! Self-throttling policies
//!
//! The loader consults a [`Throttle`] after dispatching every line. A
//! returned duration pauses the whole pipeline: in-flight records are
//! settled, counters are reported, and the next line is read only after the
//! pause. None of the policies observe store latency or throttling
//! responses; they bound the request rate from the client side only.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Decides when the pipeline pauses
pub trait Throttle: Send {
    /// Called once per dispatched line with the running processed count
    fn after_line(&mut self, processed: u64) -> Option<Duration>;
}

impl<T: Throttle + ?Sized> Throttle for Box<T> {
    fn after_line(&mut self, processed: u64) -> Option<Duration> {
        (**self).after_line(processed)
    }
}

/// Pause for a fixed delay after every `every` lines
#[derive(Debug, Clone)]
pub struct FixedIntervalPause {
    every: u64,
    delay: Duration,
}

impl FixedIntervalPause {
    pub fn new(every: u64, delay: Duration) -> Self {
        Self { every, delay }
    }
}

impl Throttle for FixedIntervalPause {
    fn after_line(&mut self, processed: u64) -> Option<Duration> {
        if self.every > 0 && processed > 0 && processed % self.every == 0 && !self.delay.is_zero() {
            Some(self.delay)
        } else {
            None
        }
    }
}

/// Token bucket: `rate` lines per second on average, bursts up to `burst`
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(rate_per_sec: u32, burst: u32) -> Self {
        let capacity = f64::from(burst.max(1));
        Self {
            capacity,
            tokens: capacity,
            rate: f64::from(rate_per_sec.max(1)),
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_refill = now;
    }
}

impl Throttle for TokenBucket {
    fn after_line(&mut self, _processed: u64) -> Option<Duration> {
        self.refill();
        self.tokens -= 1.0;

        if self.tokens >= 0.0 {
            return None;
        }

        // Debt is repaid by the refill that follows the pause
        Some(Duration::from_secs_f64(-self.tokens / self.rate))
    }
}

/// Never pauses
#[derive(Debug, Clone, Copy, Default)]
pub struct Unthrottled;

impl Throttle for Unthrottled {
    fn after_line(&mut self, _processed: u64) -> Option<Duration> {
        None
    }
}

/// Throttle policy selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ThrottleKind {
    /// Pause `pause_secs` after every `batch_size` lines
    #[default]
    Fixed,
    /// Token bucket at `rate_per_sec` with a burst of `batch_size`
    TokenBucket,
    None,
}

impl std::str::FromStr for ThrottleKind {
    type Err = kvload_common::KvloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(ThrottleKind::Fixed),
            "token-bucket" | "token_bucket" | "tokenbucket" => Ok(ThrottleKind::TokenBucket),
            "none" | "off" => Ok(ThrottleKind::None),
            _ => Err(kvload_common::KvloadError::parse("throttle", s)),
        }
    }
}

impl std::fmt::Display for ThrottleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThrottleKind::Fixed => write!(f, "fixed"),
            ThrottleKind::TokenBucket => write!(f, "token-bucket"),
            ThrottleKind::None => write!(f, "none"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_pauses_on_batch_boundaries() {
        let mut throttle = FixedIntervalPause::new(100, Duration::from_secs(3));

        assert_eq!(throttle.after_line(1), None);
        assert_eq!(throttle.after_line(99), None);
        assert_eq!(throttle.after_line(100), Some(Duration::from_secs(3)));
        assert_eq!(throttle.after_line(101), None);
        assert_eq!(throttle.after_line(200), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_fixed_with_zero_delay_never_pauses() {
        let mut throttle = FixedIntervalPause::new(10, Duration::ZERO);
        assert!((1..=100).all(|n| throttle.after_line(n).is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_bucket_allows_burst_then_paces() {
        let mut bucket = TokenBucket::new(10, 5);

        for n in 1..=5 {
            assert_eq!(bucket.after_line(n), None, "line {} is within the burst", n);
        }

        let wait = bucket.after_line(6).unwrap();
        assert_eq!(wait, Duration::from_millis(100));

        tokio::time::sleep(wait).await;
        // The pause repaid the debt; the next line needs another token
        let wait = bucket.after_line(7).unwrap();
        assert!(wait <= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_bucket_refills_over_time() {
        let mut bucket = TokenBucket::new(10, 5);
        for n in 1..=5 {
            bucket.after_line(n);
        }

        tokio::time::advance(Duration::from_secs(1)).await;
        for n in 6..=10 {
            assert_eq!(bucket.after_line(n), None);
        }
    }

    #[test]
    fn test_unthrottled() {
        let mut throttle = Unthrottled;
        assert_eq!(throttle.after_line(100), None);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("fixed".parse::<ThrottleKind>().unwrap(), ThrottleKind::Fixed);
        assert_eq!(
            "token-bucket".parse::<ThrottleKind>().unwrap(),
            ThrottleKind::TokenBucket
        );
        assert_eq!("off".parse::<ThrottleKind>().unwrap(), ThrottleKind::None);
        assert!("adaptive".parse::<ThrottleKind>().is_err());
    }
}
