//! Bounded exponential backoff for rate-limited platform calls
//!
//! After the retry cap the update is abandoned and the error propagates for
//! the caller to log; nothing blocks the event pipeline waiting on one
//! message.

use rand::Rng;
use std::time::Duration;

/// Maximum retries for a rate-limited call
pub const MAX_RETRIES: u32 = 3;

/// Base delay applied when the platform gives no retry-after hint
const BASE_DELAY_MS: u64 = 500;

/// Ceiling on any single delay
const MAX_DELAY_MS: u64 = 15_000;

/// Compute the delay before retry `attempt` (0-based), honouring the
/// platform's retry-after hint when present and adding jitter to spread
/// concurrent retries.
pub fn retry_delay(attempt: u32, retry_after_ms: Option<u64>) -> Duration {
    let base = retry_after_ms.unwrap_or(BASE_DELAY_MS << attempt).min(MAX_DELAY_MS);
    let jitter = rand::thread_rng().gen_range(0..=base / 4);
    Duration::from_millis(base + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_with_attempts() {
        let d0 = retry_delay(0, None);
        let d2 = retry_delay(2, None);
        assert!(d0.as_millis() >= 500);
        assert!(d2.as_millis() >= 2000);
    }

    #[test]
    fn test_retry_after_hint_wins() {
        let d = retry_delay(0, Some(1200));
        assert!(d.as_millis() >= 1200 && d.as_millis() <= 1500);
    }

    #[test]
    fn test_delay_is_capped() {
        let d = retry_delay(10, None);
        assert!(d.as_millis() <= (MAX_DELAY_MS + MAX_DELAY_MS / 4) as u128);
    }
}
