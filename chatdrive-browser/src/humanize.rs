//! Randomized timing for human-like input.

use chatdrive_common::DelayRange;
use rand::Rng;
use std::time::Duration;

/// Draw a delay from `range`, rounded to whole milliseconds.
pub fn sample(range: &DelayRange) -> Duration {
    let (min, max) = (range.min(), range.max());
    if max <= min {
        return min;
    }
    let millis = rand::thread_rng().gen_range(min.as_secs_f64()..=max.as_secs_f64()) * 1000.0;
    Duration::from_millis(millis.round() as u64)
}

/// Sleep for a random delay drawn from `range`.
pub async fn random_sleep(range: &DelayRange) {
    let delay = sample(range);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
