use std::time::Duration;

use crate::foundation::error::{DocsealError, DocsealResult};

/// Bounded fixed-delay retry policy: `max_retries` sleeps of `delay_ms` each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Delay between polls, in milliseconds.
    pub delay_ms: u64,
    /// Polls after the first one before giving up.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay_ms: 100,
            max_retries: 50,
        }
    }
}

impl RetryPolicy {
    /// Delay between polls.
    pub fn delay(self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Worst-case total wait.
    pub fn budget(self) -> Duration {
        self.delay() * self.max_retries
    }
}

/// Anything that can report how many slides are currently mounted.
pub trait SlideCounter {
    /// Number of slides available right now.
    fn slide_count(&self) -> usize;
}

/// Wait until `counter` reports at least `min_count` slides.
///
/// Polls immediately, then sleeps `policy.delay()` between polls (timer-based, never
/// busy-waiting). Returns the observed count, or [`DocsealError::RenderTimeout`] once the retry
/// budget is spent.
pub async fn wait_for_slides<P: SlideCounter + ?Sized>(
    counter: &P,
    min_count: usize,
    policy: RetryPolicy,
) -> DocsealResult<usize> {
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let count = counter.slide_count();
        if count >= min_count {
            return Ok(count);
        }
        if attempts > policy.max_retries {
            return Err(DocsealError::RenderTimeout { attempts });
        }
        tokio::time::sleep(policy.delay()).await;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/wait.rs"]
mod tests;
