use std::cell::Cell;
use std::time::Duration;

use super::*;

struct Counting {
    polls: Cell<u32>,
    appear_after: Option<u32>,
}

impl SlideCounter for Counting {
    fn slide_count(&self) -> usize {
        let n = self.polls.get() + 1;
        self.polls.set(n);
        match self.appear_after {
            Some(k) if n > k => 3,
            _ => 0,
        }
    }
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_bounded_retries() {
    let counter = Counting {
        polls: Cell::new(0),
        appear_after: None,
    };
    let start = tokio::time::Instant::now();
    let err = wait_for_slides(&counter, 1, RetryPolicy::default())
        .await
        .unwrap_err();

    assert!(matches!(err, DocsealError::RenderTimeout { attempts: 51 }));
    assert_eq!(counter.polls.get(), 51);
    let waited = start.elapsed();
    assert!(waited >= Duration::from_millis(5000) && waited < Duration::from_millis(5100));
    assert_eq!(RetryPolicy::default().budget(), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn returns_as_soon_as_slides_appear() {
    let counter = Counting {
        polls: Cell::new(0),
        appear_after: Some(4),
    };
    let start = tokio::time::Instant::now();
    let n = wait_for_slides(&counter, 2, RetryPolicy::default())
        .await
        .unwrap();
    assert_eq!(n, 3);
    assert_eq!(counter.polls.get(), 5);
    let waited = start.elapsed();
    assert!(waited >= Duration::from_millis(400) && waited < Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn zero_retries_polls_once() {
    let counter = Counting {
        polls: Cell::new(0),
        appear_after: None,
    };
    let policy = RetryPolicy {
        delay_ms: 100,
        max_retries: 0,
    };
    assert!(wait_for_slides(&counter, 1, policy).await.is_err());
    assert_eq!(counter.polls.get(), 1);
}
