use std::time::Duration;

use super::*;

#[test]
fn abort_is_visible_to_all_signals() {
    let (handle, a) = AbortHandle::new();
    let b = handle.signal();
    assert!(!a.is_aborted());
    handle.abort();
    handle.abort();
    assert!(a.is_aborted());
    assert!(b.is_aborted());
}

#[test]
fn never_signal_stays_clear() {
    assert!(!AbortSignal::never().is_aborted());
    assert!(!AbortSignal::default().is_aborted());
}

#[tokio::test(start_paused = true)]
async fn aborted_future_resolves_after_abort() {
    let (handle, signal) = AbortHandle::new();
    let waiter = tokio::spawn(async move { signal.aborted().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!waiter.is_finished());
    handle.abort();
    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn dropped_handle_never_resolves() {
    let (handle, signal) = AbortHandle::new();
    drop(handle);
    let res = tokio::time::timeout(Duration::from_secs(5), signal.aborted()).await;
    assert!(res.is_err());
}
