use remex::time::{sleep, timeout, Elapsed};
use remex::{spawn, RuntimeBuilder};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[remex::test]
async fn sleep_waits_at_least_the_duration() {
    let start = Instant::now();
    sleep(Duration::from_millis(50)).await;

    assert!(start.elapsed() >= Duration::from_millis(50));
}

#[remex::test]
async fn zero_duration_sleep_is_immediate() {
    let start = Instant::now();
    sleep(Duration::from_millis(0)).await;

    assert!(start.elapsed() < Duration::from_millis(100));
}

/// Timers must fire in expiry order regardless of the order the sleeps
/// were spawned in.
#[test]
fn timers_fire_in_expiry_order() {
    let rt = RuntimeBuilder::inline().build();
    let order = Arc::new(Mutex::new(Vec::new()));

    let recorded = order.clone();
    rt.block_on(async move {
        let handles: Vec<_> = [30u64, 10, 20]
            .into_iter()
            .map(|ms| {
                let order = recorded.clone();
                spawn(async move {
                    sleep(Duration::from_millis(ms)).await;
                    order.lock().unwrap().push(ms);
                })
            })
            .collect();

        for handle in handles {
            handle.await;
        }
    })
    .unwrap();

    assert_eq!(*order.lock().unwrap(), vec![10, 20, 30]);
}

/// Cancelling a long timer must not keep the drive loop alive: the
/// deadline is ten seconds away, yet `block_on` returns promptly.
#[test]
fn cancelled_timer_never_fires() {
    let rt = RuntimeBuilder::new().worker_threads(1).build();

    let start = Instant::now();
    let result = rt
        .block_on(async {
            // Polls the long sleep once (registering its timer), then
            // the short deadline wins and drops it.
            timeout(Duration::from_millis(1), sleep(Duration::from_secs(10))).await
        })
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(result, Err(Elapsed));
    assert!(
        elapsed < Duration::from_secs(2),
        "cancelled timer stalled the drive loop for {elapsed:?}"
    );
}

#[remex::test]
async fn timeout_passes_through_a_fast_future() {
    let value = timeout(Duration::from_secs(1), async { 5 }).await;
    assert_eq!(value, Ok(5));
}

#[remex::test]
async fn concurrent_sleeps_overlap() {
    let start = Instant::now();

    let handles: Vec<_> = (0..10)
        .map(|_| spawn(async { sleep(Duration::from_millis(50)).await }))
        .collect();

    for handle in handles {
        handle.await;
    }

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(50));
    assert!(
        elapsed < Duration::from_millis(500),
        "ten 50ms sleeps must overlap, got {elapsed:?}"
    );
}
