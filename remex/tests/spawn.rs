use remex::{spawn, RuntimeBuilder};
use rstest::rstest;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Detached tasks must all finish before `block_on` returns, even when
/// the blocked future itself does nothing.
#[rstest]
#[case::multi_thread(RuntimeBuilder::new().worker_threads(4))]
#[case::inline(RuntimeBuilder::inline())]
fn block_on_drains_detached_tasks(#[case] builder: RuntimeBuilder) {
    let rt = builder.build();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..100 {
        let count = counter.clone();
        rt.spawn(async move {
            count.fetch_add(1, Ordering::Relaxed);
        });
    }

    rt.block_on(async {}).unwrap();

    assert_eq!(counter.load(Ordering::Relaxed), 100);
}

#[rstest]
#[case::multi_thread(RuntimeBuilder::new().worker_threads(4))]
#[case::inline(RuntimeBuilder::inline())]
fn dropped_handles_detach_without_cancelling(#[case] builder: RuntimeBuilder) {
    let rt = builder.build();
    let counter = Arc::new(AtomicUsize::new(0));

    let count = counter.clone();
    rt.block_on(async move {
        for _ in 0..10 {
            let count = count.clone();
            // The handle is dropped immediately; the task still runs.
            drop(spawn(async move {
                count.fetch_add(1, Ordering::Relaxed);
            }));
        }
    })
    .unwrap();

    assert_eq!(counter.load(Ordering::Relaxed), 10);
}

/// The sleep-then-spawn-a-child scenario: every task sleeps, spawns a
/// child that sleeps again and bumps the counter. The block must last
/// both sleep generations and see every child finish.
#[test]
fn sleeping_children_all_finish() {
    let rt = RuntimeBuilder::new().worker_threads(4).build();
    let counter = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let count = counter.clone();
    rt.block_on(async move {
        for _ in 0..30 {
            let count = count.clone();
            spawn(async move {
                remex::time::sleep(Duration::from_millis(40)).await;
                spawn(async move {
                    remex::time::sleep(Duration::from_millis(10)).await;
                    count.fetch_add(1, Ordering::Relaxed);
                });
            });
        }
    })
    .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(counter.load(Ordering::Relaxed), 30);
    assert!(
        elapsed >= Duration::from_millis(50),
        "both sleep generations must elapse, got {elapsed:?}"
    );
    assert!(
        elapsed < Duration::from_secs(5),
        "sleeps must run concurrently, got {elapsed:?}"
    );
}

#[remex::test]
async fn nested_spawns_complete() {
    let results = Arc::new(AtomicUsize::new(0));

    let outer: Vec<_> = (0..4)
        .map(|_| {
            let results = results.clone();
            spawn(async move {
                let inner: Vec<_> = (0..5)
                    .map(|_| {
                        let results = results.clone();
                        spawn(async move {
                            results.fetch_add(1, Ordering::Relaxed);
                        })
                    })
                    .collect();

                for handle in inner {
                    handle.await;
                }
            })
        })
        .collect();

    for handle in outer {
        handle.await;
    }

    assert_eq!(results.load(Ordering::Relaxed), 20);
}
