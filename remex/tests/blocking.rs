use remex::{spawn, spawn_blocking, RuntimeBuilder};
use rstest::rstest;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[rstest]
#[case::multi_thread(RuntimeBuilder::new().worker_threads(2))]
#[case::inline(RuntimeBuilder::inline())]
fn blocking_closure_returns_its_value(#[case] builder: RuntimeBuilder) {
    let rt = builder.build();

    let value = rt
        .block_on(async {
            spawn_blocking(|| {
                std::thread::sleep(Duration::from_millis(50));
                42
            })
            .await
        })
        .unwrap();

    assert_eq!(value, 42);
}

/// A thread-blocking call must not stall the reactor: a shorter timer
/// racing the blocking work finishes first.
#[rstest]
#[case::multi_thread(RuntimeBuilder::new().worker_threads(2))]
#[case::inline(RuntimeBuilder::inline())]
fn blocking_work_does_not_stall_timers(#[case] builder: RuntimeBuilder) {
    let rt = builder.build();
    let start = Instant::now();
    let sleep_done = Arc::new(Mutex::new(None));

    let recorded = sleep_done.clone();
    let blocking_done = rt
        .block_on(async move {
            let timer = spawn(async move {
                remex::time::sleep(Duration::from_millis(50)).await;
                *recorded.lock().unwrap() = Some(start.elapsed());
            });

            let value = spawn_blocking(move || {
                std::thread::sleep(Duration::from_millis(150));
                start.elapsed()
            })
            .await;

            timer.await;
            value
        })
        .unwrap();

    let sleep_done = sleep_done.lock().unwrap().expect("timer task must run");
    assert!(
        sleep_done < blocking_done,
        "the 50ms sleep ({sleep_done:?}) must beat the 150ms blocking call ({blocking_done:?})"
    );
}

#[remex::test]
async fn blocking_calls_run_concurrently() {
    let start = Instant::now();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            spawn(async {
                spawn_blocking(|| std::thread::sleep(Duration::from_millis(100))).await;
            })
        })
        .collect();

    for handle in handles {
        handle.await;
    }

    // The pool grows past one thread for this backlog, so eight 100ms
    // jobs take well under eight times as long.
    let elapsed = start.elapsed();
    assert!(
        elapsed < Duration::from_millis(700),
        "blocking pool failed to grow, got {elapsed:?}"
    );
}

#[remex::test]
async fn fs_roundtrip() {
    let path = std::env::temp_dir().join(format!("remex-fs-test-{}", std::process::id()));

    remex::fs::write(&path, "hello from the blocking pool")
        .await
        .unwrap();
    let text = remex::fs::read_to_string(&path).await.unwrap();
    let bytes = remex::fs::read(&path).await.unwrap();

    assert_eq!(text, "hello from the blocking pool");
    assert_eq!(bytes, text.as_bytes());

    let _ = std::fs::remove_file(&path);
}
