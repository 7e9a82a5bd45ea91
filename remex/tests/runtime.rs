use remex::{spawn, RuntimeBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn block_on_returns_the_value() {
    let rt = RuntimeBuilder::new().worker_threads(1).build();

    let result = rt.block_on(async { 42 }).unwrap();
    assert_eq!(result, 42);
}

#[test]
fn inline_flavor_runs_on_the_calling_thread() {
    let rt = RuntimeBuilder::inline().build();
    let caller = std::thread::current().id();

    let ran_on = rt
        .block_on(async move { std::thread::current().id() })
        .unwrap();

    assert_eq!(ran_on, caller);
}

#[test]
fn join_handles_carry_values() {
    let rt = RuntimeBuilder::new().worker_threads(4).build();

    let result = rt
        .block_on(async {
            let handle = spawn(async {
                let inner = spawn(async { 10 });
                inner.await + 20
            });
            handle.await + 30
        })
        .unwrap();

    assert_eq!(result, 60);
}

#[test]
fn parallel_spawns_all_complete() {
    let rt = RuntimeBuilder::new().worker_threads(4).build();
    let counter = Arc::new(AtomicUsize::new(0));

    let count = counter.clone();
    rt.block_on(async move {
        let handles: Vec<_> = (0..50)
            .map(|_| {
                let count = count.clone();
                spawn(async move {
                    count.fetch_add(1, Ordering::Relaxed);
                })
            })
            .collect();

        for handle in handles {
            handle.await;
        }
    })
    .unwrap();

    assert_eq!(counter.load(Ordering::Relaxed), 50);
}

#[test]
fn sequential_runtimes_are_independent() {
    for n in 1..=4 {
        let rt = RuntimeBuilder::new().worker_threads(n).build();
        let result = rt.block_on(async move { n * 10 }).unwrap();
        assert_eq!(result, n * 10);
        drop(rt);
    }
}

#[test]
#[should_panic(expected = "worker_threads must be > 0")]
fn zero_worker_threads_panics() {
    let _ = RuntimeBuilder::new().worker_threads(0).build();
}

#[remex::test]
async fn yield_now_resumes() {
    remex::yield_now().await;
    remex::yield_now().await;
}

#[remex::test(worker_threads = 2)]
async fn test_macro_accepts_options() {
    let handle = spawn(async { "ok" });
    assert_eq!(handle.await, "ok");
}

#[remex::test(flavor = "inline")]
async fn test_macro_inline_flavor() {
    let handle = spawn(async { 7 });
    assert_eq!(handle.await, 7);
}
