//! Thirty tasks sleep, then each spawns a child that sleeps again and
//! bumps a shared counter. With four-second and one-second sleeps the
//! whole run takes about five seconds of wall clock, demonstrating that
//! every timer overlaps.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn main() {
    let runtime = remex::RuntimeBuilder::new().worker_threads(8).build();
    let counter = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    let count = counter.clone();
    runtime
        .block_on(async move {
            for _ in 0..30 {
                let count = count.clone();
                remex::spawn(async move {
                    remex::time::sleep(Duration::from_secs(4)).await;
                    remex::spawn(async move {
                        remex::time::sleep(Duration::from_secs(1)).await;
                        count.fetch_add(1, Ordering::Relaxed);
                    });
                });
            }
        })
        .expect("runtime error");

    println!(
        "elapsed: {}ms, counter: {}",
        start.elapsed().as_millis(),
        counter.load(Ordering::Relaxed)
    );
}
