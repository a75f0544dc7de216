//! Sharing one pool between threads and tokio tasks

use atomic_objectpool::{DefaultObjectPool, VecPooledObjectPolicy};
use std::sync::Arc;
use std::thread;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== atomic_objectpool - Concurrent Examples ===\n");

    // Example 1: OS threads
    threads();

    // Example 2: tokio tasks
    tasks().await;
}

fn threads() {
    println!("1. Threads:");
    let pool = DefaultObjectPool::with_maximum_retained(VecPooledObjectPolicy::<u8>::default(), 8)
        .unwrap();

    thread::scope(|s| {
        for id in 0..4u8 {
            let pool = &pool;
            s.spawn(move || {
                for _ in 0..1_000 {
                    let mut buf = pool.get();
                    buf.push(id);
                }
            });
        }
    });

    let metrics = pool.get_metrics();
    println!(
        "   created: {}, hits: {}, retained: {}\n",
        metrics.total_created, metrics.total_hits, metrics.retained_objects
    );
}

async fn tasks() {
    println!("2. Tokio Tasks:");
    let pool = Arc::new(
        DefaultObjectPool::with_maximum_retained(VecPooledObjectPolicy::<u8>::default(), 8)
            .unwrap(),
    );

    let mut handles = Vec::new();
    for id in 0..8u8 {
        let pool = Arc::clone(&pool);
        handles.push(tokio::spawn(async move {
            for _ in 0..100 {
                let buf = {
                    let mut buf = pool.acquire();
                    buf.push(id);
                    buf
                };
                tokio::task::yield_now().await;
                pool.release(buf);
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }

    println!("   {}", pool.export_metrics_prometheus("tasks", None));
}
