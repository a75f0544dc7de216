//! Basic usage examples for DefaultObjectPool

use atomic_objectpool::{
    DefaultObjectPool, DefaultPooledObjectPolicy, PoolConfiguration, StringPooledObjectPolicy,
};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    println!("=== atomic_objectpool - Basic Examples ===\n");

    // Example 1: Acquire and release by hand
    simple_pool();

    // Example 2: RAII guard
    guarded_pool();

    // Example 3: Capacity limit
    capacity_limit();

    // Example 4: Metrics
    metrics();
}

fn simple_pool() {
    println!("1. Simple Pool:");
    let pool = DefaultObjectPool::new(DefaultPooledObjectPolicy::<Vec<u8>>::new());

    let mut buf = pool.acquire();
    buf.extend_from_slice(b"hello");
    println!("   Got buffer: {:?}", buf);
    pool.release(buf);

    println!("   Retained after release: {}\n", pool.retained_count());
}

fn guarded_pool() {
    println!("2. Guarded Pool:");
    let pool = DefaultObjectPool::new(StringPooledObjectPolicy::default());

    {
        let mut s = pool.get();
        s.push_str("scratch text");
        println!("   Using: {}", *s);
        // String automatically returned (and cleared) when dropped
    }

    println!("   Retained after drop: {}", pool.retained_count());
    println!("   Reused string is empty: {}\n", pool.acquire().is_empty());
}

fn capacity_limit() {
    println!("3. Capacity Limit:");
    let config = PoolConfiguration::new().with_maximum_retained(2);
    let pool =
        DefaultObjectPool::with_configuration(DefaultPooledObjectPolicy::<u64>::new(), config)
            .unwrap();

    let items: Vec<_> = (0..4).map(|_| pool.acquire()).collect();
    for item in items {
        pool.release(item);
    }

    println!("   Released 4, retained {}\n", pool.retained_count());
}

fn metrics() {
    println!("4. Metrics:");
    let pool = DefaultObjectPool::new(DefaultPooledObjectPolicy::<Vec<u8>>::new());

    for _ in 0..10 {
        let _buf = pool.get();
    }

    let metrics = pool.get_metrics();
    println!("   Hit rate: {:.1}%", metrics.hit_rate() * 100.0);
    for (key, value) in pool.export_metrics() {
        println!("     {}: {}", key, value);
    }
}
