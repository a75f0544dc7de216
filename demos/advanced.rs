//! Advanced features: custom policies, providers, warm-up, Prometheus

use atomic_objectpool::{
    DefaultObjectPool, DefaultObjectPoolProvider, FnPooledObjectPolicy, ObjectPoolProvider,
    PoolConfiguration, PooledObjectPolicy,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug)]
struct Connection {
    id: usize,
    healthy: bool,
    data: String,
}

/// Hands out numbered connections and drops unhealthy ones on return
#[derive(Default)]
struct ConnectionPolicy {
    next_id: AtomicUsize,
}

impl PooledObjectPolicy<Connection> for ConnectionPolicy {
    fn create(&self) -> Connection {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Connection {
            id,
            healthy: true,
            data: format!("Connection-{}", id),
        }
    }

    fn on_return(&self, conn: &mut Connection) -> bool {
        conn.healthy
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    println!("=== atomic_objectpool - Advanced Features ===\n");

    // Example 1: Custom policy
    custom_policy();

    // Example 2: Provider
    provider();

    // Example 3: Warm-up
    warm_up();

    // Example 4: Prometheus metrics
    prometheus_export();
}

fn custom_policy() {
    println!("1. Custom Policy:");
    let pool = DefaultObjectPool::with_maximum_retained(ConnectionPolicy::default(), 4).unwrap();

    let conn = pool.acquire();
    println!("   Using #{}: {}", conn.id, conn.data);
    pool.release(conn);

    let mut broken = pool.acquire();
    broken.healthy = false;
    pool.release(broken);

    println!("   Retained after unhealthy return: {}", pool.retained_count());
    println!("   Next: {:?}\n", pool.acquire());
}

fn provider() {
    println!("2. Provider:");
    let provider =
        DefaultObjectPoolProvider::new(PoolConfiguration::new().with_maximum_retained(16)).unwrap();

    let strings = provider.create_string_pool();
    let counters = provider.create(FnPooledObjectPolicy::new(
        || 0u32,
        |n: &mut u32| {
            *n = 0;
            true
        },
    ));

    println!("   String pool capacity: {}", strings.maximum_retained());
    println!("   Counter pool capacity: {}\n", counters.maximum_retained());
}

fn warm_up() {
    println!("3. Warm-up:");
    let pool = DefaultObjectPool::with_maximum_retained(ConnectionPolicy::default(), 3).unwrap();

    let stored = pool.warm_up(10);
    println!("   Pre-created {} connections", stored);
    println!("   Created so far: {}\n", pool.get_metrics().total_created);
}

fn prometheus_export() {
    println!("4. Prometheus Metrics Export:");
    let pool = DefaultObjectPool::with_maximum_retained(ConnectionPolicy::default(), 4).unwrap();

    for _ in 0..5 {
        let _conn = pool.get();
    }

    let mut tags = HashMap::new();
    tags.insert("service".to_string(), "example".to_string());
    tags.insert("env".to_string(), "dev".to_string());

    println!("{}", pool.export_metrics_prometheus("connections", Some(&tags)));

    let registry = prometheus::Registry::new();
    pool.register_metrics("connections", &registry).unwrap();
    println!("   Registered {} metric families", registry.gather().len());
}
