//! # atomic_objectpool
//!
//! Bounded, lock-free object pool for reusing expensive instances across
//! threads.
//!
//! ## Features
//!
//! - Lock-free acquire and release built on single compare-and-exchange slots
//! - A fast slot checked before the bounded slot array
//! - Pluggable policies for creating and resetting instances
//! - Statically detected always-retain policy that skips return validation
//! - Automatic return of objects via RAII (Drop trait)
//! - Pool warm-up/pre-population
//! - Metrics with Prometheus export
//!
//! ## Quick Start
//!
//! ```rust
//! use atomic_objectpool::{DefaultObjectPool, DefaultPooledObjectPolicy};
//!
//! let pool = DefaultObjectPool::new(DefaultPooledObjectPolicy::<Vec<u8>>::new());
//! {
//!     let mut buf = pool.get();
//!     buf.extend_from_slice(b"payload");
//!     // Buffer automatically returned when `buf` goes out of scope
//! }
//! assert_eq!(pool.retained_count(), 1);
//! ```

mod config;
mod errors;
mod metrics;
mod policy;
mod pool;
mod provider;
mod slot;

pub use config::{PoolConfiguration, DEFAULT_RETAINED_PER_CPU};
pub use errors::{PoolError, PoolResult};
pub use metrics::{MetricsExporter, PoolMetrics};
#[cfg(feature = "prometheus")]
pub use metrics::PoolCollector;
pub use policy::{
    DefaultPooledObjectPolicy, FnPooledObjectPolicy, PooledObjectPolicy, StringPooledObjectPolicy,
    VecPooledObjectPolicy, DEFAULT_INITIAL_CAPACITY, DEFAULT_MAXIMUM_RETAINED_CAPACITY,
};
pub use pool::{DefaultObjectPool, ObjectPool, PooledObject};
pub use provider::{DefaultObjectPoolProvider, ObjectPoolProvider};
