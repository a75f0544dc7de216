//! Core object pool implementation

use crate::config::PoolConfiguration;
use crate::errors::PoolResult;
#[cfg(feature = "prometheus")]
use crate::metrics::PoolCollector;
use crate::metrics::{MetricsExporter, MetricsTracker, PoolMetrics};
use crate::policy::PooledObjectPolicy;
use crate::slot::Slot;

use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::sync::Arc;
use tracing::{debug, trace};

/// Common surface of object pools, usable as `dyn ObjectPool<T>`.
///
/// # Examples
///
/// ```
/// use atomic_objectpool::{DefaultObjectPool, DefaultPooledObjectPolicy, ObjectPool};
/// use std::sync::Arc;
///
/// let pool: Arc<dyn ObjectPool<Vec<u8>> + Send + Sync> =
///     Arc::new(DefaultObjectPool::new(DefaultPooledObjectPolicy::<Vec<u8>>::new()));
///
/// let buf = pool.acquire();
/// pool.release(buf);
/// ```
pub trait ObjectPool<T> {
    /// Hand out a pooled instance, creating one if none is available.
    fn acquire(&self) -> Box<T>;

    /// Give an instance back to the pool. It may be kept or dropped.
    fn release(&self, obj: Box<T>);
}

/// A pooled object that returns to its pool when dropped
pub struct PooledObject<'a, T, P>
where
    P: PooledObjectPolicy<T>,
{
    value: Option<Box<T>>,
    pool: &'a DefaultObjectPool<T, P>,
}

impl<'a, T, P> PooledObject<'a, T, P>
where
    P: PooledObjectPolicy<T>,
{
    fn new(value: Box<T>, pool: &'a DefaultObjectPool<T, P>) -> Self {
        Self {
            value: Some(value),
            pool,
        }
    }

    /// Take the instance out without returning it to the pool
    pub fn detach(mut self) -> Box<T> {
        self.value.take().expect("Value already taken")
    }
}

impl<T, P> Deref for PooledObject<'_, T, P>
where
    P: PooledObjectPolicy<T>,
{
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value.as_ref().expect("Value already taken")
    }
}

impl<T, P> DerefMut for PooledObject<'_, T, P>
where
    P: PooledObjectPolicy<T>,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.value.as_mut().expect("Value already taken")
    }
}

impl<T, P> Drop for PooledObject<'_, T, P>
where
    P: PooledObjectPolicy<T>,
{
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.pool.release(value);
        }
    }
}

impl<T: fmt::Debug, P> fmt::Debug for PooledObject<'_, T, P>
where
    P: PooledObjectPolicy<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PooledObject").field(&self.value).finish()
    }
}

/// Bounded, lock-free pool of reusable instances.
///
/// Idle instances live in one fast slot checked first plus an array of
/// `maximum_retained - 1` further slots. Every slot changes hands through a
/// single compare-and-exchange, so `acquire` and `release` never block and
/// never spin: a lost race moves on to the next slot.
///
/// Returned instances beyond capacity, or refused by the policy, are dropped.
///
/// # Examples
///
/// ```
/// use atomic_objectpool::{DefaultObjectPool, StringPooledObjectPolicy};
///
/// let pool = DefaultObjectPool::with_maximum_retained(StringPooledObjectPolicy::default(), 4)
///     .unwrap();
///
/// {
///     let mut s = pool.get();
///     s.push_str("scratch");
/// }
///
/// // The string came back cleared.
/// assert_eq!(pool.retained_count(), 1);
/// assert!(pool.acquire().is_empty());
/// ```
pub struct DefaultObjectPool<T, P>
where
    P: PooledObjectPolicy<T>,
{
    first: Slot<T>,
    items: Box<[Slot<T>]>,
    policy: P,
    metrics: Arc<MetricsTracker>,
    maximum_retained: usize,
}

impl<T, P> DefaultObjectPool<T, P>
where
    P: PooledObjectPolicy<T>,
{
    /// Create a pool retaining up to twice the available parallelism
    pub fn new(policy: P) -> Self {
        Self::from_validated(policy, PoolConfiguration::default().maximum_retained)
    }

    /// Create a pool retaining at most `maximum_retained` idle instances
    pub fn with_maximum_retained(policy: P, maximum_retained: usize) -> PoolResult<Self> {
        Self::with_configuration(
            policy,
            PoolConfiguration::new().with_maximum_retained(maximum_retained),
        )
    }

    /// Create a pool from a full configuration
    pub fn with_configuration(policy: P, config: PoolConfiguration) -> PoolResult<Self> {
        config.validate()?;
        Ok(Self::from_validated(policy, config.maximum_retained))
    }

    pub(crate) fn from_validated(policy: P, maximum_retained: usize) -> Self {
        debug_assert!(maximum_retained >= 1);

        // The fast slot counts towards the limit.
        let items = (1..maximum_retained).map(|_| Slot::new()).collect();

        debug!(
            maximum_retained,
            skip_return_validation = P::ALWAYS_RETAIN,
            "object pool created"
        );

        Self {
            first: Slot::new(),
            items,
            policy,
            metrics: Arc::new(MetricsTracker::new()),
            maximum_retained,
        }
    }

    /// Take an idle instance, or create a new one when none is available.
    ///
    /// A panic in the policy's `create` propagates to the caller; the pool is
    /// left unchanged.
    pub fn acquire(&self) -> Box<T> {
        if let Some(item) = self.first.try_take().or_else(|| self.take_via_scan()) {
            MetricsTracker::record(&self.metrics.total_hits);
            return item;
        }

        let item = Box::new(self.policy.create());
        MetricsTracker::record(&self.metrics.total_created);
        item
    }

    #[inline]
    fn take_via_scan(&self) -> Option<Box<T>> {
        self.items.iter().find_map(Slot::try_take)
    }

    /// Return an instance to the pool.
    ///
    /// Unless the policy always retains, `on_return` decides whether the
    /// instance is kept. Kept instances go to the first empty slot; with no
    /// empty slot the instance is dropped.
    pub fn release(&self, mut obj: Box<T>) {
        if !P::ALWAYS_RETAIN && !self.policy.on_return(&mut obj) {
            MetricsTracker::record(&self.metrics.total_rejected);
            trace!("returned instance rejected by policy");
            return;
        }

        if self.store(obj) {
            MetricsTracker::record(&self.metrics.total_returned);
        } else {
            MetricsTracker::record(&self.metrics.total_dropped);
            trace!(maximum_retained = self.maximum_retained, "pool full, instance dropped");
        }
    }

    /// Place `obj` in the fast slot or the first free array slot. Drops it and
    /// returns `false` when every slot is occupied.
    fn store(&self, obj: Box<T>) -> bool {
        let raw = NonNull::from(Box::leak(obj));

        if self.first.try_store(raw) || self.items.iter().any(|slot| slot.try_store(raw)) {
            return true;
        }

        // SAFETY: every store attempt failed, so ownership never left us.
        drop(unsafe { Box::from_raw(raw.as_ptr()) });
        false
    }

    /// Acquire an instance wrapped in a guard that releases it on drop
    pub fn get(&self) -> PooledObject<'_, T, P> {
        PooledObject::new(self.acquire(), self)
    }

    /// Pre-create up to `count` instances, capped at the free slots, and store
    /// them.
    ///
    /// Returns how many instances were stored. Under concurrent releases this
    /// can be fewer than requested.
    pub fn warm_up(&self, count: usize) -> usize {
        let free = self.maximum_retained.saturating_sub(self.retained_count());
        let mut stored = 0;
        for _ in 0..count.min(free) {
            if self.retained_count() >= self.maximum_retained {
                break;
            }
            let item = Box::new(self.policy.create());
            MetricsTracker::record(&self.metrics.total_created);
            if !self.store(item) {
                MetricsTracker::record(&self.metrics.total_dropped);
                break;
            }
            MetricsTracker::record(&self.metrics.total_prefilled);
            stored += 1;
        }
        debug!(requested = count, stored, "object pool warmed up");
        stored
    }

    /// Number of idle instances currently held. Racy under concurrent use.
    pub fn retained_count(&self) -> usize {
        usize::from(self.first.is_occupied())
            + self.items.iter().filter(|slot| slot.is_occupied()).count()
    }

    /// Configured retention limit, fast slot included
    pub fn maximum_retained(&self) -> usize {
        self.maximum_retained
    }

    /// Policy that creates and vets this pool's instances
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        self.metrics
            .get_metrics(self.retained_count(), self.maximum_retained)
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        MetricsExporter::export_prometheus(&self.get_metrics(), pool_name, tags)
    }

    /// Build a Prometheus collector that reads this pool's counters on every
    /// gather. The collector stays valid after the pool is dropped and then
    /// reports frozen values.
    #[cfg(feature = "prometheus")]
    pub fn collector(&self, pool_name: &str) -> prometheus::Result<PoolCollector> {
        PoolCollector::new(Arc::clone(&self.metrics), self.maximum_retained, pool_name)
    }

    /// Register a live collector for this pool. Registering the same pool
    /// name twice in one registry fails with `AlreadyReg`.
    #[cfg(feature = "prometheus")]
    pub fn register_metrics(
        &self,
        pool_name: &str,
        registry: &prometheus::Registry,
    ) -> prometheus::Result<()> {
        registry.register(Box::new(self.collector(pool_name)?))
    }
}

impl<T, P> ObjectPool<T> for DefaultObjectPool<T, P>
where
    P: PooledObjectPolicy<T>,
{
    fn acquire(&self) -> Box<T> {
        DefaultObjectPool::acquire(self)
    }

    fn release(&self, obj: Box<T>) {
        DefaultObjectPool::release(self, obj)
    }
}

impl<T, P> fmt::Debug for DefaultObjectPool<T, P>
where
    P: PooledObjectPolicy<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultObjectPool")
            .field("maximum_retained", &self.maximum_retained)
            .field("retained", &self.retained_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PoolError;
    use crate::policy::DefaultPooledObjectPolicy;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and rejects instances whose value is negative.
    #[derive(Default)]
    struct CountingPolicy {
        created: AtomicUsize,
        returned: AtomicUsize,
    }

    impl PooledObjectPolicy<i64> for CountingPolicy {
        fn create(&self) -> i64 {
            self.created.fetch_add(1, Ordering::SeqCst) as i64
        }

        fn on_return(&self, obj: &mut i64) -> bool {
            self.returned.fetch_add(1, Ordering::SeqCst);
            *obj >= 0
        }
    }

    /// Same counters, but flagged as always retaining.
    #[derive(Default)]
    struct BypassPolicy {
        created: AtomicUsize,
        returned: AtomicUsize,
    }

    impl PooledObjectPolicy<i64> for BypassPolicy {
        const ALWAYS_RETAIN: bool = true;

        fn create(&self) -> i64 {
            self.created.fetch_add(1, Ordering::SeqCst) as i64
        }

        fn on_return(&self, _obj: &mut i64) -> bool {
            self.returned.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    fn addr<T>(b: &T) -> *const T {
        b as *const T
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let result = DefaultObjectPool::with_maximum_retained(CountingPolicy::default(), 0);
        assert!(matches!(result, Err(PoolError::InvalidMaximumRetained(0))));
    }

    #[test]
    fn test_default_capacity_follows_configuration() {
        let pool = DefaultObjectPool::new(DefaultPooledObjectPolicy::<u8>::new());
        assert_eq!(pool.maximum_retained(), PoolConfiguration::default().maximum_retained);
        assert_eq!(pool.retained_count(), 0);
    }

    #[test]
    fn test_miss_calls_create() {
        let pool = DefaultObjectPool::with_maximum_retained(CountingPolicy::default(), 2).unwrap();
        assert_eq!(*pool.acquire(), 0);
        assert_eq!(*pool.acquire(), 1);
        assert_eq!(pool.policy().created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_fast_slot_returns_same_instance() {
        let pool = DefaultObjectPool::with_maximum_retained(CountingPolicy::default(), 1).unwrap();

        let item = pool.acquire();
        let before = addr(&*item);
        pool.release(item);

        let again = pool.acquire();
        assert_eq!(addr(&*again), before);
        assert_eq!(pool.policy().created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_capacity_bound() {
        let capacity = 4;
        let pool =
            DefaultObjectPool::with_maximum_retained(CountingPolicy::default(), capacity).unwrap();

        let items: Vec<_> = (0..capacity + 3).map(|_| pool.acquire()).collect();
        let created = pool.policy().created.load(Ordering::SeqCst);
        assert_eq!(created, capacity + 3);

        for item in items {
            pool.release(item);
        }
        assert_eq!(pool.retained_count(), capacity);

        let _reacquired: Vec<_> = (0..capacity).map(|_| pool.acquire()).collect();
        assert_eq!(pool.policy().created.load(Ordering::SeqCst), created);

        let _extra = pool.acquire();
        assert_eq!(pool.policy().created.load(Ordering::SeqCst), created + 1);

        let metrics = pool.get_metrics();
        assert_eq!(metrics.total_dropped, 3);
        assert_eq!(metrics.total_returned, capacity);
        assert_eq!(metrics.total_hits, capacity);
    }

    #[test]
    fn test_always_retain_skips_on_return() {
        let pool = DefaultObjectPool::with_maximum_retained(BypassPolicy::default(), 2).unwrap();

        for _ in 0..10 {
            let a = pool.acquire();
            let b = pool.acquire();
            let c = pool.acquire();
            pool.release(a);
            pool.release(b);
            pool.release(c);
        }

        assert_eq!(pool.policy().returned.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_custom_policy_sees_every_return() {
        let pool = DefaultObjectPool::with_maximum_retained(CountingPolicy::default(), 2).unwrap();
        for _ in 0..5 {
            let item = pool.acquire();
            pool.release(item);
        }
        assert_eq!(pool.policy().returned.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_rejected_instance_is_never_reissued() {
        let pool = DefaultObjectPool::with_maximum_retained(CountingPolicy::default(), 3).unwrap();

        let mut marked = pool.acquire();
        *marked = -1;
        pool.release(marked);

        assert_eq!(pool.retained_count(), 0);
        for _ in 0..10 {
            let item = pool.acquire();
            assert_ne!(*item, -1);
            pool.release(item);
        }
        assert_eq!(pool.get_metrics().total_rejected, 1);
    }

    #[test]
    fn test_end_to_end_three_slots() {
        let pool = DefaultObjectPool::with_maximum_retained(BypassPolicy::default(), 3).unwrap();

        let (first, second) = std::thread::scope(|scope| {
            let first = scope
                .spawn(|| {
                    let x = pool.acquire();
                    let x_addr = addr(&*x) as usize;
                    pool.release(x);
                    x_addr
                })
                .join()
                .unwrap();
            assert_eq!(pool.policy().created.load(Ordering::SeqCst), 1);

            let second = scope
                .spawn(|| {
                    let again = pool.acquire();
                    let again_addr = addr(&*again) as usize;
                    pool.release(again);
                    again_addr
                })
                .join()
                .unwrap();
            (first, second)
        });
        assert_eq!(first, second);

        let third = pool.acquire();
        assert_eq!(addr(&*third) as usize, first);
        assert_eq!(pool.policy().created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_returns_on_drop() {
        let pool = DefaultObjectPool::with_maximum_retained(CountingPolicy::default(), 2).unwrap();
        {
            let mut obj = pool.get();
            *obj += 40;
            assert_eq!(*obj, 40);
        }
        assert_eq!(pool.retained_count(), 1);
        assert_eq!(*pool.acquire(), 40);
    }

    #[test]
    fn test_detach_keeps_instance_out() {
        let pool = DefaultObjectPool::with_maximum_retained(CountingPolicy::default(), 2).unwrap();
        let owned = pool.get().detach();
        assert_eq!(*owned, 0);
        assert_eq!(pool.retained_count(), 0);
    }

    #[test]
    fn test_warm_up_is_capped() {
        let pool = DefaultObjectPool::with_maximum_retained(CountingPolicy::default(), 3).unwrap();
        assert_eq!(pool.warm_up(10), 3);
        assert_eq!(pool.retained_count(), 3);

        let _items: Vec<_> = (0..3).map(|_| pool.acquire()).collect();
        assert_eq!(pool.policy().created.load(Ordering::SeqCst), 3);
        assert_eq!(pool.get_metrics().total_hits, 3);
    }

    #[test]
    fn test_warm_up_fills_only_free_slots() {
        let pool = DefaultObjectPool::with_maximum_retained(CountingPolicy::default(), 3).unwrap();
        let items: Vec<_> = (0..2).map(|_| pool.acquire()).collect();
        for item in items {
            pool.release(item);
        }
        assert_eq!(pool.retained_count(), 2);

        assert_eq!(pool.warm_up(10), 1);
        assert_eq!(pool.retained_count(), 3);

        let metrics = pool.get_metrics();
        assert_eq!(metrics.total_created, 3);
        assert_eq!(metrics.total_dropped, 0);
        assert_eq!(pool.policy().created.load(Ordering::SeqCst), 3);

        // Full pool: nothing is created just to be thrown away.
        assert_eq!(pool.warm_up(4), 0);
        assert_eq!(pool.get_metrics().total_created, 3);
        assert_eq!(pool.get_metrics().total_dropped, 0);
    }

    #[cfg(feature = "prometheus")]
    #[test]
    fn test_registered_metrics_follow_pool_activity() {
        let pool = DefaultObjectPool::with_maximum_retained(CountingPolicy::default(), 4).unwrap();
        let registry = prometheus::Registry::new();
        pool.register_metrics("counting", &registry).unwrap();

        for _ in 0..5 {
            let item = pool.acquire();
            pool.release(item);
        }

        let read = |name: &str| -> f64 {
            let families = registry.gather();
            let family = families.iter().find(|f| f.get_name() == name).unwrap();
            let metric = &family.get_metric()[0];
            match family.get_field_type() {
                prometheus::proto::MetricType::COUNTER => metric.get_counter().get_value(),
                _ => metric.get_gauge().get_value(),
            }
        };
        assert_eq!(read("objectpool_objects_created_total"), 1.0);
        assert_eq!(read("objectpool_hits_total"), 4.0);
        assert_eq!(read("objectpool_objects_returned_total"), 5.0);
        assert_eq!(read("objectpool_objects_retained"), 1.0);
        assert_eq!(read("objectpool_maximum_retained"), 4.0);

        pool.warm_up(2);
        assert_eq!(read("objectpool_objects_retained"), 3.0);
        assert_eq!(read("objectpool_objects_created_total"), 3.0);

        // The live collector is already registered under this name.
        assert!(matches!(
            pool.register_metrics("counting", &registry),
            Err(prometheus::Error::AlreadyReg)
        ));
    }

    #[test]
    fn test_pool_drop_releases_retained() {
        use std::sync::Arc;

        let shared = Arc::new(());
        let template = Arc::clone(&shared);
        let policy = crate::policy::FnPooledObjectPolicy::new(
            move || Arc::clone(&template),
            |_: &mut Arc<()>| true,
        );
        let pool = DefaultObjectPool::with_maximum_retained(policy, 2).unwrap();

        let a = pool.acquire();
        let b = pool.acquire();
        pool.release(a);
        pool.release(b);
        // One for `shared`, one captured by the policy, two in slots.
        assert_eq!(Arc::strong_count(&shared), 4);

        drop(pool);
        assert_eq!(Arc::strong_count(&shared), 1);
    }

    #[test]
    #[should_panic(expected = "construction failed")]
    fn test_create_panic_propagates() {
        let policy = crate::policy::FnPooledObjectPolicy::new(
            || -> u8 { panic!("construction failed") },
            |_: &mut u8| true,
        );
        let pool = DefaultObjectPool::with_maximum_retained(policy, 1).unwrap();
        let _ = pool.acquire();
    }

    #[test]
    fn test_usable_through_trait_object() {
        let pool = DefaultObjectPool::with_maximum_retained(CountingPolicy::default(), 1).unwrap();
        let dyn_pool: &dyn ObjectPool<i64> = &pool;
        let item = dyn_pool.acquire();
        dyn_pool.release(item);
        assert_eq!(pool.retained_count(), 1);
    }
}
