//! Policies that decide how pooled instances are created and whether a
//! returned instance is kept.

use std::fmt;
use std::marker::PhantomData;

/// Default initial capacity of strings created by [`StringPooledObjectPolicy`].
pub const DEFAULT_INITIAL_CAPACITY: usize = 100;

/// Default capacity above which returned strings and vectors are discarded.
pub const DEFAULT_MAXIMUM_RETAINED_CAPACITY: usize = 4 * 1024;

/// Strategy used by a pool to construct instances and to vet instances
/// handed back to it.
///
/// `create` runs only when the pool has nothing to hand out. A panic inside it
/// reaches the caller of `acquire` unchanged.
///
/// `on_return` runs on every release unless [`ALWAYS_RETAIN`] is `true`. It may
/// reset the instance; returning `false` drops the instance instead of
/// storing it.
///
/// [`ALWAYS_RETAIN`]: PooledObjectPolicy::ALWAYS_RETAIN
///
/// # Examples
///
/// ```
/// use atomic_objectpool::{DefaultObjectPool, PooledObjectPolicy};
///
/// struct Scratch;
///
/// impl PooledObjectPolicy<Vec<u8>> for Scratch {
///     fn create(&self) -> Vec<u8> {
///         Vec::with_capacity(64)
///     }
///
///     fn on_return(&self, buf: &mut Vec<u8>) -> bool {
///         buf.clear();
///         true
///     }
/// }
///
/// let pool = DefaultObjectPool::new(Scratch);
/// let mut buf = pool.acquire();
/// buf.extend_from_slice(b"hello");
/// pool.release(buf);
///
/// assert!(pool.acquire().is_empty());
/// ```
pub trait PooledObjectPolicy<T> {
    /// When `true`, the pool never calls `on_return` and keeps every released
    /// instance it has room for.
    const ALWAYS_RETAIN: bool = false;

    /// Build a fresh instance.
    fn create(&self) -> T;

    /// Prepare a released instance for reuse, or reject it.
    fn on_return(&self, obj: &mut T) -> bool;
}

/// Creates instances through `T::default()` and keeps every returned instance
/// untouched.
pub struct DefaultPooledObjectPolicy<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> DefaultPooledObjectPolicy<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for DefaultPooledObjectPolicy<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for DefaultPooledObjectPolicy<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for DefaultPooledObjectPolicy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultPooledObjectPolicy").finish()
    }
}

impl<T: Default> PooledObjectPolicy<T> for DefaultPooledObjectPolicy<T> {
    const ALWAYS_RETAIN: bool = true;

    #[inline]
    fn create(&self) -> T {
        T::default()
    }

    #[inline]
    fn on_return(&self, _obj: &mut T) -> bool {
        true
    }
}

/// Policy for pooled `String` buffers.
///
/// Returned strings are cleared. Strings whose capacity grew beyond
/// `maximum_retained_capacity` are dropped so one oversized payload does not
/// pin a large allocation in the pool.
#[derive(Debug, Clone)]
pub struct StringPooledObjectPolicy {
    pub initial_capacity: usize,
    pub maximum_retained_capacity: usize,
}

impl Default for StringPooledObjectPolicy {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            maximum_retained_capacity: DEFAULT_MAXIMUM_RETAINED_CAPACITY,
        }
    }
}

impl StringPooledObjectPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_maximum_retained_capacity(mut self, capacity: usize) -> Self {
        self.maximum_retained_capacity = capacity;
        self
    }
}

impl PooledObjectPolicy<String> for StringPooledObjectPolicy {
    fn create(&self) -> String {
        String::with_capacity(self.initial_capacity)
    }

    fn on_return(&self, obj: &mut String) -> bool {
        if obj.capacity() > self.maximum_retained_capacity {
            return false;
        }
        obj.clear();
        true
    }
}

/// Policy for pooled `Vec<E>` buffers, with the same capacity rule as
/// [`StringPooledObjectPolicy`].
pub struct VecPooledObjectPolicy<E> {
    pub initial_capacity: usize,
    pub maximum_retained_capacity: usize,
    _marker: PhantomData<fn() -> E>,
}

impl<E> VecPooledObjectPolicy<E> {
    pub fn new(initial_capacity: usize, maximum_retained_capacity: usize) -> Self {
        Self {
            initial_capacity,
            maximum_retained_capacity,
            _marker: PhantomData,
        }
    }
}

impl<E> Default for VecPooledObjectPolicy<E> {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_CAPACITY, DEFAULT_MAXIMUM_RETAINED_CAPACITY)
    }
}

impl<E> fmt::Debug for VecPooledObjectPolicy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VecPooledObjectPolicy")
            .field("initial_capacity", &self.initial_capacity)
            .field("maximum_retained_capacity", &self.maximum_retained_capacity)
            .finish()
    }
}

impl<E> PooledObjectPolicy<Vec<E>> for VecPooledObjectPolicy<E> {
    fn create(&self) -> Vec<E> {
        Vec::with_capacity(self.initial_capacity)
    }

    fn on_return(&self, obj: &mut Vec<E>) -> bool {
        if obj.capacity() > self.maximum_retained_capacity {
            return false;
        }
        obj.clear();
        true
    }
}

/// Policy assembled from two closures.
///
/// # Examples
///
/// ```
/// use atomic_objectpool::{DefaultObjectPool, FnPooledObjectPolicy};
///
/// let policy = FnPooledObjectPolicy::new(|| vec![0u32; 4], |v: &mut Vec<u32>| {
///     v.iter_mut().for_each(|x| *x = 0);
///     v.len() == 4
/// });
/// let pool = DefaultObjectPool::new(policy);
/// assert_eq!(pool.acquire().len(), 4);
/// ```
pub struct FnPooledObjectPolicy<C, R> {
    create: C,
    on_return: R,
}

impl<C, R> FnPooledObjectPolicy<C, R> {
    pub fn new(create: C, on_return: R) -> Self {
        Self { create, on_return }
    }
}

impl<C, R> fmt::Debug for FnPooledObjectPolicy<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPooledObjectPolicy").finish_non_exhaustive()
    }
}

impl<T, C, R> PooledObjectPolicy<T> for FnPooledObjectPolicy<C, R>
where
    C: Fn() -> T,
    R: Fn(&mut T) -> bool,
{
    fn create(&self) -> T {
        (self.create)()
    }

    fn on_return(&self, obj: &mut T) -> bool {
        (self.on_return)(obj)
    }
}
