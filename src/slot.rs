//! Single-instance storage cell updated only by compare-and-exchange

use crossbeam::utils::CachePadded;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};

/// One place in the pool that is either empty (null) or owns exactly one
/// boxed instance.
///
/// Ownership moves in and out of the slot only through a successful
/// compare-and-exchange, so at most one caller can win any given
/// occupied-to-empty transition.
pub(crate) struct Slot<T> {
    ptr: CachePadded<AtomicPtr<T>>,
    _owns: PhantomData<Box<T>>,
}

// SAFETY: the slot hands its `Box<T>` to exactly one thread at a time, which
// is the same requirement as sending the box itself.
unsafe impl<T: Send> Send for Slot<T> {}
unsafe impl<T: Send> Sync for Slot<T> {}

impl<T> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            ptr: CachePadded::new(AtomicPtr::new(ptr::null_mut())),
            _owns: PhantomData,
        }
    }

    /// Take the instance if the slot is occupied. A single attempt: losing
    /// the race to another taker returns `None`.
    #[inline]
    pub(crate) fn try_take(&self) -> Option<Box<T>> {
        let current = self.ptr.load(Ordering::Acquire);
        if current.is_null() {
            return None;
        }

        self.ptr
            .compare_exchange(current, ptr::null_mut(), Ordering::Acquire, Ordering::Relaxed)
            .ok()
            // SAFETY: a non-null value in the slot always came from
            // `Box::into_raw` in `try_store`, and winning the exchange makes
            // us its only owner.
            .map(|raw| unsafe { Box::from_raw(raw) })
    }

    /// Store `item` if the slot is empty. Returns `false` without touching
    /// the slot when it is occupied; the caller keeps ownership of `item`.
    #[inline]
    pub(crate) fn try_store(&self, item: NonNull<T>) -> bool {
        if !self.ptr.load(Ordering::Relaxed).is_null() {
            return false;
        }

        self.ptr
            .compare_exchange(
                ptr::null_mut(),
                item.as_ptr(),
                Ordering::Release,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    #[inline]
    pub(crate) fn is_occupied(&self) -> bool {
        !self.ptr.load(Ordering::Relaxed).is_null()
    }
}

impl<T> Drop for Slot<T> {
    fn drop(&mut self) {
        let raw = *self.ptr.get_mut();
        if !raw.is_null() {
            // SAFETY: `&mut self` rules out concurrent access, and the
            // pointer is an owned box stored by `try_store`.
            drop(unsafe { Box::from_raw(raw) });
        }
    }
}
