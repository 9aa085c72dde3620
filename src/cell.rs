use std::{
    any,
    cell::UnsafeCell,
    fmt,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicUsize, Ordering},
};

use crossbeam::utils::Backoff;

/// A `RefCell` whose borrow flag is atomic, so that it may be shared
/// between threads. Conflicting borrows are refused instead of blocking.
pub struct AtomicRefCell<T: ?Sized> {
    borrow: AtomicUsize,
    data: UnsafeCell<T>,
}

impl<T> AtomicRefCell<T> {
    pub fn new(data: T) -> Self {
        Self {
            borrow: AtomicUsize::new(0),
            data: UnsafeCell::new(data),
        }
    }
}

impl<T: ?Sized> AtomicRefCell<T> {
    const MUTABLY_BORROWED: usize = usize::MAX;

    pub fn borrow(&self) -> AtomicRef<'_, T> {
        self.try_borrow()
            .unwrap_or_else(|| panic!("{} was already borrowed mutably!", any::type_name::<T>()))
    }

    pub fn try_borrow(&self) -> Option<AtomicRef<'_, T>> {
        let backoff = Backoff::new();
        let mut state = self.borrow.load(Ordering::Acquire);

        loop {
            // The second check keeps the shared count from ever reaching
            // the exclusive marker.
            if state == Self::MUTABLY_BORROWED || state == Self::MUTABLY_BORROWED - 1 {
                return None;
            }

            match self.borrow.compare_exchange_weak(
                state,
                state + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => {
                    state = actual;
                    backoff.spin();
                }
            }
        }

        let data = unsafe { &*self.data.get() };

        Some(AtomicRef {
            flag: &self.borrow,
            data,
        })
    }

    pub fn borrow_mut(&self) -> AtomicRefMut<'_, T> {
        self.try_borrow_mut()
            .unwrap_or_else(|| panic!("{} was already borrowed!", any::type_name::<T>()))
    }

    pub fn try_borrow_mut(&self) -> Option<AtomicRefMut<'_, T>> {
        if self
            .borrow
            .compare_exchange(0, Self::MUTABLY_BORROWED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        let data = unsafe { &mut *self.data.get() };

        Some(AtomicRefMut {
            flag: &self.borrow,
            data,
        })
    }

    pub fn is_borrowed_mut(&self) -> bool {
        self.borrow.load(Ordering::Acquire) == Self::MUTABLY_BORROWED
    }
}

// Shared borrows hand out `&T` on any thread, hence the `Sync` bound.
unsafe impl<T: ?Sized + Send> Send for AtomicRefCell<T> {}

unsafe impl<T: ?Sized + Send + Sync> Sync for AtomicRefCell<T> {}

impl<T: ?Sized> fmt::Debug for AtomicRefCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicRefCell")
            .field("borrow", &self.borrow.load(Ordering::Relaxed))
            .finish()
    }
}

#[derive(Debug)]
pub struct AtomicRef<'a, T: ?Sized> {
    flag: &'a AtomicUsize,
    data: &'a T,
}

impl<T: ?Sized> Deref for AtomicRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.data
    }
}

impl<T: ?Sized> Drop for AtomicRef<'_, T> {
    fn drop(&mut self) {
        let old_val = self.flag.fetch_sub(1, Ordering::AcqRel);
        debug_assert_ne!(old_val, AtomicRefCell::<T>::MUTABLY_BORROWED);
    }
}

#[derive(Debug)]
pub struct AtomicRefMut<'a, T: ?Sized> {
    flag: &'a AtomicUsize,
    data: &'a mut T,
}

impl<T: ?Sized> Deref for AtomicRefMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.data
    }
}

impl<T: ?Sized> DerefMut for AtomicRefMut<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.data
    }
}

impl<T: ?Sized> Drop for AtomicRefMut<'_, T> {
    fn drop(&mut self) {
        let old_val = self.flag.swap(0, Ordering::Release);
        debug_assert_eq!(old_val, AtomicRefCell::<T>::MUTABLY_BORROWED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_borrows_stack() {
        let cell = AtomicRefCell::new(5u32);
        let a = cell.borrow();
        let b = cell.borrow();

        assert_eq!(*a + *b, 10);
        assert!(cell.try_borrow_mut().is_none());
    }

    #[test]
    fn exclusive_borrow_excludes_everything() {
        let cell = AtomicRefCell::new(vec![1, 2, 3]);

        {
            let mut guard = cell.borrow_mut();
            guard.push(4);
            assert!(cell.is_borrowed_mut());
            assert!(cell.try_borrow().is_none());
            assert!(cell.try_borrow_mut().is_none());
        }

        assert!(!cell.is_borrowed_mut());
        assert_eq!(cell.borrow().len(), 4);
    }

    #[test]
    #[should_panic(expected = "already borrowed")]
    fn conflicting_borrow_panics() {
        let cell = AtomicRefCell::new(0u8);
        let _guard = cell.borrow();
        let _ = cell.borrow_mut();
    }
}
