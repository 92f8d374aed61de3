use crate::{BufferView, Result};
use bytemuck::Zeroable;
use negative_impl::negative_impl;
use std::cell::UnsafeCell;
use std::pin::Pin;
use std::ptr::NonNull;
use std::{fmt, iter, mem, ptr, slice};
use tracing::{event, Level};

/// An owned, fixed-capacity, contiguous sequence of `T` whose address is stable for
/// the buffer's entire lifetime.
///
/// The buffer is the allocation-owning collaborator of [`BufferView`]: it hands out
/// views over its storage and guarantees that the addresses those views compute stay
/// valid until the buffer is dropped. The capacity is fixed at construction - the
/// storage is never grown, shrunk or reallocated, which is the whole pinning
/// guarantee.
///
/// The pin is released exactly once, when the buffer is dropped. This holds on every
/// exit path, including panics, because release rides on `Drop`. Using a view after
/// the buffer is gone is rejected at compile time since views borrow the buffer:
///
/// ```compile_fail
/// use pinbuf::PinnedBuffer;
///
/// let view = {
///     let buffer = PinnedBuffer::<u32>::new_zeroed(4);
///     buffer.view()
/// }; // buffer dropped here while the view still references it
/// let _ = view.offset();
/// ```
///
/// This is a single threaded type - the buffer and all views into it stay on the
/// thread that created the buffer.
pub struct PinnedBuffer<T> {
    // The Box is the pin: heap contents never move as long as we neither resize nor
    // give the allocation away. The UnsafeCell layer is what makes writes through
    // view-derived pointers (obtained via `&self`) defined behavior.
    storage: Pin<Box<[UnsafeCell<T>]>>,
}

impl<T> PinnedBuffer<T> {
    /// Allocates a zero-initialized buffer of `count` elements.
    ///
    /// Allocation failure aborts the process, as is standard for infallible Rust
    /// allocation.
    pub fn new_zeroed(count: usize) -> Self
    where
        T: Zeroable,
    {
        let storage: Box<[T]> = iter::repeat_with(T::zeroed).take(count).collect();

        Self::from_boxed_slice(storage)
    }

    /// Adopts caller-supplied data as the buffer's storage, without copying the
    /// elements. The buffer becomes the owner for its lifetime; the storage can be
    /// recovered later via [`into_inner_boxed_slice`][Self::into_inner_boxed_slice].
    pub fn from_boxed_slice(storage: Box<[T]>) -> Self {
        event!(
            Level::TRACE,
            message = "pin acquired",
            elements = storage.len()
        );

        // SAFETY: UnsafeCell<T> is repr(transparent), so [UnsafeCell<T>] is
        // layout-compatible with [T] and we can reinterpret the allocation freely.
        let storage =
            unsafe { Box::from_raw(Box::into_raw(storage) as *mut [UnsafeCell<T>]) };

        // SAFETY: Box heap contents have a stable address and we never move out of
        // the Box or resize it for the lifetime of this value.
        let storage = unsafe { Pin::new_unchecked(storage) };

        Self { storage }
    }

    /// Adopts a `Vec<T>` as the buffer's storage. Shorthand for
    /// [`from_boxed_slice`][Self::from_boxed_slice].
    pub fn from_vec(data: Vec<T>) -> Self {
        Self::from_boxed_slice(data.into_boxed_slice())
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Returns a view over the entire buffer, at offset zero.
    pub fn view(&self) -> BufferView<'_, T> {
        // SAFETY: `base()` addresses element 0 of a region of `len()` elements that
        // stays valid and address-stable while `self` is borrowed, which is exactly
        // the lifetime the returned view carries. The UnsafeCell storage makes
        // writes through the view's computed pointers defined.
        unsafe { BufferView::from_raw_parts(self.base(), self.len()) }
    }

    /// Returns a view over the buffer starting at `offset` elements.
    ///
    /// Fails with [`Error::OffsetOutOfRange`][crate::Error::OffsetOutOfRange] if
    /// `offset` exceeds the buffer's element count.
    pub fn view_at(&self, offset: usize) -> Result<BufferView<'_, T>> {
        self.view().slice(offset)
    }

    /// Obtains an immutable view over the contents of the buffer.
    ///
    /// Callers must not have a copy targeting this buffer in flight while the
    /// returned borrow is alive; this is a single-threaded type, so in practice
    /// that simply means "read the results after the copy returns".
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: UnsafeCell<T> is layout-compatible with T, and handing out a
        // shared borrow of the contents is valid as long as nothing writes through
        // a view-derived pointer concurrently - which the single-threaded contract
        // of this type rules out.
        unsafe { slice::from_raw_parts(self.storage.as_ptr() as *const T, self.len()) }
    }

    /// Obtains a mutable view over the contents of the buffer.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: As in `as_slice`, plus we hold the exclusive borrow of self, so
        // no view-derived pointer can be in use at the same time.
        unsafe { slice::from_raw_parts_mut(self.storage.as_ptr() as *mut T, self.len()) }
    }

    /// Consumes the buffer and returns the storage it was created over, in its full
    /// extent. This ends the pin; all views are statically guaranteed gone because
    /// they borrow the buffer.
    pub fn into_inner_boxed_slice(self) -> Box<[T]> {
        event!(
            Level::TRACE,
            message = "pin released into boxed slice",
            elements = self.len()
        );

        // We are destroying the buffer without going through the usual drop logic.
        // SAFETY: We forget self immediately after stealing the field, so nothing
        // observes the buffer in its gutted state.
        let storage = unsafe { ptr::read(&self.storage) };
        mem::forget(self);

        // SAFETY: The pinning promise was scoped to the buffer's lifetime, which
        // ends right here with every view gone; nothing holds an address into the
        // storage anymore.
        let storage = unsafe { Pin::into_inner_unchecked(storage) };

        // SAFETY: UnsafeCell<T> is layout-compatible with T.
        unsafe { Box::from_raw(Box::into_raw(storage) as *mut [T]) }
    }

    fn base(&self) -> NonNull<T> {
        match self.storage.first() {
            // SAFETY: UnsafeCell::get never returns null for a real cell.
            Some(cell) => unsafe { NonNull::new_unchecked(cell.get()) },
            None => NonNull::dangling(),
        }
    }
}

impl<T> Drop for PinnedBuffer<T> {
    fn drop(&mut self) {
        event!(Level::TRACE, message = "pin released", elements = self.len());
    }
}

impl<T> From<Vec<T>> for PinnedBuffer<T> {
    fn from(data: Vec<T>) -> Self {
        Self::from_vec(data)
    }
}

impl<T> fmt::Debug for PinnedBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinnedBuffer")
            .field("base", &format_args!("{:p}", self.storage.as_ptr()))
            .field("len", &self.len())
            .finish()
    }
}

#[negative_impl]
impl<T> !Send for PinnedBuffer<T> {}
#[negative_impl]
impl<T> !Sync for PinnedBuffer<T> {}
