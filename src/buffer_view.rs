use crate::{Error, Result};
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

/// A non-owning, offset-aware reference into a pinned contiguous region of `T`.
///
/// A view is three fields: the address of element 0 of the backing storage, the
/// element count of that storage and the number of elements skipped from the start.
/// Everything it does is pure arithmetic over those fields - a view never allocates,
/// frees or dereferences memory itself. The raw copy operations in this crate
/// ([`copy`][crate::copy] and [`copy_unchecked`][crate::copy_unchecked]) are the only
/// consumers of the computed addresses.
///
/// Views are tied to the backing storage by a borrow, so the compiler rejects any
/// attempt to use a view after its backing buffer is gone. Within that lifetime the
/// backing address is guaranteed stable by whoever constructed the view (for views
/// obtained from [`PinnedBuffer`][crate::PinnedBuffer], by the buffer itself).
///
/// Views are plain `Copy` values; slicing produces a new view and leaves the
/// original untouched.
///
/// This is a single threaded type - it holds a raw pointer, so it cannot move
/// between threads.
pub struct BufferView<'b, T> {
    base: NonNull<T>,

    // Element count of the entire backing storage, not of the part after `offset`.
    backing_len: usize,

    // Invariant: offset <= backing_len. One-past-the-end is allowed and yields an
    // empty view, same as slicing a Rust slice at its full length.
    offset: usize,

    _backing: PhantomData<&'b [T]>,
}

impl<'b, T> BufferView<'b, T> {
    /// Creates a view over `backing_len` elements of `T` starting at `base`,
    /// with an offset of zero.
    ///
    /// # Safety
    ///
    /// The caller must guarantee that `base` is the address of element 0 of a
    /// contiguous region of `backing_len` elements of `T`, that the region is valid
    /// for reads and writes for the lifetime `'b`, and that its address remains
    /// stable (the memory is not moved, reallocated or freed) for all of `'b`.
    ///
    /// `backing_len` becomes the bound that all checked operations on the view
    /// validate against, so overstating it voids the bounds checking of the entire
    /// safe API surface.
    pub unsafe fn from_raw_parts(base: NonNull<T>, backing_len: usize) -> Self {
        Self {
            base,
            backing_len,
            offset: 0,
            _backing: PhantomData,
        }
    }

    /// Returns a new view over the same backing storage with the offset advanced
    /// by `extra_offset` elements. The original view is unaffected.
    ///
    /// Slicing composes additively: `v.slice(a)?.slice(b)?` addresses the same
    /// element as `v.slice(a + b)?`.
    ///
    /// Fails with [`Error::OffsetOutOfRange`] if the resulting offset would exceed
    /// the element count of the backing storage. An offset exactly at the end is
    /// valid and produces an empty view.
    pub fn slice(self, extra_offset: usize) -> Result<Self> {
        let offset = self
            .offset
            .checked_add(extra_offset)
            .filter(|&offset| offset <= self.backing_len)
            .ok_or(Error::OffsetOutOfRange {
                offset: self.offset.saturating_add(extra_offset),
                backing_len: self.backing_len,
            })?;

        Ok(Self { offset, ..self })
    }

    /// Number of elements skipped from the start of the backing storage.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Element count of the entire backing storage, ignoring the offset.
    pub fn backing_len(&self) -> usize {
        self.backing_len
    }

    /// Number of elements between the current offset and the end of the backing
    /// storage.
    pub fn remaining(&self) -> usize {
        self.backing_len - self.offset
    }

    /// Number of bytes between the current offset and the end of the backing
    /// storage. This is the capacity that a copy into this view has to work with.
    pub fn remaining_bytes(&self) -> usize {
        self.remaining() * mem::size_of::<T>()
    }

    /// The address of element 0 of the backing storage, ignoring the offset.
    pub fn base_ptr(&self) -> NonNull<T> {
        self.base
    }

    /// The address of the element at the current offset, i.e.
    /// `base + offset * size_of::<T>()`.
    ///
    /// The view itself never dereferences this - it exists purely to feed the raw
    /// copy operations.
    pub fn ptr_at_offset(&self) -> NonNull<T> {
        // SAFETY: The construction contract says `base` addresses a region of
        // `backing_len` elements and our invariant keeps offset <= backing_len, so
        // the result is within that region or one past its end - both of which are
        // valid positions to compute (though not to dereference, which we never do).
        unsafe { NonNull::new_unchecked(self.base.as_ptr().add(self.offset)) }
    }
}

// Implemented by hand because the derived versions would uselessly require T to be
// Clone/Copy - the view is a reference-like value regardless of T.
impl<T> Clone for BufferView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for BufferView<'_, T> {}

impl<T> fmt::Debug for BufferView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferView")
            .field("base", &format_args!("{:p}", self.base.as_ptr()))
            .field("backing_len", &self.backing_len)
            .field("offset", &self.offset)
            .finish()
    }
}
