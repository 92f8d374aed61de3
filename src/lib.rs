//! Pinned typed buffers with zero-copy offset views and a raw byte-transfer primitive.
//!
//! The crate is built from three pieces, composed bottom-up:
//!
//! * [`PinnedBuffer`] owns a fixed-capacity contiguous allocation whose address is
//!   guaranteed stable for the buffer's entire lifetime.
//! * [`BufferView`] is a non-owning, offset-aware reference into such an allocation.
//!   Views are cheap to copy and slice; they never allocate, free or dereference
//!   anything on their own.
//! * [`copy`] moves N *source elements' worth* of bytes between two views whose
//!   element types may differ in size and layout, without any intermediate staging
//!   buffer. [`copy_unchecked`] is the narrow unsafe primitive underneath it.
//!
//! A typical flow: allocate a [`PinnedBuffer`], take a [`BufferView`] into it
//! (optionally sliced to an offset) and hand views to [`copy`] to move data between
//! buffers of the same or different element types.
//!
//! The buffer types are single-threaded: a buffer and its views stay on the thread
//! that created them, which is what makes the raw address arithmetic inside safe to
//! reason about.

mod buffer_view;
mod error;
mod pinned_buffer;
mod raw_copy;

pub use buffer_view::*;
pub use error::*;
pub use pinned_buffer::*;
pub use raw_copy::*;

// The traits that define which element types may participate in reinterpreting
// copies and zeroed allocation. Re-exported so callers do not need a direct
// bytemuck dependency just to spell out bounds.
pub use bytemuck::{AnyBitPattern, NoUninit, Zeroable};
