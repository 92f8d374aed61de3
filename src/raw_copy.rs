use crate::BufferView;
use bytemuck::{AnyBitPattern, NoUninit};
use std::any::type_name;
use std::{mem, ptr};

/// Copies `count` source elements' worth of bytes from `source` into `dest`.
///
/// This is a byte-for-byte transfer sized by the *source* element type: it moves
/// exactly `count * size_of::<S>()` bytes starting at the source view's offset into
/// the memory starting at the destination view's offset, reinterpreting the byte
/// stream. No element-wise conversion between `S` and `D` takes place. This is the
/// mechanism for viewing a typed sequence as raw bytes (or vice versa) without an
/// intermediate staging buffer.
///
/// The trait bounds are what make the reinterpretation sound: `S: NoUninit` means
/// the source bytes are all initialized (no padding), and `D: AnyBitPattern` means
/// any byte sequence forms valid destination values.
///
/// `count == 0` is a no-op. Copying a range exactly onto itself (same address) is
/// a no-op. There is no partial-copy mode: either the full byte range is moved or
/// the operation panics without touching memory.
///
/// # Panics
///
/// Panics if the byte count overflows `usize`, if either view has fewer than
/// `count * size_of::<S>()` bytes remaining after its offset, or if the source and
/// destination byte ranges partially overlap. These are contract violations, not
/// recoverable conditions - a raw memory move that went ahead anyway would corrupt
/// memory instead.
pub fn copy<S, D>(source: BufferView<'_, S>, dest: BufferView<'_, D>, count: usize)
where
    S: NoUninit,
    D: AnyBitPattern,
{
    let byte_count = count
        .checked_mul(mem::size_of::<S>())
        .unwrap_or_else(|| {
            panic!(
                "byte count of copying {count} elements of {} overflows usize",
                type_name::<S>()
            )
        });

    if byte_count == 0 {
        return;
    }

    assert!(
        byte_count <= source.remaining_bytes(),
        "copy of {byte_count} bytes overruns the {} bytes remaining in the source of {}",
        source.remaining_bytes(),
        type_name::<S>()
    );
    assert!(
        byte_count <= dest.remaining_bytes(),
        "copy of {byte_count} bytes overruns the {} bytes remaining in the destination of {}",
        dest.remaining_bytes(),
        type_name::<D>()
    );

    let src = source.ptr_at_offset().as_ptr() as usize;
    let dst = dest.ptr_at_offset().as_ptr() as usize;

    // A range copied exactly onto itself already holds the result.
    if src == dst {
        return;
    }

    // Both ranges were just validated to lie within real allocations, so the end
    // addresses cannot wrap.
    assert!(
        src + byte_count <= dst || dst + byte_count <= src,
        "source and destination ranges of a {byte_count} byte copy overlap"
    );

    // SAFETY: Capacity on both sides and non-overlap were checked above; the views
    // guarantee (per their construction contract) that the addresses are valid for
    // reads/writes for the duration of the borrows they carry, and the trait bounds
    // make the resulting destination bytes valid values of D.
    unsafe {
        copy_unchecked(source, dest, count);
    }
}

/// Copies `count * size_of::<S>()` bytes from `source` into `dest` with no checks
/// of any kind. This is the single unchecked primitive that every checked copy
/// entry point funnels into.
///
/// # Safety
///
/// The caller must guarantee all of the following:
///
/// * both views have at least `count * size_of::<S>()` bytes after their offsets;
/// * the source and destination byte ranges do not overlap;
/// * no other access to the destination range happens concurrently;
/// * the destination memory is subsequently treated in a way that is valid for the
///   bytes written into it (the checked [`copy`] encodes this via trait bounds;
///   here it is entirely the caller's problem).
pub unsafe fn copy_unchecked<S, D>(
    source: BufferView<'_, S>,
    dest: BufferView<'_, D>,
    count: usize,
) {
    let byte_count = count * mem::size_of::<S>();

    ptr::copy_nonoverlapping(
        source.ptr_at_offset().as_ptr() as *const u8,
        dest.ptr_at_offset().as_ptr() as *mut u8,
        byte_count,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PinnedBuffer;
    use bytemuck::{cast_slice, Pod, Zeroable};

    // A mixed-field record. Laid out without padding so that every byte of it is
    // initialized, which is what lets it participate in reinterpreting copies.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Record {
        index: u64,
        value: f64,
    }

    const RECORD_SIZE: usize = mem::size_of::<Record>();

    fn records(count: usize) -> Vec<Record> {
        (0..count)
            .map(|i| Record {
                index: i as u64,
                value: i as f64,
            })
            .collect()
    }

    fn copy_to_own_type(count: usize) {
        let source = PinnedBuffer::from_vec(records(count + 2));
        let dest = PinnedBuffer::<Record>::new_zeroed(count + 5);

        copy(source.view(), dest.view(), count);

        assert_eq!(dest.as_slice()[..count], source.as_slice()[..count]);

        // The element one past the copied range is untouched.
        assert_eq!(dest.as_slice()[count], Record::default());
        assert_ne!(source.as_slice()[count], Record::default());
    }

    #[test]
    fn to_own_type_small() {
        copy_to_own_type(4);
    }

    #[test]
    fn to_own_type_larger_than_cache_line() {
        copy_to_own_type(1500);
    }

    fn copy_typed_to_bytes(count: usize) {
        let source = PinnedBuffer::from_vec(records(count + 2));
        let dest = PinnedBuffer::<u8>::new_zeroed((count + 1) * RECORD_SIZE + 1);

        copy(source.view(), dest.view(), count);

        let expected: &[u8] = cast_slice(&source.as_slice()[..count]);
        assert_eq!(&dest.as_slice()[..count * RECORD_SIZE], expected);

        // Everything past the copied byte range is untouched.
        assert!(dest.as_slice()[count * RECORD_SIZE..].iter().all(|&b| b == 0));
    }

    #[test]
    fn typed_to_bytes_small() {
        copy_typed_to_bytes(4);
    }

    #[test]
    fn typed_to_bytes_larger_than_cache_line() {
        copy_typed_to_bytes(1500);
    }

    fn copy_bytes_to_typed(count: usize) {
        let byte_count = count * RECORD_SIZE;
        let source =
            PinnedBuffer::from_vec((0..byte_count).map(|i| (i % 255) as u8).collect());
        let dest = PinnedBuffer::<Record>::new_zeroed(count + 2);

        copy(source.view(), dest.view(), byte_count);

        // Compare in byte space: casting &[Record] down to bytes is always
        // alignment-safe, the reverse direction is not.
        let actual: &[u8] = cast_slice(&dest.as_slice()[..count]);
        assert_eq!(actual, source.as_slice());

        // The record one past the reinterpreted range is untouched.
        assert_eq!(dest.as_slice()[count], Record::default());
    }

    #[test]
    fn bytes_to_typed_small() {
        copy_bytes_to_typed(4);
    }

    #[test]
    fn bytes_to_typed_larger_than_cache_line() {
        copy_bytes_to_typed(1500);
    }

    #[test]
    fn round_trip_through_bytes_is_lossless() {
        let original = records(7);

        let source = PinnedBuffer::from_vec(original.clone());
        let bytes = PinnedBuffer::<u8>::new_zeroed(7 * RECORD_SIZE);
        let restored = PinnedBuffer::<Record>::new_zeroed(7);

        copy(source.view(), bytes.view(), 7);
        copy(bytes.view(), restored.view(), 7 * RECORD_SIZE);

        assert_eq!(restored.as_slice(), &original[..]);
    }

    #[test]
    fn zero_count_is_noop() {
        let source = PinnedBuffer::from_vec(records(2));
        let dest = PinnedBuffer::<Record>::new_zeroed(2);

        copy(source.view(), dest.view(), 0);

        assert_eq!(dest.as_slice(), &[Record::default(), Record::default()][..]);
    }

    #[test]
    fn zero_count_is_noop_even_on_empty_buffers() {
        let source = PinnedBuffer::<Record>::new_zeroed(0);
        let dest = PinnedBuffer::<u8>::new_zeroed(0);

        copy(source.view(), dest.view(), 0);
    }

    #[test]
    fn copy_between_sliced_views() {
        let source = PinnedBuffer::from_vec(vec![10_u32, 11, 12, 13, 14]);
        let dest = PinnedBuffer::<u32>::new_zeroed(5);

        copy(
            source.view_at(2).unwrap(),
            dest.view_at(3).unwrap(),
            2,
        );

        assert_eq!(dest.as_slice(), &[0, 0, 0, 12, 13]);
    }

    #[test]
    fn copy_onto_itself_is_noop() {
        let buffer = PinnedBuffer::from_vec(vec![1_u32, 2, 3]);

        copy(buffer.view(), buffer.view(), 3);

        assert_eq!(buffer.as_slice(), &[1, 2, 3]);
    }

    #[test]
    #[should_panic]
    fn panic_when_destination_too_small() {
        let source = PinnedBuffer::from_vec(records(4));
        let dest = PinnedBuffer::<u8>::new_zeroed(RECORD_SIZE);

        copy(source.view(), dest.view(), 4);
    }

    #[test]
    #[should_panic]
    fn panic_when_source_too_small() {
        let source = PinnedBuffer::from_vec(records(2));
        let dest = PinnedBuffer::<Record>::new_zeroed(8);

        copy(source.view(), dest.view(), 4);
    }

    #[test]
    #[should_panic(expected = "overflows usize")]
    fn panic_when_byte_count_overflows() {
        let source = PinnedBuffer::from_vec(records(2));
        let dest = PinnedBuffer::<Record>::new_zeroed(2);

        // A count whose byte size cannot be represented must be rejected by the
        // byte-count computation itself, before any capacity math or memory access.
        copy(source.view(), dest.view(), usize::MAX / 2);
    }

    #[test]
    #[should_panic]
    fn panic_when_ranges_overlap() {
        let buffer = PinnedBuffer::from_vec(vec![1_u32, 2, 3, 4]);

        copy(buffer.view(), buffer.view_at(1).unwrap(), 2);
    }

    #[test]
    fn unchecked_copy_moves_exactly_the_requested_bytes() {
        let source = PinnedBuffer::from_vec(vec![0xAB_u8; 8]);
        let dest = PinnedBuffer::<u8>::new_zeroed(8);

        // SAFETY: Both views cover 8 bytes of disjoint live storage and u8 accepts
        // any byte value.
        unsafe {
            copy_unchecked(source.view(), dest.view(), 5);
        }

        assert_eq!(dest.as_slice(), &[0xAB, 0xAB, 0xAB, 0xAB, 0xAB, 0, 0, 0]);
    }
}
