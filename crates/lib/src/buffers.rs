//! Buffer helpers: merge an ordered run of byte regions into one contiguous buffer.
//!
//! Used to join payload fragments or chunked body pieces before handing them on as one slice.

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Shared zero-length buffer handed out whenever there is nothing to merge.
pub static EMPTY: Bytes = Bytes::from_static(&[]);

/// Concatenate the remaining bytes of every buffer, in order, into a new buffer.
///
/// Each input is read through a cloned view, so the caller's buffers keep their position.
/// The result is sized to the sum of each buffer's own `remaining()` and is returned
/// positioned at its start. When that sum is zero a clone of [`EMPTY`] is returned and
/// nothing is allocated.
pub fn copy_many<B: Buf + Clone>(buffers: &[B]) -> Bytes {
    let size: usize = buffers.iter().map(Buf::remaining).sum();
    if size == 0 {
        return EMPTY.clone();
    }

    let mut result = BytesMut::with_capacity(size);
    for item in buffers {
        result.put(item.clone());
    }
    result.freeze()
}
