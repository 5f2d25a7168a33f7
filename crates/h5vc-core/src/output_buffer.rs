//! Output buffers for the two drivers.
//!
//! The encoder appends packets of unknown size into an [`OutputBuffer`]; the
//! decoder writes planes of known size into a [`PlaneBuffer`] sized once up
//! front.

use crate::error::{FilterError, Result};

/// Initial compression-ratio guess used to size the encoder's buffer.
pub const EXPECTED_COMPRESSION_RATIO: usize = 30;

/// Append-only byte buffer with explicit capacity tracking.
///
/// Invariant: `len() <= capacity()`; capacity never shrinks.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    data: Vec<u8>,
    capacity: usize,
    grow_events: usize,
}

impl OutputBuffer {
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|_| FilterError::OutOfMemory {
                requested: capacity,
            })?;
        Ok(Self {
            data,
            capacity,
            grow_events: 0,
        })
    }

    /// Buffer sized for a chunk of `raw_size` bytes.
    pub fn for_raw_size(raw_size: usize) -> Result<Self> {
        Self::with_capacity(raw_size / EXPECTED_COMPRESSION_RATIO)
    }

    /// Append `bytes`, growing to `2 × new_len` when capacity runs out.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        let new_len = self
            .data
            .len()
            .checked_add(bytes.len())
            .ok_or(FilterError::OutOfMemory {
                requested: usize::MAX,
            })?;
        if new_len > self.capacity {
            let target = new_len.saturating_mul(2);
            self.data
                .try_reserve_exact(target - self.data.len())
                .map_err(|_| FilterError::OutOfMemory { requested: target })?;
            tracing::trace!(from = self.capacity, to = target, "Output buffer grown");
            self.capacity = target;
            self.grow_events += 1;
        }
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// How many times [`append`](Self::append) had to reallocate.
    pub fn grow_events(&self) -> usize {
        self.grow_events
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

/// Fixed-size plane sink for decoded frames.
#[derive(Debug)]
pub struct PlaneBuffer {
    data: Vec<u8>,
    frame_size: usize,
    filled: usize,
}

impl PlaneBuffer {
    /// Zeroed buffer holding exactly `depth` planes of `frame_size` bytes.
    pub fn new(frame_size: usize, depth: usize) -> Result<Self> {
        let total = frame_size
            .checked_mul(depth)
            .ok_or(FilterError::OutOfMemory {
                requested: usize::MAX,
            })?;
        let mut data = Vec::new();
        data.try_reserve_exact(total)
            .map_err(|_| FilterError::OutOfMemory { requested: total })?;
        data.resize(total, 0);
        Ok(Self {
            data,
            frame_size,
            filled: 0,
        })
    }

    /// Next unwritten plane. Fails once every plane has been written.
    pub fn next_plane(&mut self) -> Result<&mut [u8]> {
        let start = self.filled * self.frame_size;
        if start + self.frame_size > self.data.len() {
            return Err(FilterError::SizeMismatch {
                expected: self.data.len(),
                actual: start + self.frame_size,
            });
        }
        self.filled += 1;
        Ok(&mut self.data[start..start + self.frame_size])
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn planes_written(&self) -> usize {
        self.filled
    }

    pub fn planes_total(&self) -> usize {
        self.data.len().checked_div(self.frame_size).unwrap_or(0)
    }

    pub fn is_full(&self) -> bool {
        self.filled * self.frame_size == self.data.len()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_capacity_uses_ratio_guess() {
        let buf = OutputBuffer::for_raw_size(64 * 64 * 64).unwrap();
        assert_eq!(buf.capacity(), 64 * 64 * 64 / 30);
        assert!(buf.is_empty());
    }

    #[test]
    fn growth_doubles_the_new_length() {
        let mut buf = OutputBuffer::with_capacity(10).unwrap();
        buf.append(&[1; 8]).unwrap();
        assert_eq!(buf.capacity(), 10);
        buf.append(&[2; 5]).unwrap();
        assert_eq!(buf.len(), 13);
        assert_eq!(buf.capacity(), 26);
        assert_eq!(buf.grow_events(), 1);
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let mut buf = OutputBuffer::with_capacity(0).unwrap();
        let mut last_capacity = 0;
        for n in [0usize, 1, 3, 100, 7, 1000, 2, 64] {
            buf.append(&vec![0xAB; n]).unwrap();
            assert!(buf.len() <= buf.capacity());
            assert!(buf.capacity() >= last_capacity);
            last_capacity = buf.capacity();
        }
        assert_eq!(buf.len(), 1177);
    }

    #[test]
    fn appends_preserve_order() {
        let mut buf = OutputBuffer::with_capacity(2).unwrap();
        buf.append(b"ab").unwrap();
        buf.append(b"").unwrap();
        buf.append(b"cde").unwrap();
        assert_eq!(buf.into_vec(), b"abcde");
    }

    #[test]
    fn plane_buffer_rejects_extra_planes() {
        let mut planes = PlaneBuffer::new(4, 2).unwrap();
        planes.next_plane().unwrap().copy_from_slice(&[1, 2, 3, 4]);
        assert!(!planes.is_full());
        planes.next_plane().unwrap().copy_from_slice(&[5, 6, 7, 8]);
        assert!(planes.is_full());
        let err = planes.next_plane().unwrap_err();
        assert!(matches!(
            err,
            FilterError::SizeMismatch {
                expected: 8,
                actual: 12
            }
        ));
        assert_eq!(planes.planes_written(), 2);
        assert_eq!(planes.into_vec(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
