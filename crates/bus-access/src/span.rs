//! Sub-range selection within caller-owned transfer buffers.
//!
//! A [`Span`] names `buffer[start..end]` without slicing eagerly, so a
//! partial transfer hands the HAL a borrowed view instead of a copy.

use core::ops::Range;

/// Selects the part of a buffer a transfer operates on.
///
/// `end` counts from the end of the buffer when negative and defaults to the
/// buffer length when `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Span {
    pub start: usize,
    pub end: Option<isize>,
}

impl Span {
    /// The whole buffer.
    pub const FULL: Span = Span { start: 0, end: None };

    /// `start..end`, with a negative `end` counted from the back.
    pub const fn new(start: usize, end: isize) -> Self {
        Self { start, end: Some(end) }
    }

    /// From `start` to the end of the buffer.
    pub const fn starting_at(start: usize) -> Self {
        Self { start, end: None }
    }

    /// Resolve against a buffer of `len` bytes.
    ///
    /// An `end` before `start` yields an empty range. An `end` past the
    /// buffer is clamped rather than rejected. The result always lies
    /// inside `0..len`.
    pub fn resolve(&self, len: usize) -> Range<usize> {
        let end = match self.end {
            None => len,
            // A still-negative end wraps and ends up clamped below.
            Some(end) if end < 0 => end.wrapping_add(len as isize) as usize,
            Some(end) => end as usize,
        };

        let start = self.start.min(len);
        if end < self.start {
            return start..start;
        }

        let count = (end - self.start).min(len).min(len - start);
        start..start + count
    }

    /// Borrow the selected part of `buffer`.
    #[inline]
    pub fn slice<'b>(&self, buffer: &'b [u8]) -> &'b [u8] {
        &buffer[self.resolve(buffer.len())]
    }

    /// Mutably borrow the selected part of `buffer`.
    #[inline]
    pub fn slice_mut<'b>(&self, buffer: &'b mut [u8]) -> &'b mut [u8] {
        let range = self.resolve(buffer.len());
        &mut buffer[range]
    }
}

impl From<Range<usize>> for Span {
    fn from(range: Range<usize>) -> Self {
        Self { start: range.start, end: Some(range.end as isize) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_range() {
        assert_eq!(Span::new(2, 8).resolve(10), 2..8);
    }

    #[test]
    fn negative_end_counts_from_back() {
        assert_eq!(Span::new(2, -1).resolve(10), 2..9);
    }

    #[test]
    fn inverted_range_is_empty() {
        let range = Span::new(5, 3).resolve(10);
        assert!(range.is_empty());
        assert_eq!(range.start, 5);
    }

    #[test]
    fn oversized_end_is_clamped() {
        assert_eq!(Span::new(0, 100).resolve(10), 0..10);
        assert_eq!(Span::new(4, 100).resolve(10), 4..10);
    }

    #[test]
    fn omitted_end_is_buffer_length() {
        assert_eq!(Span::FULL.resolve(10), 0..10);
        assert_eq!(Span::starting_at(3).resolve(10), 3..10);
    }

    #[test]
    fn start_past_buffer_is_empty() {
        assert!(Span::starting_at(12).resolve(10).is_empty());
        assert!(Span::new(12, 20).resolve(10).is_empty());
    }

    #[test]
    fn very_negative_end_wraps_and_clamps() {
        assert_eq!(Span::new(0, -20).resolve(10), 0..10);
    }

    #[test]
    fn slices_borrow_in_place() {
        let mut buffer = [0u8; 10];
        Span::new(2, 4).slice_mut(&mut buffer).copy_from_slice(&[7, 8]);
        assert_eq!(Span::new(1, 5).slice(&buffer), &[0, 7, 8, 0]);
    }
}
