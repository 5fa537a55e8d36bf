//! Ring-buffer drain/fill math for a single RTT channel (spec §3
//! invariants: `wr_off < size`, `rd_off < size`, empty iff
//! `wr_off == rd_off`, full iff `(wr_off + 1) % size == rd_off`).
//!
//! Kept free of any I/O so the wrap-around arithmetic can be exercised
//! directly, the way `mi/parser.rs`'s grammar helpers are tested apart
//! from the process that feeds them.

/// One contiguous span `[offset, offset + len)` within the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub offset: u32,
    pub len: u32,
}

/// Bytes available to read between `rd_off` and `wr_off`, as at most two
/// contiguous spans (one if the unread region doesn't wrap, two if it
/// does). Returns `None` if `size` is zero or either offset is
/// out-of-range, signalling a corrupted descriptor to the caller.
pub fn readable_spans(size: u32, wr_off: u32, rd_off: u32) -> Option<Vec<Span>> {
    if size == 0 || wr_off >= size || rd_off >= size {
        return None;
    }
    if wr_off == rd_off {
        return Some(Vec::new());
    }
    if wr_off > rd_off {
        return Some(vec![Span { offset: rd_off, len: wr_off - rd_off }]);
    }
    Some(vec![
        Span { offset: rd_off, len: size - rd_off },
        Span { offset: 0, len: wr_off },
    ])
}

/// Total unread byte count, equivalent to summing [`readable_spans`].
pub fn readable_len(size: u32, wr_off: u32, rd_off: u32) -> Option<u32> {
    if size == 0 || wr_off >= size || rd_off >= size {
        return None;
    }
    Some(if wr_off >= rd_off { wr_off - rd_off } else { size - rd_off + wr_off })
}

/// Advance `rd_off` by `n` unread bytes (mod `size`), as the engine does
/// once a drained chunk has been acknowledged by its sink.
pub fn advance_offset(size: u32, rd_off: u32, n: u32) -> u32 {
    if size == 0 {
        return 0;
    }
    (rd_off + n) % size
}

/// Free space available to a writer (the host, writing a down-channel)
/// before the buffer reports full — one byte is always reserved so that
/// `wr_off == rd_off` stays unambiguous with "empty" (spec §3).
pub fn writable_len(size: u32, wr_off: u32, rd_off: u32) -> Option<u32> {
    if size == 0 || wr_off >= size || rd_off >= size {
        return None;
    }
    let used = readable_len(size, wr_off, rd_off)?;
    Some(size - used - 1)
}

/// `true` iff the descriptor reports the buffer full per the spec's
/// invariant `(wr_off + 1) % size == rd_off`.
pub fn is_full(size: u32, wr_off: u32, rd_off: u32) -> bool {
    size != 0 && (wr_off + 1) % size == rd_off
}

/// Spans to write `n` bytes starting at `wr_off`, wrapping at `size`.
/// Caller is responsible for ensuring `n` does not exceed
/// [`writable_len`].
pub fn write_spans(size: u32, wr_off: u32, n: u32) -> Vec<Span> {
    if n == 0 || size == 0 {
        return Vec::new();
    }
    let first = n.min(size - wr_off);
    if first == n {
        vec![Span { offset: wr_off, len: n }]
    } else {
        vec![
            Span { offset: wr_off, len: first },
            Span { offset: 0, len: n - first },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_when_offsets_equal() {
        assert_eq!(readable_spans(16, 5, 5), Some(Vec::new()));
        assert_eq!(readable_len(16, 5, 5), Some(0));
    }

    #[test]
    fn contiguous_span_when_not_wrapped() {
        assert_eq!(
            readable_spans(16, 10, 4),
            Some(vec![Span { offset: 4, len: 6 }])
        );
        assert_eq!(readable_len(16, 10, 4), Some(6));
    }

    #[test]
    fn two_spans_when_wrapped() {
        assert_eq!(
            readable_spans(16, 2, 14),
            Some(vec![
                Span { offset: 14, len: 2 },
                Span { offset: 0, len: 2 },
            ])
        );
        assert_eq!(readable_len(16, 2, 14), Some(4));
    }

    #[test]
    fn out_of_range_offsets_reported_corrupt() {
        assert_eq!(readable_spans(16, 16, 0), None);
        assert_eq!(readable_spans(16, 0, 99), None);
        assert_eq!(readable_spans(0, 0, 0), None);
    }

    #[test]
    fn advance_offset_wraps() {
        assert_eq!(advance_offset(16, 14, 4), 2);
        assert_eq!(advance_offset(16, 0, 0), 0);
    }

    #[test]
    fn writable_len_reserves_one_byte() {
        // size 16, nothing read yet: 15 free, not 16.
        assert_eq!(writable_len(16, 0, 0), Some(15));
    }

    #[test]
    fn full_detection_matches_invariant() {
        assert!(is_full(16, 3, 4));
        assert!(!is_full(16, 3, 5));
    }

    #[test]
    fn write_spans_wraps_when_needed() {
        assert_eq!(write_spans(16, 14, 4), vec![
            Span { offset: 14, len: 2 },
            Span { offset: 0, len: 2 },
        ]);
        assert_eq!(write_spans(16, 2, 4), vec![Span { offset: 2, len: 4 }]);
    }
}
