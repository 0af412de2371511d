//! Region bookkeeping: where committed data lives and where new data may go.
//!
//! The occupied part of the store is at most two spans:
//!
//! ```text
//!   Single(A):      [ free | A A A A A | free     ]
//!   Split { A, B }: [ B B | free | A A A | frozen ]
//!                                       ^ high-water mark
//! ```
//!
//! Readers always drain A. Writers extend A at its end until the tail runs
//! out, then start B at offset 0 and keep extending B. Once A is fully
//! released, B takes its place and the tail becomes usable again. A fully
//! released A with nothing behind it leaves `Empty`, which remembers where A
//! ended so the next write continues from there.

use crate::invariants::{
    debug_assert_b_at_front, debug_assert_disjoint, debug_assert_in_bounds,
    debug_assert_region_nonempty,
};
use crate::{BufferError, Result};

/// A contiguous run of bytes in the store, `[start, start + len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Offset of the first byte.
    pub start: usize,
    /// Number of bytes.
    pub len: usize,
}

impl Span {
    #[inline]
    pub const fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    /// One past the last byte.
    #[inline]
    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Committed, unreleased data in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regions {
    /// Nothing committed.
    Empty {
        /// Where region A last ended. Tail reservations start here.
        cursor: usize,
    },
    /// Only region A exists.
    Single(Span),
    /// Region A plus region B, which wrapped to the front of the store.
    Split {
        /// Readable region.
        a: Span,
        /// Wrapped region, always starting at 0.
        b: Span,
    },
}

/// Where a reservation was placed relative to region A.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    /// Directly after the growing region.
    Tail,
    /// At the front of the store, creating or extending region B.
    Front,
}

/// An outstanding reservation between `reserve` and `commit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pending {
    pub(crate) span: Span,
    pub(crate) placement: Placement,
}

/// What a release did to the region layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Released {
    /// Region A shrank but still holds data.
    Advanced,
    /// Region A is gone and nothing was wrapped; the buffer is empty.
    Emptied,
    /// Region A is gone and region B took its place.
    Promoted,
}

impl Default for Regions {
    fn default() -> Self {
        Regions::Empty { cursor: 0 }
    }
}

impl Regions {
    /// Region A, the only region readers see.
    #[inline]
    pub fn readable(&self) -> Option<Span> {
        match *self {
            Regions::Empty { .. } => None,
            Regions::Single(a) | Regions::Split { a, .. } => Some(a),
        }
    }

    /// Region B, if the writer has wrapped.
    #[inline]
    pub fn wrapped(&self) -> Option<Span> {
        match *self {
            Regions::Split { b, .. } => Some(b),
            _ => None,
        }
    }

    /// Total committed, unreleased bytes across both regions.
    #[inline]
    pub fn len(&self) -> usize {
        match *self {
            Regions::Empty { .. } => 0,
            Regions::Single(a) => a.len,
            Regions::Split { a, b } => a.len + b.len,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Regions::Empty { .. })
    }

    /// End of region A while region B exists. Bytes past it are frozen.
    #[inline]
    pub fn high_water_mark(&self) -> Option<usize> {
        match *self {
            Regions::Split { a, .. } => Some(a.end()),
            _ => None,
        }
    }

    /// Finds room for `n` bytes without touching either region.
    ///
    /// The tail after A is tried first, then the gap between B (or offset 0)
    /// and A's start. Either way the total committed after a full commit
    /// stays within `capacity - 1`. An empty buffer that has no room past its
    /// cursor starts over at offset 0.
    pub(crate) fn place(&self, n: usize, capacity: usize) -> Option<Pending> {
        debug_assert!(n > 0 && n < capacity);
        if n > capacity - 1 - self.len() {
            return None;
        }

        let tail = |start: usize| Pending {
            span: Span::new(start, n),
            placement: Placement::Tail,
        };
        let front = |start: usize| Pending {
            span: Span::new(start, n),
            placement: Placement::Front,
        };

        match *self {
            Regions::Empty { cursor } if capacity - cursor >= n => Some(tail(cursor)),
            Regions::Empty { .. } => Some(front(0)),
            Regions::Single(a) if capacity - a.end() >= n => Some(tail(a.end())),
            Regions::Single(a) if a.start >= n => Some(front(0)),
            Regions::Single(_) => None,
            // A's tail is frozen; only the gap in front of A is usable.
            Regions::Split { a, b } if a.start - b.end() >= n => Some(front(b.end())),
            Regions::Split { .. } => None,
        }
    }

    /// Publishes the first `n` bytes of `pending`.
    ///
    /// Releases may have run since the reservation was placed, so the
    /// layout is matched by offset: a window that starts where the last
    /// region ends extends it, a window at offset 0 behind A becomes B.
    pub(crate) fn commit(&mut self, pending: Pending, n: usize) {
        debug_assert!(n <= pending.span.len);
        if n == 0 {
            return;
        }
        let span = Span::new(pending.span.start, n);

        *self = match *self {
            Regions::Empty { .. } => Regions::Single(span),
            Regions::Single(a) if span.start == a.end() => {
                Regions::Single(Span::new(a.start, a.len + n))
            }
            Regions::Single(a) => {
                debug_assert_eq!(span.start, 0, "wrapped window must start at 0");
                Regions::Split { a, b: span }
            }
            Regions::Split { a, b } => {
                debug_assert_eq!(span.start, b.end(), "window must extend region B");
                Regions::Split {
                    a,
                    b: Span::new(b.start, b.len + n),
                }
            }
        };
    }

    /// Frees the first `k` bytes of region A.
    pub(crate) fn release(&mut self, k: usize) -> Result<Released> {
        let Some(a) = self.readable() else {
            if k == 0 {
                return Ok(Released::Emptied);
            }
            return Err(BufferError::InvalidLength { requested: k, max: 0 });
        };
        if k > a.len {
            return Err(BufferError::InvalidLength {
                requested: k,
                max: a.len,
            });
        }

        let rest = Span::new(a.start + k, a.len - k);
        let (next, released) = match *self {
            Regions::Single(_) if rest.is_empty() => {
                (Regions::Empty { cursor: rest.start }, Released::Emptied)
            }
            Regions::Single(_) => (Regions::Single(rest), Released::Advanced),
            Regions::Split { b, .. } if rest.is_empty() => (Regions::Single(b), Released::Promoted),
            Regions::Split { b, .. } => (Regions::Split { a: rest, b }, Released::Advanced),
            Regions::Empty { .. } => unreachable!("readable() returned a region"),
        };
        *self = next;
        Ok(released)
    }

    /// Runs the debug-only structural checks.
    #[inline]
    pub(crate) fn check(&self, capacity: usize) {
        match *self {
            Regions::Empty { cursor } => debug_assert!(cursor <= capacity),
            Regions::Single(a) => {
                debug_assert_region_nonempty!("A", a);
                debug_assert_in_bounds!(a, capacity);
            }
            Regions::Split { a, b } => {
                debug_assert_region_nonempty!("A", a);
                debug_assert_region_nonempty!("B", b);
                debug_assert_b_at_front!(b);
                debug_assert_in_bounds!(a, capacity);
                debug_assert_disjoint!("regions", a, b);
            }
        }
    }
}
