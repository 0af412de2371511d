use crate::invariants::{debug_assert_disjoint, debug_assert_in_bounds, debug_assert_occupancy};
use crate::metrics::Metrics;
use crate::region::{Pending, Placement, Regions, Released, Span};
use crate::split::{Reader, Writer};
use crate::{BufferError, Config, MetricsSnapshot, Result};
use std::cell::{Cell, UnsafeCell};
use std::fmt;
use tracing::{debug, trace};

// =============================================================================
// ALIASING PROTOCOL
// =============================================================================
//
// The store is handed out as raw sub-slices, so correctness rests on three
// disjoint sets of bytes:
//
// - region A and region B: committed data, only ever viewed through `&[u8]`
// - the pending reservation: the only bytes ever viewed through `&mut [u8]`
// - everything else: free, and not viewed at all
//
// `Regions::place` only returns windows outside A and B, and region bytes
// are only given back to the free set by `release`, never beyond the length
// of the latest view handed to the reader. Every public entry
// point that can end a view (`commit`, `release`, `clear`) takes `&mut` on
// the type the view borrows from, so the borrow checker retires stale views
// before the bytes underneath them change hands.
//
// The store is `Box<[UnsafeCell<u8>]>` so that a shared reference to the
// buffer may still produce a write pointer into the pending window.
//
// =============================================================================

/// Fixed-capacity bipartite byte buffer.
///
/// A producer claims contiguous space with [`reserve`](Self::reserve), fills
/// it in place and publishes it with [`commit`](Self::commit). A consumer
/// gets a contiguous view of published bytes from [`read`](Self::read) and
/// hands them back with [`release`](Self::release). Neither side copies.
///
/// When the tail of the store runs out, new data wraps to the front and the
/// reader sees it only after the pre-wrap data has been released, so a
/// wrapped write sequence drains in two `read`/`release` cycles.
///
/// To keep a read view alive while writing, use [`split`](Self::split).
pub struct Buffer {
    store: Box<[UnsafeCell<u8>]>,
    regions: Cell<Regions>,
    pending: Cell<Option<Pending>>,
    /// Bytes of region A the reader has been shown and not yet released.
    last_view: Cell<usize>,
    metrics: Metrics,
    config: Config,
}

impl Buffer {
    /// Creates a buffer with `capacity` bytes of backing store.
    ///
    /// Fails with [`BufferError::InvalidCapacity`] if `capacity < 2`.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_config(Config::default().with_capacity(capacity))
    }

    /// Creates a buffer from a full configuration.
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        let store = (0..config.capacity).map(|_| UnsafeCell::new(0)).collect();
        Ok(Self {
            store,
            regions: Cell::new(Regions::default()),
            pending: Cell::new(None),
            last_view: Cell::new(0),
            metrics: Metrics::new(),
            config,
        })
    }

    // ---------------------------------------------------------------------
    // STATUS
    // ---------------------------------------------------------------------

    /// Size of the backing store.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.store.len()
    }

    /// Committed bytes not yet released, across both regions.
    #[inline]
    pub fn len(&self) -> usize {
        self.regions.get().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.regions.get().is_empty()
    }

    /// Free bytes, not necessarily contiguous. One byte is never usable.
    #[inline]
    pub fn available(&self) -> usize {
        self.capacity() - 1 - self.len()
    }

    /// Returns true if a reservation is waiting for its commit.
    #[inline]
    pub fn has_pending(&self) -> bool {
        self.pending.get().is_some()
    }

    /// End of the readable region while wrapped data is waiting behind it.
    #[inline]
    pub fn high_water_mark(&self) -> Option<usize> {
        self.regions.get().high_water_mark()
    }

    /// Snapshot of the current region layout.
    #[inline]
    pub fn regions(&self) -> Regions {
        self.regions.get()
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get a snapshot of metrics if enabled.
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.config.enable_metrics {
            self.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }

    /// Zeroes all metric counters.
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    // ---------------------------------------------------------------------
    // PRODUCER API
    // ---------------------------------------------------------------------

    /// Claims `n` contiguous bytes for writing.
    ///
    /// The returned slice is exactly `n` bytes long and holds whatever was
    /// there before. Nothing becomes readable until [`commit`](Self::commit).
    pub fn reserve(&mut self, n: usize) -> Result<&mut [u8]> {
        let span = self.reserve_span(n)?;
        // SAFETY: `span` is the fresh pending window, disjoint from both
        // regions, and `&mut self` rules out any other view.
        Ok(unsafe { self.view_mut(span) })
    }

    /// Publishes the first `n` bytes of the pending reservation.
    ///
    /// The rest of the reservation is given back as free space.
    pub fn commit(&mut self, n: usize) -> Result<()> {
        self.commit_pending(n)
    }

    /// Reserves, copies and commits `data` in one step.
    pub fn push(&mut self, data: &[u8]) -> Result<()> {
        self.push_bytes(data)
    }

    // ---------------------------------------------------------------------
    // CONSUMER API
    // ---------------------------------------------------------------------

    /// Contiguous view of the readable region, or `None` if nothing is
    /// committed.
    ///
    /// Calling this again without a release returns the same bytes. The
    /// view's length bounds the next [`release`](Self::release).
    pub fn read(&self) -> Option<&[u8]> {
        let span = self.readable_span()?;
        // SAFETY: region A is committed data; the only `&mut` view is the
        // pending window, which `place` keeps disjoint from it.
        Some(unsafe { self.view(span) })
    }

    /// Frees the first `k` bytes of the readable region.
    ///
    /// `k` may not exceed the length of the latest [`read`](Self::read)
    /// view, less whatever has been released since.
    pub fn release(&mut self, k: usize) -> Result<()> {
        self.release_front(k)
    }

    /// Copies up to `out.len()` readable bytes into `out` and releases them.
    pub fn recv(&mut self, out: &mut [u8]) -> usize {
        self.recv_into(out)
    }

    /// Hands every readable view to `handler` and releases it, until the
    /// buffer is empty. Returns the number of bytes drained.
    pub fn drain<F>(&mut self, handler: F) -> usize
    where
        F: FnMut(&[u8]),
    {
        self.drain_with(handler)
    }

    // ---------------------------------------------------------------------
    // LIFECYCLE
    // ---------------------------------------------------------------------

    /// Splits into a producer and a consumer handle.
    ///
    /// Unlike the methods on `Buffer`, a view from [`Reader::read`] stays
    /// usable while the [`Writer`] keeps reserving and committing.
    pub fn split(&mut self) -> (Writer<'_>, Reader<'_>) {
        let buf: &Buffer = self;
        (Writer::new(buf), Reader::new(buf))
    }

    /// Drops all committed data and any pending reservation.
    pub fn clear(&mut self) {
        self.regions.set(Regions::default());
        self.pending.set(None);
        self.last_view.set(0);
    }

    // ---------------------------------------------------------------------
    // SHARED CORE (used by Buffer and the split handles)
    // ---------------------------------------------------------------------

    pub(crate) fn reserve_span(&self, n: usize) -> Result<Span> {
        let capacity = self.capacity();
        if n == 0 {
            debug!("rejected empty reservation");
            return Err(BufferError::InvalidLength {
                requested: 0,
                max: capacity - 1,
            });
        }
        if n >= capacity {
            debug!(requested = n, capacity, "reservation can never fit");
            return Err(BufferError::RequestTooLarge {
                requested: n,
                max: capacity - 1,
            });
        }
        if let Some(pending) = self.pending.get() {
            debug!(requested = n, pending = pending.span.len, "reservation already pending");
            return Err(BufferError::ReservationPending {
                pending: pending.span.len,
            });
        }

        let regions = self.regions.get();
        let Some(pending) = regions.place(n, capacity) else {
            let available = self.available();
            if self.config.enable_metrics {
                self.metrics.add_backpressure();
            }
            debug!(requested = n, available, "not enough space for reservation");
            return Err(BufferError::NotEnoughSpace {
                requested: n,
                available,
            });
        };

        debug_assert_in_bounds!(pending.span, capacity);
        if let Some(a) = regions.readable() {
            debug_assert_disjoint!("reservation and region A", pending.span, a);
        }
        if let Some(b) = regions.wrapped() {
            debug_assert_disjoint!("reservation and region B", pending.span, b);
        }

        if pending.placement == Placement::Front {
            trace!(
                offset = pending.span.start,
                len = n,
                high_water_mark = ?regions.readable().map(|a| a.end()),
                "reservation wrapped to front of store"
            );
            if self.config.enable_metrics {
                self.metrics.add_wrap();
            }
        }
        if self.config.enable_metrics {
            self.metrics.add_reservation();
        }

        self.pending.set(Some(pending));
        Ok(pending.span)
    }

    pub(crate) fn commit_pending(&self, n: usize) -> Result<()> {
        let Some(pending) = self.pending.get() else {
            debug!(n, "commit without reservation");
            return Err(BufferError::NoReservation);
        };
        if n > pending.span.len {
            debug!(n, reserved = pending.span.len, "commit exceeds reservation");
            return Err(BufferError::InvalidLength {
                requested: n,
                max: pending.span.len,
            });
        }

        let mut regions = self.regions.get();
        regions.commit(pending, n);
        debug_assert_occupancy!(regions.len(), self.capacity());
        regions.check(self.capacity());

        self.regions.set(regions);
        self.pending.set(None);

        if self.config.enable_metrics {
            self.metrics.add_commit(n);
        }
        Ok(())
    }

    /// Region A as the reader is about to see it. Records its length as
    /// the bound for the next release.
    #[inline]
    pub(crate) fn readable_span(&self) -> Option<Span> {
        let span = self.regions.get().readable();
        self.last_view.set(span.map_or(0, |a| a.len));
        span
    }

    pub(crate) fn release_front(&self, k: usize) -> Result<()> {
        let shown = self.last_view.get();
        if k > shown {
            debug!(k, shown, "release exceeds last read view");
            return Err(BufferError::InvalidLength {
                requested: k,
                max: shown,
            });
        }

        let mut regions = self.regions.get();
        let released = regions.release(k)?;
        regions.check(self.capacity());
        self.regions.set(regions);
        self.last_view.set(shown - k);

        match released {
            Released::Promoted => {
                trace!(len = regions.len(), "wrapped region promoted to readable");
                if self.config.enable_metrics {
                    self.metrics.add_promotion();
                }
            }
            Released::Emptied if k > 0 => trace!("buffer drained"),
            _ => {}
        }
        if self.config.enable_metrics {
            self.metrics.add_released(k);
        }
        Ok(())
    }

    pub(crate) fn push_bytes(&self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let span = self.reserve_span(data.len())?;
        // SAFETY: the pending window was just placed outside both regions and
        // the view does not outlive this statement.
        unsafe { self.view_mut(span) }.copy_from_slice(data);
        self.commit_pending(data.len())
    }

    pub(crate) fn recv_into(&self, out: &mut [u8]) -> usize {
        let Some(span) = self.readable_span() else {
            return 0;
        };
        let n = span.len.min(out.len());
        // SAFETY: region A is committed data and the view is dropped before
        // the release below.
        out[..n].copy_from_slice(&unsafe { self.view(span) }[..n]);
        self.release_front(n).map_or(0, |()| n)
    }

    pub(crate) fn drain_with<F>(&self, mut handler: F) -> usize
    where
        F: FnMut(&[u8]),
    {
        let mut total = 0;
        while let Some(span) = self.readable_span() {
            // SAFETY: as in `read`; `handler` cannot keep the view past this
            // call because it only receives a higher-ranked borrow.
            handler(unsafe { self.view(span) });
            if self.release_front(span.len).is_err() {
                break;
            }
            total += span.len;
        }
        total
    }

    // ---------------------------------------------------------------------
    // RAW VIEWS
    // ---------------------------------------------------------------------

    #[inline]
    fn base(&self) -> *mut u8 {
        UnsafeCell::raw_get(self.store.as_ptr())
    }

    /// # Safety
    ///
    /// `span` must lie inside the store and no `&mut` view may overlap it
    /// while the returned slice is alive.
    #[inline]
    pub(crate) unsafe fn view(&self, span: Span) -> &[u8] {
        debug_assert_in_bounds!(span, self.capacity());
        std::slice::from_raw_parts(self.base().add(span.start), span.len)
    }

    /// # Safety
    ///
    /// `span` must lie inside the store and no other view may overlap it
    /// while the returned slice is alive.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn view_mut(&self, span: Span) -> &mut [u8] {
        debug_assert_in_bounds!(span, self.capacity());
        std::slice::from_raw_parts_mut(self.base().add(span.start), span.len)
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("capacity", &self.capacity())
            .field("regions", &self.regions.get())
            .field("pending", &self.pending.get().map(|p| p.span))
            .field("high_water_mark", &self.high_water_mark())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn commit_bytes(b: &mut Buffer, data: &[u8]) {
        let w = b.reserve(data.len()).unwrap();
        w.copy_from_slice(data);
        b.commit(data.len()).unwrap();
    }

    #[test]
    fn test_buffer_read_my_writes() {
        let mut b = Buffer::new(10).unwrap();

        let w = b.reserve(4).unwrap();
        assert_eq!(w.len(), 4);
        w.copy_from_slice(b"abcd");
        b.commit(4).unwrap();

        assert_eq!(b.read(), Some(&b"abcd"[..]));
        b.release(4).unwrap();
        assert_eq!(b.read(), None);
        assert!(b.is_empty());
    }

    #[test]
    fn test_buffer_invalid_capacity() {
        assert_eq!(
            Buffer::new(1).unwrap_err(),
            BufferError::InvalidCapacity { capacity: 1 }
        );
        assert!(Buffer::new(0).is_err());

        let mut b = Buffer::new(2).unwrap();
        b.push(b"x").unwrap();
        assert_eq!(b.read(), Some(&b"x"[..]));
    }

    #[test]
    fn test_reserve_argument_checks() {
        let mut b = Buffer::new(10).unwrap();
        assert_eq!(
            b.reserve(0).unwrap_err(),
            BufferError::InvalidLength { requested: 0, max: 9 }
        );
        assert_eq!(
            b.reserve(10).unwrap_err(),
            BufferError::RequestTooLarge { requested: 10, max: 9 }
        );

        b.reserve(3).unwrap();
        assert!(b.has_pending());
        assert_eq!(
            b.reserve(2).unwrap_err(),
            BufferError::ReservationPending { pending: 3 }
        );
        // Size check wins over the pending check.
        assert_eq!(
            b.reserve(11).unwrap_err(),
            BufferError::RequestTooLarge { requested: 11, max: 9 }
        );
    }

    #[test]
    fn test_commit_argument_checks() {
        let mut b = Buffer::new(10).unwrap();
        assert_eq!(b.commit(0).unwrap_err(), BufferError::NoReservation);

        b.reserve(3).unwrap();
        assert_eq!(
            b.commit(4).unwrap_err(),
            BufferError::InvalidLength { requested: 4, max: 3 }
        );
        // A rejected commit leaves the reservation in place.
        assert!(b.has_pending());
        b.commit(3).unwrap();
        assert!(!b.has_pending());
        assert_eq!(b.len(), 3);
    }

    #[test]
    fn test_partial_commit_publishes_prefix_only() {
        let mut b = Buffer::new(10).unwrap();
        let w = b.reserve(5).unwrap();
        w.copy_from_slice(b"aaaab");
        b.commit(4).unwrap();

        assert_eq!(b.read(), Some(&b"aaaa"[..]));
        assert_eq!(b.len(), 4);
        assert_eq!(b.available(), 5);
    }

    #[test]
    fn test_zero_commit_abandons_reservation() {
        let mut b = Buffer::new(10).unwrap();
        b.reserve(9).unwrap();
        b.commit(0).unwrap();
        assert!(b.read().is_none());
        assert!(b.reserve(9).is_ok());
    }

    #[test]
    fn test_release_argument_checks() {
        let mut b = Buffer::new(10).unwrap();
        b.release(0).unwrap();
        assert_eq!(
            b.release(1).unwrap_err(),
            BufferError::InvalidLength { requested: 1, max: 0 }
        );

        // Nothing has been read yet, so nothing may be released.
        commit_bytes(&mut b, b"abc");
        assert_eq!(
            b.release(1).unwrap_err(),
            BufferError::InvalidLength { requested: 1, max: 0 }
        );

        assert_eq!(b.read(), Some(&b"abc"[..]));
        assert_eq!(
            b.release(4).unwrap_err(),
            BufferError::InvalidLength { requested: 4, max: 3 }
        );
        b.release(1).unwrap();
        b.release(2).unwrap();
        assert!(b.is_empty());
    }

    #[test]
    fn test_release_bounded_by_last_view() {
        let mut b = Buffer::new(10).unwrap();
        commit_bytes(&mut b, b"aaaa");
        assert_eq!(b.read().map(<[u8]>::len), Some(4));

        // Region A grows to 8 bytes, but only 4 were ever shown.
        commit_bytes(&mut b, b"bbbb");
        assert_eq!(b.len(), 8);
        assert_eq!(
            b.release(8).unwrap_err(),
            BufferError::InvalidLength { requested: 8, max: 4 }
        );
        assert_eq!(b.len(), 8);

        b.release(3).unwrap();
        assert_eq!(
            b.release(2).unwrap_err(),
            BufferError::InvalidLength { requested: 2, max: 1 }
        );
        b.release(1).unwrap();
        assert_eq!(b.read(), Some(&b"bbbb"[..]));
        b.release(4).unwrap();
    }

    #[test]
    fn test_write_position_survives_drain() {
        let mut b = Buffer::new(10).unwrap();
        commit_bytes(&mut b, b"aaaa");
        assert_eq!(b.read(), Some(&b"aaaa"[..]));
        b.release(4).unwrap();
        assert!(b.is_empty());
        assert_eq!(b.regions(), Regions::Empty { cursor: 4 });

        // "bbbb" follows on at offset 4, so "cccc" has to wrap.
        commit_bytes(&mut b, b"bbbb");
        commit_bytes(&mut b, b"cccc");
        assert_eq!(b.high_water_mark(), Some(8));
        assert_eq!(b.read(), Some(&b"bbbb"[..]));

        b.clear();
        assert_eq!(b.regions(), Regions::default());
    }

    #[test]
    fn test_wraparound_splits_reads() {
        let mut b = Buffer::new(10).unwrap();
        commit_bytes(&mut b, b"aaaa");
        commit_bytes(&mut b, b"bbbb");
        assert_eq!(b.read(), Some(&b"aaaabbbb"[..]));
        b.release(4).unwrap();

        // Two bytes of tail left, four free at the front.
        commit_bytes(&mut b, b"cccc");
        assert_eq!(b.high_water_mark(), Some(8));
        assert_eq!(b.len(), 8);

        assert_eq!(b.read(), Some(&b"bbbb"[..]));
        b.release(4).unwrap();
        assert_eq!(b.high_water_mark(), None);
        assert_eq!(b.read(), Some(&b"cccc"[..]));
        b.release(4).unwrap();
        assert!(b.read().is_none());
    }

    #[test]
    fn test_out_of_space_without_release() {
        let mut b = Buffer::new(10).unwrap();
        assert!(matches!(b.reserve(10), Err(BufferError::RequestTooLarge { .. })));

        commit_bytes(&mut b, &[b'a'; 9]);
        assert_eq!(b.read(), Some(&[b'a'; 9][..]));

        // Nothing was released, so no smaller request fits either.
        assert_eq!(
            b.reserve(9).unwrap_err(),
            BufferError::NotEnoughSpace { requested: 9, available: 0 }
        );
        assert_eq!(
            b.reserve(8).unwrap_err(),
            BufferError::NotEnoughSpace { requested: 8, available: 0 }
        );
        assert_eq!(b.read(), Some(&[b'a'; 9][..]));
    }

    #[test]
    fn test_push_recv_drain() {
        let mut b = Buffer::new(8).unwrap();
        b.push(b"").unwrap();
        assert!(b.is_empty());

        b.push(b"hello").unwrap();
        let mut out = [0u8; 3];
        assert_eq!(b.recv(&mut out), 3);
        assert_eq!(&out, b"hel");

        // "wo" leaves one byte of tail behind "lo", so "rld" wraps.
        b.push(b"wo").unwrap();
        b.push(b"rld").unwrap();
        assert!(b.high_water_mark().is_some());

        let mut chunks = Vec::new();
        let n = b.drain(|chunk| chunks.push(chunk.to_vec()));
        assert_eq!(n, 7);
        assert_eq!(chunks, vec![b"lowo".to_vec(), b"rld".to_vec()]);
        assert_eq!(b.recv(&mut out), 0);
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut b = Buffer::new(10).unwrap();
        commit_bytes(&mut b, b"abc");
        b.reserve(2).unwrap();
        b.clear();
        assert!(b.is_empty());
        assert!(!b.has_pending());
        assert!(b.reserve(9).is_ok());
    }

    #[test]
    fn test_metrics_tracking() {
        let mut b = Buffer::with_config(Config::new(10, true)).unwrap();
        commit_bytes(&mut b, b"aaaaaaaa");
        assert!(b.read().is_some());
        b.release(6).unwrap();
        commit_bytes(&mut b, b"bbb");
        assert!(b.reserve(5).is_err());
        b.release(2).unwrap();

        let m = b.metrics();
        assert_eq!(m.reservations, 2);
        assert_eq!(m.commits, 2);
        assert_eq!(m.bytes_committed, 11);
        assert_eq!(m.bytes_released, 8);
        assert_eq!(m.wraps, 1);
        assert_eq!(m.promotions, 1);
        assert_eq!(m.backpressure, 1);

        b.reset_metrics();
        assert_eq!(b.metrics(), MetricsSnapshot::default());
    }

    #[test]
    fn test_metrics_disabled_by_default() {
        let mut b = Buffer::new(10).unwrap();
        b.push(b"abc").unwrap();
        assert_eq!(b.metrics(), MetricsSnapshot::default());
    }

    #[test]
    fn test_debug_output() {
        let mut b = Buffer::new(10).unwrap();
        b.push(b"abc").unwrap();
        let s = format!("{:?}", b);
        assert!(s.contains("capacity: 10"));
        assert!(s.contains("Single"));
        assert!(!s.contains("store"));
    }

    #[test]
    #[traced_test]
    fn test_wrap_and_promotion_are_traced() {
        let mut b = Buffer::new(10).unwrap();
        b.push(b"aaaaaaaa").unwrap();
        assert!(b.read().is_some());
        b.release(6).unwrap();
        b.push(b"bbb").unwrap();
        assert!(logs_contain("reservation wrapped to front of store"));

        b.release(2).unwrap();
        assert!(logs_contain("wrapped region promoted to readable"));

        assert!(b.push(b"ccccccc").is_err());
        assert!(logs_contain("not enough space for reservation"));
    }
}
