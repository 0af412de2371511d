//! Debug assertion macros for buffer invariants.
//!
//! Only active in debug builds (`debug_assert!`), so release builds pay
//! nothing. Used by `Buffer` after every state transition.

// =============================================================================
// INV-REG-01: Non-empty regions
// =============================================================================

/// Assert that a region held by `Single`/`Split` is not empty.
///
/// **Invariant**: an empty region A collapses the state to `Empty` or promotes B.
///
/// Used in: `Regions::check()`
macro_rules! debug_assert_region_nonempty {
    ($name:literal, $span:expr) => {
        debug_assert!(
            $span.len > 0,
            "INV-REG-01 violated: region {} is empty at offset {}",
            $name,
            $span.start
        )
    };
}

// =============================================================================
// INV-REG-02: Region B is anchored at the front
// =============================================================================

/// Assert that region B starts at offset 0.
///
/// Used in: `Regions::check()`
macro_rules! debug_assert_b_at_front {
    ($b:expr) => {
        debug_assert!(
            $b.start == 0,
            "INV-REG-02 violated: region B starts at {} instead of 0",
            $b.start
        )
    };
}

// =============================================================================
// INV-REG-03: No overlap
// =============================================================================

/// Assert that two spans are disjoint.
///
/// **Invariant**: A, B and the pending reservation never share a byte.
///
/// Used in: `Regions::check()`, `Buffer::reserve_span()`
macro_rules! debug_assert_disjoint {
    ($what:literal, $x:expr, $y:expr) => {
        debug_assert!(
            $x.end() <= $y.start || $y.end() <= $x.start,
            "INV-REG-03 violated: {} overlap: [{}, {}) and [{}, {})",
            $what,
            $x.start,
            $x.end(),
            $y.start,
            $y.end()
        )
    };
}

// =============================================================================
// INV-CAP-01: One byte always free
// =============================================================================

/// Assert that committed bytes stay within `capacity - 1`.
///
/// Used in: `Buffer::commit_pending()`
macro_rules! debug_assert_occupancy {
    ($used:expr, $capacity:expr) => {
        debug_assert!(
            $used < $capacity,
            "INV-CAP-01 violated: {} committed bytes in a buffer of capacity {}",
            $used,
            $capacity
        )
    };
}

/// Assert that a span lies inside the backing store.
///
/// Used in: `Regions::check()`, `Buffer::reserve_span()`, `Buffer::view()`,
/// `Buffer::view_mut()`
macro_rules! debug_assert_in_bounds {
    ($span:expr, $capacity:expr) => {
        debug_assert!(
            $span.end() <= $capacity,
            "INV-CAP-02 violated: span [{}, {}) exceeds capacity {}",
            $span.start,
            $span.end(),
            $capacity
        )
    };
}

pub(crate) use debug_assert_b_at_front;
pub(crate) use debug_assert_disjoint;
pub(crate) use debug_assert_in_bounds;
pub(crate) use debug_assert_occupancy;
pub(crate) use debug_assert_region_nonempty;
