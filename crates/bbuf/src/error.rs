//! Error types for buffer operations.

use thiserror::Error;

/// Errors returned by [`Buffer`](crate::Buffer) operations.
///
/// Only [`NotEnoughSpace`](BufferError::NotEnoughSpace) is expected in a
/// correctly sequenced program; the rest indicate caller misuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BufferError {
    /// Capacity is too small to ever hold a byte.
    #[error("invalid capacity {capacity}: must be at least 2")]
    InvalidCapacity {
        /// Capacity that was requested.
        capacity: usize,
    },

    /// The request cannot fit even in an empty buffer.
    #[error("request of {requested} bytes exceeds the maximum of {max}")]
    RequestTooLarge {
        /// Bytes requested.
        requested: usize,
        /// Largest reservation this buffer can ever grant (`capacity - 1`).
        max: usize,
    },

    /// Current occupancy leaves no contiguous placement for the request.
    #[error("not enough space for {requested} bytes ({available} free)")]
    NotEnoughSpace {
        /// Bytes requested.
        requested: usize,
        /// Total free bytes, not necessarily contiguous.
        available: usize,
    },

    /// A previous reservation has not been committed yet.
    #[error("a reservation of {pending} bytes is still pending")]
    ReservationPending {
        /// Length of the outstanding reservation.
        pending: usize,
    },

    /// `commit` was called without an outstanding reservation.
    #[error("no reservation to commit")]
    NoReservation,

    /// A length argument is outside the range allowed by the current state.
    #[error("invalid length {requested} (max {max})")]
    InvalidLength {
        /// Length passed by the caller.
        requested: usize,
        /// Largest length accepted in the current state.
        max: usize,
    },
}

impl BufferError {
    /// Returns `true` for backpressure: drain via read/release and retry.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotEnoughSpace { .. })
    }

    /// Returns `true` if this error indicates a protocol violation by the caller.
    #[inline]
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            Self::ReservationPending { .. } | Self::NoReservation | Self::InvalidLength { .. }
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BufferError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let e = BufferError::NotEnoughSpace { requested: 4, available: 2 };
        assert!(e.is_recoverable());
        assert!(!e.is_misuse());

        assert!(BufferError::NoReservation.is_misuse());
        assert!(BufferError::ReservationPending { pending: 3 }.is_misuse());
        assert!(BufferError::InvalidLength { requested: 5, max: 4 }.is_misuse());

        let e = BufferError::RequestTooLarge { requested: 10, max: 9 };
        assert!(!e.is_recoverable());
        assert!(!e.is_misuse());
    }

    #[test]
    fn test_error_display() {
        let e = BufferError::RequestTooLarge { requested: 10, max: 9 };
        assert_eq!(e.to_string(), "request of 10 bytes exceeds the maximum of 9");

        let e = BufferError::InvalidCapacity { capacity: 1 };
        assert_eq!(e.to_string(), "invalid capacity 1: must be at least 2");
    }
}
