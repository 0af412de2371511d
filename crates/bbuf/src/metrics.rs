use std::cell::Cell;

/// Counters for monitoring buffer traffic.
///
/// Updated only when [`Config::enable_metrics`](crate::Config::enable_metrics)
/// is set. Interior mutability keeps the read path on `&self`.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    reservations: Cell<u64>,
    commits: Cell<u64>,
    bytes_committed: Cell<u64>,
    bytes_released: Cell<u64>,
    wraps: Cell<u64>,
    promotions: Cell<u64>,
    backpressure: Cell<u64>,
}

/// Point-in-time copy of a buffer's traffic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    /// Successful reservations.
    pub reservations: u64,
    /// Successful commits, including zero-length ones.
    pub commits: u64,
    /// Bytes made readable by commits.
    pub bytes_committed: u64,
    /// Bytes handed back by releases.
    pub bytes_released: u64,
    /// Reservations placed at the front of the store.
    pub wraps: u64,
    /// Times the wrapped region took over as the readable region.
    pub promotions: u64,
    /// Reservations rejected for lack of space.
    pub backpressure: u64,
}

#[inline]
fn bump(counter: &Cell<u64>, by: u64) {
    counter.set(counter.get().wrapping_add(by));
}

impl Metrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_reservation(&self) {
        bump(&self.reservations, 1);
    }

    pub(crate) fn add_commit(&self, bytes: usize) {
        bump(&self.commits, 1);
        bump(&self.bytes_committed, bytes as u64);
    }

    pub(crate) fn add_released(&self, bytes: usize) {
        bump(&self.bytes_released, bytes as u64);
    }

    pub(crate) fn add_wrap(&self) {
        bump(&self.wraps, 1);
    }

    pub(crate) fn add_promotion(&self) {
        bump(&self.promotions, 1);
    }

    pub(crate) fn add_backpressure(&self) {
        bump(&self.backpressure, 1);
    }

    pub(crate) fn reset(&self) {
        for counter in [
            &self.reservations,
            &self.commits,
            &self.bytes_committed,
            &self.bytes_released,
            &self.wraps,
            &self.promotions,
            &self.backpressure,
        ] {
            counter.set(0);
        }
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reservations: self.reservations.get(),
            commits: self.commits.get(),
            bytes_committed: self.bytes_committed.get(),
            bytes_released: self.bytes_released.get(),
            wraps: self.wraps.get(),
            promotions: self.promotions.get(),
            backpressure: self.backpressure.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_snapshot_and_reset() {
        let m = Metrics::new();
        m.add_reservation();
        m.add_commit(7);
        m.add_commit(0);
        m.add_released(5);
        m.add_wrap();
        m.add_backpressure();

        let snap = m.snapshot();
        assert_eq!(snap.reservations, 1);
        assert_eq!(snap.commits, 2);
        assert_eq!(snap.bytes_committed, 7);
        assert_eq!(snap.bytes_released, 5);
        assert_eq!(snap.wraps, 1);
        assert_eq!(snap.promotions, 0);
        assert_eq!(snap.backpressure, 1);

        m.reset();
        assert_eq!(m.snapshot(), MetricsSnapshot::default());
    }
}
