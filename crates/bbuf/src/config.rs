use crate::{BufferError, Result};

/// Smallest capacity that leaves a usable byte.
pub const MIN_CAPACITY: usize = 2;

/// Configuration for [`Buffer`](crate::Buffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Size of the backing store in bytes (default: 4096)
    pub capacity: usize,
    /// Enable metrics collection (slight overhead)
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a new configuration with custom settings.
    pub const fn new(capacity: usize, enable_metrics: bool) -> Self {
        Self {
            capacity,
            enable_metrics,
        }
    }

    /// Sets the capacity.
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Enables or disables metrics.
    pub const fn with_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = enable;
        self
    }

    /// Largest reservation a buffer with this configuration can grant.
    ///
    /// One byte is always kept free, so this is `capacity - 1`.
    #[inline]
    pub const fn max_reservation(&self) -> usize {
        self.capacity.saturating_sub(1)
    }

    /// Checks that the capacity can hold at least one byte.
    pub fn validate(&self) -> Result<()> {
        if self.capacity < MIN_CAPACITY {
            return Err(BufferError::InvalidCapacity {
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 4096, // one page
            enable_metrics: false,
        }
    }
}

/// Small staging configuration (512 bytes, fits a handful of log lines)
pub const SMALL_CONFIG: Config = Config::new(512, false);

/// Batched flush configuration (64 KiB, metrics on)
pub const FLUSH_BATCH_CONFIG: Config = Config::new(64 * 1024, true);
