//! bbuf - Bipartite Byte Buffer
//!
//! A fixed-capacity staging buffer for one producer and one consumer. The
//! producer claims contiguous space, writes into it in place and publishes
//! it; the consumer gets a contiguous view of published bytes and releases
//! them when done. No copies, no per-write allocation.
//!
//! Small, irregular writes go in; large contiguous reads come out, ready to
//! be flushed to whatever sink the caller owns.
//!
//! # Key Features
//!
//! - Zero-copy reserve/commit and read/release
//! - Transparent wraparound with at most two regions (A and B)
//! - Contiguous read views that never straddle the end of the store
//! - Split producer/consumer handles whose views are checked by the borrow checker
//! - Synchronous backpressure via [`BufferError::NotEnoughSpace`]
//!
//! # Example
//!
//! ```
//! use bbuf::{Buffer, BufferError};
//!
//! let mut buf = Buffer::new(10)?;
//!
//! // Zero-copy API: reserve() + commit()
//! let window = buf.reserve(4)?;
//! window.copy_from_slice(b"abcd");
//! buf.commit(4)?;
//!
//! assert_eq!(buf.read(), Some(&b"abcd"[..]));
//! buf.release(4)?;
//! assert_eq!(buf.read(), None);
//!
//! // Backpressure: the buffer never fills its last byte
//! buf.push(b"123456789")?;
//! assert!(matches!(buf.push(b"x"), Err(BufferError::NotEnoughSpace { .. })));
//! # Ok::<(), BufferError>(())
//! ```
//!
//! Views from a split reader stay valid while the writer keeps going:
//!
//! ```
//! use bbuf::Buffer;
//!
//! let mut buf = Buffer::new(10)?;
//! let (mut writer, mut reader) = buf.split();
//!
//! writer.push(b"aaaa")?;
//! let view = reader.read().unwrap();
//! writer.push(b"bbbb")?;
//! assert_eq!(view, b"aaaa");
//!
//! reader.release(4)?;
//! assert_eq!(reader.read(), Some(&b"bbbb"[..]));
//! # Ok::<(), bbuf::BufferError>(())
//! ```

mod buffer;
mod config;
mod error;
mod invariants;
mod metrics;
mod region;
mod split;

pub use buffer::Buffer;
pub use config::{Config, FLUSH_BATCH_CONFIG, MIN_CAPACITY, SMALL_CONFIG};
pub use error::{BufferError, Result};
pub use metrics::MetricsSnapshot;
pub use region::{Regions, Span};
pub use split::{Reader, Writer};
