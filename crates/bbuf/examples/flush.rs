//! Stage small, irregular records and flush them to a sink in batches.
//!
//! Run with: `RUST_LOG=bbuf=trace cargo run --example flush`

use bbuf::{Buffer, BufferError, Config};
use std::io::Write;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Sink that takes one contiguous chunk per flush, like a `write(2)` call.
#[derive(Default)]
struct CountingSink {
    bytes: Vec<u8>,
    flushes: usize,
}

impl CountingSink {
    /// Flushes the current readable view. Returns the bytes written.
    fn flush_from(&mut self, buf: &mut Buffer) -> Result<usize, BufferError> {
        let Some(chunk) = buf.read() else {
            return Ok(0);
        };
        self.bytes.write_all(chunk).expect("writing to a Vec cannot fail");
        self.flushes += 1;
        let n = chunk.len();
        buf.release(n)?;
        Ok(n)
    }
}

fn main() -> Result<(), BufferError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("bbuf Flush Example");
    println!("==================\n");

    const RECORDS: usize = 100_000;
    let config = Config::new(
        4096, // one page of staging space
        true, // metrics enabled
    );
    let mut buf = Buffer::with_config(config)?;
    let mut sink = CountingSink::default();
    let mut expected = 0;

    println!("Configuration:");
    println!("  Capacity: {} bytes", buf.capacity());
    println!("  Records: {}\n", RECORDS);

    let start = Instant::now();

    for i in 0..RECORDS {
        let record = format!("event={} level={}\n", i, i % 5);
        expected += record.len();

        // Backpressure: flush one chunk at a time until the record fits.
        while let Err(e) = buf.push(record.as_bytes()) {
            if !e.is_recoverable() {
                return Err(e);
            }
            sink.flush_from(&mut buf)?;
        }
    }
    while sink.flush_from(&mut buf)? > 0 {}

    let elapsed = start.elapsed();
    let m = buf.metrics();

    assert_eq!(sink.bytes.len(), expected);
    println!("Results:");
    println!("  Staged: {} bytes in {:?}", expected, elapsed);
    println!("  Sink writes: {}", sink.flushes);
    println!("  Avg write: {} bytes", expected / sink.flushes.max(1));
    println!("  Wraps: {}", m.wraps);
    println!("  Promotions: {}", m.promotions);
    println!("  Backpressure events: {}", m.backpressure);

    Ok(())
}
