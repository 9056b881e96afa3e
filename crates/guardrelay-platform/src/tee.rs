//! Fan-out writer.
//!
//! [`TeeWriter`] is one logical sink that forwards every write to two
//! underlying sinks. The process spawner uses it with the terminal as the
//! primary sink and an in-memory buffer as the secondary one.

use std::io::{self, Write};

/// Writes every byte to both `primary` and `secondary`, in that order.
#[derive(Debug)]
pub struct TeeWriter<A, B> {
    primary: A,
    secondary: B,
}

impl<A: Write, B: Write> TeeWriter<A, B> {
    pub fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }
}

impl<A: Write, B: Write> Write for TeeWriter<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // Partial writes would leave the sinks disagreeing; write whole.
        self.primary.write_all(buf)?;
        self.secondary.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.primary.flush()?;
        self.secondary.flush()
    }
}
