//! Buffered output stream that defers every flush until close.
//!
//! Writers that flush after each small chunk (framing layers, serializers) would turn every
//! chunk into a separate write on the sink. Here `flush` is ignored and `close` performs a
//! single real flush followed by closing the sink.

use std::io::{self, BufWriter, Write};

/// Buffered writer whose `flush` is a no-op. Call [`close`](Self::close) to emit the data.
///
/// Dropping without `close` still writes buffered bytes to the sink, but never flushes it.
pub struct DeferredFlushWriter<W: Write> {
    inner: BufWriter<W>,
}

impl<W: Write> DeferredFlushWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            inner: BufWriter::new(sink),
        }
    }

    pub fn with_capacity(capacity: usize, sink: W) -> Self {
        Self {
            inner: BufWriter::with_capacity(capacity, sink),
        }
    }

    /// The underlying sink. Bytes still held in the buffer are not visible here.
    pub fn get_ref(&self) -> &W {
        self.inner.get_ref()
    }

    /// Bytes written but not yet handed to the sink.
    pub fn buffered(&self) -> usize {
        self.inner.buffer().len()
    }

    /// Flush once, then close the sink by dropping it.
    pub fn close(self) -> io::Result<()> {
        let sink = self.finish()?;
        drop(sink);
        Ok(())
    }

    /// Flush once and return the sink without closing it.
    pub fn finish(mut self) -> io::Result<W> {
        self.inner.flush()?;
        self.inner.into_inner().map_err(|e| e.into_error())
    }
}

impl<W: Write> Write for DeferredFlushWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
