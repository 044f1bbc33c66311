//! Wires [`LogFilter`] into `tracing_subscriber` as a [`MakeWriter`], so
//! every formatted log line — not just lines plugins pass through the
//! filter explicitly — gets redacted before it reaches its destination.

use std::io;
use std::sync::Arc;

use tracing_subscriber::fmt::MakeWriter;

use crate::filter::LogFilter;

/// An [`io::Write`] that redacts each buffer it's given before forwarding
/// it to `inner`. `tracing_subscriber`'s formatting layer calls `write`
/// once per fully formatted line, so one redaction pass per call is
/// exactly one pass per log line.
pub struct FilteringWriter<W> {
    inner: W,
    filter: Arc<LogFilter>,
}

impl<W: io::Write> io::Write for FilteringWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        let filtered = self.filter.filter(&text);
        self.inner.write_all(filtered.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A [`MakeWriter`] that wraps another `MakeWriter`'s output in a
/// [`FilteringWriter`].
pub struct FilteringMakeWriter<M> {
    make: M,
    filter: Arc<LogFilter>,
}

impl<M> FilteringMakeWriter<M> {
    /// Wraps `make`, redacting every line it produces through `filter`.
    pub fn new(make: M, filter: Arc<LogFilter>) -> Self {
        Self { make, filter }
    }
}

impl<'a, M> MakeWriter<'a> for FilteringMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = FilteringWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        FilteringWriter {
            inner: self.make.make_writer(),
            filter: Arc::clone(&self.filter),
        }
    }
}
