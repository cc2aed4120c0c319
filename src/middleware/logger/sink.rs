//! Destinations for rendered lines.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Receives one rendered line per exchange, newline included.
///
/// Each line arrives in a single call and an implementation must write it
/// in one piece. Ordering between exchanges finishing at the same time is
/// whatever the sink provides.
pub trait Sink: Send + Sync + 'static {
    fn write_line(&self, line: &str) -> io::Result<()>;
}

impl Sink for io::Stdout {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut out = self.lock();
        out.write_all(line.as_bytes())?;
        out.flush()
    }
}

impl Sink for io::Stderr {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut out = self.lock();
        out.write_all(line.as_bytes())?;
        out.flush()
    }
}

/// Any writer behind a mutex: files, sockets, in-memory buffers.
impl<W: Write + Send + 'static> Sink for Mutex<W> {
    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut writer = self.lock().map_err(|_| io::Error::other("log sink mutex poisoned"))?;
        writer.write_all(line.as_bytes())?;
        writer.flush()
    }
}

/// Lets the caller keep a handle on the sink it hands to the logger.
impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn write_line(&self, line: &str) -> io::Result<()> {
        (**self).write_line(line)
    }
}
