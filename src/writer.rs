//! Write-only standard stream sinks.
//!
//! The rendering layer writes through [`OutputWriter`] instead of grabbing
//! `io::stdout()` itself, so the owner of the handle can substitute the
//! output sink (see `TerminalHandle::set_out`) without the renderer
//! noticing.

use std::io::{self, Write};

enum Sink {
    Stdout,
    Stderr,
    Custom(Box<dyn Write + Send>),
}

/// Write-only text sink over one of the process's standard streams, or a
/// caller-supplied replacement.
pub struct OutputWriter {
    sink: Sink,
}

impl OutputWriter {
    pub(crate) fn stdout() -> Self {
        OutputWriter { sink: Sink::Stdout }
    }

    pub(crate) fn stderr() -> Self {
        OutputWriter { sink: Sink::Stderr }
    }

    pub(crate) fn custom(sink: Box<dyn Write + Send>) -> Self {
        OutputWriter {
            sink: Sink::Custom(sink),
        }
    }
}

impl Write for OutputWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.sink {
            Sink::Stdout => io::stdout().write(buf),
            Sink::Stderr => io::stderr().write(buf),
            Sink::Custom(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.sink {
            Sink::Stdout => io::stdout().flush(),
            Sink::Stderr => io::stderr().flush(),
            Sink::Custom(writer) => writer.flush(),
        }
    }
}
