//! The terminal handle.
//!
//! [`TerminalHandle`] leases the process's console for a rendering layer:
//! it snapshots the colors in effect at attach time, forwards color and
//! cursor traffic to the device, negotiates virtual terminal mode when
//! asked, and puts everything back when released. Restoration runs exactly
//! once - `release()` is the explicit path, `Drop` the fallback, both
//! funneled through the same guard.

use std::io::Write;

use tracing::{debug, trace};

use crate::color::ConsoleColor;
use crate::console::{Console, Result, SystemConsole};
use crate::region::Region;
use crate::vt::{term_indicates_ansi, VirtualTerminalMode};
use crate::writer::OutputWriter;

/// Scoped handle over the process console.
///
/// One handle per process is the expected shape (the console is shared
/// process-wide state), though nothing enforces it.
pub struct TerminalHandle {
    console: Box<dyn Console>,
    initial_foreground: ConsoleColor,
    initial_background: ConsoleColor,
    vt: Option<VirtualTerminalMode>,
    out: OutputWriter,
    err: OutputWriter,
    released: bool,
}

impl TerminalHandle {
    /// Attach to the process console and snapshot its current colors.
    ///
    /// The snapshot happens before any mutation and is what `release`
    /// restores. No other side effects.
    pub fn attach() -> Result<Self> {
        Self::with_console(SystemConsole::open()?)
    }

    /// Build a handle over any console device.
    ///
    /// Snapshot semantics are identical to [`TerminalHandle::attach`]; this
    /// is the seam for embedders that substitute the device, and for tests.
    pub fn with_console(console: impl Console + 'static) -> Result<Self> {
        let console: Box<dyn Console> = Box::new(console);
        let initial_foreground = console.foreground()?;
        let initial_background = console.background()?;
        trace!(
            "console attached, snapshot {:?} on {:?}",
            initial_foreground,
            initial_background
        );

        Ok(TerminalHandle {
            console,
            initial_foreground,
            initial_background,
            vt: None,
            out: OutputWriter::stdout(),
            err: OutputWriter::stderr(),
            released: false,
        })
    }

    pub fn foreground(&self) -> Result<ConsoleColor> {
        self.console.foreground()
    }

    pub fn set_foreground(&mut self, color: ConsoleColor) -> Result<()> {
        self.console.set_foreground(color)
    }

    pub fn background(&self) -> Result<ConsoleColor> {
        self.console.background()
    }

    pub fn set_background(&mut self, color: ConsoleColor) -> Result<()> {
        self.console.set_background(color)
    }

    /// Reset to the console's own defaults.
    ///
    /// Unrelated to the snapshot written back at release time.
    pub fn reset_colors(&mut self) -> Result<()> {
        self.console.reset_colors()
    }

    /// Current cursor position as `(column, row)`.
    pub fn cursor_position(&self) -> Result<(u16, u16)> {
        self.console.cursor_position()
    }

    /// Move the cursor. On a redirected stream the platform decides what
    /// this means; callers must tolerate an error.
    pub fn set_cursor_position(&mut self, column: u16, row: u16) -> Result<()> {
        self.console.set_cursor_position(column, row)
    }

    /// Whether standard output goes to a file or pipe instead of a
    /// terminal device.
    pub fn is_output_redirected(&self) -> bool {
        self.console.is_output_redirected()
    }

    /// Visible bounds available for rendering.
    ///
    /// A redirected stream has no geometry, so the unbounded region comes
    /// back and callers skip geometry-aware rendering entirely.
    pub fn region(&self) -> Result<Region> {
        if self.console.is_output_redirected() {
            return Ok(Region::UNBOUNDED);
        }
        let (width, height) = self.console.size()?;
        Ok(Region::entire(width, height))
    }

    /// Whether escape sequences will be interpreted.
    ///
    /// A held capability token answers definitively. Before any enable
    /// attempt the `TERM` heuristic stands in, so callers probing early
    /// still get a best-effort answer.
    pub fn is_virtual_terminal_enabled(&self) -> bool {
        if self.vt.is_some() {
            return true;
        }
        self.console
            .term_type()
            .map(|term| term_indicates_ansi(&term))
            .unwrap_or(false)
    }

    /// Ask the console to interpret ANSI escape sequences.
    ///
    /// Skipped when output is redirected - a pipe has no escape-sequence
    /// mode to switch. Negotiation failure leaves the handle as it was;
    /// this is a best-effort feature and never errors.
    pub fn try_enable_virtual_terminal(&mut self) {
        if self.vt.is_some() {
            return;
        }
        if self.console.is_output_redirected() {
            debug!("output redirected, skipping virtual terminal negotiation");
            return;
        }
        self.vt = VirtualTerminalMode::try_enable();
    }

    /// Write-only sink over standard output.
    pub fn out(&mut self) -> &mut OutputWriter {
        &mut self.out
    }

    /// Write-only sink over standard error.
    pub fn err(&mut self) -> &mut OutputWriter {
        &mut self.err
    }

    /// Route subsequent standard-output writes through `sink` instead.
    pub fn set_out(&mut self, sink: Box<dyn Write + Send>) {
        self.out = OutputWriter::custom(sink);
    }

    /// Give the console back.
    ///
    /// Drops the capability token (which restores the mode bits it
    /// changed), then writes the snapshot colors back, regardless of what
    /// was mutated in between. Safe to call more than once; `Drop` calls
    /// this too, so a handle that is never released explicitly still
    /// restores on the way out.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        // Mode bits go back before colors so the restore writes land on a
        // console in its original mode.
        self.vt = None;

        let _ = self.console.set_foreground(self.initial_foreground);
        let _ = self.console.set_background(self.initial_background);
        debug!(
            "console restored to {:?} on {:?}",
            self.initial_foreground, self.initial_background
        );
    }
}

impl Drop for TerminalHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Copy)]
    struct FakeState {
        foreground: ConsoleColor,
        background: ConsoleColor,
        cursor: (u16, u16),
        color_writes: u32,
        resets: u32,
    }

    /// In-memory console device. Clones share state so a test can inspect
    /// the device after the handle is gone.
    #[derive(Clone)]
    struct FakeConsole {
        state: Arc<Mutex<FakeState>>,
        size: (u16, u16),
        redirected: bool,
        term: Option<&'static str>,
    }

    impl FakeConsole {
        fn new(foreground: ConsoleColor, background: ConsoleColor) -> Self {
            FakeConsole {
                state: Arc::new(Mutex::new(FakeState {
                    foreground,
                    background,
                    cursor: (0, 0),
                    color_writes: 0,
                    resets: 0,
                })),
                size: (80, 24),
                redirected: false,
                term: None,
            }
        }

        fn redirected(mut self) -> Self {
            self.redirected = true;
            self
        }

        fn with_term(mut self, term: &'static str) -> Self {
            self.term = Some(term);
            self
        }

        fn snapshot(&self) -> FakeState {
            *self.state.lock().unwrap()
        }
    }

    impl Console for FakeConsole {
        fn foreground(&self) -> Result<ConsoleColor> {
            Ok(self.snapshot().foreground)
        }

        fn set_foreground(&mut self, color: ConsoleColor) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.foreground = color;
            state.color_writes += 1;
            Ok(())
        }

        fn background(&self) -> Result<ConsoleColor> {
            Ok(self.snapshot().background)
        }

        fn set_background(&mut self, color: ConsoleColor) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.background = color;
            state.color_writes += 1;
            Ok(())
        }

        fn reset_colors(&mut self) -> Result<()> {
            self.state.lock().unwrap().resets += 1;
            Ok(())
        }

        fn cursor_position(&self) -> Result<(u16, u16)> {
            Ok(self.snapshot().cursor)
        }

        fn set_cursor_position(&mut self, column: u16, row: u16) -> Result<()> {
            self.state.lock().unwrap().cursor = (column, row);
            Ok(())
        }

        fn size(&self) -> Result<(u16, u16)> {
            Ok(self.size)
        }

        fn is_output_redirected(&self) -> bool {
            self.redirected
        }

        fn term_type(&self) -> Option<String> {
            self.term.map(String::from)
        }
    }

    #[test]
    fn test_release_restores_snapshot_colors() {
        let fake = FakeConsole::new(ConsoleColor::White, ConsoleColor::Black);
        let mut handle = TerminalHandle::with_console(fake.clone()).unwrap();

        handle.set_foreground(ConsoleColor::Red).unwrap();
        handle.set_background(ConsoleColor::Green).unwrap();
        handle.release();

        let state = fake.snapshot();
        assert_eq!(state.foreground, ConsoleColor::White);
        assert_eq!(state.background, ConsoleColor::Black);
    }

    #[test]
    fn test_release_restores_after_many_mutations() {
        let fake = FakeConsole::new(ConsoleColor::Grey, ConsoleColor::DarkBlue);
        let mut handle = TerminalHandle::with_console(fake.clone()).unwrap();

        for color in [
            ConsoleColor::Red,
            ConsoleColor::Yellow,
            ConsoleColor::Cyan,
            ConsoleColor::Magenta,
        ] {
            handle.set_foreground(color).unwrap();
            handle.set_background(color).unwrap();
        }
        handle.release();

        let state = fake.snapshot();
        assert_eq!(state.foreground, ConsoleColor::Grey);
        assert_eq!(state.background, ConsoleColor::DarkBlue);
    }

    #[test]
    fn test_release_is_idempotent() {
        let fake = FakeConsole::new(ConsoleColor::White, ConsoleColor::Black);
        let mut handle = TerminalHandle::with_console(fake.clone()).unwrap();

        handle.set_foreground(ConsoleColor::Red).unwrap();
        handle.release();
        let after_first = fake.snapshot().color_writes;

        handle.release();
        assert_eq!(fake.snapshot().color_writes, after_first);
    }

    #[test]
    fn test_drop_restores_without_explicit_release() {
        let fake = FakeConsole::new(ConsoleColor::White, ConsoleColor::Black);
        {
            let mut handle = TerminalHandle::with_console(fake.clone()).unwrap();
            handle.set_foreground(ConsoleColor::DarkRed).unwrap();
        }

        assert_eq!(fake.snapshot().foreground, ConsoleColor::White);
    }

    #[test]
    fn test_release_then_drop_restores_once() {
        let fake = FakeConsole::new(ConsoleColor::White, ConsoleColor::Black);
        let writes = {
            let mut handle = TerminalHandle::with_console(fake.clone()).unwrap();
            handle.set_foreground(ConsoleColor::Blue).unwrap();
            handle.release();
            fake.snapshot().color_writes
        };

        assert_eq!(fake.snapshot().color_writes, writes);
    }

    #[test]
    fn test_redirected_region_is_unbounded() {
        let fake = FakeConsole::new(ConsoleColor::White, ConsoleColor::Black).redirected();
        let handle = TerminalHandle::with_console(fake).unwrap();

        let region = handle.region().unwrap();
        assert!(region.is_unbounded());
        assert!(!region.clip);
    }

    #[test]
    fn test_interactive_region_matches_terminal() {
        let mut fake = FakeConsole::new(ConsoleColor::White, ConsoleColor::Black);
        fake.size = (132, 43);
        let handle = TerminalHandle::with_console(fake).unwrap();

        let region = handle.region().unwrap();
        assert!(region.clip);
        assert_eq!((region.width, region.height), (132, 43));
    }

    #[test]
    fn test_redirected_enable_is_noop() {
        let fake = FakeConsole::new(ConsoleColor::White, ConsoleColor::Black)
            .redirected()
            .with_term("xterm-256color");
        let mut handle = TerminalHandle::with_console(fake).unwrap();

        let before = handle.is_virtual_terminal_enabled();
        handle.try_enable_virtual_terminal();
        assert_eq!(handle.is_virtual_terminal_enabled(), before);
    }

    #[test]
    fn test_redirected_enable_is_noop_on_dumb_term() {
        let fake = FakeConsole::new(ConsoleColor::White, ConsoleColor::Black)
            .redirected()
            .with_term("dumb");
        let mut handle = TerminalHandle::with_console(fake).unwrap();

        assert!(!handle.is_virtual_terminal_enabled());
        handle.try_enable_virtual_terminal();
        assert!(!handle.is_virtual_terminal_enabled());
    }

    #[test]
    fn test_term_signal_answers_before_enable() {
        let xterm = FakeConsole::new(ConsoleColor::White, ConsoleColor::Black)
            .with_term("xterm-256color");
        let handle = TerminalHandle::with_console(xterm).unwrap();
        assert!(handle.is_virtual_terminal_enabled());

        let dumb = FakeConsole::new(ConsoleColor::White, ConsoleColor::Black).with_term("dumb");
        let handle = TerminalHandle::with_console(dumb).unwrap();
        assert!(!handle.is_virtual_terminal_enabled());

        let unset = FakeConsole::new(ConsoleColor::White, ConsoleColor::Black);
        let handle = TerminalHandle::with_console(unset).unwrap();
        assert!(!handle.is_virtual_terminal_enabled());
    }

    #[test]
    fn test_cursor_passes_through() {
        let fake = FakeConsole::new(ConsoleColor::White, ConsoleColor::Black);
        let mut handle = TerminalHandle::with_console(fake.clone()).unwrap();

        handle.set_cursor_position(12, 3).unwrap();
        assert_eq!(handle.cursor_position().unwrap(), (12, 3));
        assert_eq!(fake.snapshot().cursor, (12, 3));
    }

    #[test]
    fn test_reset_colors_passes_through() {
        let fake = FakeConsole::new(ConsoleColor::White, ConsoleColor::Black);
        let mut handle = TerminalHandle::with_console(fake.clone()).unwrap();

        handle.reset_colors().unwrap();
        assert_eq!(fake.snapshot().resets, 1);
    }

    #[test]
    fn test_set_out_redirects_writes() {
        struct CaptureSink(Arc<Mutex<Vec<u8>>>);

        impl Write for CaptureSink {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let fake = FakeConsole::new(ConsoleColor::White, ConsoleColor::Black);
        let mut handle = TerminalHandle::with_console(fake).unwrap();

        let buffer = Arc::new(Mutex::new(Vec::new()));
        handle.set_out(Box::new(CaptureSink(buffer.clone())));
        write!(handle.out(), "redirected").unwrap();

        assert_eq!(&*buffer.lock().unwrap(), b"redirected");
    }
}
