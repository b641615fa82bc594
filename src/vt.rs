//! Virtual terminal capability negotiation.
//!
//! [`VirtualTerminalMode`] is the capability token for the console's ANSI
//! escape-sequence mode: acquiring it flips the host console into
//! escape-sequence interpretation, dropping it restores the mode bits it
//! changed. On hosts whose terminals interpret escape sequences natively
//! there is nothing to negotiate and [`VirtualTerminalMode::try_enable`]
//! returns `None`, leaving detection to the `TERM` heuristic.

use tracing::debug;

#[cfg(windows)]
use windows::Win32::Foundation::HANDLE;
#[cfg(windows)]
use windows::Win32::System::Console::{
    GetConsoleMode, GetStdHandle, SetConsoleMode, CONSOLE_MODE, DISABLE_NEWLINE_AUTO_RETURN,
    ENABLE_VIRTUAL_TERMINAL_PROCESSING, STD_OUTPUT_HANDLE,
};

/// Capability token for the console's ANSI escape-sequence mode.
///
/// Exists only after a successful enable; dropping it hands the console
/// mode word captured at acquisition back to the host.
#[cfg(windows)]
#[derive(Debug)]
pub struct VirtualTerminalMode {
    output: HANDLE,
    original_mode: CONSOLE_MODE,
}

/// Capability token for the console's ANSI escape-sequence mode.
///
/// Never constructed off Windows: the terminal either speaks ANSI or it
/// does not, and no mode switch exists to negotiate.
#[cfg(not(windows))]
#[derive(Debug)]
pub struct VirtualTerminalMode {
    _private: (),
}

// Safety: console handles are plain kernel handles; access is serialized
// by the owning handle.
#[cfg(windows)]
unsafe impl Send for VirtualTerminalMode {}

#[cfg(windows)]
impl VirtualTerminalMode {
    /// Attempt to switch the output console into escape-sequence
    /// interpretation.
    ///
    /// Returns `None` when the console refuses; negotiation is best-effort
    /// and failures never surface beyond a debug log line.
    pub fn try_enable() -> Option<Self> {
        unsafe {
            let output = GetStdHandle(STD_OUTPUT_HANDLE).ok()?;

            let mut mode = CONSOLE_MODE(0);
            if GetConsoleMode(output, &mut mode).is_err() {
                debug!("GetConsoleMode failed, leaving virtual terminal mode off");
                return None;
            }
            let original_mode = mode;

            let wanted = CONSOLE_MODE(
                mode.0 | ENABLE_VIRTUAL_TERMINAL_PROCESSING.0 | DISABLE_NEWLINE_AUTO_RETURN.0,
            );
            if SetConsoleMode(output, wanted).is_err() {
                // Older hosts reject DISABLE_NEWLINE_AUTO_RETURN; retry with
                // the processing flag alone.
                let minimal = CONSOLE_MODE(mode.0 | ENABLE_VIRTUAL_TERMINAL_PROCESSING.0);
                if SetConsoleMode(output, minimal).is_err() {
                    debug!("SetConsoleMode rejected virtual terminal processing");
                    return None;
                }
            }

            debug!(
                "virtual terminal processing enabled, original mode 0x{:08X}",
                original_mode.0
            );
            Some(VirtualTerminalMode {
                output,
                original_mode,
            })
        }
    }
}

#[cfg(not(windows))]
impl VirtualTerminalMode {
    /// No mode negotiation exists on this platform; detection falls back to
    /// the `TERM` heuristic.
    pub fn try_enable() -> Option<Self> {
        debug!("no virtual terminal negotiation on this platform");
        None
    }
}

#[cfg(windows)]
impl Drop for VirtualTerminalMode {
    fn drop(&mut self) {
        unsafe {
            let _ = SetConsoleMode(self.output, self.original_mode);
        }
    }
}

/// Best-effort ANSI capability guess from the `TERM` environment signal.
///
/// A `TERM` starting with `xterm` (case-insensitive) is taken as evidence
/// of an ANSI-capable terminal family. Known imprecise: plenty of
/// non-xterm terminals speak ANSI, and an xterm-named terminal in a
/// constrained context may not. Heuristic only, not guaranteed detection.
pub fn term_indicates_ansi(term: &str) -> bool {
    term.as_bytes()
        .get(..5)
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case(b"xterm"))
}
