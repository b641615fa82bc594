//! termlease - scoped access to the process console
//!
//! A [`TerminalHandle`] leases the console for a command-line rendering
//! layer: it snapshots the colors in effect when attached, forwards color
//! and cursor traffic to the host console, detects redirected output,
//! negotiates ANSI virtual terminal mode where the host requires it, and
//! puts the console back exactly once when released.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::io::Write;
//! use termlease::{ConsoleColor, TerminalHandle};
//!
//! fn main() -> Result<(), termlease::ConsoleError> {
//!     let mut term = TerminalHandle::attach()?;
//!     term.try_enable_virtual_terminal();
//!
//!     term.set_foreground(ConsoleColor::Cyan)?;
//!     writeln!(term.out(), "hello").ok();
//!
//!     term.release(); // optional - dropping the handle restores too
//!     Ok(())
//! }
//! ```
//!
//! # Lifecycle Contract
//!
//! - Colors are captured once, at attach, before any mutation.
//! - `release()` is idempotent; `Drop` funnels into the same guarded path,
//!   so restoration runs exactly once on every exit path.
//! - The virtual terminal capability token restores the console mode bits
//!   it changed when the handle lets go of it.
//! - When output is redirected there is no geometry to report: the region
//!   query returns the unbounded region and enabling virtual terminal mode
//!   is a no-op.
//!
//! # Shared State
//!
//! The console is process-wide mutable state. The crate adds no locking;
//! concurrent uncoordinated writers get interleaved output, and
//! serializing access is the host process's job.

pub mod color;
pub mod console;
pub mod region;
pub mod terminal;
pub mod vt;
pub mod writer;

pub use color::ConsoleColor;
pub use console::{Console, ConsoleError, SystemConsole};
pub use region::Region;
pub use terminal::TerminalHandle;
pub use vt::{term_indicates_ansi, VirtualTerminalMode};
pub use writer::OutputWriter;
