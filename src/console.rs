//! Console device access.
//!
//! [`Console`] is the seam between `TerminalHandle` and the real console:
//! color and cursor state live in the host console, not in this crate.
//! [`SystemConsole`] talks to the attached console directly - native screen
//! buffer APIs on Windows, ANSI escape sequences through crossterm
//! elsewhere.
//!
//! The console is process-wide shared state. Implementations add no locking;
//! concurrent uncoordinated writers produce interleaved output, and
//! serializing access is the host's job.

use std::io;

use thiserror::Error;

use crate::color::ConsoleColor;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("no console is attached to this process: {0}")]
    NoConsole(#[source] io::Error),

    #[error("failed to read console state: {0}")]
    Query(#[source] io::Error),

    #[error("failed to write console state: {0}")]
    Mutate(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Access to the console device behind a `TerminalHandle`.
pub trait Console {
    fn foreground(&self) -> Result<ConsoleColor>;

    fn set_foreground(&mut self, color: ConsoleColor) -> Result<()>;

    fn background(&self) -> Result<ConsoleColor>;

    fn set_background(&mut self, color: ConsoleColor) -> Result<()>;

    /// Reset to the console's own defaults (not the snapshot a handle
    /// captured at attach time).
    fn reset_colors(&mut self) -> Result<()>;

    /// Current cursor position as `(column, row)`.
    fn cursor_position(&self) -> Result<(u16, u16)>;

    fn set_cursor_position(&mut self, column: u16, row: u16) -> Result<()>;

    /// Visible terminal dimensions as `(columns, rows)`.
    fn size(&self) -> Result<(u16, u16)>;

    /// Whether standard output goes to a file or pipe instead of a
    /// terminal device. Pure query.
    fn is_output_redirected(&self) -> bool;

    /// Terminal-type environment signal (`TERM`), if one is set.
    fn term_type(&self) -> Option<String>;
}

fn output_is_redirected() -> bool {
    use crossterm::tty::IsTty;
    !io::stdout().is_tty()
}

fn term_env() -> Option<String> {
    std::env::var("TERM").ok().filter(|term| !term.is_empty())
}

#[cfg(windows)]
mod system {
    use super::*;

    use windows::Win32::Foundation::HANDLE;
    use windows::Win32::System::Console::{
        GetConsoleScreenBufferInfo, GetStdHandle, SetConsoleCursorPosition,
        SetConsoleTextAttribute, CONSOLE_CHARACTER_ATTRIBUTES, CONSOLE_SCREEN_BUFFER_INFO, COORD,
        STD_OUTPUT_HANDLE,
    };

    /// Console device backed by the Win32 screen buffer APIs.
    ///
    /// Colors go through the attribute word rather than escape sequences,
    /// so reads reflect writes even when virtual terminal mode is off.
    pub struct SystemConsole {
        output: HANDLE,
        /// Attribute word observed when the device was opened;
        /// `reset_colors` writes this back.
        default_attributes: u16,
    }

    // Safety: console handles are plain kernel handles; access is
    // serialized by the owning handle.
    unsafe impl Send for SystemConsole {}

    fn win_err(e: windows::core::Error) -> io::Error {
        io::Error::from_raw_os_error(e.code().0 as i32)
    }

    fn screen_buffer_info(handle: HANDLE) -> io::Result<CONSOLE_SCREEN_BUFFER_INFO> {
        let mut info = CONSOLE_SCREEN_BUFFER_INFO::default();
        unsafe {
            GetConsoleScreenBufferInfo(handle, &mut info).map_err(win_err)?;
        }
        Ok(info)
    }

    impl SystemConsole {
        /// Open the process's output console.
        ///
        /// Fails with [`ConsoleError::NoConsole`] when the process has no
        /// attached console (service hosts, detached children).
        pub fn open() -> Result<Self> {
            let output = unsafe { GetStdHandle(STD_OUTPUT_HANDLE) }
                .map_err(|e| ConsoleError::NoConsole(win_err(e)))?;
            let info = screen_buffer_info(output).map_err(ConsoleError::NoConsole)?;
            Ok(SystemConsole {
                output,
                default_attributes: info.wAttributes.0,
            })
        }

        fn set_attributes(&self, attributes: u16) -> Result<()> {
            unsafe {
                SetConsoleTextAttribute(self.output, CONSOLE_CHARACTER_ATTRIBUTES(attributes))
                    .map_err(|e| ConsoleError::Mutate(win_err(e)))
            }
        }
    }

    impl Console for SystemConsole {
        fn foreground(&self) -> Result<ConsoleColor> {
            let info = screen_buffer_info(self.output).map_err(ConsoleError::Query)?;
            Ok(ConsoleColor::from_index(info.wAttributes.0 as u8))
        }

        fn set_foreground(&mut self, color: ConsoleColor) -> Result<()> {
            let info = screen_buffer_info(self.output).map_err(ConsoleError::Query)?;
            self.set_attributes((info.wAttributes.0 & !0x000F) | color.attribute())
        }

        fn background(&self) -> Result<ConsoleColor> {
            let info = screen_buffer_info(self.output).map_err(ConsoleError::Query)?;
            Ok(ConsoleColor::from_index((info.wAttributes.0 >> 4) as u8))
        }

        fn set_background(&mut self, color: ConsoleColor) -> Result<()> {
            let info = screen_buffer_info(self.output).map_err(ConsoleError::Query)?;
            self.set_attributes((info.wAttributes.0 & !0x00F0) | (color.attribute() << 4))
        }

        fn reset_colors(&mut self) -> Result<()> {
            self.set_attributes(self.default_attributes)
        }

        fn cursor_position(&self) -> Result<(u16, u16)> {
            let info = screen_buffer_info(self.output).map_err(ConsoleError::Query)?;
            Ok((
                info.dwCursorPosition.X.max(0) as u16,
                info.dwCursorPosition.Y.max(0) as u16,
            ))
        }

        fn set_cursor_position(&mut self, column: u16, row: u16) -> Result<()> {
            let position = COORD {
                X: column as i16,
                Y: row as i16,
            };
            unsafe {
                SetConsoleCursorPosition(self.output, position)
                    .map_err(|e| ConsoleError::Mutate(win_err(e)))
            }
        }

        fn size(&self) -> Result<(u16, u16)> {
            let info = screen_buffer_info(self.output).map_err(ConsoleError::Query)?;
            let window = info.srWindow;
            Ok((
                (window.Right - window.Left + 1).max(0) as u16,
                (window.Bottom - window.Top + 1).max(0) as u16,
            ))
        }

        fn is_output_redirected(&self) -> bool {
            output_is_redirected()
        }

        fn term_type(&self) -> Option<String> {
            term_env()
        }
    }
}

#[cfg(not(windows))]
mod system {
    use super::*;

    use crossterm::cursor::{self, MoveTo};
    use crossterm::execute;
    use crossterm::style::{ResetColor, SetBackgroundColor, SetForegroundColor};
    use crossterm::terminal;

    /// Console device driven over ANSI escape sequences.
    ///
    /// Unix terminals cannot report their current colors, so the device
    /// shadows the last value written through it, starting from the
    /// conventional grey-on-black console defaults.
    pub struct SystemConsole {
        foreground: ConsoleColor,
        background: ConsoleColor,
    }

    impl SystemConsole {
        pub fn open() -> Result<Self> {
            Ok(SystemConsole {
                foreground: ConsoleColor::Grey,
                background: ConsoleColor::Black,
            })
        }
    }

    impl Console for SystemConsole {
        fn foreground(&self) -> Result<ConsoleColor> {
            Ok(self.foreground)
        }

        fn set_foreground(&mut self, color: ConsoleColor) -> Result<()> {
            execute!(io::stdout(), SetForegroundColor(color.to_crossterm()))
                .map_err(ConsoleError::Mutate)?;
            self.foreground = color;
            Ok(())
        }

        fn background(&self) -> Result<ConsoleColor> {
            Ok(self.background)
        }

        fn set_background(&mut self, color: ConsoleColor) -> Result<()> {
            execute!(io::stdout(), SetBackgroundColor(color.to_crossterm()))
                .map_err(ConsoleError::Mutate)?;
            self.background = color;
            Ok(())
        }

        fn reset_colors(&mut self) -> Result<()> {
            execute!(io::stdout(), ResetColor).map_err(ConsoleError::Mutate)?;
            self.foreground = ConsoleColor::Grey;
            self.background = ConsoleColor::Black;
            Ok(())
        }

        fn cursor_position(&self) -> Result<(u16, u16)> {
            cursor::position().map_err(ConsoleError::Query)
        }

        fn set_cursor_position(&mut self, column: u16, row: u16) -> Result<()> {
            execute!(io::stdout(), MoveTo(column, row)).map_err(ConsoleError::Mutate)
        }

        fn size(&self) -> Result<(u16, u16)> {
            terminal::size().map_err(ConsoleError::Query)
        }

        fn is_output_redirected(&self) -> bool {
            output_is_redirected()
        }

        fn term_type(&self) -> Option<String> {
            term_env()
        }
    }
}

pub use system::SystemConsole;
