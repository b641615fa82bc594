//! Console color palette.
//!
//! The 16-entry palette every console host understands. Variant values
//! follow the console attribute encoding (low nibble = foreground), so the
//! Windows conversions are a cast away; [`ConsoleColor::to_crossterm`] maps
//! onto the ANSI equivalents for escape-sequence output.

use crossterm::style::Color;

/// A color from the console's 16-entry palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConsoleColor {
    Black = 0,
    DarkBlue = 1,
    DarkGreen = 2,
    DarkCyan = 3,
    DarkRed = 4,
    DarkMagenta = 5,
    DarkYellow = 6,
    Grey = 7,
    DarkGrey = 8,
    Blue = 9,
    Green = 10,
    Cyan = 11,
    Red = 12,
    Magenta = 13,
    Yellow = 14,
    White = 15,
}

impl ConsoleColor {
    /// Decode a palette entry from a console attribute nibble.
    ///
    /// Only the low four bits are read, so a full attribute word can be
    /// passed directly.
    pub fn from_index(index: u8) -> Self {
        const PALETTE: [ConsoleColor; 16] = [
            ConsoleColor::Black,
            ConsoleColor::DarkBlue,
            ConsoleColor::DarkGreen,
            ConsoleColor::DarkCyan,
            ConsoleColor::DarkRed,
            ConsoleColor::DarkMagenta,
            ConsoleColor::DarkYellow,
            ConsoleColor::Grey,
            ConsoleColor::DarkGrey,
            ConsoleColor::Blue,
            ConsoleColor::Green,
            ConsoleColor::Cyan,
            ConsoleColor::Red,
            ConsoleColor::Magenta,
            ConsoleColor::Yellow,
            ConsoleColor::White,
        ];
        PALETTE[(index & 0x0F) as usize]
    }

    /// Console attribute nibble for this color.
    pub fn attribute(self) -> u16 {
        self as u16
    }

    /// Convert to crossterm Color
    pub fn to_crossterm(self) -> Color {
        match self {
            ConsoleColor::Black => Color::Black,
            ConsoleColor::DarkBlue => Color::DarkBlue,
            ConsoleColor::DarkGreen => Color::DarkGreen,
            ConsoleColor::DarkCyan => Color::DarkCyan,
            ConsoleColor::DarkRed => Color::DarkRed,
            ConsoleColor::DarkMagenta => Color::DarkMagenta,
            ConsoleColor::DarkYellow => Color::DarkYellow,
            ConsoleColor::Grey => Color::Grey,
            ConsoleColor::DarkGrey => Color::DarkGrey,
            ConsoleColor::Blue => Color::Blue,
            ConsoleColor::Green => Color::Green,
            ConsoleColor::Cyan => Color::Cyan,
            ConsoleColor::Red => Color::Red,
            ConsoleColor::Magenta => Color::Magenta,
            ConsoleColor::Yellow => Color::Yellow,
            ConsoleColor::White => Color::White,
        }
    }
}
