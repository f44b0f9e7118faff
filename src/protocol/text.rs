//! # ESC/POS Text Commands
//!
//! Alignment and print mode selection.
//!
//! ## Print Mode Bits (ESC ! n)
//!
//! | Bit | Hex | Effect |
//! |-----|-----|--------|
//! | 0 | 0x01 | Font B |
//! | 3 | 0x08 | Emphasized |
//! | 4 | 0x10 | Double height |
//! | 5 | 0x20 | Double width |
//! | 7 | 0x80 | Underline |
//!
//! `ESC ! 0` restores normal text; it is emitted after every banner.

use super::commands::ESC;

// ============================================================================
// TEXT ALIGNMENT
// ============================================================================

/// Text alignment options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

/// # Select Justification (ESC a n)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC a n |
/// | Hex     | 1B 61 n |
///
/// Applies from the start of the next line.
#[inline]
pub fn align(alignment: Alignment) -> Vec<u8> {
    vec![ESC, b'a', alignment as u8]
}

// ============================================================================
// PRINT MODE
// ============================================================================

/// Print mode bit set for `ESC ! n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrintMode(pub u8);

impl PrintMode {
    pub const NORMAL: Self = Self(0x00);
    pub const EMPHASIZED: Self = Self(0x08);
    pub const DOUBLE_HEIGHT: Self = Self(0x10);

    /// Combine two modes.
    pub const fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn is_double_height(self) -> bool {
        self.0 & Self::DOUBLE_HEIGHT.0 != 0
    }
}

/// # Select Print Mode (ESC ! n)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC ! n |
/// | Hex     | 1B 21 n |
///
/// ## Example
///
/// ```
/// use kotprint::protocol::text::{print_mode, PrintMode};
///
/// assert_eq!(print_mode(PrintMode::DOUBLE_HEIGHT), vec![0x1B, 0x21, 0x10]);
/// assert_eq!(print_mode(PrintMode::NORMAL), vec![0x1B, 0x21, 0x00]);
/// ```
#[inline]
pub fn print_mode(mode: PrintMode) -> Vec<u8> {
    vec![ESC, b'!', mode.0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align() {
        assert_eq!(align(Alignment::Left), vec![0x1B, 0x61, 0x00]);
        assert_eq!(align(Alignment::Center), vec![0x1B, 0x61, 0x01]);
        assert_eq!(align(Alignment::Right), vec![0x1B, 0x61, 0x02]);
    }

    #[test]
    fn test_print_mode_combination() {
        let banner = PrintMode::DOUBLE_HEIGHT.with(PrintMode::EMPHASIZED);
        assert_eq!(print_mode(banner), vec![0x1B, 0x21, 0x18]);
        assert!(banner.is_double_height());
        assert!(!PrintMode::EMPHASIZED.is_double_height());
    }
}
