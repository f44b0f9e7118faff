//! # ESC/POS Printer Commands
//!
//! Printer control commands: initialization, character table, print speed,
//! line spacing, feeding and cutting.
//!
//! ## Escape Sequence Structure
//!
//! - Single byte: `LF`
//! - Two bytes: `ESC @`
//! - With parameters: `ESC 3 n`, `GS V m n`
//! - Function groups: `GS ( K pL pH fn m`, where `pL pH` is the little-endian
//!   byte count of everything after them
//!
//! ## Reference
//!
//! Based on the Epson ESC/POS Application Programming Guide; the same command
//! set is implemented by the generic 58mm BLE printers this crate targets.

// ============================================================================
// ESCAPE SEQUENCE CONSTANTS
// ============================================================================

/// ESC (Escape) - Command prefix byte
pub const ESC: u8 = 0x1B;

/// GS (Group Separator) - Extended command prefix
///
/// Used for cutter, character size and 2D symbol commands.
pub const GS: u8 = 0x1D;

/// LF (Line Feed) - Print and advance one line
pub const LF: u8 = 0x0A;

/// Default line spacing in dots for `ESC 3 n`.
pub const DEFAULT_LINE_SPACING: u8 = 60;

/// Fastest level accepted by `GS ( K` function 50 on the targeted printers.
pub const MAX_PRINT_SPEED: u8 = 9;

// ============================================================================
// INITIALIZATION
// ============================================================================

/// # Initialize Printer (ESC @)
///
/// Clears the print buffer and resets styles, alignment and line spacing.
///
/// ## Protocol Details
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC @ |
/// | Hex     | 1B 40 |
///
/// ## Example
///
/// ```
/// use kotprint::protocol::commands;
///
/// assert_eq!(commands::init(), vec![0x1B, 0x40]);
/// ```
#[inline]
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

/// # Select Character Code Table (ESC t n)
///
/// Table 0 is PC437, which covers the ASCII range every receipt line uses.
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC t n |
/// | Hex     | 1B 74 n |
#[inline]
pub fn select_char_table(table: u8) -> Vec<u8> {
    vec![ESC, b't', table]
}

/// # Select Print Speed (GS ( K pL pH fn m)
///
/// Function 50 (`0x32`). Higher `level` prints faster; the value is clamped
/// to `1..=MAX_PRINT_SPEED`.
///
/// | Format  | Bytes |
/// |---------|-------|
/// | Hex     | 1D 28 4B 02 00 32 m |
#[inline]
pub fn print_speed(level: u8) -> Vec<u8> {
    vec![GS, b'(', b'K', 0x02, 0x00, 0x32, level.clamp(1, MAX_PRINT_SPEED)]
}

/// # Set Line Spacing (ESC 3 n)
///
/// Sets line spacing to `n` motion units (dots at 203 DPI).
///
/// | Format  | Bytes |
/// |---------|-------|
/// | Hex     | 1B 33 n |
#[inline]
pub fn line_spacing(dots: u8) -> Vec<u8> {
    vec![ESC, b'3', dots]
}

// ============================================================================
// CUTTER CONTROL
// ============================================================================

/// # Feed and Full Cut (GS V B n)
///
/// Feeds paper to the cutting position plus `n` dots, then cuts. This is the
/// variant sent at the end of every ticket (`1D 56 42 40`): the printer
/// itself accounts for the head-to-cutter distance.
///
/// | Format  | Bytes |
/// |---------|-------|
/// | Hex     | 1D 56 42 n |
///
/// ## Example
///
/// ```
/// use kotprint::protocol::commands;
///
/// assert_eq!(commands::cut_full_feed(0x40), vec![0x1D, 0x56, 0x42, 0x40]);
/// ```
#[inline]
pub fn cut_full_feed(dots: u8) -> Vec<u8> {
    vec![GS, b'V', b'B', dots]
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        assert_eq!(init(), vec![0x1B, 0x40]);
    }

    #[test]
    fn test_char_table() {
        assert_eq!(select_char_table(0), vec![0x1B, 0x74, 0x00]);
    }

    #[test]
    fn test_print_speed_clamped() {
        assert_eq!(print_speed(9), vec![0x1D, 0x28, 0x4B, 0x02, 0x00, 0x32, 0x09]);
        assert_eq!(print_speed(0)[6], 1);
        assert_eq!(print_speed(200)[6], MAX_PRINT_SPEED);
    }

    #[test]
    fn test_line_spacing() {
        assert_eq!(line_spacing(DEFAULT_LINE_SPACING), vec![0x1B, 0x33, 60]);
    }

    #[test]
    fn test_full_cut() {
        assert_eq!(cut_full_feed(0x40), vec![0x1D, 0x56, 0x42, 0x40]);
    }
}
