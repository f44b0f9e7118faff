//! # Printer Configuration
//!
//! Hardware profile and BLE addressing for the supported printer class.
//!
//! ## Supported Printers
//!
//! | Profile | Paper | Columns | Interface |
//! |---------|-------|---------|-----------|
//! | Generic 58mm | 58mm | 32 (Font A) | BLE GATT |
//!
//! The targeted printers are unbranded 58mm ESC/POS units sold under many
//! names. They do not share a GATT layout, so the connection manager matches
//! the service and characteristic against the tables below.
//!
//! ## Usage
//!
//! ```
//! use kotprint::printer::PrinterConfig;
//!
//! let config = PrinterConfig::GENERIC_58MM;
//! assert_eq!(config.columns, 32);
//! ```

use uuid::Uuid;

use crate::protocol::barcode::qr::QrErrorLevel;
use crate::protocol::commands::{DEFAULT_LINE_SPACING, MAX_PRINT_SPEED};

// ============================================================================
// GATT ADDRESSING
// ============================================================================

/// Vendor service UUIDs. Any match selects the service.
///
/// | UUID | Vendor |
/// |------|--------|
/// | `49535343-FE7D-4AE5-8FA9-9FAFD205E455` | Microchip transparent UART |
/// | `E7810A71-73AE-499D-8C15-FAA9AEF0C3F2` | Generic Chinese POS modules |
/// | `000018F0-0000-1000-8000-00805F9B34FB` | 16-bit `0x18F0` printer service |
pub const SERVICE_UUIDS: [Uuid; 3] = [
    Uuid::from_u128(0x49535343_fe7d_4ae5_8fa9_9fafd205e455),
    Uuid::from_u128(0xe7810a71_73ae_499d_8c15_faa9aef0c3f2),
    Uuid::from_u128(0x000018f0_0000_1000_8000_00805f9b34fb),
];

/// Write characteristic UUIDs, matched within the selected service.
pub const CHARACTERISTIC_UUIDS: [Uuid; 2] = [
    Uuid::from_u128(0x49535343_8841_43f4_a8d4_ecbe34729bb3),
    Uuid::from_u128(0xbef8d6c9_9c21_4c9e_b632_bd58c1009f9f),
];

// ============================================================================
// PRINTER PROFILE
// ============================================================================

/// # Printer Configuration
///
/// Defines the layout and command parameters used when encoding a ticket.
///
/// ## Layout
///
/// - **columns**: characters per line in Font A
///
/// ## Commands
///
/// - **char_table**: `ESC t n` code table
/// - **print_speed**: `GS ( K` speed level
/// - **line_spacing**: `ESC 3 n` dots
/// - **qr_module_size** / **qr_error_level**: QR symbol parameters
#[derive(Debug, Clone, Copy)]
pub struct PrinterConfig {
    /// Profile name
    pub name: &'static str,

    /// Receipt line width in characters
    pub columns: usize,

    /// Character code table selected in the prologue
    pub char_table: u8,

    /// Print speed level selected in the prologue
    pub print_speed: u8,

    /// Line spacing in dots
    pub line_spacing: u8,

    /// QR module size in dots
    pub qr_module_size: u8,

    /// QR error correction level
    pub qr_error_level: QrErrorLevel,
}

impl PrinterConfig {
    /// # Generic 58mm BLE Printer
    ///
    /// | Property | Value |
    /// |----------|-------|
    /// | Paper width | 58mm |
    /// | Print width | 48mm (384 dots) |
    /// | Font A | 12×24 dots, 32 columns |
    pub const GENERIC_58MM: Self = Self {
        name: "Generic 58mm",
        columns: 32,
        char_table: 0,
        print_speed: MAX_PRINT_SPEED,
        line_spacing: DEFAULT_LINE_SPACING,
        qr_module_size: 6,
        qr_error_level: QrErrorLevel::M,
    };
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self::GENERIC_58MM
    }
}

// ============================================================================
// TESTS
// ============================================================================
