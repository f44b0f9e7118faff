//! # ESC/POS QR Code Commands
//!
//! QR codes are printed with the `GS ( k` function group (`cn = 49`) in five
//! steps:
//!
//! 1. Select model (function 165)
//! 2. Set module size (function 167)
//! 3. Set error correction level (function 169)
//! 4. Store symbol data (function 180)
//! 5. Print the stored symbol (function 181)
//!
//! ```
//! use kotprint::protocol::barcode::qr;
//!
//! let mut data = Vec::new();
//! data.extend(qr::set_model(qr::QrModel::Model2));
//! data.extend(qr::set_module_size(6));
//! data.extend(qr::set_error_correction(qr::QrErrorLevel::M));
//! data.extend(qr::store_data(b"upi://pay?pa=cafe@okbank").unwrap());
//! data.extend(qr::print());
//! ```
//!
//! ## Length Prefix
//!
//! The store command's `pL pH` count the payload plus the three bytes
//! `cn fn m`. Only `pL` is ever populated here (`pH = 0`), so the payload
//! must satisfy `len + 3 <= 255`. Longer payloads are rejected with
//! [`PrintError::EncodingOverflow`](crate::error::PrintError) rather than
//! emitting a wrapped length byte the printer would misread.

/// QR code command builders
pub mod qr {
    use crate::error::{PrintError, Result};
    use crate::protocol::commands::GS;

    /// Largest payload whose length prefix fits in one byte.
    pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize - 3;

    /// `GS ( k` prefix
    const PREFIX: [u8; 3] = [GS, b'(', b'k'];

    /// Symbol type byte for QR code
    const CN: u8 = 0x31;

    /// QR Code model selection
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum QrModel {
        Model1 = 0x31,
        #[default]
        Model2 = 0x32,
    }

    /// QR Code error correction level
    ///
    /// | Level | Recovery |
    /// |-------|----------|
    /// | L | ~7% |
    /// | M | ~15% |
    /// | Q | ~25% |
    /// | H | ~30% |
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum QrErrorLevel {
        L = 0x30,
        #[default]
        M = 0x31,
        Q = 0x32,
        H = 0x33,
    }

    /// # Select Model (GS ( k 04 00 31 41 n1 n2)
    pub fn set_model(model: QrModel) -> Vec<u8> {
        let mut cmd = PREFIX.to_vec();
        cmd.extend_from_slice(&[0x04, 0x00, CN, 0x41, model as u8, 0x00]);
        cmd
    }

    /// # Set Module Size (GS ( k 03 00 31 43 n)
    ///
    /// Module size in dots, clamped to `1..=16`.
    pub fn set_module_size(dots: u8) -> Vec<u8> {
        let mut cmd = PREFIX.to_vec();
        cmd.extend_from_slice(&[0x03, 0x00, CN, 0x43, dots.clamp(1, 16)]);
        cmd
    }

    /// # Set Error Correction Level (GS ( k 03 00 31 45 n)
    pub fn set_error_correction(level: QrErrorLevel) -> Vec<u8> {
        let mut cmd = PREFIX.to_vec();
        cmd.extend_from_slice(&[0x03, 0x00, CN, 0x45, level as u8]);
        cmd
    }

    /// # Store Symbol Data (GS ( k pL pH 31 50 30 d1...dk)
    ///
    /// `pL = len + 3`, `pH = 0`.
    ///
    /// ## Errors
    ///
    /// [`PrintError::EncodingOverflow`] when `data.len() > MAX_PAYLOAD_LEN`.
    ///
    /// ## Example
    ///
    /// ```
    /// use kotprint::protocol::barcode::qr;
    ///
    /// let cmd = qr::store_data(b"HELLO").unwrap();
    /// assert_eq!(cmd[3], 5 + 3);
    /// assert_eq!(cmd[4], 0);
    /// assert!(qr::store_data(&[b'x'; 253]).is_err());
    /// ```
    pub fn store_data(data: &[u8]) -> Result<Vec<u8>> {
        if data.len() > MAX_PAYLOAD_LEN {
            return Err(PrintError::EncodingOverflow {
                len: data.len(),
                max: MAX_PAYLOAD_LEN,
            });
        }
        let mut cmd = PREFIX.to_vec();
        cmd.reserve(5 + data.len());
        cmd.extend_from_slice(&[(data.len() + 3) as u8, 0x00, CN, 0x50, 0x30]);
        cmd.extend_from_slice(data);
        Ok(cmd)
    }

    /// # Print Symbol (GS ( k 03 00 31 51 30)
    pub fn print() -> Vec<u8> {
        let mut cmd = PREFIX.to_vec();
        cmd.extend_from_slice(&[0x03, 0x00, CN, 0x51, 0x30]);
        cmd
    }
}
