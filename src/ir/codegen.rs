//! # Code Generation
//!
//! Converts IR programs to ESC/POS bytes.

use tracing::debug;

use super::ops::{Op, Program};
use crate::error::Result;
use crate::protocol::barcode::qr;
use crate::protocol::{commands, text};

/// Feed distance in dots passed to `GS V B n` before a full cut.
pub const CUT_FEED_DOTS: u8 = 0x40;

impl Program {
    /// Compile the IR program to ESC/POS bytes.
    ///
    /// ## Errors
    ///
    /// [`PrintError::EncodingOverflow`](crate::error::PrintError) if a QR
    /// payload does not fit the single-byte length prefix. Nothing is
    /// returned in that case, so a caller can never send a partial ticket.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(1024);

        for op in &self.ops {
            match op {
                // ===== Printer Control =====
                Op::Init => out.extend(commands::init()),
                Op::SelectCharTable(table) => out.extend(commands::select_char_table(*table)),
                Op::PrintSpeed(level) => out.extend(commands::print_speed(*level)),
                Op::LineSpacing(dots) => out.extend(commands::line_spacing(*dots)),
                Op::Cut => out.extend(commands::cut_full_feed(CUT_FEED_DOTS)),

                // ===== Style Changes =====
                Op::SetAlign(align) => out.extend(text::align(*align)),
                Op::SetMode(mode) => out.extend(text::print_mode(*mode)),

                // ===== Content =====
                Op::Text(s) => out.extend_from_slice(s.as_bytes()),
                Op::Newline => out.push(commands::LF),

                // ===== Symbols =====
                Op::QrCode {
                    data,
                    module_size,
                    error_level,
                } => {
                    out.extend(qr::set_model(qr::QrModel::Model2));
                    out.extend(qr::set_module_size(*module_size));
                    out.extend(qr::set_error_correction(*error_level));
                    out.extend(qr::store_data(data.as_bytes())?);
                    out.extend(qr::print());
                }
            }
        }

        debug!(ops = self.ops.len(), bytes = out.len(), "compiled program");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PrintError;
    use crate::protocol::barcode::qr::QrErrorLevel;
    use crate::protocol::text::{Alignment, PrintMode};

    #[test]
    fn test_empty_program() {
        assert!(Program::new().to_bytes().unwrap().is_empty());
    }

    #[test]
    fn test_init_only() {
        assert_eq!(Program::with_init().to_bytes().unwrap(), vec![0x1B, 0x40]);
    }

    #[test]
    fn test_styled_text() {
        let mut program = Program::with_init();
        program.push(Op::SetAlign(Alignment::Center));
        program.push(Op::SetMode(PrintMode::DOUBLE_HEIGHT));
        program.push(Op::Text("PAID".into()));
        program.push(Op::Newline);
        program.push(Op::SetMode(PrintMode::NORMAL));

        let bytes = program.to_bytes().unwrap();
        assert_eq!(
            bytes,
            vec![
                0x1B, 0x40, // init
                0x1B, 0x61, 0x01, // center
                0x1B, 0x21, 0x10, // double height
                b'P', b'A', b'I', b'D', 0x0A, //
                0x1B, 0x21, 0x00, // normal
            ]
        );
    }

    #[test]
    fn test_utf8_text_passthrough() {
        let mut program = Program::new();
        program.push(Op::Text("₹".into()));
        assert_eq!(program.to_bytes().unwrap(), "₹".as_bytes());
    }

    #[test]
    fn test_full_cut_bytes() {
        let mut program = Program::new();
        program.push(Op::Cut);
        assert_eq!(program.to_bytes().unwrap(), vec![0x1D, 0x56, 0x42, 0x40]);
    }

    #[test]
    fn test_qr_group_order() {
        let mut program = Program::new();
        program.push(Op::QrCode {
            data: "PAY".into(),
            module_size: 6,
            error_level: QrErrorLevel::M,
        });
        let bytes = program.to_bytes().unwrap();
        // five GS ( k commands
        let count = bytes.windows(3).filter(|w| w == &[0x1D, 0x28, 0x6B]).count();
        assert_eq!(count, 5);
        assert!(bytes.windows(8).any(|w| w == [0x1D, 0x28, 0x6B, 6, 0x00, 0x31, 0x50, 0x30]));
    }

    #[test]
    fn test_qr_overflow_fails_whole_program() {
        let mut program = Program::with_init();
        program.push(Op::Text("before".into()));
        program.push(Op::QrCode {
            data: "x".repeat(300),
            module_size: 6,
            error_level: QrErrorLevel::M,
        });
        assert!(matches!(
            program.to_bytes(),
            Err(PrintError::EncodingOverflow { len: 300, .. })
        ));
    }
}
