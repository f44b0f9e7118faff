//! # IR Opcodes
//!
//! The intermediate representation for ticket printing: a flat sequence of
//! opcodes that can be inspected in tests and compiled to ESC/POS bytes.
//!
//! ```text
//! Document → IR (inspectable) → Codegen → Bytes
//! ```
//!
//! Each opcode is a single atomic operation. Style changes are individual
//! ops so a test can assert exactly which directives wrap which text.

use crate::protocol::barcode::qr::QrErrorLevel;
use crate::protocol::text::{Alignment, PrintMode};

/// IR opcodes - the "bytecode" for ticket printing.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    // ========== Printer Control ==========
    /// Initialize printer (ESC @).
    Init,

    /// Select character code table (ESC t n).
    SelectCharTable(u8),

    /// Select print speed level (GS ( K fn 50).
    PrintSpeed(u8),

    /// Set line spacing in dots (ESC 3 n).
    LineSpacing(u8),

    /// Feed to the cutter and make a full cut (GS V B n).
    Cut,

    // ========== Style Changes ==========
    /// Set text alignment (ESC a n).
    SetAlign(Alignment),

    /// Set print mode bits (ESC ! n).
    SetMode(PrintMode),

    // ========== Content ==========
    /// Text, UTF-8 encoded as-is. May contain embedded newlines.
    Text(String),

    /// Line feed.
    Newline,

    // ========== Symbols ==========
    /// QR code via the GS ( k function group.
    QrCode {
        data: String,
        module_size: u8,
        error_level: QrErrorLevel,
    },
}

/// A sequence of ops ready to compile.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub ops: Vec<Op>,
}

impl Program {
    /// Create an empty program.
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Create a program with an initial Init op.
    pub fn with_init() -> Self {
        Self {
            ops: vec![Op::Init],
        }
    }

    /// Add an op to the program.
    pub fn push(&mut self, op: Op) {
        self.ops.push(op);
    }

    /// Get the number of ops in the program.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if the program is empty.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// All text content concatenated, control ops skipped.
    pub fn text(&self) -> String {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Text(s) => Some(s.as_str()),
                Op::Newline => Some("\n"),
                _ => None,
            })
            .collect()
    }
}

impl FromIterator<Op> for Program {
    fn from_iter<T: IntoIterator<Item = Op>>(iter: T) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}
